//! Reverse-DNS annotation of peer names and endpoints.
//!
//! `10.0.0.2/32` becomes `10.0.0.2/32 (host.example)` and
//! `192.0.2.1:51820` becomes `192.0.2.1:51820 (gw.example)`. A missing PTR
//! record is not an error; the raw value is kept.

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::error::{ResolveError as DnsError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use ipnet::IpNet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::wg::Peer;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("parse {cidr:?}: {source}")]
    InvalidCidr {
        cidr: String,
        #[source]
        source: ipnet::AddrParseError,
    },

    #[error("parse address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("create resolver: {0}")]
    Init(#[source] DnsError),

    #[error("resolving {addr}: {source}")]
    Lookup {
        addr: IpAddr,
        #[source]
        source: DnsError,
    },

    #[error("resolving {addr}: timed out after {timeout:?}")]
    Timeout { addr: IpAddr, timeout: Duration },
}

/// PTR lookups.
#[allow(async_fn_in_trait)]
pub trait AddrLookup {
    /// Hostname of `ip` without the trailing dot, `None` when no record
    /// exists.
    async fn lookup_addr(&self, ip: IpAddr) -> Result<Option<String>, ResolveError>;
}

/// System resolver with a hard deadline per lookup.
pub struct Resolver {
    inner: TokioAsyncResolver,
    timeout: Duration,
}

impl Resolver {
    pub fn from_system_conf(timeout: Duration) -> Result<Self, ResolveError> {
        let inner = TokioAsyncResolver::tokio_from_system_conf().map_err(ResolveError::Init)?;
        Ok(Self { inner, timeout })
    }
}

impl AddrLookup for Resolver {
    async fn lookup_addr(&self, ip: IpAddr) -> Result<Option<String>, ResolveError> {
        debug!(%ip, "reverse lookup");
        let result = tokio::time::timeout(self.timeout, self.inner.reverse_lookup(ip)).await;
        match result {
            Err(_) => Err(ResolveError::Timeout {
                addr: ip,
                timeout: self.timeout,
            }),
            Ok(Err(e)) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(None),
            Ok(Err(source)) => Err(ResolveError::Lookup { addr: ip, source }),
            Ok(Ok(lookup)) => Ok(lookup
                .iter()
                .next()
                .map(|ptr| ptr.to_utf8().trim_end_matches('.').to_string())),
        }
    }
}

/// Peer name with its hostname appended, e.g. `10.0.0.2/32 (host)`.
pub async fn resolved_name<L: AddrLookup>(lookup: &L, peer: &Peer) -> Result<String, ResolveError> {
    let cidr = peer.name();
    let net: IpNet = cidr.parse().map_err(|source| ResolveError::InvalidCidr {
        cidr: cidr.to_string(),
        source,
    })?;
    let ip = net.addr();
    let hostname = lookup.lookup_addr(ip).await?;
    Ok(annotate(cidr, ip, hostname))
}

/// Endpoint with its hostname appended, e.g. `192.0.2.1:51820 (host)`.
/// Endpoints without a port (including `(none)`) are returned as is.
pub async fn endpoint_name<L: AddrLookup>(lookup: &L, peer: &Peer) -> Result<String, ResolveError> {
    let endpoint = peer.endpoint.as_str();
    let Some((host, _port)) = endpoint.rsplit_once(':') else {
        return Ok(endpoint.to_string());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let ip: IpAddr = host.parse().map_err(|source| ResolveError::InvalidAddress {
        addr: host.to_string(),
        source,
    })?;
    let hostname = lookup.lookup_addr(ip).await?;
    Ok(annotate(endpoint, ip, hostname))
}

/// [`resolved_name`], falling back to the raw name on failure.
pub async fn display_name<L: AddrLookup>(lookup: &L, peer: &Peer) -> String {
    resolved_name(lookup, peer).await.unwrap_or_else(|e| {
        warn!(peer = peer.name(), error = %e, "failed to resolve peer name");
        peer.name().to_string()
    })
}

/// [`endpoint_name`], falling back to the raw endpoint on failure.
pub async fn display_endpoint<L: AddrLookup>(lookup: &L, peer: &Peer) -> String {
    endpoint_name(lookup, peer).await.unwrap_or_else(|e| {
        warn!(endpoint = %peer.endpoint, error = %e, "failed to resolve peer endpoint");
        peer.endpoint.clone()
    })
}

fn annotate(raw: &str, ip: IpAddr, hostname: Option<String>) -> String {
    match hostname {
        Some(hostname) if hostname != ip.to_string() => format!("{raw} ({hostname})"),
        _ => raw.to_string(),
    }
}
