pub mod handshake;
pub mod show;
pub mod transfer;

use std::time::Duration;

use tracing::warn;

use crate::resolve::{self, AddrLookup, Resolver};
use crate::wg::Peer;

/// How peers are labelled in plugin output: raw, or annotated with
/// reverse-DNS hostnames.
pub struct Names<L = Resolver> {
    lookup: Option<L>,
}

impl Names {
    /// Falls back to raw names when the system resolver cannot be set up.
    /// Must be called inside a tokio runtime.
    pub fn new(resolve: bool, timeout: Duration) -> Self {
        if !resolve {
            return Self::raw();
        }
        match Resolver::from_system_conf(timeout) {
            Ok(resolver) => Self::with_lookup(resolver),
            Err(e) => {
                warn!(error = %e, "reverse DNS disabled");
                Self::raw()
            }
        }
    }
}

impl<L: AddrLookup> Names<L> {
    pub fn raw() -> Self {
        Self { lookup: None }
    }

    pub fn with_lookup(lookup: L) -> Self {
        Self {
            lookup: Some(lookup),
        }
    }

    pub async fn peer(&self, peer: &Peer) -> String {
        match &self.lookup {
            Some(lookup) => resolve::display_name(lookup, peer).await,
            None => peer.name().to_string(),
        }
    }

    pub async fn endpoint(&self, peer: &Peer) -> String {
        match &self.lookup {
            Some(lookup) => resolve::display_endpoint(lookup, peer).await,
            None => peer.endpoint.clone(),
        }
    }
}

/// Runtime for one check; lookups are the only thing it ever awaits.
fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    use anyhow::Context;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("creating async runtime")
}
