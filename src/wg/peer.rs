//! Peer records: lines 2..N of the dump.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::error::{unsigned_digits, Field, FieldError, TimestampOutOfRange};
use super::{DUMP_NONE, DUMP_OFF};

/// Number of tab-separated fields in a peer record.
pub const PEER_FIELDS: usize = 8;

/// One remote peer configured on the interface.
///
/// A `Peer::default()` is not valid; only [`Peer::from_record`] produces
/// valid peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub public_key: String,
    /// Serialized as `"(hidden)"` when set.
    #[serde(serialize_with = "hidden")]
    pub preshared_key: Option<String>,
    pub endpoint: String,
    pub allowed_ips: Vec<String>,
    /// `None` when no handshake was ever observed.
    pub latest_handshake: Option<DateTime<Utc>>,
    pub rx: u64,
    pub tx: u64,
    /// `None` when persistent keepalive is off.
    #[serde(with = "humantime_serde")]
    pub persistent_keepalive: Option<Duration>,

    #[serde(skip)]
    valid: bool,
}

impl Peer {
    /// Decode one peer record. `rec` must hold exactly [`PEER_FIELDS`]
    /// fields; the decoder checks that before calling.
    pub fn from_record(rec: &[&str]) -> Result<Self, FieldError> {
        debug_assert_eq!(rec.len(), PEER_FIELDS);

        let latest_handshake = parse_latest_handshake(rec[4])?;
        let rx = parse_bytes(Field::TransferRx, rec[5])?;
        let tx = parse_bytes(Field::TransferTx, rec[6])?;
        let persistent_keepalive = parse_keepalive(rec[7])?;

        Ok(Self {
            public_key: rec[0].to_string(),
            preshared_key: (rec[1] != DUMP_NONE).then(|| rec[1].to_string()),
            endpoint: rec[2].to_string(),
            allowed_ips: rec[3].split(',').map(str::to_string).collect(),
            latest_handshake,
            rx,
            tx,
            persistent_keepalive,
            valid: true,
        })
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Display identifier: the first allowed IP.
    pub fn name(&self) -> &str {
        self.allowed_ips.first().map_or("", String::as_str)
    }

    /// Persistent keepalive interval, zero when off.
    pub fn keepalive(&self) -> Duration {
        self.persistent_keepalive.unwrap_or_default()
    }

    pub fn never_handshaken(&self) -> bool {
        self.latest_handshake.is_none()
    }

    /// Strictly earlier handshake than `other`. A peer without any
    /// handshake sorts before every real timestamp.
    pub fn handshake_before(&self, other: &Peer) -> bool {
        self.latest_handshake < other.latest_handshake
    }
}

fn hidden<S: Serializer>(secret: &Option<String>, ser: S) -> Result<S::Ok, S::Error> {
    match secret {
        Some(_) => ser.serialize_str("(hidden)"),
        None => ser.serialize_none(),
    }
}

fn parse_latest_handshake(s: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
    let secs: u64 = unsigned_digits(Field::LatestHandshake, s, 10)?
        .parse()
        .map_err(|e| FieldError::new(Field::LatestHandshake, s, e))?;
    if secs == 0 {
        return Ok(None);
    }
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(Some)
        .ok_or_else(|| FieldError::new(Field::LatestHandshake, s, TimestampOutOfRange))
}

fn parse_bytes(field: Field, s: &str) -> Result<u64, FieldError> {
    unsigned_digits(field, s, 10)?
        .parse()
        .map_err(|e| FieldError::new(field, s, e))
}

fn parse_keepalive(s: &str) -> Result<Option<Duration>, FieldError> {
    if s == DUMP_OFF {
        return Ok(None);
    }
    let secs: u16 = unsigned_digits(Field::PersistentKeepalive, s, 10)?
        .parse()
        .map_err(|e| FieldError::new(Field::PersistentKeepalive, s, e))?;
    Ok(Some(Duration::from_secs(secs.into())))
}
