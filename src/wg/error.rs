//! Errors produced while decoding `wg show <iface> dump` output.

use std::fmt;
use std::io;
use std::num::{IntErrorKind, ParseIntError};

use thiserror::Error;

/// A failed decode. Any of these aborts the whole parse; no partial dump is
/// ever returned.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Input ended before the interface record was read.
    #[error("parse first line: {source}")]
    StreamExhausted {
        #[source]
        source: io::Error,
    },

    #[error("read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: wrong number of fields: expected {expected}, got {got}")]
    FieldCount {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("parse interface record: {source}")]
    Interface {
        #[source]
        source: FieldError,
    },

    #[error("parse peer record at line {line}: {source}")]
    Peer {
        line: usize,
        #[source]
        source: FieldError,
    },
}

impl DumpError {
    pub(crate) fn stream_exhausted() -> Self {
        Self::StreamExhausted {
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of input"),
        }
    }

    pub fn is_stream_exhausted(&self) -> bool {
        matches!(self, Self::StreamExhausted { .. })
    }

    pub fn is_field_count(&self) -> bool {
        matches!(self, Self::FieldCount { .. })
    }

    /// The field-level failure behind an interface or peer record error.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            Self::Interface { source } | Self::Peer { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Column of a dump record that holds a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ListenPort,
    FwMark,
    LatestHandshake,
    TransferRx,
    TransferTx,
    PersistentKeepalive,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::ListenPort => "listen-port",
            Field::FwMark => "fwmark",
            Field::LatestHandshake => "latest-handshake",
            Field::TransferRx => "transfer-rx",
            Field::TransferTx => "transfer-tx",
            Field::PersistentKeepalive => "persistent-keepalive",
        };
        f.write_str(name)
    }
}

/// A numeric field that failed to parse under its declared base and width.
///
/// The low-level cause is kept as the error source, so a
/// [`ParseIntError`] can still be downcast after any amount of wrapping.
#[derive(Debug, Error)]
#[error("failed parse {field} {value:?}: {cause}")]
pub struct FieldError {
    pub field: Field,
    pub value: String,
    #[source]
    cause: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// Value with something other than digits in it, such as a sign.
#[derive(Debug, Error)]
#[error("invalid digit found in string")]
pub struct InvalidDigits;

/// Seconds value that parsed but cannot be represented as a point in time.
#[derive(Debug, Error)]
#[error("timestamp out of range")]
pub struct TimestampOutOfRange;

impl FieldError {
    pub(crate) fn new<E>(field: Field, value: &str, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            field,
            value: value.to_string(),
            cause: Box::new(cause),
        }
    }

    /// True when the value was not a number at all, as opposed to a number
    /// that does not fit the field.
    pub fn is_syntax(&self) -> bool {
        self.cause.is::<InvalidDigits>()
            || matches!(
                self.int_error().map(ParseIntError::kind),
                Some(IntErrorKind::InvalidDigit | IntErrorKind::Empty)
            )
    }

    pub(crate) fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn int_error(&self) -> Option<&ParseIntError> {
        self.cause.downcast_ref()
    }
}

/// Rejects anything but bare digits of `radix`. Rust's integer parsing
/// takes a leading `+`; dump fields never carry a sign.
pub(crate) fn unsigned_digits(field: Field, s: &str, radix: u32) -> Result<&str, FieldError> {
    if s.chars().all(|c| c.is_digit(radix)) {
        Ok(s)
    } else {
        Err(FieldError::new(field, s, InvalidDigits))
    }
}
