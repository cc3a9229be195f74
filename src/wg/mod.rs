//! Model of `wg show <iface> dump` output.

pub mod dump;
pub mod error;
pub mod peer;

pub use dump::{Dump, Interface};
pub use error::{DumpError, Field, FieldError};
pub use peer::Peer;

/// Absent key.
const DUMP_NONE: &str = "(none)";
/// Disabled fwmark or persistent keepalive.
const DUMP_OFF: &str = "off";
