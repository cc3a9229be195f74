//! Icinga2 / Nagios health checks of WireGuard peers, using the output of
//! `wg show <iface> dump`.
//!
//! [`wg`] decodes the dump and answers the two questions the checks ask:
//! which peer has the oldest handshake, and which peer has a given name.
//! [`commands`] turns the answers into monitoring plugin results.

pub mod commands;
pub mod config;
pub mod plugin;
pub mod resolve;
pub mod source;
pub mod wg;
