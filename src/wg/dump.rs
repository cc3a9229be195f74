//! Decoder for `wg show <iface> dump` and the queries the checks need.
//!
//! The first line describes the interface (4 fields), every following line
//! one peer (8 fields). Decoding is all-or-nothing: the first bad line
//! aborts it.

use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;

use serde::Serialize;

use super::error::{unsigned_digits, DumpError, Field, FieldError};
use super::peer::{Peer, PEER_FIELDS};
use super::{DUMP_NONE, DUMP_OFF};

/// Number of tab-separated fields in the interface record.
pub const INTERFACE_FIELDS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Interface {
    /// Never serialized.
    #[serde(skip)]
    pub private_key: Option<String>,
    pub public_key: String,
    pub listen_port: u16,
    /// Zero when off.
    pub fwmark: u32,
}

impl Interface {
    pub fn from_record(rec: &[&str]) -> Result<Self, FieldError> {
        debug_assert_eq!(rec.len(), INTERFACE_FIELDS);

        let listen_port = unsigned_digits(Field::ListenPort, rec[2], 10)?
            .parse()
            .map_err(|e| FieldError::new(Field::ListenPort, rec[2], e))?;
        let fwmark = parse_fwmark(rec[3])?;

        Ok(Self {
            private_key: (rec[0] != DUMP_NONE).then(|| rec[0].to_string()),
            public_key: rec[1].to_string(),
            listen_port,
            fwmark,
        })
    }
}

/// `off`, a `0x` hex literal, or decimal.
fn parse_fwmark(s: &str) -> Result<u32, FieldError> {
    if s == DUMP_OFF {
        return Ok(0);
    }
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    let digits = unsigned_digits(Field::FwMark, digits, radix).map_err(|e| e.with_value(s))?;
    u32::from_str_radix(digits, radix).map_err(|e| FieldError::new(Field::FwMark, s, e))
}

/// Snapshot of one interface and its peers, in input order.
///
/// Queries hand out references into `peers`, never copies: a peer changed
/// through [`Dump::peer_mut`] or `peers[i]` is what the next query sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dump {
    pub interface: Interface,
    pub peers: Vec<Peer>,
}

impl Dump {
    pub fn from_reader<R: Read>(r: R) -> Result<Self, DumpError> {
        decode(BufReader::new(r))
    }

    /// Peer with the earliest latest handshake. Peers that never completed
    /// a handshake sort first; ties keep the first one seen.
    pub fn oldest_handshake(&self) -> Option<&Peer> {
        self.oldest_handshake_except::<&str>(&[])
    }

    /// Like [`Dump::oldest_handshake`], skipping peers whose name is in
    /// `exclude`.
    pub fn oldest_handshake_except<S: AsRef<str>>(&self, exclude: &[S]) -> Option<&Peer> {
        let mut oldest: Option<&Peer> = None;
        for peer in &self.peers {
            if exclude.iter().any(|name| name.as_ref() == peer.name()) {
                continue;
            }
            if oldest.map_or(true, |o| peer.handshake_before(o)) {
                oldest = Some(peer);
            }
        }
        oldest
    }

    /// First peer whose name matches exactly.
    pub fn peer(&self, name: &str) -> Option<&Peer> {
        self.peers.iter().find(|p| p.name() == name)
    }

    pub fn peer_mut(&mut self, name: &str) -> Option<&mut Peer> {
        self.peers.iter_mut().find(|p| p.name() == name)
    }
}

impl FromStr for Dump {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s.as_bytes())
    }
}

enum State {
    AwaitingInterface,
    ReadingPeers { interface: Interface, peers: Vec<Peer> },
}

impl State {
    fn expected_fields(&self) -> usize {
        match self {
            State::AwaitingInterface => INTERFACE_FIELDS,
            State::ReadingPeers { .. } => PEER_FIELDS,
        }
    }
}

/// Line-at-a-time decoder. Owns all state, so every decode starts fresh.
struct Decoder {
    state: State,
}

impl Decoder {
    fn new() -> Self {
        Self {
            state: State::AwaitingInterface,
        }
    }

    fn push_line(&mut self, line_no: usize, line: &str) -> Result<(), DumpError> {
        if line.is_empty() {
            return Ok(());
        }

        let rec: Vec<&str> = line.split('\t').collect();
        let expected = self.state.expected_fields();
        if rec.len() != expected {
            return Err(DumpError::FieldCount {
                line: line_no,
                expected,
                got: rec.len(),
            });
        }

        match self.state {
            State::AwaitingInterface => {
                let interface = Interface::from_record(&rec)
                    .map_err(|source| DumpError::Interface { source })?;
                self.state = State::ReadingPeers {
                    interface,
                    peers: Vec::new(),
                };
            }
            State::ReadingPeers { ref mut peers, .. } => {
                let peer = Peer::from_record(&rec).map_err(|source| DumpError::Peer {
                    line: line_no,
                    source,
                })?;
                peers.push(peer);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Dump, DumpError> {
        match self.state {
            State::AwaitingInterface => Err(DumpError::stream_exhausted()),
            State::ReadingPeers { interface, peers } => Ok(Dump { interface, peers }),
        }
    }
}

/// Decode a whole dump. Blank lines are skipped; `\r\n` endings are
/// accepted.
pub fn decode<R: BufRead>(r: R) -> Result<Dump, DumpError> {
    let mut decoder = Decoder::new();
    for (idx, line) in r.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| DumpError::Read {
            line: line_no,
            source,
        })?;
        decoder.push_line(line_no, &line)?;
    }
    decoder.finish()
}
