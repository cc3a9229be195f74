//! Where the dump comes from: stdin, or the stdout of a command such as
//! `wg show wg0 dump`.

use std::fmt;
use std::io::{self, Read};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::wg::Dump;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    Command(Vec<String>),
}

impl Source {
    /// No arguments means stdin.
    pub fn from_args(args: Vec<String>) -> Self {
        if args.is_empty() {
            Source::Stdin
        } else {
            Source::Command(args)
        }
    }

    /// Decode the dump this source produces.
    pub fn read_dump(&self) -> Result<Dump> {
        self.with_input(|r| {
            let dump = Dump::from_reader(r).with_context(|| format!("with input from {self}"))?;
            debug!(source = %self, peers = dump.peers.len(), "decoded dump");
            Ok(dump)
        })
    }

    /// Run `f` over the input. A spawned command is waited for after `f`
    /// returns and must exit successfully.
    pub fn with_input<T>(&self, f: impl FnOnce(&mut dyn Read) -> Result<T>) -> Result<T> {
        let args = match self {
            Source::Stdin => return f(&mut io::stdin().lock()),
            Source::Command(args) => args,
        };

        let Some((program, rest)) = args.split_first().filter(|(p, _)| !p.is_empty()) else {
            bail!("exec {self}: no command");
        };

        debug!(command = %self, "spawning");
        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("exec {self}"))?;

        let Some(mut stdout) = child.stdout.take() else {
            bail!("exec {self}: stdout not captured");
        };

        let value = match f(&mut stdout) {
            Ok(value) => value,
            Err(e) => {
                // Reap the child; its exit status no longer matters.
                drop(stdout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        drop(stdout);
        let status = child.wait().with_context(|| format!("wait for {self}"))?;
        if !status.success() {
            bail!("wait for {self}: {status}");
        }
        Ok(value)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => f.write_str("stdin"),
            Source::Command(args) => write!(f, "[{}]", args.join(" ")),
        }
    }
}
