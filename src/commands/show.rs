//! `check_wg show`: print the decoded dump. The private key is never
//! printed.

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::source::Source;
use crate::wg::Dump;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Command printing the dump, e.g. `wg show wg0 dump` (default: stdin)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

pub fn run(args: ShowArgs) -> Result<()> {
    let dump = Source::from_args(args.command).read_dump()?;
    let mut stdout = io::stdout().lock();
    print_output(&mut stdout, args.format, &dump)
}

fn print_output(w: &mut impl Write, format: Format, dump: &Dump) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut *w, dump)?;
            writeln!(w)?;
        }
        Format::Table => print_table(w, dump)?,
    }
    Ok(())
}

fn print_table(w: &mut impl Write, dump: &Dump) -> io::Result<()> {
    let iface = &dump.interface;
    writeln!(w, "interface:")?;
    writeln!(w, "  public key:  {}", iface.public_key)?;
    writeln!(w, "  listen port: {}", iface.listen_port)?;
    if iface.fwmark != 0 {
        writeln!(w, "  fwmark:      {:#x}", iface.fwmark)?;
    }

    for peer in &dump.peers {
        writeln!(w)?;
        writeln!(w, "peer: {}", peer.name())?;
        writeln!(w, "  public key:       {}", peer.public_key)?;
        if peer.preshared_key.is_some() {
            writeln!(w, "  preshared key:    (hidden)")?;
        }
        writeln!(w, "  endpoint:         {}", peer.endpoint)?;
        writeln!(w, "  allowed ips:      {}", peer.allowed_ips.join(", "))?;
        match peer.latest_handshake {
            Some(at) => writeln!(w, "  latest handshake: {}", at.to_rfc3339())?,
            None => writeln!(w, "  latest handshake: never")?,
        }
        writeln!(w, "  transfer:         {} B received, {} B sent", peer.rx, peer.tx)?;
        if let Some(every) = peer.persistent_keepalive {
            writeln!(
                w,
                "  keepalive:        every {}",
                humantime::format_duration(every)
            )?;
        }
    }
    Ok(())
}
