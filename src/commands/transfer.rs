//! `check_wg transfer`: byte counters of one peer as performance data.

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;
use crate::plugin::{PerfPoint, Response, Status};
use crate::resolve::AddrLookup;
use crate::source::Source;
use crate::wg::Dump;

use super::Names;

#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Peer name: its first allowed IP, e.g. 10.0.0.2/32
    peer: String,

    /// Command printing the dump, e.g. `wg show wg0 dump` (default: stdin)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

pub fn run(args: TransferArgs, config: &Config, resolve: bool) -> Response {
    let source = Source::from_args(args.command);

    let mut resp = Response::new("bytes transferred");
    let result = super::runtime().and_then(|rt| {
        rt.block_on(async {
            let names = Names::new(resolve, config.dns_timeout);
            let dump = source.read_dump()?;
            check(&dump, &args.peer, &names, &mut resp).await
        })
    });
    if let Err(e) = result {
        resp.update_status_on_error(&e);
    }
    resp
}

pub async fn check<L: AddrLookup>(
    dump: &Dump,
    name: &str,
    names: &Names<L>,
    resp: &mut Response,
) -> Result<()> {
    let peer = dump
        .peer(name)
        .with_context(|| format!("peer not found: {name}"))?;
    resp.update_status(Status::Ok, format!("peer={}", names.peer(peer).await));
    resp.update_status(Status::Ok, format!("endpoint={}", names.endpoint(peer).await));

    for (label, octets) in [("rx", peer.rx), ("tx", peer.tx)] {
        resp.add_perf_point(PerfPoint::new(label, octets).unit("B"))
            .with_context(|| format!("failed add performance data {label}={octets}"))?;
    }
    Ok(())
}
