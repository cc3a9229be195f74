//! `check_wg handshake`: staleness of the oldest latest handshake.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use crate::config::Config;
use crate::plugin::{PerfPoint, Response, Status, Thresholds};
use crate::resolve::AddrLookup;
use crate::source::Source;
use crate::wg::Dump;

use super::Names;

#[derive(Debug, Args)]
pub struct HandshakeArgs {
    /// Warning threshold (default from config, 5m)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    warn: Option<Duration>,

    /// Critical threshold (default from config, 15m)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    crit: Option<Duration>,

    /// Ignore this peer (first allowed IP); repeatable
    #[arg(long, value_name = "PEER")]
    exclude: Vec<String>,

    /// Command printing the dump, e.g. `wg show wg0 dump` (default: stdin)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub warn: Duration,
    pub crit: Duration,
    pub exclude: Vec<String>,
}

pub fn run(args: HandshakeArgs, config: &Config, resolve: bool) -> Response {
    let opts = Options {
        warn: args.warn.unwrap_or(config.handshake.warn),
        crit: args.crit.unwrap_or(config.handshake.crit),
        exclude: args.exclude,
    };
    let source = Source::from_args(args.command);

    let mut resp = Response::new("latest handshake");
    let result = super::runtime().and_then(|rt| {
        rt.block_on(async {
            let names = Names::new(resolve, config.dns_timeout);
            let dump = source.read_dump()?;
            check(&dump, &opts, &names, Utc::now(), &mut resp).await
        })
    });
    if let Err(e) = result {
        resp.update_status_on_error(&e);
    }
    resp
}

pub async fn check<L: AddrLookup>(
    dump: &Dump,
    opts: &Options,
    names: &Names<L>,
    now: DateTime<Utc>,
    resp: &mut Response,
) -> Result<()> {
    let peer = dump
        .oldest_handshake_except(&opts.exclude)
        .context("no valid peer found")?;
    let name = names.peer(peer).await;

    let Some(latest) = peer.latest_handshake else {
        resp.update_status(Status::Warning, "latest handshake: never");
        resp.update_status(Status::Warning, format!("peer={name}"));
        return Ok(());
    };

    // A clock behind the peer's counts as a fresh handshake.
    let age = (now - latest).to_std().unwrap_or_default();
    let age = Duration::from_secs(age.as_secs());
    let ago = humantime::format_duration(age);

    let point = PerfPoint::new("latest handshake", age.as_secs())
        .unit("s")
        .thresholds(Thresholds::new(
            opts.warn.as_secs_f64(),
            opts.crit.as_secs_f64(),
        ));
    resp.add_perf_point(point)
        .with_context(|| format!("add performance point {latest}"))?;

    let status = resp.status();
    resp.update_status(status, format!("latest handshake: {ago} ago"));
    resp.update_status(status, format!("peer: {name}"));

    let threshold = match status {
        Status::Warning => opts.warn,
        Status::Critical => opts.crit,
        _ => return Ok(()),
    };
    resp.update_status(status, format!("endpoint: {}", names.endpoint(peer).await));
    resp.update_status(
        status,
        format!("threshold: {}", humantime::format_duration(threshold)),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::FakeLookup;
    use test_case::test_case;

    const SHOW_DUMP: &str = include_str!("../../tests/fixtures/wg_show_dump.txt");
    const ZERO_HANDSHAKE: &str = include_str!("../../tests/fixtures/latest_handshake_zero.txt");

    fn opts() -> Options {
        Options {
            warn: Duration::from_secs(5 * 60),
            crit: Duration::from_secs(15 * 60),
            exclude: Vec::new(),
        }
    }

    fn raw() -> Names<FakeLookup> {
        Names::raw()
    }

    /// Every peer fresh except 10.0.0.4/32, which is `age` old.
    fn aged_dump(now: DateTime<Utc>, age: Duration) -> Dump {
        let mut dump: Dump = SHOW_DUMP.parse().unwrap();
        for peer in &mut dump.peers {
            peer.latest_handshake = Some(now);
        }
        let age = chrono::Duration::from_std(age).unwrap();
        dump.peer_mut("10.0.0.4/32").unwrap().latest_handshake = Some(now - age);
        dump
    }

    #[test_case(4 * 60, Status::Ok, None ; "ok")]
    #[test_case(6 * 60, Status::Warning, Some("threshold: 5m") ; "warning")]
    #[test_case(16 * 60, Status::Critical, Some("threshold: 15m") ; "critical")]
    #[tokio::test]
    async fn staleness(age_secs: u64, want: Status, threshold: Option<&str>) {
        let now = Utc::now();
        let age = Duration::from_secs(age_secs);
        let dump = aged_dump(now, age);

        let mut resp = Response::new("test OK");
        check(&dump, &opts(), &raw(), now, &mut resp).await.unwrap();
        assert_eq!(resp.status(), want);

        let out = resp.output();
        assert!(out.contains("peer: 10.0.0.4/32"), "{out}");
        assert!(
            out.contains(&format!(
                "latest handshake: {} ago",
                humantime::format_duration(age)
            )),
            "{out}"
        );
        assert!(
            out.contains(&format!("'latest handshake'={age_secs}s;300;900;;")),
            "{out}"
        );
        match threshold {
            Some(threshold) => {
                assert!(out.contains(threshold), "{out}");
                assert!(out.contains("endpoint: 10.0.0.1:54323"), "{out}");
            }
            None => assert!(!out.contains("threshold"), "{out}"),
        }
    }

    #[tokio::test]
    async fn fixture_oldest_is_third_peer() {
        let dump: Dump = SHOW_DUMP.parse().unwrap();
        let now = DateTime::<Utc>::from_timestamp(1709565713 + 60, 0).unwrap();

        let mut resp = Response::new("test OK");
        check(&dump, &opts(), &raw(), now, &mut resp).await.unwrap();
        assert_eq!(resp.status(), Status::Ok);
        assert!(resp.output().contains("peer: 10.0.0.4/32"));
        assert!(resp.output().contains("'latest handshake'=60s;"));
    }

    #[tokio::test]
    async fn excluded_peer_is_skipped() {
        let now = Utc::now();
        let dump = aged_dump(now, Duration::from_secs(20 * 60));
        let opts = Options {
            exclude: vec!["10.0.0.4/32".to_string()],
            ..opts()
        };

        let mut resp = Response::new("test OK");
        check(&dump, &opts, &raw(), now, &mut resp).await.unwrap();
        assert_eq!(resp.status(), Status::Ok);
        assert!(resp.output().contains("peer: 10.0.0.2/32"));
    }

    #[tokio::test]
    async fn never_handshaken_warns() {
        let dump: Dump = ZERO_HANDSHAKE.parse().unwrap();

        let mut resp = Response::new("test OK");
        check(&dump, &opts(), &raw(), Utc::now(), &mut resp)
            .await
            .unwrap();
        assert_eq!(resp.status(), Status::Warning);
        assert_eq!(
            resp.output(),
            "WARNING: latest handshake: never, peer=10.0.0.3/32"
        );
    }

    #[tokio::test]
    async fn no_peers_is_an_error() {
        let dump: Dump = SHOW_DUMP.lines().next().unwrap().parse().unwrap();

        let mut resp = Response::new("test OK");
        let err = check(&dump, &opts(), &raw(), Utc::now(), &mut resp)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no valid peer found"));
    }

    #[tokio::test]
    async fn resolved_names_in_output() {
        let now = Utc::now();
        let dump = aged_dump(now, Duration::from_secs(20 * 60));
        let names = Names::with_lookup(
            FakeLookup::default()
                .with("10.0.0.4", Ok("peer4.example"))
                .with("10.0.0.1", Ok("gw.example")),
        );

        let mut resp = Response::new("test OK");
        check(&dump, &opts(), &names, now, &mut resp).await.unwrap();
        let out = resp.output();
        assert!(out.contains("peer: 10.0.0.4/32 (peer4.example)"), "{out}");
        assert!(out.contains("endpoint: 10.0.0.1:54323 (gw.example)"), "{out}");
    }

    #[test]
    fn run_reports_decode_errors_as_unknown() {
        let args = HandshakeArgs {
            warn: None,
            crit: None,
            exclude: Vec::new(),
            command: vec!["cat".to_string(), "/dev/null".to_string()],
        };
        let resp = run(args, &Config::default(), false);
        assert_eq!(resp.status(), Status::Unknown);
        assert!(resp.output().contains("with input from [cat /dev/null]"));
    }
}
