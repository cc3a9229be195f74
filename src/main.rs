use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use check_wg::plugin::Status;
use check_wg::{commands, config};

#[derive(Parser)]
#[command(
    name = "check_wg",
    version,
    about = "Icinga2 health check of wireguard peers, using output of wg(8)",
    long_about = "Icinga2 health check of wireguard peers, using output of wg(8).\n\n\
        Every check executes the given command (e.g. `wg show wg0 dump`) and reads \
        its output, or reads stdin if no command was given at all."
)]
struct Cli {
    /// Path to config file (default: ~/.config/check_wg/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides config and is overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Annotate peer names and endpoints with reverse-DNS hostnames
    #[arg(long, global = true)]
    resolve: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check oldest latest handshake
    ///
    /// Analyzes the latest handshake of every peer and reports warning or
    /// critical status if the oldest one is older than the given threshold.
    Handshake(commands::handshake::HandshakeArgs),

    /// Output transfer stats of one peer
    Transfer(commands::transfer::TransferArgs),

    /// Print the decoded dump
    Show(commands::show::ShowArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {e:#}", Status::Unknown);
            return ExitCode::from(Status::Unknown.code());
        }
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let resolve = cli.resolve || config.resolve;

    match cli.command {
        Commands::Handshake(args) => {
            let resp = commands::handshake::run(args, &config, resolve);
            println!("{}", resp.output());
            resp.exit_code()
        }
        Commands::Transfer(args) => {
            let resp = commands::transfer::run(args, &config, resolve);
            println!("{}", resp.output());
            resp.exit_code()
        }
        Commands::Show(args) => match commands::show::run(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_handshake_with_command() {
        let cli = Cli::parse_from([
            "check_wg", "handshake", "-w", "2m", "--exclude", "10.0.0.4/32", "wg", "show",
            "wg0", "dump",
        ]);
        let Commands::Handshake(args) = cli.command else {
            panic!("expected handshake command");
        };
        let rendered = format!("{args:?}");
        assert!(rendered.contains("120s"), "{rendered}");
        assert!(rendered.contains("10.0.0.4/32"), "{rendered}");
        assert!(rendered.contains(r#"["wg", "show", "wg0", "dump"]"#), "{rendered}");
    }

    #[test]
    fn parses_transfer() {
        let cli = Cli::parse_from(["check_wg", "--resolve", "transfer", "10.0.0.2/32"]);
        assert!(cli.resolve);
        assert!(matches!(cli.command, Commands::Transfer(_)));
    }

    #[test]
    fn transfer_requires_peer() {
        assert!(Cli::try_parse_from(["check_wg", "transfer"]).is_err());
    }

    #[test]
    fn rejects_bad_duration() {
        assert!(Cli::try_parse_from(["check_wg", "handshake", "-w", "soon"]).is_err());
    }
}
