//! # tmv CLI entry point
//!
//! Parses command-line arguments, sets up logging and dispatches to the
//! subcommand handlers in `tmv_cli`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tmv_cli::inspect::{run_inspect, InspectArgs};
use tmv_cli::validate::{run_validate, ValidateArgs};
use tmv_cli::{load_config, EXIT_FAILURE};

/// 3D Tiles structural metadata validator.
///
/// Checks metadata documents with binary property tables: document
/// structure, buffer layout, offsets, and value ranges.
#[derive(Parser, Debug)]
#[command(name = "tmv", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a validator configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a metadata document and its binary property tables.
    Validate(ValidateArgs),

    /// Print the entity values of a property table.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    // Logs go to stderr; stdout carries the report.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!("tmv starting");

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        let mut out = std::io::stdout().lock();
        match &cli.command {
            Commands::Validate(args) => run_validate(args, &config, &mut out),
            Commands::Inspect(args) => run_inspect(args, &mut out),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_validate() {
        let cli = Cli::try_parse_from(["tmv", "validate", "tileset/metadata.json"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(!cli.log_json);
        if let Commands::Validate(args) = cli.command {
            assert_eq!(args.document, PathBuf::from("tileset/metadata.json"));
            assert!(!args.json);
        } else {
            panic!("expected validate");
        }
    }

    #[test]
    fn cli_parse_validate_json_report() {
        let cli = Cli::try_parse_from(["tmv", "validate", "--json", "m.json"]).unwrap();
        if let Commands::Validate(args) = cli.command {
            assert!(args.json);
        } else {
            panic!("expected validate");
        }
    }

    #[test]
    fn cli_parse_inspect_defaults() {
        let cli = Cli::try_parse_from(["tmv", "inspect", "m.json"]).unwrap();
        if let Commands::Inspect(args) = cli.command {
            assert_eq!(args.table, 0);
            assert!(args.rows.is_none());
        } else {
            panic!("expected inspect");
        }
    }

    #[test]
    fn cli_parse_inspect_table_and_rows() {
        let cli =
            Cli::try_parse_from(["tmv", "inspect", "m.json", "--table", "2", "--rows", "5"]).unwrap();
        if let Commands::Inspect(args) = cli.command {
            assert_eq!(args.table, 2);
            assert_eq!(args.rows, Some(5));
        } else {
            panic!("expected inspect");
        }
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tmv",
            "validate",
            "m.json",
            "-vv",
            "--log-json",
            "--config",
            "tmv.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("tmv.json")));
    }

    #[test]
    fn cli_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["tmv"]).is_err());
    }

    #[test]
    fn cli_parse_validate_requires_document() {
        assert!(Cli::try_parse_from(["tmv", "validate"]).is_err());
    }
}
