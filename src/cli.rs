// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `execstream`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execstream",
    version,
    about = "Run a TOML-described stream graph with the demand-pull scheduler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph description (TOML).
    #[arg(long, value_name = "PATH", default_value = "Graph.toml")]
    pub config: String,

    /// Validate and print the graph, but don't execute it.
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum tuples per stream invocation; overrides `[scheduler].quantum`.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub quantum: Option<u32>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let args = CliArgs::try_parse_from(["execstream"]).unwrap();
        assert_eq!(args.config, "Graph.toml");
        assert!(!args.dry_run);
        assert!(args.quantum.is_none());

        let args =
            CliArgs::try_parse_from(["execstream", "--config", "g.toml", "--quantum", "8", "--dry-run"])
                .unwrap();
        assert_eq!(args.config, "g.toml");
        assert_eq!(args.quantum, Some(8));
        assert!(args.dry_run);

        assert!(CliArgs::try_parse_from(["execstream", "--quantum", "0"]).is_err());
    }
}
