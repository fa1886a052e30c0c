// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;

/// Command-line arguments for `hookrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hookrun",
    version,
    about = "Run commands in response to GitHub webhooks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or JSON when it ends in `.json`).
    ///
    /// Optional: everything can also be given with flags.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Interface to bind (default: all interfaces).
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Secret used to verify `X-Hub-Signature-256`.
    #[arg(short, long, value_name = "SECRET")]
    pub secret: Option<String>,

    /// Endpoint path (default: `/webhook`).
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// Where to write run records: a file, `stdout`/`-`, or `stderr`.
    #[arg(short, long, value_name = "TARGET")]
    pub log: Option<String>,

    /// Compact rule `event:match:exec`. May be repeated.
    ///
    /// Only the first two colons separate fields, so the command may
    /// contain colons. Malformed rules are skipped.
    #[arg(short, long = "rule", value_name = "RULE")]
    pub rules: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HOOKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the configuration, print it, and exit.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The flag values that override the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            host: self.host.clone(),
            secret: self.secret.clone(),
            path: self.path.clone(),
            log: self.log.clone(),
            rules: self.rules.clone(),
        }
    }
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
    fn repeated_rules_and_overrides() {
        let args = CliArgs::try_parse_from([
            "hookrun",
            "--port",
            "9000",
            "--rule",
            "push:ref == x:echo a",
            "-r",
            "*:action == opened:echo b",
            "--secret",
            "s",
        ])
        .unwrap();

        let overrides = args.overrides();
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.secret.as_deref(), Some("s"));
        assert_eq!(overrides.rules.len(), 2);
        assert!(overrides.path.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn dry_run_with_config() {
        let args =
            CliArgs::try_parse_from(["hookrun", "--config", "hooks.toml", "--dry-run"]).unwrap();
        assert!(args.dry_run);
        assert_eq!(args.config, Some(PathBuf::from("hooks.toml")));
    }
}
