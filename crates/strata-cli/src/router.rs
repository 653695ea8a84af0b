// Argument parsing and command dispatch

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_cache::{CacheContext, CacheSettings, SettingsLoader};
use strata_common::LogLevel;

use crate::commands::*;
use crate::error::CliResult;

/// strata - inspect and manage application caches
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(bin_name = "strata")]
#[command(about = "Inspect and manage strata caches")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (TOML, YAML or JSON); missing files are ignored
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Minimum log level (debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: LogLevel,

    /// Backend type, overriding the settings
    #[arg(short, long, global = true)]
    pub backend: Option<String>,

    /// Namespace, overriding the settings
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the payload stored under a key
    Get {
        #[arg(value_name = "KEY")]
        key: String,

        /// Pretty-print the payload
        #[arg(long)]
        pretty: bool,
    },

    /// Store a value; JSON is parsed, anything else is stored as a string
    Set {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(value_name = "VALUE")]
        value: String,

        /// Lifetime in seconds (0 = never expires)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Remove a key
    Delete {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Print whether a key is cached
    Has {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Remove every entry from the backend
    Flush {
        /// Also clear the transient and aggregated caches
        #[arg(long)]
        all: bool,
    },

    /// Show the active settings and backend
    Info,
}

pub struct CommandRouter;

impl CommandRouter {
    /// Load settings for `cli`, applying command-line overrides
    pub fn settings(cli: &Cli) -> CliResult<CacheSettings> {
        let mut loader = SettingsLoader::new();
        if let Some(path) = &cli.config {
            loader = loader.with_path(path);
        }
        let mut settings = loader.load()?;

        if let Some(backend) = &cli.backend {
            settings.backend = backend.clone();
        }
        if let Some(namespace) = &cli.namespace {
            settings.namespace = namespace.clone();
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Run the parsed command against `context`
    pub fn execute(cli: &Cli, context: &CacheContext, out: &mut dyn Write) -> CliResult<()> {
        match &cli.command {
            Commands::Get { key, pretty } => GetCommand::new(key.clone())
                .with_pretty(*pretty)
                .execute(context, out),
            Commands::Set { key, value, ttl } => SetCommand::new(key.clone(), value.clone())
                .with_ttl(*ttl)
                .execute(context, out),
            Commands::Delete { key } => DeleteCommand::new(key.clone()).execute(context, out),
            Commands::Has { key } => HasCommand::new(key.clone()).execute(context, out),
            Commands::Flush { all } => FlushCommand::new(*all).execute(context, out),
            Commands::Info => InfoCommand.execute(context, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_with_ttl() {
        let cli = Cli::try_parse_from(["strata", "set", "greeting", "hello", "--ttl", "60"]).unwrap();
        match cli.command {
            Commands::Set { key, value, ttl } => {
                assert_eq!(key, "greeting");
                assert_eq!(value, "hello");
                assert_eq!(ttl, Some(60));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "strata", "get", "k", "--backend", "array", "--log-level", "debug", "-n", "reports",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("array"));
        assert_eq!(cli.namespace.as_deref(), Some("reports"));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_parse_rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["strata", "info", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["strata"]).is_err());
    }
}
