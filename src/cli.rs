//! Command-line interface for kvbind.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// Command-line arguments for kvbind.
#[derive(Debug, Parser)]
#[command(version, propagate_version = true)]
pub(crate) struct Args {
    /// The address of the redis server.
    #[arg(long, env = "REDIS_HOST", default_value = "localhost:6379")]
    pub(crate) host: String,
    /// Additional binding properties, such as `redisPassword=secret` or `enableTLS=true`.
    ///
    /// May be given more than once.
    #[arg(short, long = "property", value_name = "NAME=VALUE", value_parser = parse_property)]
    pub(crate) properties: Vec<(String, String)>,
    /// Abandon the operation if it takes longer than this, such as `500ms` or `3s`.
    #[arg(short, long, value_parser = parse_timeout)]
    pub(crate) timeout: Option<Duration>,
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// What operation to perform.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Get the value associated with the given key.
    ///
    /// The value is written to stdout as-is. A key with no value produces no output.
    #[clap(alias = "fetch")]
    Get {
        /// The key to get the value for.
        key: String,
    },
    /// Set the value for the given key.
    ///
    /// If the key already exists, the value is replaced.
    #[clap(aliases = ["set", "put"])]
    Create {
        /// The key to be set.
        key: String,
        /// The file to read the value from.
        ///
        /// If `-`, the value is read from stdin.
        #[clap(long, conflicts_with = "value")]
        file: Option<PathBuf>,
        /// The value to be associated with the key.
        #[clap(required_unless_present = "file")]
        value: Option<String>,
    },
    /// Delete the given key.
    #[clap(aliases = ["remove", "rm"])]
    Delete {
        /// The key to delete.
        key: String,
    },
    /// Check that the server is reachable.
    Ping,
}

/// Parse a `NAME=VALUE` property.
fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("expected NAME=VALUE, got `{s}`")),
    }
}

/// Parse a timeout such as `500ms`.
fn parse_timeout(s: &str) -> Result<Duration, String> {
    kvbind::settings::parse_duration(s).ok_or_else(|| format!("invalid duration `{s}`"))
}
