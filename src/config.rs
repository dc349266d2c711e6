//! Client configuration.
//!
//! Values are resolved from three layers, lowest priority first: built-in
//! defaults, an optional JSON config file, and command-line flags (each flag
//! also readable from an environment variable, so the client can be driven
//! entirely from a container environment).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::error::{ClientError, Result};

/// Default per-batch byte cap.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 8 * 1024;

/// Default per-batch record cap.
pub const DEFAULT_MAX_BATCH_RECORDS: usize = 100;

/// Default pause between batch round-trips, in milliseconds.
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 100;

/// Default number of winner-query attempts before giving up on `NOT_READY`.
pub const DEFAULT_WINNER_POLL_ATTEMPTS: u32 = 5;

/// Command-line / environment surface.
#[derive(Parser, Debug, Default)]
#[command(name = "betstream", about = "Streams bet batches to the aggregation service")]
pub struct Args {
    /// Client identity embedded in every outbound message.
    #[arg(long, env = "CLIENT_ID")]
    pub id: Option<String>,

    /// Aggregation service address, host:port.
    #[arg(long, env = "SERVER_ADDRESS")]
    pub server_address: Option<String>,

    /// Path of the bet record file.
    #[arg(long, env = "DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Maximum records per batch.
    #[arg(long, env = "BATCH_MAX_AMOUNT")]
    pub batch_max_amount: Option<usize>,

    /// Maximum serialized bytes per batch.
    #[arg(long, env = "BATCH_MAX_BYTES")]
    pub batch_max_bytes: Option<usize>,

    /// Pause between batch round-trips, in milliseconds.
    #[arg(long, env = "BATCH_PAUSE_MS")]
    pub batch_pause_ms: Option<u64>,

    /// Winner-query attempts before giving up on NOT_READY.
    #[arg(long, env = "WINNER_POLL_ATTEMPTS")]
    pub winner_poll_attempts: Option<u32>,

    /// Optional JSON file providing defaults for any of the values above.
    #[arg(long, env = "CLIENT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// File-backed defaults. Every field is optional; flags win over the file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    id: Option<String>,
    server_address: Option<String>,
    data_file: Option<PathBuf>,
    batch_max_amount: Option<usize>,
    batch_max_bytes: Option<usize>,
    batch_pause_ms: Option<u64>,
    winner_poll_attempts: Option<u32>,
}

/// Resolved configuration consumed by the session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client identity, the partition key on the server side.
    pub id: String,
    /// Aggregation service address, host:port.
    pub server_address: String,
    /// Path of the bet record file.
    pub data_file: PathBuf,
    /// Maximum records per batch.
    pub batch_max_amount: usize,
    /// Maximum serialized bytes per batch.
    pub batch_max_bytes: usize,
    /// Pause between batch round-trips, also the winner-poll interval.
    pub batch_pause: Duration,
    /// Winner-query attempts before giving up on `NOT_READY`. 1 = single shot.
    pub winner_poll_attempts: u32,
}

impl ClientConfig {
    /// Resolve the final configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when a required value (id,
    /// server address, data file) is missing from every layer or a cap is
    /// zero, and [`ClientError::ConfigFile`] when the config file is not
    /// valid JSON.
    pub fn load(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str::<FileConfig>(&text)?
            }
            None => FileConfig::default(),
        };

        let config = Self {
            id: args
                .id
                .or(file.id)
                .ok_or_else(|| missing("client id (--id / CLIENT_ID)"))?,
            server_address: args
                .server_address
                .or(file.server_address)
                .ok_or_else(|| missing("server address (--server-address / SERVER_ADDRESS)"))?,
            data_file: args
                .data_file
                .or(file.data_file)
                .ok_or_else(|| missing("data file (--data-file / DATA_FILE)"))?,
            batch_max_amount: args
                .batch_max_amount
                .or(file.batch_max_amount)
                .unwrap_or(DEFAULT_MAX_BATCH_RECORDS),
            batch_max_bytes: args
                .batch_max_bytes
                .or(file.batch_max_bytes)
                .unwrap_or(DEFAULT_MAX_BATCH_BYTES),
            batch_pause: Duration::from_millis(
                args.batch_pause_ms
                    .or(file.batch_pause_ms)
                    .unwrap_or(DEFAULT_BATCH_PAUSE_MS),
            ),
            winner_poll_attempts: args
                .winner_poll_attempts
                .or(file.winner_poll_attempts)
                .unwrap_or(DEFAULT_WINNER_POLL_ATTEMPTS),
        };

        if config.batch_max_amount == 0 {
            return Err(ClientError::InvalidConfig(
                "batch record cap must be at least 1".to_string(),
            ));
        }
        if config.batch_max_bytes == 0 {
            return Err(ClientError::InvalidConfig(
                "batch byte cap must be at least 1".to_string(),
            ));
        }
        if config.winner_poll_attempts == 0 {
            return Err(ClientError::InvalidConfig(
                "winner poll attempts must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn missing(what: &str) -> ClientError {
    ClientError::InvalidConfig(format!("missing {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_args() -> Args {
        Args {
            id: Some("3".to_string()),
            server_address: Some("server:12345".to_string()),
            data_file: Some(PathBuf::from("/data/agency.csv")),
            batch_max_amount: Some(50),
            batch_max_bytes: None,
            batch_pause_ms: Some(250),
            winner_poll_attempts: None,
            config: None,
        }
    }

    #[test]
    fn test_load_resolves_defaults() {
        let config = ClientConfig::load(full_args()).unwrap();

        assert_eq!(config.id, "3");
        assert_eq!(config.batch_max_amount, 50);
        assert_eq!(config.batch_max_bytes, DEFAULT_MAX_BATCH_BYTES);
        assert_eq!(config.batch_pause, Duration::from_millis(250));
        assert_eq!(config.winner_poll_attempts, DEFAULT_WINNER_POLL_ATTEMPTS);
    }

    #[test]
    fn test_load_missing_id_rejected() {
        let mut args = full_args();
        args.id = None;

        let result = ClientConfig::load(args);
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_zero_cap_rejected() {
        let mut args = full_args();
        args.batch_max_amount = Some(0);

        let result = ClientConfig::load(args);
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_file_config_parses_partial_json() {
        let file: FileConfig =
            serde_json::from_str(r#"{"server_address": "server:9000", "batch_max_amount": 10}"#)
                .unwrap();

        assert_eq!(file.server_address.as_deref(), Some("server:9000"));
        assert_eq!(file.batch_max_amount, Some(10));
        assert!(file.id.is_none());
    }
}
