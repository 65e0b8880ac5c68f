//! Configuration for reviewd
//!
//! Flags resolve CLI → environment → compiled default. The sentiment-engine
//! endpoint table does not fit a flag, so it lives in an optional TOML file:
//!
//! ```toml
//! [engines]
//! hotel = "http://127.0.0.1:9000/analyze"
//! food = "http://127.0.0.1:9001/analyze"
//! ```

use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::services::dispatcher::{DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL_SECS};

/// Command-line arguments for reviewd
#[derive(Parser, Debug)]
#[command(name = "reviewd")]
#[command(about = "Review ingestion and live analytics service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "REVIEWD_PORT")]
    pub port: u16,

    /// SQLite database path
    #[arg(long, default_value = "reviewd.db", env = "REVIEWD_DATABASE")]
    pub database: PathBuf,

    /// Seconds between dispatcher queue scans
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS, env = "REVIEWD_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: u64,

    /// Maximum submissions claimed per dispatcher cycle
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, env = "REVIEWD_BATCH_SIZE")]
    pub batch_size: i64,

    /// TOML config file holding the sentiment-engine endpoint table
    #[arg(long, env = "REVIEWD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// TOML file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// model_type → analyze endpoint URL
    #[serde(default)]
    pub engines: HashMap<String, String>,
}

/// Load the TOML config, or defaults when no path was given
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_yields_defaults() {
        let config = load_toml_config(None).unwrap();
        assert!(config.engines.is_empty());
    }

    #[test]
    fn test_engine_table_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
            [engines]
            hotel = "http://localhost:9000/analyze"
            food = "http://localhost:9001/analyze"
            "#,
        )
        .unwrap();
        assert_eq!(config.engines.len(), 2);
        assert_eq!(
            config.engines.get("hotel").map(String::as_str),
            Some("http://localhost:9000/analyze")
        );
    }
}
