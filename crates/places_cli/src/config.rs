//! Process configuration for the `places` command.
//!
//! Every option can come from a flag or from its `PLACES_*` environment
//! variable; flags win.

use clap::Args;
use places_core::default_log_level;
use std::path::PathBuf;

const DEFAULT_DB_FILE_NAME: &str = "places.sqlite3";
// Without a log directory records go to stderr, next to command errors.
const STDERR_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database file [default: <temp dir>/places.sqlite3]
    #[arg(long, env = "PLACES_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "PLACES_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when unset
    #[arg(long, env = "PLACES_LOG_DIR", global = true)]
    pub log_dir: Option<String>,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
    }

    pub fn log_level(&self) -> &str {
        match (&self.log_level, &self.log_dir) {
            (Some(level), _) => level.as_str(),
            (None, Some(_)) => default_log_level(),
            (None, None) => STDERR_LOG_LEVEL,
        }
    }
}
