mod config;
pub mod database;
mod gateway;

pub use config::{CalendarConfig, Config, WageConfig};
pub use database::{Database, MemoryStore};
pub use gateway::{default_snapshots, PersistenceGateway, StoredSnapshot, ENTRIES_KEY};

use std::path::PathBuf;

use crate::error::Result;

/// Durable string key-value storage.
///
/// Writes replace the whole value; there are no partial updates.
pub trait KvStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>>;
    fn kv_set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Returns `~/.config/intime[-dev]/` based on INTIME_ENV.
///
/// Set INTIME_ENV=dev to use development data directory.
/// INTIME_DATA_DIR, when set, wins over both.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("INTIME_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("INTIME_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("intime-dev")
            } else {
                base_dir.join("intime")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
