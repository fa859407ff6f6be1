mod config;
pub mod database;
pub mod gateway;
pub mod kv;

pub use config::{AlertSound, Config, FeedbackConfig, HistoryConfig, RemindersConfig, Theme, UiConfig};
pub use database::Database;
pub use gateway::{PersistenceGateway, HISTORY_KEY, MEDICATIONS_KEY};
pub use kv::{KeyValueStore, MemoryStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory.
///
/// `MEDIREMINDER_DATA_DIR` wins when set; otherwise `~/.config/medireminder[-dev]/`
/// based on `MEDIREMINDER_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("MEDIREMINDER_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("MEDIREMINDER_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("medireminder-dev")
            } else {
                base_dir.join("medireminder")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}
