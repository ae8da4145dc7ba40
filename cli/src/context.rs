use std::path::PathBuf;

use taskcurve_core::Result;
use taskcurve_engine::Store;

/// Owns the loaded store and the directory it persists to. Every mutating
/// command saves back to disk immediately after its transaction commits;
/// there is no separate "save" step for the operator to forget.
pub struct AppContext {
    pub store: Store,
    pub data_dir: PathBuf,
}

impl AppContext {
    pub fn load(data_dir: PathBuf) -> Result<Self> {
        let store = if data_dir.exists() {
            Store::load_from_directory(&data_dir)?
        } else {
            Store::new()
        };
        Ok(Self { store, data_dir })
    }

    pub fn save(&self) -> Result<()> {
        self.store.save_to_directory(&self.data_dir)
    }
}

pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".taskcurve")
    })
}
