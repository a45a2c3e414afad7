//! Content factory for loading everything from one data directory.

use std::path::{Path, PathBuf};

use ledger_core::{ItemCatalog, LedgerConfig};

use crate::loaders::{ConfigLoader, ItemLoader, LoadResult};

/// Loads ledger content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── items.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load authority configuration from `config.toml`, or defaults if absent.
    pub fn load_config(&self) -> LoadResult<LedgerConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(LedgerConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load and seal the item catalog from `items.ron`.
    pub fn load_catalog(&self) -> LoadResult<ItemCatalog> {
        let path = self.data_dir.join("items.ron");
        ItemLoader::load_catalog(&path)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
