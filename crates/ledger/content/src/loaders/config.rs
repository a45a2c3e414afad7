//! Authority configuration loader.

use std::path::Path;

use ledger_core::LedgerConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`LedgerConfig`] from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<LedgerConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Missing keys fall back to [`LedgerConfig::default`].
    pub fn parse(content: &str) -> LoadResult<LedgerConfig> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use ledger_core::Tag;

    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("claim_ttl = 12\n").unwrap();
        assert_eq!(config.claim_ttl, 12);
        assert_eq!(config.default_policy, LedgerConfig::default().default_policy);
    }

    #[test]
    fn policies_are_read_from_tables() {
        let config = ConfigLoader::parse(
            r#"
            [default_policy]
            max_slots = 8
            max_weight = 120

            [world_policy]
            accepts = "Item"
            "#,
        )
        .unwrap();
        assert_eq!(config.claim_ttl, LedgerConfig::DEFAULT_CLAIM_TTL);
        assert_eq!(config.default_policy.max_slots, Some(8));
        assert_eq!(config.default_policy.max_items, None);
        assert_eq!(config.world_policy.accepts, Some(Tag::new("Item").unwrap()));
    }
}
