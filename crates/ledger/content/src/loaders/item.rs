//! Item catalog loader.

use std::path::Path;

use ledger_core::{ItemCatalog, ItemDefinition};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Top-level shape of `items.ron`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFile {
    pub items: Vec<ItemDefinition>,
}

/// Loader for item catalogs from RON files.
pub struct ItemLoader;

impl ItemLoader {
    /// Parses the definitions in `path` without registering them.
    pub fn load(path: &Path) -> LoadResult<Vec<ItemDefinition>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<ItemDefinition>> {
        let file: ItemFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse item catalog RON: {}", e))?;
        Ok(file.items)
    }

    /// Loads, registers and seals a catalog.
    pub fn load_catalog(path: &Path) -> LoadResult<ItemCatalog> {
        let definitions = Self::load(path)?;
        ItemCatalog::from_definitions(definitions).map_err(|e| {
            anyhow::anyhow!("Invalid item catalog {}: {} ({})", path.display(), e, e.error_code())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ledger_core::{AbilityId, Tag, TemplateId};
    use tempfile::NamedTempFile;

    use super::*;

    const ITEMS: &str = r#"(
        items: [
            (
                template_id: "Wood",
                max_stack_size: 20,
                tags: ["Item.Resource.Wood"],
                weight: 2,
            ),
            (
                template_id: "Torch",
                max_stack_size: 5,
                tags: ["Item.Tool.Torch"],
                ability_grants: ["Ability.Light"],
                display_name: Some("Torch"),
            ),
        ],
    )"#;

    #[test]
    fn loads_and_seals_catalog() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ITEMS.as_bytes()).unwrap();

        let catalog = ItemLoader::load_catalog(file.path()).unwrap();
        assert!(catalog.is_sealed());

        let torch = catalog.lookup(&TemplateId::from("Torch")).unwrap();
        assert_eq!(torch.ability_grants, vec![AbilityId::from("Ability.Light")]);
        assert_eq!(torch.weight, 0);
        let wood = catalog.lookup(&TemplateId::from("Wood")).unwrap();
        assert!(wood.tags.contains(&Tag::new("Item.Resource.Wood").unwrap()));
    }

    #[test]
    fn rejects_malformed_tags_and_duplicates() {
        let bad_tag =
            r#"(items: [(template_id: "Wood", max_stack_size: 1, tags: ["Item..Wood"])])"#;
        assert!(ItemLoader::parse(bad_tag).is_err());

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"(items: [
                (template_id: "Wood", max_stack_size: 1),
                (template_id: "Wood", max_stack_size: 2),
            ])"#,
        )
        .unwrap();
        let err = ItemLoader::load_catalog(file.path()).unwrap_err();
        assert!(err.to_string().contains("LEDGER_DUPLICATE_TEMPLATE"));
    }
}
