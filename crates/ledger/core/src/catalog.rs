//! Item definitions and the construct-then-seal catalog.
//!
//! The catalog is built once during initialization, sealed, and then shared by
//! reference (usually behind an `Arc`) with every container and the authority.
//! There is no global lookup: code that needs a definition is handed the
//! catalog explicitly.
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LedgerError, Result};
use crate::ids::{AbilityId, TemplateId};
use crate::tag::Tag;

/// Immutable description of an item template.
///
/// # Stacking
///
/// `max_stack_size` is at least 1. Equipment typically uses 1, resources and
/// consumables use larger values so that one instance can represent many units.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub template_id: TemplateId,
    pub max_stack_size: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: BTreeSet<Tag>,
    /// Abilities granted while at least one unit of this template is held.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ability_grants: Vec<AbilityId>,
    /// Weight of a single unit, counted against weight-limited containers.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
}

impl ItemDefinition {
    pub fn new(template_id: impl Into<TemplateId>, max_stack_size: u32) -> Self {
        Self {
            template_id: template_id.into(),
            max_stack_size,
            tags: BTreeSet::new(),
            ability_grants: Vec::new(),
            weight: 0,
            display_name: None,
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_grant(mut self, ability: impl Into<AbilityId>) -> Self {
        self.ability_grants.push(ability.into());
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// True if any of the definition's tags is `filter` or below it.
    pub fn matches_filter(&self, filter: &Tag) -> bool {
        self.tags.iter().any(|tag| tag.matches(filter))
    }

    fn validate(&self) -> Result<()> {
        if self.template_id.as_str().is_empty() {
            return Err(LedgerError::InvalidDefinition {
                template: self.template_id.clone(),
                reason: "template id is empty",
            });
        }
        if self.max_stack_size == 0 {
            return Err(LedgerError::InvalidDefinition {
                template: self.template_id.clone(),
                reason: "max_stack_size must be at least 1",
            });
        }
        let unique: BTreeSet<&AbilityId> = self.ability_grants.iter().collect();
        if unique.len() != self.ability_grants.len() {
            return Err(LedgerError::InvalidDefinition {
                template: self.template_id.clone(),
                reason: "ability grants contain duplicates",
            });
        }
        Ok(())
    }
}

/// Registry of item definitions.
///
/// Accepts registrations until [`ItemCatalog::seal`] is called; after that the
/// catalog is read-only and registrations fail with
/// [`LedgerError::CatalogSealed`].
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    definitions: BTreeMap<TemplateId, ItemDefinition>,
    sealed: bool,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every definition and seals the catalog.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ItemDefinition>) -> Result<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.register(definition)?;
        }
        catalog.seal();
        Ok(catalog)
    }

    pub fn register(&mut self, definition: ItemDefinition) -> Result<()> {
        if self.sealed {
            return Err(LedgerError::CatalogSealed);
        }
        definition.validate()?;
        if self.definitions.contains_key(&definition.template_id) {
            return Err(LedgerError::DuplicateTemplate(definition.template_id));
        }
        self.definitions
            .insert(definition.template_id.clone(), definition);
        Ok(())
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn lookup(&self, template_id: &TemplateId) -> Result<&ItemDefinition> {
        self.definitions
            .get(template_id)
            .ok_or_else(|| LedgerError::UnknownTemplate(template_id.clone()))
    }

    pub fn contains(&self, template_id: &TemplateId) -> bool {
        self.definitions.contains_key(template_id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wood() -> ItemDefinition {
        ItemDefinition::new("Wood", 20).with_tag(Tag::new("Item.Resource.Wood").unwrap())
    }

    #[test]
    fn register_then_lookup() {
        let mut catalog = ItemCatalog::new();
        catalog.register(wood()).unwrap();

        let found = catalog.lookup(&TemplateId::from("Wood")).unwrap();
        assert_eq!(found.max_stack_size, 20);
        assert_eq!(
            catalog.lookup(&TemplateId::from("Stone")),
            Err(LedgerError::UnknownTemplate(TemplateId::from("Stone")))
        );
    }

    #[test]
    fn duplicates_and_late_registration_fail() {
        let mut catalog = ItemCatalog::new();
        catalog.register(wood()).unwrap();
        assert_eq!(
            catalog.register(wood()),
            Err(LedgerError::DuplicateTemplate(TemplateId::from("Wood")))
        );

        catalog.seal();
        let stone = ItemDefinition::new("Stone", 10);
        assert_eq!(catalog.register(stone), Err(LedgerError::CatalogSealed));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn zero_stack_size_is_invalid() {
        let err = ItemCatalog::from_definitions([ItemDefinition::new("Broken", 0)]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDefinition { .. }));
    }
}
