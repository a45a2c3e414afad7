use core::fmt;

use crate::catalog::ItemDefinition;
use crate::tag::Tag;

/// Limits a container enforces on additions. `None` means unlimited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerPolicy {
    /// Maximum number of stacks.
    pub max_slots: Option<u32>,
    /// Maximum number of items summed over all stacks.
    pub max_items: Option<u64>,
    /// Maximum summed `weight * stack_count`.
    pub max_weight: Option<u64>,
    /// Only definitions carrying this tag (or a descendant) are accepted.
    pub accepts: Option<Tag>,
}

impl ContainerPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_slots(mut self, max: u32) -> Self {
        self.max_slots = Some(max);
        self
    }

    pub fn with_max_items(mut self, max: u64) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_max_weight(mut self, max: u64) -> Self {
        self.max_weight = Some(max);
        self
    }

    pub fn accepting(mut self, filter: Tag) -> Self {
        self.accepts = Some(filter);
        self
    }

    /// Checks whether `definition` may be added and whether the container
    /// would still fit the limits at `projected` usage.
    pub fn check(
        &self,
        definition: &ItemDefinition,
        projected: &ContainerUsage,
    ) -> Result<(), CapacityLimit> {
        if let Some(filter) = &self.accepts {
            if !definition.matches_filter(filter) {
                return Err(CapacityLimit::Filter {
                    required: filter.clone(),
                });
            }
        }
        if let Some(max) = self.max_slots.filter(|max| projected.slots > *max as usize) {
            return Err(CapacityLimit::Slots { max });
        }
        if let Some(max) = self.max_items.filter(|max| projected.items > *max) {
            return Err(CapacityLimit::Items { max });
        }
        if let Some(max) = self.max_weight.filter(|max| projected.weight > *max) {
            return Err(CapacityLimit::Weight { max });
        }
        Ok(())
    }
}

/// Current or projected occupancy of a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerUsage {
    pub slots: usize,
    pub items: u64,
    pub weight: u64,
}

/// Which policy limit rejected an addition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapacityLimit {
    Slots { max: u32 },
    Items { max: u64 },
    Weight { max: u64 },
    Filter { required: Tag },
}

impl fmt::Display for CapacityLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slots { max } => write!(f, "slot limit of {max} reached"),
            Self::Items { max } => write!(f, "item limit of {max} reached"),
            Self::Weight { max } => write!(f, "weight limit of {max} reached"),
            Self::Filter { required } => write!(f, "only accepts items tagged {required}"),
        }
    }
}
