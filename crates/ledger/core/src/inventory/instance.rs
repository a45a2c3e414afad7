use std::collections::BTreeSet;

use crate::ids::{InstanceId, TemplateId};
use crate::tag::Tag;

/// A stack of identical items held by exactly one container.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemInstance {
    pub id: InstanceId,
    pub template_id: TemplateId,
    pub stack_count: u32,
    /// Tags attached to this stack only (e.g. `Item.State.Damaged`). They
    /// travel with the items but are not counted in the container ledger.
    pub instance_tags: BTreeSet<Tag>,
}

impl ItemInstance {
    /// Stacks merge only when both the template and the instance tags agree.
    pub fn can_merge(&self, template_id: &TemplateId, instance_tags: &BTreeSet<Tag>) -> bool {
        &self.template_id == template_id && &self.instance_tags == instance_tags
    }

    pub(crate) fn slot_change(&self) -> SlotChange {
        SlotChange {
            instance: self.id,
            template_id: self.template_id.clone(),
            stack_count: self.stack_count,
            instance_tags: self.instance_tags.clone(),
        }
    }
}

/// Post-mutation state of one slot. A `stack_count` of 0 means the instance
/// was destroyed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotChange {
    pub instance: InstanceId,
    pub template_id: TemplateId,
    pub stack_count: u32,
    pub instance_tags: BTreeSet<Tag>,
}

impl SlotChange {
    pub fn is_destroyed(&self) -> bool {
        self.stack_count == 0
    }

    pub fn into_instance(self) -> ItemInstance {
        ItemInstance {
            id: self.instance,
            template_id: self.template_id,
            stack_count: self.stack_count,
            instance_tags: self.instance_tags,
        }
    }
}
