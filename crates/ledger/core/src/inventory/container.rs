use std::collections::BTreeSet;
use std::sync::Arc;

use super::instance::{ItemInstance, SlotChange};
use super::policy::{ContainerPolicy, ContainerUsage};
use crate::catalog::{ItemCatalog, ItemDefinition};
use crate::error::{LedgerError, Result};
use crate::ids::{ActorId, ContainerId, InstanceAllocator, InstanceId, TemplateId};
use crate::stack::{TagDelta, TagStackLedger};
use crate::tag::Tag;

/// Everything one successful container mutation changed.
///
/// This is the payload observers see and the authority turns into a
/// replication delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerChange {
    pub template_id: TemplateId,
    /// Units added or removed.
    pub quantity: u32,
    /// Touched slots in application order.
    pub slots: Vec<SlotChange>,
    pub tag_deltas: Vec<TagDelta>,
    /// The template was absent before this change.
    pub introduced: bool,
    /// The template is absent after this change.
    pub eliminated: bool,
}

/// Both halves of a successful transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferOutcome {
    pub removed: ContainerChange,
    pub added: ContainerChange,
}

/// Saved container state used to roll back a half-applied transfer.
#[derive(Clone, Debug)]
pub struct ContainerCheckpoint {
    container: ContainerId,
    items: Arc<Vec<ItemInstance>>,
    ledger: TagStackLedger,
}

/// Snapshot of a container's slots at the time [`InventoryContainer::query`]
/// was called.
///
/// Iterating does not copy the items, and the snapshot can be iterated any
/// number of times. Later mutations of the container copy on write and never
/// show up here.
#[derive(Clone, Debug)]
pub struct ContainerQuery {
    items: Arc<Vec<ItemInstance>>,
}

impl ContainerQuery {
    pub fn iter(&self) -> std::slice::Iter<'_, ItemInstance> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ContainerQuery {
    type Item = &'a ItemInstance;
    type IntoIter = std::slice::Iter<'a, ItemInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Ordered set of item instances plus the ledger scoped to them.
#[derive(Clone, Debug)]
pub struct InventoryContainer {
    id: ContainerId,
    owner: Option<ActorId>,
    policy: ContainerPolicy,
    items: Arc<Vec<ItemInstance>>,
    ledger: TagStackLedger,
}

impl InventoryContainer {
    pub fn new(id: ContainerId, owner: Option<ActorId>, policy: ContainerPolicy) -> Self {
        Self {
            id,
            owner,
            policy,
            items: Arc::new(Vec::new()),
            ledger: TagStackLedger::new(),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn owner(&self) -> Option<ActorId> {
        self.owner
    }

    pub fn policy(&self) -> &ContainerPolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &TagStackLedger {
        &self.ledger
    }

    pub fn instances(&self) -> &[ItemInstance] {
        &self.items
    }

    pub fn instance(&self, id: InstanceId) -> Result<&ItemInstance> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .ok_or(LedgerError::UnknownInstance {
                container: self.id,
                instance: id,
            })
    }

    pub fn query(&self) -> ContainerQuery {
        ContainerQuery {
            items: Arc::clone(&self.items),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units of `template_id` across all stacks.
    pub fn count_of(&self, template_id: &TemplateId) -> u64 {
        self.items
            .iter()
            .filter(|item| &item.template_id == template_id)
            .map(|item| u64::from(item.stack_count))
            .sum()
    }

    pub fn usage(&self, catalog: &ItemCatalog) -> Result<ContainerUsage> {
        let mut usage = ContainerUsage {
            slots: self.items.len(),
            ..ContainerUsage::default()
        };
        for item in self.items.iter() {
            let definition = catalog.lookup(&item.template_id)?;
            usage.items += u64::from(item.stack_count);
            usage.weight += u64::from(definition.weight) * u64::from(item.stack_count);
        }
        Ok(usage)
    }

    /// Adds `count` units of `template_id`, topping up mergeable stacks in
    /// slot order before opening new ones. Returns the change; new instance
    /// ids are the slots whose instance was not present before.
    pub fn add(
        &mut self,
        catalog: &ItemCatalog,
        allocator: &mut InstanceAllocator,
        template_id: &TemplateId,
        count: u32,
        instance_tags: &BTreeSet<Tag>,
    ) -> Result<ContainerChange> {
        if count == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let definition = catalog.lookup(template_id)?;
        let max_stack = definition.max_stack_size;

        // Plan: (slot index, units to add) for existing stacks, then new stacks.
        let mut remaining = count;
        let mut top_ups = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if !item.can_merge(template_id, instance_tags) {
                continue;
            }
            let room = max_stack.saturating_sub(item.stack_count);
            if room > 0 {
                let take = room.min(remaining);
                top_ups.push((index, take));
                remaining -= take;
            }
        }
        // Checked against the policy before any new stack is built.
        let new_stacks = remaining.div_ceil(max_stack) as usize;

        let current = self.usage(catalog)?;
        let projected = ContainerUsage {
            slots: current.slots + new_stacks,
            items: current.items + u64::from(count),
            weight: current.weight + u64::from(definition.weight) * u64::from(count),
        };
        self.policy
            .check(definition, &projected)
            .map_err(|limit| LedgerError::CapacityExceeded {
                container: self.id,
                limit,
            })?;

        let tag_deltas = signed_deltas(definition, i64::from(count));
        self.ledger.apply(&tag_deltas)?;

        // Nothing below can fail.
        let introduced = self.count_of(template_id) == 0;
        let items = Arc::make_mut(&mut self.items);
        let mut slots = Vec::with_capacity(top_ups.len() + new_stacks);
        for (index, take) in top_ups {
            let item = &mut items[index];
            item.stack_count += take;
            slots.push(item.slot_change());
        }
        while remaining > 0 {
            let take = remaining.min(max_stack);
            remaining -= take;
            let item = ItemInstance {
                id: allocator.allocate(),
                template_id: template_id.clone(),
                stack_count: take,
                instance_tags: instance_tags.clone(),
            };
            slots.push(item.slot_change());
            items.push(item);
        }

        Ok(ContainerChange {
            template_id: template_id.clone(),
            quantity: count,
            slots,
            tag_deltas,
            introduced,
            eliminated: false,
        })
    }

    /// Removes `count` units from one instance, destroying it at zero.
    pub fn remove(
        &mut self,
        catalog: &ItemCatalog,
        instance: InstanceId,
        count: u32,
    ) -> Result<ContainerChange> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == instance)
            .ok_or(LedgerError::UnknownInstance {
                container: self.id,
                instance,
            })?;
        if count == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let available = self.items[index].stack_count;
        if count > available {
            return Err(LedgerError::InsufficientStack {
                requested: u64::from(count),
                available: u64::from(available),
            });
        }
        let template_id = self.items[index].template_id.clone();
        let definition = catalog.lookup(&template_id)?;
        let tag_deltas = signed_deltas(definition, -i64::from(count));
        self.ledger.apply(&tag_deltas)?;

        let items = Arc::make_mut(&mut self.items);
        items[index].stack_count -= count;
        let slot = items[index].slot_change();
        if slot.is_destroyed() {
            items.remove(index);
        }

        Ok(ContainerChange {
            eliminated: self.count_of(&template_id) == 0,
            template_id,
            quantity: count,
            slots: vec![slot],
            tag_deltas,
            introduced: false,
        })
    }

    /// Removes `count` units of `template_id` across stacks in slot order.
    pub fn consume(
        &mut self,
        catalog: &ItemCatalog,
        template_id: &TemplateId,
        count: u32,
    ) -> Result<ContainerChange> {
        if count == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let definition = catalog.lookup(template_id)?;
        let available = self.count_of(template_id);
        if u64::from(count) > available {
            return Err(LedgerError::InsufficientStack {
                requested: u64::from(count),
                available,
            });
        }
        let tag_deltas = signed_deltas(definition, -i64::from(count));
        self.ledger.apply(&tag_deltas)?;

        let items = Arc::make_mut(&mut self.items);
        let mut remaining = count;
        let mut slots = Vec::new();
        for item in items.iter_mut() {
            if remaining == 0 {
                break;
            }
            if &item.template_id != template_id {
                continue;
            }
            let take = item.stack_count.min(remaining);
            item.stack_count -= take;
            remaining -= take;
            slots.push(item.slot_change());
        }
        items.retain(|item| item.stack_count > 0);

        Ok(ContainerChange {
            template_id: template_id.clone(),
            quantity: count,
            slots,
            tag_deltas,
            introduced: false,
            eliminated: u64::from(count) == available,
        })
    }

    pub fn checkpoint(&self) -> ContainerCheckpoint {
        ContainerCheckpoint {
            container: self.id,
            items: Arc::clone(&self.items),
            ledger: self.ledger.clone(),
        }
    }

    /// Restores a checkpoint taken from this container.
    pub fn restore(&mut self, checkpoint: ContainerCheckpoint) {
        debug_assert_eq!(checkpoint.container, self.id);
        self.items = checkpoint.items;
        self.ledger = checkpoint.ledger;
    }
}

/// Ledger deltas for `units` of `definition` (negative to remove).
fn signed_deltas(definition: &ItemDefinition, units: i64) -> Vec<TagDelta> {
    definition
        .tags
        .iter()
        .map(|tag| TagDelta::new(tag.clone(), units))
        .collect()
}

/// Moves `count` units of `instance` from `source` into `target`.
///
/// The source removal is rolled back if the target rejects the items, so the
/// units always end up in exactly one of the two containers. Instance tags
/// travel with the items.
pub fn transfer(
    source: &mut InventoryContainer,
    target: &mut InventoryContainer,
    catalog: &ItemCatalog,
    allocator: &mut InstanceAllocator,
    instance: InstanceId,
    count: u32,
) -> Result<TransferOutcome> {
    if source.id == target.id {
        return Err(LedgerError::SelfTransfer(source.id));
    }
    let moving = source.instance(instance)?;
    let template_id = moving.template_id.clone();
    let instance_tags = moving.instance_tags.clone();

    let checkpoint = source.checkpoint();
    let removed = source.remove(catalog, instance, count)?;
    match target.add(catalog, allocator, &template_id, count, &instance_tags) {
        Ok(added) => Ok(TransferOutcome { removed, added }),
        Err(error) => {
            source.restore(checkpoint);
            Err(error)
        }
    }
}
