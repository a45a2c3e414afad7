//! Client-side container replicas.
//!
//! A [`ContainerReplica`] applies the authority's deltas strictly in sequence
//! order. Anything out of order is either ignored (already applied) or
//! reported as a gap, after which the only way forward is a full
//! [`ContainerSnapshot`].
use sha2::{Digest, Sha256};

use crate::delta::ReplicationDelta;
use crate::error::{LedgerError, Result};
use crate::ids::{ActorId, ContainerId, TemplateId};
use crate::inventory::ItemInstance;
use crate::stack::{TagStack, TagStackLedger};

/// Full state of one container at `sequence`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerSnapshot {
    pub container: ContainerId,
    pub owner: Option<ActorId>,
    pub sequence: u64,
    pub instances: Vec<ItemInstance>,
    pub stacks: Vec<TagStack>,
}

impl ContainerSnapshot {
    /// SHA-256 over a canonical, length-prefixed encoding of the snapshot.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.container.0.to_le_bytes());
        match self.owner {
            Some(owner) => {
                hasher.update([1]);
                hasher.update(owner.0.to_le_bytes());
            }
            None => hasher.update([0]),
        }
        hasher.update(self.sequence.to_le_bytes());

        hasher.update((self.instances.len() as u64).to_le_bytes());
        for instance in &self.instances {
            hasher.update(instance.id.0.to_le_bytes());
            hash_str(&mut hasher, instance.template_id.as_str());
            hasher.update(instance.stack_count.to_le_bytes());
            hasher.update((instance.instance_tags.len() as u64).to_le_bytes());
            for tag in &instance.instance_tags {
                hash_str(&mut hasher, tag.as_str());
            }
        }

        hasher.update((self.stacks.len() as u64).to_le_bytes());
        for stack in &self.stacks {
            hash_str(&mut hasher, stack.tag.as_str());
            hasher.update(stack.count.to_le_bytes());
        }
        hasher.finalize().into()
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The delta was already applied; nothing changed.
    Stale,
}

/// Read-only mirror of one container, driven by deltas.
#[derive(Clone, Debug)]
pub struct ContainerReplica {
    container: ContainerId,
    owner: Option<ActorId>,
    sequence: u64,
    instances: Vec<ItemInstance>,
    ledger: TagStackLedger,
}

impl ContainerReplica {
    /// Empty replica at sequence 0, matching a freshly created container.
    pub fn new(container: ContainerId, owner: Option<ActorId>) -> Self {
        Self {
            container,
            owner,
            sequence: 0,
            instances: Vec::new(),
            ledger: TagStackLedger::new(),
        }
    }

    pub fn from_snapshot(snapshot: ContainerSnapshot) -> Self {
        let mut replica = Self::new(snapshot.container, snapshot.owner);
        replica.install(snapshot);
        replica
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn instances(&self) -> &[ItemInstance] {
        &self.instances
    }

    pub fn ledger(&self) -> &TagStackLedger {
        &self.ledger
    }

    pub fn count_of(&self, template_id: &TemplateId) -> u64 {
        self.instances
            .iter()
            .filter(|item| &item.template_id == template_id)
            .map(|item| u64::from(item.stack_count))
            .sum()
    }

    /// Applies the next delta in sequence.
    ///
    /// Fails with [`LedgerError::SequenceGap`] if deltas were skipped and with
    /// [`LedgerError::ReplicaDiverged`] if the delta does not fit the local
    /// state. In both cases the replica is unchanged.
    pub fn apply(&mut self, delta: &ReplicationDelta) -> Result<ApplyOutcome> {
        if delta.container != self.container {
            return Err(self.diverged(format!("delta addressed to {}", delta.container)));
        }
        if delta.sequence <= self.sequence {
            return Ok(ApplyOutcome::Stale);
        }
        let expected = self.sequence + 1;
        if delta.sequence != expected {
            return Err(LedgerError::SequenceGap {
                container: self.container,
                expected,
                received: delta.sequence,
            });
        }

        let mut instances = self.instances.clone();
        for slot in &delta.slots {
            let position = instances.iter().position(|item| item.id == slot.instance);
            match (position, slot.is_destroyed()) {
                (Some(index), true) => {
                    instances.remove(index);
                }
                (Some(index), false) => {
                    let item = &mut instances[index];
                    if item.template_id != slot.template_id {
                        return Err(self.diverged(format!("{} changed template", slot.instance)));
                    }
                    item.stack_count = slot.stack_count;
                    item.instance_tags = slot.instance_tags.clone();
                }
                (None, false) => instances.push(slot.clone().into_instance()),
                (None, true) => {
                    return Err(self.diverged(format!("{} is not present", slot.instance)));
                }
            }
        }
        let mut ledger = self.ledger.clone();
        ledger
            .apply(&delta.tag_deltas)
            .map_err(|err| self.diverged(err.to_string()))?;

        self.instances = instances;
        self.ledger = ledger;
        self.sequence = delta.sequence;
        Ok(ApplyOutcome::Applied)
    }

    /// Replaces the local state with an authoritative snapshot.
    pub fn resync(&mut self, snapshot: ContainerSnapshot) -> Result<()> {
        if snapshot.container != self.container {
            return Err(self.diverged(format!("snapshot of {}", snapshot.container)));
        }
        self.install(snapshot);
        Ok(())
    }

    fn install(&mut self, snapshot: ContainerSnapshot) {
        let mut ledger = TagStackLedger::new();
        for stack in &snapshot.stacks {
            ledger.set_count(&stack.tag, stack.count);
        }
        self.owner = snapshot.owner;
        self.sequence = snapshot.sequence;
        self.instances = snapshot.instances;
        self.ledger = ledger;
    }

    pub fn snapshot(&self) -> ContainerSnapshot {
        ContainerSnapshot {
            container: self.container,
            owner: self.owner,
            sequence: self.sequence,
            instances: self.instances.clone(),
            stacks: self.ledger.stacks().collect(),
        }
    }

    fn diverged(&self, reason: String) -> LedgerError {
        LedgerError::ReplicaDiverged {
            container: self.container,
            reason,
        }
    }
}
