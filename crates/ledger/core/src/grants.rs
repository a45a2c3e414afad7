//! Ability grants driven by container contents.
//!
//! [`AbilityGrantBinding`] is a [`MutationObserver`]: when a container gains
//! its first unit of a template it grants that template's abilities, and when
//! the last unit leaves it revokes them. Grants are reference-counted per
//! `(container, ability)` so that two templates granting the same ability only
//! produce one grant, revoked once both are gone.
use std::collections::BTreeMap;

use crate::catalog::ItemCatalog;
use crate::ids::{AbilityId, ContainerId};
use crate::observer::{ContainerMutation, MutationObserver};

/// Opaque token handed out by the ability system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrantHandle(pub u64);

/// The external ability system as seen by the ledger.
pub trait AbilitySink: Send {
    fn grant(&mut self, ability: &AbilityId, source: ContainerId) -> GrantHandle;

    fn revoke(&mut self, handle: GrantHandle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GrantRecord {
    handle: GrantHandle,
    /// Number of distinct templates currently held that grant the ability.
    refs: u32,
}

/// Grants and revokes abilities in an [`AbilitySink`] as items come and go.
///
/// Unowned (world) containers never receive grants.
pub struct AbilityGrantBinding<S> {
    sink: S,
    grants: BTreeMap<(ContainerId, AbilityId), GrantRecord>,
}

impl<S: AbilitySink> AbilityGrantBinding<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            grants: BTreeMap::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn handle(&self, container: ContainerId, ability: &AbilityId) -> Option<GrantHandle> {
        self.grants
            .get(&(container, ability.clone()))
            .map(|record| record.handle)
    }

    pub fn is_granted(&self, container: ContainerId, ability: &AbilityId) -> bool {
        self.handle(container, ability).is_some()
    }

    pub fn active_grants(&self) -> usize {
        self.grants.len()
    }

    fn acquire(&mut self, container: ContainerId, ability: &AbilityId) {
        let key = (container, ability.clone());
        match self.grants.get_mut(&key) {
            Some(record) => record.refs += 1,
            None => {
                let handle = self.sink.grant(ability, container);
                self.grants.insert(key, GrantRecord { handle, refs: 1 });
            }
        }
    }

    fn release(&mut self, container: ContainerId, ability: &AbilityId) {
        let key = (container, ability.clone());
        let Some(record) = self.grants.get_mut(&key) else {
            return;
        };
        record.refs -= 1;
        if record.refs == 0 {
            let handle = record.handle;
            self.grants.remove(&key);
            self.sink.revoke(handle);
        }
    }
}

impl<S: AbilitySink> MutationObserver for AbilityGrantBinding<S> {
    fn name(&self) -> &'static str {
        "ability-grants"
    }

    fn on_mutation(&mut self, mutation: ContainerMutation<'_>, catalog: &ItemCatalog) {
        if mutation.owner.is_none() {
            return;
        }
        let change = mutation.change;
        if !change.introduced && !change.eliminated {
            return;
        }
        let Ok(definition) = catalog.lookup(&change.template_id) else {
            return;
        };
        for ability in &definition.ability_grants {
            if change.introduced {
                self.acquire(mutation.container, ability);
            }
            if change.eliminated {
                self.release(mutation.container, ability);
            }
        }
    }

    fn on_container_destroyed(&mut self, container: ContainerId) {
        let doomed: Vec<(ContainerId, AbilityId)> = self
            .grants
            .keys()
            .filter(|(owner, _)| *owner == container)
            .cloned()
            .collect();
        for key in doomed {
            if let Some(record) = self.grants.remove(&key) {
                self.sink.revoke(record.handle);
            }
        }
    }
}
