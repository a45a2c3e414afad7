//! Synchronous mutation observers.
//!
//! Observers run inside the authority's mutation call, after the container has
//! committed and before the next request is looked at. They never see a
//! half-applied container.
use crate::catalog::ItemCatalog;
use crate::ids::{ActorId, ContainerId};
use crate::inventory::ContainerChange;

/// One committed change to one container.
#[derive(Clone, Copy, Debug)]
pub struct ContainerMutation<'a> {
    pub container: ContainerId,
    pub owner: Option<ActorId>,
    pub change: &'a ContainerChange,
}

/// Receives every committed container mutation.
///
/// Observers are invoked in priority order (lower values first).
pub trait MutationObserver: Send {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        0
    }

    fn on_mutation(&mut self, mutation: ContainerMutation<'_>, catalog: &ItemCatalog);

    /// The container and everything in it are gone.
    fn on_container_destroyed(&mut self, _container: ContainerId) {}
}

#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Box<dyn MutationObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn MutationObserver>) {
        self.observers.push(observer);
        // Stable: equal priorities keep registration order.
        self.observers.sort_by_key(|observer| observer.priority());
    }

    pub fn notify(&mut self, mutation: ContainerMutation<'_>, catalog: &ItemCatalog) {
        for observer in &mut self.observers {
            observer.on_mutation(mutation, catalog);
        }
    }

    pub fn notify_destroyed(&mut self, container: ContainerId) {
        for observer in &mut self.observers {
            observer.on_container_destroyed(container);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.observers.iter().map(|observer| observer.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.names())
            .finish()
    }
}
