//! Bridge from ledger grant bindings to the event bus.

use ledger_core::{AbilityId, AbilitySink, ContainerId, GrantHandle};

use crate::events::{AbilityEvent, Event, EventBus};

/// [`AbilitySink`] that turns grants and revokes into [`AbilityEvent`]s on
/// `Topic::Abilities`. Handles are allocated locally and never reused.
pub struct BusAbilitySink {
    event_bus: EventBus,
    next_handle: u64,
}

impl BusAbilitySink {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            next_handle: 1,
        }
    }
}

impl AbilitySink for BusAbilitySink {
    fn grant(&mut self, ability: &AbilityId, source: ContainerId) -> GrantHandle {
        let handle = GrantHandle(self.next_handle);
        self.next_handle += 1;
        tracing::debug!(
            target: "runtime::authority",
            ability = %ability,
            container = %source,
            handle = handle.0,
            "Ability granted"
        );
        self.event_bus.publish(Event::Ability(AbilityEvent::Granted {
            handle,
            ability: ability.clone(),
            container: source,
        }));
        handle
    }

    fn revoke(&mut self, handle: GrantHandle) {
        tracing::debug!(target: "runtime::authority", handle = handle.0, "Ability revoked");
        self.event_bus
            .publish(Event::Ability(AbilityEvent::Revoked { handle }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Topic;

    #[tokio::test]
    async fn grants_are_published_with_fresh_handles() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Topic::Abilities);
        let mut sink = BusAbilitySink::new(bus.clone());

        let light = AbilityId::from("Ability.Light");
        let first = sink.grant(&light, ContainerId(1));
        let second = sink.grant(&light, ContainerId(2));
        sink.revoke(first);

        assert_ne!(first, second);
        assert!(matches!(
            rx.recv().await,
            Ok(Event::Ability(AbilityEvent::Granted { container: ContainerId(1), .. }))
        ));
        assert!(matches!(
            rx.recv().await,
            Ok(Event::Ability(AbilityEvent::Granted { container: ContainerId(2), .. }))
        ));
        assert!(matches!(
            rx.recv().await,
            Ok(Event::Ability(AbilityEvent::Revoked { handle })) if handle == first
        ));
    }
}
