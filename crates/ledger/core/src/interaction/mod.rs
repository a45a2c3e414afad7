//! Claim-guarded access to world interactables.
//!
//! [`InteractionSystem`] pairs each [`Interactable`]'s state machine with the
//! [`ReservationRegistry`] entry that guards it. The registry is the single
//! arbitration point. The machine records where in the lifecycle the
//! interactable is and produces the [`InteractionEvent`]s that clients see.
mod machine;
mod reservation;

use std::collections::BTreeMap;

pub use machine::{Interactable, InteractionEvent, InteractionPhase, PhaseKind};
pub use reservation::{InteractionClaim, ReservationRegistry};

use crate::error::{LedgerError, Result};
use crate::ids::{ActorId, ContainerId, InteractableId, Tick};

#[derive(Clone, Debug, Default)]
pub struct InteractionSystem {
    registry: ReservationRegistry,
    interactables: BTreeMap<InteractableId, Interactable>,
}

impl InteractionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: InteractableId, source: ContainerId) {
        self.interactables.insert(id, Interactable::new(id, source));
    }

    pub fn remove(&mut self, id: InteractableId) -> Option<Interactable> {
        self.registry.clear(id);
        self.interactables.remove(&id)
    }

    /// Removes every interactable whose source is `container`.
    pub fn remove_for_container(&mut self, container: ContainerId) -> Vec<InteractableId> {
        let doomed: Vec<InteractableId> = self
            .interactables
            .values()
            .filter(|interactable| interactable.source() == container)
            .map(Interactable::id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed
    }

    pub fn get(&self, id: InteractableId) -> Result<&Interactable> {
        self.interactables
            .get(&id)
            .ok_or(LedgerError::UnknownInteractable(id))
    }

    pub fn interactables(&self) -> impl Iterator<Item = &Interactable> {
        self.interactables.values()
    }

    pub fn registry(&self) -> &ReservationRegistry {
        &self.registry
    }

    fn machine(&mut self, id: InteractableId) -> Result<&mut Interactable> {
        self.interactables
            .get_mut(&id)
            .ok_or(LedgerError::UnknownInteractable(id))
    }

    /// Claims `id` for `actor` until `now + ttl`.
    ///
    /// A stale claim left by another actor is expired first, so its
    /// `Claimed -> Expired -> Idle` events precede the new claim's event.
    pub fn claim(
        &mut self,
        id: InteractableId,
        actor: ActorId,
        now: Tick,
        ttl: Tick,
    ) -> Result<(InteractionClaim, Vec<InteractionEvent>)> {
        self.get(id)?;
        let claim = self.registry.try_claim(id, actor, now, ttl)?;

        let machine = self.machine(id)?;
        let mut events = Vec::new();
        if let InteractionPhase::Claimed { actor: holder, .. } = machine.phase() {
            if holder != actor {
                events.push(machine.expire()?);
                events.push(machine.recycle()?);
            }
        }
        events.push(machine.claim(actor, claim.expiry)?);
        Ok((claim, events))
    }

    /// Voluntary `Claimed -> Released -> Idle`.
    pub fn release(&mut self, id: InteractableId, actor: ActorId) -> Result<Vec<InteractionEvent>> {
        self.get(id)?;
        self.registry.release(id, actor)?;
        let machine = self.machine(id)?;
        Ok(vec![machine.release(actor)?, machine.recycle()?])
    }

    /// Validates the claim and moves to `Transferring`. Returns the source
    /// container to transfer from.
    pub fn begin_transfer(
        &mut self,
        id: InteractableId,
        actor: ActorId,
        now: Tick,
    ) -> Result<(ContainerId, InteractionEvent)> {
        self.get(id)?;
        self.registry.validate(id, actor, now)?;
        let machine = self.machine(id)?;
        let event = machine.begin_transfer(actor)?;
        Ok((machine.source(), event))
    }

    /// Releases the claim whatever the transfer's outcome and returns to `Idle`.
    pub fn finish_transfer(&mut self, id: InteractableId) -> Result<Vec<InteractionEvent>> {
        self.registry.clear(id);
        let machine = self.machine(id)?;
        Ok(vec![machine.finish_transfer()?, machine.recycle()?])
    }

    /// Auto-releases every claim that is no longer live at `now`.
    pub fn expire(&mut self, now: Tick) -> (Vec<InteractionClaim>, Vec<InteractionEvent>) {
        let expired = self.registry.expire(now);
        let mut events = Vec::new();
        for claim in &expired {
            let Some(machine) = self.interactables.get_mut(&claim.interactable) else {
                continue;
            };
            if machine.phase().actor() != Some(claim.actor) {
                continue;
            }
            if let Ok(event) = machine.expire() {
                events.push(event);
                if let Ok(event) = machine.recycle() {
                    events.push(event);
                }
            }
        }
        (expired, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEST: InteractableId = InteractableId(1);
    const ALICE: ActorId = ActorId(1);
    const BOB: ActorId = ActorId(2);

    fn system() -> InteractionSystem {
        let mut system = InteractionSystem::new();
        system.register(CHEST, ContainerId(100));
        system
    }

    #[test]
    fn claim_expires_and_another_actor_takes_over() {
        let mut system = system();
        system.claim(CHEST, ALICE, 0, 2).unwrap();

        assert!(matches!(
            system.claim(CHEST, BOB, 1, 2),
            Err(LedgerError::AlreadyClaimed { holder: ALICE, .. })
        ));

        let (claim, events) = system.claim(CHEST, BOB, 2, 2).unwrap();
        assert_eq!(claim.actor, BOB);
        let path: Vec<PhaseKind> = events.iter().map(|event| event.to).collect();
        assert_eq!(
            path,
            vec![PhaseKind::Expired, PhaseKind::Idle, PhaseKind::Claimed]
        );
    }

    #[test]
    fn clock_sweep_recycles_stale_claims() {
        let mut system = system();
        system.claim(CHEST, ALICE, 0, 2).unwrap();

        let (expired, events) = system.expire(1);
        assert!(expired.is_empty() && events.is_empty());

        let (expired, events) = system.expire(2);
        assert_eq!(expired.len(), 1);
        assert_eq!(events.len(), 2);
        assert_eq!(system.get(CHEST).unwrap().phase(), InteractionPhase::Idle);
    }

    #[test]
    fn transfer_releases_claim_on_completion() {
        let mut system = system();
        system.claim(CHEST, ALICE, 0, 5).unwrap();

        assert!(system.begin_transfer(CHEST, BOB, 1).is_err());
        let (source, _) = system.begin_transfer(CHEST, ALICE, 1).unwrap();
        assert_eq!(source, ContainerId(100));

        let events = system.finish_transfer(CHEST).unwrap();
        assert_eq!(events.last().map(|event| event.to), Some(PhaseKind::Idle));
        assert!(system.registry().claim(CHEST).is_none());
        assert!(system.claim(CHEST, BOB, 2, 5).is_ok());
    }

    #[test]
    fn removing_the_source_container_drops_its_interactables() {
        let mut system = system();
        system.register(InteractableId(2), ContainerId(200));
        system.claim(CHEST, ALICE, 0, 5).unwrap();

        assert_eq!(system.remove_for_container(ContainerId(100)), vec![CHEST]);
        assert_eq!(
            system.claim(CHEST, ALICE, 1, 5).unwrap_err(),
            LedgerError::UnknownInteractable(CHEST)
        );
        assert!(system.registry().claim(CHEST).is_none());
    }
}
