use std::collections::BTreeMap;

use crate::error::{LedgerError, Result};
use crate::ids::{ActorId, InteractableId, Tick};

/// Temporary exclusive reservation of an interactable by one actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionClaim {
    pub interactable: InteractableId,
    pub actor: ActorId,
    /// First tick at which the claim is no longer live.
    pub expiry: Tick,
}

impl InteractionClaim {
    pub fn is_live(&self, now: Tick) -> bool {
        now < self.expiry
    }
}

/// At most one live claim per interactable.
///
/// Requests are arbitrated in the order the registry sees them: the first
/// claim wins and every later claimant gets [`LedgerError::AlreadyClaimed`]
/// until the claim is released or expires.
#[derive(Clone, Debug, Default)]
pub struct ReservationRegistry {
    claims: BTreeMap<InteractableId, InteractionClaim>,
}

impl ReservationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `interactable` for `actor` until `now + ttl`.
    ///
    /// A stale claim by anyone is replaced. A live claim by the same actor is
    /// renewed.
    pub fn try_claim(
        &mut self,
        interactable: InteractableId,
        actor: ActorId,
        now: Tick,
        ttl: Tick,
    ) -> Result<InteractionClaim> {
        if let Some(existing) = self.claims.get(&interactable) {
            if existing.is_live(now) && existing.actor != actor {
                return Err(LedgerError::AlreadyClaimed {
                    interactable,
                    holder: existing.actor,
                });
            }
        }
        let claim = InteractionClaim {
            interactable,
            actor,
            expiry: now.saturating_add(ttl),
        };
        self.claims.insert(interactable, claim);
        Ok(claim)
    }

    /// Checks that `actor` holds a live claim on `interactable`.
    pub fn validate(
        &self,
        interactable: InteractableId,
        actor: ActorId,
        now: Tick,
    ) -> Result<&InteractionClaim> {
        match self.claims.get(&interactable) {
            Some(claim) if claim.actor == actor && claim.is_live(now) => Ok(claim),
            Some(claim) if claim.actor == actor => Err(LedgerError::ClaimExpired {
                interactable,
                expired_at: claim.expiry,
            }),
            _ => Err(LedgerError::NotClaimant {
                interactable,
                actor,
            }),
        }
    }

    /// Drops the claim held by `actor`.
    pub fn release(
        &mut self,
        interactable: InteractableId,
        actor: ActorId,
    ) -> Result<InteractionClaim> {
        match self.claims.get(&interactable) {
            Some(claim) if claim.actor == actor => {
                let claim = *claim;
                self.claims.remove(&interactable);
                Ok(claim)
            }
            _ => Err(LedgerError::NotClaimant {
                interactable,
                actor,
            }),
        }
    }

    /// Removes whatever claim exists, regardless of holder.
    pub fn clear(&mut self, interactable: InteractableId) -> Option<InteractionClaim> {
        self.claims.remove(&interactable)
    }

    /// Removes and returns every claim that is no longer live at `now`.
    pub fn expire(&mut self, now: Tick) -> Vec<InteractionClaim> {
        let expired: Vec<InteractionClaim> = self
            .claims
            .values()
            .filter(|claim| !claim.is_live(now))
            .copied()
            .collect();
        for claim in &expired {
            self.claims.remove(&claim.interactable);
        }
        expired
    }

    pub fn claim(&self, interactable: InteractableId) -> Option<&InteractionClaim> {
        self.claims.get(&interactable)
    }

    pub fn live_claims(&self, now: Tick) -> impl Iterator<Item = &InteractionClaim> {
        self.claims.values().filter(move |claim| claim.is_live(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEST: InteractableId = InteractableId(1);
    const ALICE: ActorId = ActorId(1);
    const BOB: ActorId = ActorId(2);

    #[test]
    fn second_claimant_is_rejected() {
        let mut registry = ReservationRegistry::new();
        registry.try_claim(CHEST, ALICE, 0, 10).unwrap();

        assert_eq!(
            registry.try_claim(CHEST, BOB, 3, 10),
            Err(LedgerError::AlreadyClaimed {
                interactable: CHEST,
                holder: ALICE
            })
        );
    }

    #[test]
    fn expired_claim_can_be_taken_over() {
        let mut registry = ReservationRegistry::new();
        registry.try_claim(CHEST, ALICE, 0, 2).unwrap();

        assert!(registry.try_claim(CHEST, BOB, 1, 2).is_err());
        let claim = registry.try_claim(CHEST, BOB, 2, 2).unwrap();
        assert_eq!(claim.actor, BOB);
        assert_eq!(
            registry.validate(CHEST, ALICE, 2),
            Err(LedgerError::NotClaimant {
                interactable: CHEST,
                actor: ALICE
            })
        );
    }

    #[test]
    fn holder_renews_and_releases() {
        let mut registry = ReservationRegistry::new();
        registry.try_claim(CHEST, ALICE, 0, 5).unwrap();
        let renewed = registry.try_claim(CHEST, ALICE, 4, 5).unwrap();
        assert_eq!(renewed.expiry, 9);

        assert!(registry.release(CHEST, BOB).is_err());
        registry.release(CHEST, ALICE).unwrap();
        assert!(registry.claim(CHEST).is_none());
    }

    #[test]
    fn validate_reports_expiry_to_the_holder() {
        let mut registry = ReservationRegistry::new();
        registry.try_claim(CHEST, ALICE, 0, 3).unwrap();

        assert!(registry.validate(CHEST, ALICE, 2).is_ok());
        assert_eq!(
            registry.validate(CHEST, ALICE, 3),
            Err(LedgerError::ClaimExpired {
                interactable: CHEST,
                expired_at: 3
            })
        );

        let expired = registry.expire(3);
        assert_eq!(expired.len(), 1);
        assert_eq!(registry.live_claims(3).count(), 0);
    }
}
