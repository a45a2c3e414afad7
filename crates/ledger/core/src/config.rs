use crate::ids::Tick;
use crate::inventory::ContainerPolicy;

/// Tunable authority parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LedgerConfig {
    /// Ticks a claim stays live without a transfer.
    pub claim_ttl: Tick,
    /// Policy of the pickup containers created by drops.
    pub world_policy: ContainerPolicy,
    /// Policy used by [`crate::ReplicationAuthority::create_actor_container`].
    pub default_policy: ContainerPolicy,
}

impl LedgerConfig {
    pub const DEFAULT_CLAIM_TTL: Tick = 30;
    pub const DEFAULT_ACTOR_SLOTS: u32 = 24;

    pub fn new() -> Self {
        Self {
            claim_ttl: Self::DEFAULT_CLAIM_TTL,
            world_policy: ContainerPolicy::unbounded(),
            default_policy: ContainerPolicy::unbounded().with_max_slots(Self::DEFAULT_ACTOR_SLOTS),
        }
    }

    pub fn with_claim_ttl(mut self, claim_ttl: Tick) -> Self {
        self.claim_ttl = claim_ttl;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new()
    }
}
