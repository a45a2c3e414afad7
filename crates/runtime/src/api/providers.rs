//! Asynchronous abstraction for sourcing actor intent.
//!
//! Runtime users plug in [`AgentProvider`] implementations so actors can be
//! driven by human input, scripted fixtures, or AI policies. Every request
//! still goes through the authority and can be rejected like any other.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use ledger_core::{
    ActorId, ContainerId, ContainerSnapshot, Interactable, InteractableId, InteractionPhase,
    MutationRequest, Tick,
};

use super::errors::{Result, RuntimeError};

/// What an agent may look at before deciding.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub actor: ActorId,
    /// Authority clock when the context was captured.
    pub now: Tick,
    /// The agent's own container.
    pub inventory: ContainerSnapshot,
    pub interactables: Vec<Interactable>,
}

impl AgentContext {
    pub fn container(&self) -> ContainerId {
        self.inventory.container
    }
}

/// Trait for providing mutation requests on behalf of an actor.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Next request for the actor, or `None` to skip this step.
    async fn next_request(&self, context: &AgentContext) -> Result<Option<MutationRequest>>;
}

/// Replays a fixed queue of requests, one per step.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    script: Mutex<VecDeque<MutationRequest>>,
}

impl ScriptedAgent {
    pub fn new(script: impl IntoIterator<Item = MutationRequest>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map_or(0, |script| script.len())
    }
}

#[async_trait]
impl AgentProvider for ScriptedAgent {
    async fn next_request(&self, context: &AgentContext) -> Result<Option<MutationRequest>> {
        let mut script = self.script.lock().map_err(|_| RuntimeError::Agent {
            actor: context.actor,
            reason: "script lock poisoned".to_owned(),
        })?;
        Ok(script.pop_front())
    }
}

/// Greedy AI that claims the lowest free interactable and then loots it.
///
/// Two steps per pickup: a `Claim`, then an `Interact` once the context shows
/// the claim is held. A lost race simply moves on to the next free target.
#[derive(Debug, Default)]
pub struct ScavengerAgent;

impl ScavengerAgent {
    pub fn new() -> Self {
        Self
    }

    fn held(context: &AgentContext) -> Option<InteractableId> {
        context
            .interactables
            .iter()
            .find_map(|interactable| match interactable.phase() {
                InteractionPhase::Claimed { actor, expiry }
                    if actor == context.actor && context.now < expiry =>
                {
                    Some(interactable.id())
                }
                _ => None,
            })
    }

    fn free(context: &AgentContext) -> Option<InteractableId> {
        context
            .interactables
            .iter()
            .find(|interactable| matches!(interactable.phase(), InteractionPhase::Idle))
            .map(Interactable::id)
    }
}

#[async_trait]
impl AgentProvider for ScavengerAgent {
    async fn next_request(&self, context: &AgentContext) -> Result<Option<MutationRequest>> {
        if let Some(interactable) = Self::held(context) {
            return Ok(Some(MutationRequest::pickup(interactable, context.container())));
        }
        Ok(Self::free(context).map(|interactable| MutationRequest::Claim { interactable }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(interactables: Vec<Interactable>) -> AgentContext {
        AgentContext {
            actor: ActorId(7),
            now: 0,
            inventory: ContainerSnapshot {
                container: ContainerId(1),
                owner: Some(ActorId(7)),
                sequence: 0,
                instances: Vec::new(),
                stacks: Vec::new(),
            },
            interactables,
        }
    }

    #[tokio::test]
    async fn scripted_agent_replays_in_order() {
        let agent = ScriptedAgent::new([
            MutationRequest::Claim {
                interactable: InteractableId(1),
            },
            MutationRequest::Release {
                interactable: InteractableId(1),
            },
        ]);
        let context = context(Vec::new());

        assert!(matches!(
            agent.next_request(&context).await.unwrap(),
            Some(MutationRequest::Claim { .. })
        ));
        assert_eq!(agent.remaining(), 1);
        assert!(matches!(
            agent.next_request(&context).await.unwrap(),
            Some(MutationRequest::Release { .. })
        ));
        assert!(agent.next_request(&context).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scavenger_claims_first_idle_interactable() {
        let context = context(vec![
            Interactable::new(InteractableId(3), ContainerId(9)),
            Interactable::new(InteractableId(4), ContainerId(10)),
        ]);

        let request = ScavengerAgent::new().next_request(&context).await.unwrap();
        assert_eq!(
            request,
            Some(MutationRequest::Claim {
                interactable: InteractableId(3)
            })
        );
    }

    #[tokio::test]
    async fn scavenger_idles_without_targets() {
        let request = ScavengerAgent::new().next_request(&context(Vec::new())).await.unwrap();
        assert!(request.is_none());
    }
}
