//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use ledger_core::{EffectEvent, InteractionEvent, ReplicationDelta};

use super::types::AbilityEvent;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Per-container replication deltas
    Replication,
    /// Fire-and-forget presentation effects
    Effects,
    /// Interactable phase changes
    Interaction,
    /// Grant and revoke requests for the ability system
    Abilities,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Delta(ReplicationDelta),
    Effect(EffectEvent),
    Interaction(InteractionEvent),
    Ability(AbilityEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Delta(_) => Topic::Replication,
            Event::Effect(_) => Topic::Effects,
            Event::Interaction(_) => Topic::Interaction,
            Event::Ability(_) => Topic::Abilities,
        }
    }
}

struct Channels {
    replication: broadcast::Sender<Event>,
    effects: broadcast::Sender<Event>,
    interaction: broadcast::Sender<Event>,
    abilities: broadcast::Sender<Event>,
}

impl Channels {
    fn get(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Replication => &self.replication,
            Topic::Effects => &self.effects,
            Topic::Interaction => &self.interaction,
            Topic::Abilities => &self.abilities,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Each topic is a bounded broadcast channel; a
/// subscriber that falls more than `capacity` events behind observes
/// `RecvError::Lagged` and must resynchronize.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let channels = Channels {
            replication: broadcast::channel(capacity).0,
            effects: broadcast::channel(capacity).0,
            interaction: broadcast::channel(capacity).0,
            abilities: broadcast::channel(capacity).0,
        };

        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channels.get(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels.get(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels.get(topic).receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{ActorId, ContainerId, TemplateId};

    fn used(container: u32) -> Event {
        Event::Effect(EffectEvent::ItemUsed {
            actor: Some(ActorId(1)),
            container: ContainerId(container),
            template: TemplateId::from("HealthPotion"),
        })
    }

    #[tokio::test]
    async fn events_only_reach_their_topic() {
        let bus = EventBus::new();
        let mut effects = bus.subscribe(Topic::Effects);
        let mut replication = bus.subscribe(Topic::Replication);

        bus.publish(used(1));

        assert!(matches!(effects.recv().await, Ok(Event::Effect(_))));
        assert!(replication.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::with_capacity(1);
        bus.publish(used(1));
        assert_eq!(bus.subscriber_count(Topic::Effects), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe(Topic::Effects);
        for container in 0..5 {
            bus.publish(used(container));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
    }
}
