//! Cloneable façade for issuing commands to the authority.
//!
//! [`AuthorityHandle`] hides channel plumbing and offers async helpers for
//! submitting mutation requests, driving the clock, fetching snapshots and
//! streaming events from specific topics.
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use ledger_core::{
    ActorId, ContainerId, ContainerPolicy, ContainerSnapshot, Interactable, InteractableId,
    LedgerError, MutationOutcome, MutationRequest, ReplicationDelta, Requester, SpawnerConfig,
    SpawnerId, Tick, TickReport,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::{AuthorityMetrics, Command};

/// Client-facing handle to the authority worker
#[derive(Clone)]
pub struct AuthorityHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    metrics: Arc<AuthorityMetrics>,
}

impl AuthorityHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        metrics: Arc<AuthorityMetrics>,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            metrics,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    async fn ledger_request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<std::result::Result<T, LedgerError>>) -> Command,
    ) -> Result<T> {
        Ok(self.request(build).await??)
    }

    /// Submit a mutation request. Deltas it produced are already on the bus
    /// when this returns.
    pub async fn submit(
        &self,
        requester: Requester,
        request: MutationRequest,
    ) -> Result<MutationOutcome> {
        self.ledger_request(|reply| Command::Submit {
            requester,
            request,
            reply,
        })
        .await
    }

    /// Advance the authority clock by `ticks`.
    pub async fn advance(&self, ticks: u64) -> Result<TickReport> {
        self.request(|reply| Command::Advance { ticks, reply }).await
    }

    pub async fn clock(&self) -> Result<Tick> {
        self.request(|reply| Command::Clock { reply }).await
    }

    /// Create an actor container with the configured default policy.
    pub async fn create_actor_container(&self, actor: ActorId) -> Result<ContainerId> {
        self.create_container(Some(actor), None).await
    }

    pub async fn create_container(
        &self,
        owner: Option<ActorId>,
        policy: Option<ContainerPolicy>,
    ) -> Result<ContainerId> {
        self.request(|reply| Command::CreateContainer {
            owner,
            policy,
            reply,
        })
        .await
    }

    /// Destroy a container, returning the interactables that went with it.
    pub async fn destroy_container(&self, container: ContainerId) -> Result<Vec<InteractableId>> {
        self.ledger_request(|reply| Command::DestroyContainer { container, reply })
            .await
    }

    pub async fn register_interactable(&self, source: ContainerId) -> Result<InteractableId> {
        self.ledger_request(|reply| Command::RegisterInteractable { source, reply })
            .await
    }

    pub async fn register_spawner(&self, config: SpawnerConfig) -> Result<SpawnerId> {
        self.ledger_request(|reply| Command::RegisterSpawner { config, reply })
            .await
    }

    pub async fn remove_spawner(&self, spawner: SpawnerId) -> Result<()> {
        self.ledger_request(|reply| Command::RemoveSpawner { spawner, reply })
            .await
    }

    /// Full state of a container. Plain reads do not count as resyncs.
    pub async fn snapshot(&self, container: ContainerId) -> Result<ContainerSnapshot> {
        self.snapshot_with(container, false).await
    }

    /// Snapshot fetched to rebuild a replica after a gap, lag or divergence.
    /// Counted in [`AuthorityMetrics::resyncs_served`].
    pub async fn resync_snapshot(&self, container: ContainerId) -> Result<ContainerSnapshot> {
        self.snapshot_with(container, true).await
    }

    async fn snapshot_with(
        &self,
        container: ContainerId,
        resync: bool,
    ) -> Result<ContainerSnapshot> {
        self.ledger_request(|reply| Command::Snapshot {
            container,
            resync,
            reply,
        })
        .await
    }

    /// Logged deltas of `container` with sequence greater than `after`.
    pub async fn deltas_since(
        &self,
        container: ContainerId,
        after: u64,
    ) -> Result<Vec<ReplicationDelta>> {
        self.ledger_request(|reply| Command::DeltasSince {
            container,
            after,
            reply,
        })
        .await
    }

    pub async fn interactables(&self) -> Result<Vec<Interactable>> {
        self.request(|reply| Command::Interactables { reply }).await
    }

    pub async fn debug_view(&self, container: ContainerId) -> Result<String> {
        self.ledger_request(|reply| Command::DebugView { container, reply })
            .await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Replication` - Per-container deltas
    /// - `Topic::Effects` - Pickup, use and drop notifications
    /// - `Topic::Interaction` - Interactable phase changes
    /// - `Topic::Abilities` - Grant and revoke requests
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    pub fn metrics(&self) -> &AuthorityMetrics {
        &self.metrics
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }
}
