//! Authority worker that owns the single writable [`ReplicationAuthority`].
//!
//! Receives commands from [`AuthorityHandle`](crate::AuthorityHandle),
//! applies them in arrival order, and publishes everything the authority
//! produced to the [`EventBus`] before replying. A caller that awaited a
//! mutation can therefore rely on its deltas already being on the bus.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use ledger_core::{
    ActorId, ContainerId, ContainerPolicy, ContainerSnapshot, Interactable, InteractableId,
    LedgerError, MutationOutcome, MutationRequest, ReplicationAuthority, ReplicationDelta,
    Requester, SpawnerConfig, SpawnerId, Tick, TickReport,
};

use crate::events::{Event, EventBus};
use crate::workers::AuthorityMetrics;

type Reply<T> = oneshot::Sender<Result<T, LedgerError>>;

/// Commands that can be sent to the authority worker
pub enum Command {
    Submit {
        requester: Requester,
        request: MutationRequest,
        reply: Reply<MutationOutcome>,
    },
    Advance {
        ticks: u64,
        reply: oneshot::Sender<TickReport>,
    },
    CreateContainer {
        owner: Option<ActorId>,
        /// `None` picks the configured default for the owner kind.
        policy: Option<ContainerPolicy>,
        reply: oneshot::Sender<ContainerId>,
    },
    DestroyContainer {
        container: ContainerId,
        reply: Reply<Vec<InteractableId>>,
    },
    RegisterInteractable {
        source: ContainerId,
        reply: Reply<InteractableId>,
    },
    RegisterSpawner {
        config: SpawnerConfig,
        reply: Reply<SpawnerId>,
    },
    RemoveSpawner {
        spawner: SpawnerId,
        reply: Reply<()>,
    },
    Snapshot {
        container: ContainerId,
        /// Set when a replica is rebuilding after a gap, lag or divergence.
        resync: bool,
        reply: Reply<ContainerSnapshot>,
    },
    DeltasSince {
        container: ContainerId,
        after: u64,
        reply: Reply<Vec<ReplicationDelta>>,
    },
    Interactables {
        reply: oneshot::Sender<Vec<Interactable>>,
    },
    DebugView {
        container: ContainerId,
        reply: Reply<String>,
    },
    Clock {
        reply: oneshot::Sender<Tick>,
    },
    Shutdown,
}

/// Background task that serializes every authority mutation.
pub struct AuthorityWorker {
    authority: ReplicationAuthority,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    metrics: Arc<AuthorityMetrics>,
}

impl AuthorityWorker {
    pub fn new(
        authority: ReplicationAuthority,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        metrics: Arc<AuthorityMetrics>,
    ) -> Self {
        info!(
            target: "runtime::authority",
            templates = authority.catalog().len(),
            claim_ttl = authority.config().claim_ttl,
            "AuthorityWorker initialized"
        );

        Self {
            authority,
            command_rx,
            event_bus,
            metrics,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            if matches!(cmd, Command::Shutdown) {
                debug!(target: "runtime::authority", "Shutdown command received");
                break;
            }
            self.handle_command(cmd);
        }
        // Observers may still have queued output from the last command.
        self.publish_outbox();
        info!(target: "runtime::authority", "AuthorityWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit {
                requester,
                request,
                reply,
            } => {
                let result = self.handle_submit(requester, request);
                self.publish_then_reply(reply, result, "Submit");
            }
            Command::Advance { ticks, reply } => {
                let report = self.handle_advance(ticks);
                self.publish_then_reply(reply, report, "Advance");
            }
            Command::CreateContainer {
                owner,
                policy,
                reply,
            } => {
                let policy = policy.unwrap_or_else(|| {
                    let config = self.authority.config();
                    match owner {
                        Some(_) => config.default_policy.clone(),
                        None => config.world_policy.clone(),
                    }
                });
                let id = self.authority.create_container(owner, policy);
                debug!(
                    target: "runtime::authority",
                    container = %id,
                    owner = ?owner,
                    "Container created"
                );
                self.publish_then_reply(reply, id, "CreateContainer");
            }
            Command::DestroyContainer { container, reply } => {
                let result = self.authority.destroy_container(container);
                if result.is_ok() {
                    debug!(
                        target: "runtime::authority",
                        container = %container,
                        "Container destroyed"
                    );
                }
                self.publish_then_reply(reply, result, "DestroyContainer");
            }
            Command::RegisterInteractable { source, reply } => {
                let result = self.authority.register_interactable(source);
                self.publish_then_reply(reply, result, "RegisterInteractable");
            }
            Command::RegisterSpawner { config, reply } => {
                let result = self.authority.register_spawner(config);
                self.publish_then_reply(reply, result, "RegisterSpawner");
            }
            Command::RemoveSpawner { spawner, reply } => {
                let result = self.authority.remove_spawner(spawner).map(|_| ());
                self.publish_then_reply(reply, result, "RemoveSpawner");
            }
            Command::Snapshot {
                container,
                resync,
                reply,
            } => {
                let result = self.authority.snapshot(container);
                if resync && result.is_ok() {
                    self.metrics.record_resync();
                }
                self.publish_then_reply(reply, result, "Snapshot");
            }
            Command::DeltasSince {
                container,
                after,
                reply,
            } => {
                let result = self.authority.deltas_since(container, after);
                self.publish_then_reply(reply, result, "DeltasSince");
            }
            Command::Interactables { reply } => {
                let interactables = self
                    .authority
                    .interactions()
                    .interactables()
                    .cloned()
                    .collect();
                self.publish_then_reply(reply, interactables, "Interactables");
            }
            Command::DebugView { container, reply } => {
                let result = self.authority.debug_view(container);
                self.publish_then_reply(reply, result, "DebugView");
            }
            Command::Clock { reply } => {
                let now = self.authority.clock();
                self.publish_then_reply(reply, now, "Clock");
            }
            Command::Shutdown => {}
        }
    }

    fn handle_submit(
        &mut self,
        requester: Requester,
        request: MutationRequest,
    ) -> Result<MutationOutcome, LedgerError> {
        let op = request.name();
        let container = request.container();
        let actor = requester.actor();

        match self.authority.submit(requester, request) {
            Ok(outcome) => {
                self.metrics.record_applied();
                debug!(
                    target: "runtime::authority",
                    op,
                    container = ?container,
                    actor = ?actor,
                    "Mutation applied"
                );
                Ok(outcome)
            }
            Err(error) => {
                self.metrics.record_rejected();
                if error.severity().is_recoverable() {
                    debug!(
                        target: "runtime::authority",
                        op,
                        container = ?container,
                        actor = ?actor,
                        error_code = error.error_code(),
                        %error,
                        "Mutation rejected"
                    );
                } else {
                    warn!(
                        target: "runtime::authority",
                        op,
                        container = ?container,
                        actor = ?actor,
                        error_code = error.error_code(),
                        %error,
                        "Mutation rejected"
                    );
                }
                Err(error)
            }
        }
    }

    fn handle_advance(&mut self, ticks: u64) -> TickReport {
        let report = self.authority.advance(ticks);
        for claim in &report.expired {
            debug!(
                target: "runtime::authority",
                interactable = %claim.interactable,
                actor = %claim.actor,
                "Claim expired"
            );
        }
        for (spawner, target, quantity) in &report.spawned {
            debug!(
                target: "runtime::authority",
                spawner = %spawner,
                container = %target,
                quantity,
                "Spawner produced items"
            );
        }
        for failure in &report.spawn_failures {
            warn!(
                target: "runtime::authority",
                spawner = %failure.spawner,
                container = %failure.target,
                error_code = failure.error.error_code(),
                error = %failure.error,
                "Spawn rejected, retrying next interval"
            );
        }
        report
    }

    fn publish_then_reply<T>(
        &mut self,
        reply: oneshot::Sender<T>,
        value: T,
        command: &'static str,
    ) {
        self.publish_outbox();
        if reply.send(value).is_err() {
            debug!(
                target: "runtime::authority",
                command,
                "Reply channel closed (caller dropped)"
            );
        }
    }

    /// Drains the authority outbox onto the bus.
    fn publish_outbox(&mut self) {
        let outbox = self.authority.drain();
        if outbox.is_empty() {
            return;
        }

        self.metrics.record_deltas(outbox.deltas.len() as u64);
        for delta in outbox.deltas {
            debug!(
                target: "runtime::authority",
                container = %delta.container,
                op = %delta.op,
                sequence = delta.sequence,
                "Delta published"
            );
            self.event_bus.publish(Event::Delta(delta));
        }
        for event in outbox.interactions {
            self.event_bus.publish(Event::Interaction(event));
        }
        for effect in outbox.effects {
            self.event_bus.publish(Event::Effect(effect));
        }
    }
}
