//! High-level runtime orchestrator.
//!
//! The runtime owns background workers, wires up command/event channels, and
//! exposes a builder-based API for clients to drive the authority.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use ledger_core::{
    AbilityGrantBinding, ActorId, ContainerId, ItemCatalog, LedgerConfig, LedgerError,
    MutationObserver, MutationOutcome, ReplicationAuthority, Requester,
};

use crate::abilities::BusAbilitySink;
use crate::api::{AgentContext, AgentProvider, AuthorityHandle, Result, RuntimeError};
use crate::events::EventBus;
use crate::replica::ReplicaSession;
use crate::workers::{AuthorityMetrics, AuthorityWorker, ClockWorker, Command};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub ledger: LedgerConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Wall-clock length of one authority tick. `None` leaves the clock to
    /// explicit [`AuthorityHandle::advance`] calls.
    pub tick_interval: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            event_buffer_size: 256,
            command_buffer_size: 32,
            tick_interval: None,
        }
    }
}

struct AgentSlot {
    actor: ActorId,
    container: ContainerId,
    provider: Box<dyn AgentProvider>,
}

/// Result of one agent's turn in [`Runtime::step_agents`].
#[derive(Debug)]
pub struct AgentStep {
    pub actor: ActorId,
    /// Operation name of the submitted request, `None` if the agent passed.
    pub op: Option<&'static str>,
    pub result: std::result::Result<Option<MutationOutcome>, LedgerError>,
}

/// Main runtime that hosts the replication authority
///
/// Design: Runtime owns workers and coordinates agents.
/// [`AuthorityHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: AuthorityHandle,
    agents: Vec<AgentSlot>,
    authority_worker: JoinHandle<()>,
    clock_worker: Option<(JoinHandle<()>, oneshot::Sender<()>)>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to the authority
    pub fn handle(&self) -> AuthorityHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> &AuthorityMetrics {
        self.handle.metrics()
    }

    /// Open a replica session subscribed from this point on.
    pub fn replica_session(&self) -> ReplicaSession {
        ReplicaSession::new(self.handle.clone())
    }

    /// Register an agent acting as `actor` out of `container`.
    pub fn add_agent(
        &mut self,
        actor: ActorId,
        container: ContainerId,
        provider: impl AgentProvider + 'static,
    ) {
        self.agents.push(AgentSlot {
            actor,
            container,
            provider: Box::new(provider),
        });
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Poll every agent once, in registration order, and submit its request.
    ///
    /// Ledger rejections are part of the returned steps; only runtime
    /// failures abort the round.
    pub async fn step_agents(&mut self) -> Result<Vec<AgentStep>> {
        let mut steps = Vec::with_capacity(self.agents.len());

        for slot in &self.agents {
            let context = AgentContext {
                actor: slot.actor,
                now: self.handle.clock().await?,
                inventory: self.handle.snapshot(slot.container).await?,
                interactables: self.handle.interactables().await?,
            };

            let Some(request) = slot.provider.next_request(&context).await? else {
                steps.push(AgentStep {
                    actor: slot.actor,
                    op: None,
                    result: Ok(None),
                });
                continue;
            };

            let op = request.name();
            debug!(target: "runtime::authority", actor = %slot.actor, op, "Agent request");
            let result = match self.handle.submit(Requester::Actor(slot.actor), request).await {
                Ok(outcome) => Ok(Some(outcome)),
                Err(RuntimeError::Ledger(error)) => Err(error),
                Err(error) => return Err(error),
            };
            steps.push(AgentStep {
                actor: slot.actor,
                op: Some(op),
                result,
            });
        }

        Ok(steps)
    }

    /// Shutdown the runtime gracefully
    pub async fn shutdown(self) -> Result<()> {
        if let Some((clock, stop)) = self.clock_worker {
            // The clock may already have stopped on its own.
            let _ = stop.send(());
            clock.await.map_err(RuntimeError::WorkerJoin)?;
        }

        self.handle.shutdown().await?;
        self.authority_worker
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    catalog: Option<Arc<ItemCatalog>>,
    observers: Vec<Box<dyn MutationObserver>>,
    ability_grants: bool,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            catalog: None,
            observers: Vec::new(),
            ability_grants: true,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sealed item catalog (required)
    pub fn catalog(mut self, catalog: impl Into<Arc<ItemCatalog>>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Add a mutation observer next to the built-in ability binding.
    pub fn observer(mut self, observer: impl MutationObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Publish ability grants on `Topic::Abilities` (default: true)
    pub fn ability_grants(mut self, enable: bool) -> Self {
        self.ability_grants = enable;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = Some(interval);
        self
    }

    /// Build the runtime and spawn its workers
    pub async fn build(self) -> Result<Runtime> {
        let catalog = self.catalog.ok_or(RuntimeError::MissingCatalog)?;
        let mut authority = ReplicationAuthority::new(catalog, self.config.ledger.clone())?;

        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        if self.ability_grants {
            let sink = BusAbilitySink::new(event_bus.clone());
            authority.register_observer(Box::new(AbilityGrantBinding::new(sink)));
        }
        for observer in self.observers {
            authority.register_observer(observer);
        }

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let metrics = Arc::new(AuthorityMetrics::new());
        let handle = AuthorityHandle::new(command_tx, event_bus.clone(), Arc::clone(&metrics));

        let worker = AuthorityWorker::new(authority, command_rx, event_bus, metrics);
        let authority_worker = tokio::spawn(async move {
            worker.run().await;
        });

        let clock_worker = self.config.tick_interval.map(|period| {
            let (stop_tx, stop_rx) = oneshot::channel();
            let clock = ClockWorker::new(handle.clone(), period, stop_rx);
            let task = tokio::spawn(async move {
                clock.run().await;
            });
            (task, stop_tx)
        });

        Ok(Runtime {
            handle,
            agents: Vec::new(),
            authority_worker,
            clock_worker,
        })
    }
}
