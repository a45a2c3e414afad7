//! Demonstration session.
//!
//! Two scavenger agents compete for world pickups while a spawner refills a
//! grove and one actor drops part of its loot back into the world. A replica
//! session mirrors both actor containers the whole time, and the effect
//! stream is logged the way a presentation layer would consume it.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use ledger_core::{
    ActorId, ContainerId, ContainerSnapshot, MutationOutcome, MutationRequest, Requester,
    SpawnerConfig,
};
use runtime::{AuthorityHandle, Event, ReplicaSession, Runtime, ScavengerAgent, Topic};

const ALICE: ActorId = ActorId(1);
const BOB: ActorId = ActorId(2);

/// Summary written next to the session log.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub rounds: u64,
    pub clock: u64,
    pub applied: u64,
    pub rejected: u64,
    pub deltas_published: u64,
    pub resyncs_served: u64,
    pub replica_resyncs: u64,
    pub containers: Vec<ContainerReport>,
}

#[derive(Debug, Serialize)]
pub struct ContainerReport {
    pub container: ContainerId,
    pub sequence: u64,
    pub digest: String,
    pub replica_in_sync: bool,
    pub snapshot: ContainerSnapshot,
}

pub async fn run(
    runtime: &mut Runtime,
    rounds: u64,
    tick_interval: Option<Duration>,
) -> Result<SessionReport> {
    let handle = runtime.handle();
    let presenter = spawn_presenter(&handle);

    let alice = handle.create_actor_container(ALICE).await?;
    let bob = handle.create_actor_container(BOB).await?;

    let chest = handle.create_container(None, None).await?;
    seed(&handle, chest, "Torch", 1).await?;
    seed(&handle, chest, "HealthPotion", 3).await?;
    handle.register_interactable(chest).await?;

    let grove = handle.create_container(None, None).await?;
    handle
        .register_spawner(SpawnerConfig::new("Wood", 4, 2, grove).with_max_stock(12))
        .await?;
    handle.register_interactable(grove).await?;

    let mut replicas = runtime.replica_session();
    replicas.track(alice).await?;
    replicas.track(bob).await?;

    runtime.add_agent(ALICE, alice, ScavengerAgent::new());
    runtime.add_agent(BOB, bob, ScavengerAgent::new());

    for round in 1..=rounds {
        match tick_interval {
            Some(period) => tokio::time::sleep(period).await,
            None => {
                handle.advance(1).await?;
            }
        }

        for step in runtime.step_agents().await? {
            match (&step.op, &step.result) {
                (Some(op), Ok(_)) => {
                    tracing::info!(round, actor = %step.actor, op, "Agent step applied")
                }
                (Some(op), Err(error)) => tracing::info!(
                    round,
                    actor = %step.actor,
                    op,
                    error_code = error.error_code(),
                    "Agent step rejected"
                ),
                (None, _) => tracing::debug!(round, actor = %step.actor, "Agent idle"),
            }
        }

        if round == rounds / 2 {
            drop_half_of_first_stack(&handle, ALICE, alice).await?;
        }

        let applied = replicas.sync().await?;
        tracing::debug!(round, applied, "Replicas caught up");
    }

    let report = build_report(runtime, &handle, &mut replicas, rounds).await?;
    presenter.abort();
    Ok(report)
}

async fn seed(
    handle: &AuthorityHandle,
    container: ContainerId,
    template: &str,
    quantity: u32,
) -> Result<()> {
    handle
        .submit(Requester::Server, MutationRequest::add(container, template, quantity))
        .await
        .with_context(|| format!("Failed to seed {quantity} {template} into {container}"))?;
    Ok(())
}

/// Puts part of the actor's first stack back into the world as a pickup.
async fn drop_half_of_first_stack(
    handle: &AuthorityHandle,
    actor: ActorId,
    container: ContainerId,
) -> Result<()> {
    let snapshot = handle.snapshot(container).await?;
    let Some(item) = snapshot.instances.first() else {
        tracing::info!(actor = %actor, "Nothing to drop");
        return Ok(());
    };

    let quantity = (item.stack_count / 2).max(1);
    let request = MutationRequest::Drop {
        container,
        instance: item.id,
        quantity,
    };
    match handle.submit(Requester::Actor(actor), request).await {
        Ok(MutationOutcome::Dropped { interactable, .. }) => {
            tracing::info!(
                actor = %actor,
                %interactable,
                quantity,
                template = %item.template_id,
                "Dropped items"
            );
        }
        Ok(other) => bail!("unexpected drop outcome {other:?}"),
        Err(error) => tracing::warn!(
            actor = %actor,
            error_code = error.error_code(),
            %error,
            "Drop rejected"
        ),
    }
    Ok(())
}

fn spawn_presenter(handle: &AuthorityHandle) -> JoinHandle<()> {
    let mut effects = handle.subscribe(Topic::Effects);
    let mut abilities = handle.subscribe(Topic::Abilities);
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = effects.recv() => event,
                event = abilities.recv() => event,
            };
            match event {
                Ok(Event::Effect(effect)) => {
                    tracing::info!(target: "ledger_server::presenter", ?effect, "Effect")
                }
                Ok(Event::Ability(ability)) => {
                    tracing::info!(target: "ledger_server::presenter", ?ability, "Ability")
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "ledger_server::presenter", skipped, "Presenter lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn build_report(
    runtime: &Runtime,
    handle: &AuthorityHandle,
    replicas: &mut ReplicaSession,
    rounds: u64,
) -> Result<SessionReport> {
    let mut containers = Vec::new();
    let tracked: Vec<ContainerId> = replicas.tracked().collect();
    for container in tracked {
        let snapshot = handle.snapshot(container).await?;
        let replica_in_sync = replicas
            .replica(container)
            .is_some_and(|replica| replica.snapshot().digest() == snapshot.digest());
        if !replica_in_sync {
            tracing::warn!(%container, "Replica digest mismatch, resynchronizing");
            replicas.resync(container).await?;
        }
        tracing::info!("\n{}", handle.debug_view(container).await?);
        containers.push(ContainerReport {
            container,
            sequence: snapshot.sequence,
            digest: hex::encode(snapshot.digest()),
            replica_in_sync,
            snapshot,
        });
    }

    let metrics = runtime.metrics().snapshot();
    Ok(SessionReport {
        rounds,
        clock: handle.clock().await?,
        applied: metrics.applied,
        rejected: metrics.rejected,
        deltas_published: metrics.deltas_published,
        resyncs_served: metrics.resyncs_served,
        replica_resyncs: replicas.resyncs(),
        containers,
    })
}
