use std::sync::Arc;
use std::time::Duration;

use ledger_content::ContentFactory;
use ledger_core::{
    ActorId, ContainerId, ContainerPolicy, ContainerReplica, EffectEvent, InstanceId, ItemCatalog,
    LedgerConfig, LedgerError, MutationOutcome, MutationRequest, PhaseKind, Requester,
    SpawnerConfig, TemplateId,
};
use runtime::{
    AbilityEvent, AuthorityHandle, Event, Runtime, RuntimeConfig, RuntimeError, ScavengerAgent,
    ScriptedAgent, SyncStatus, Topic,
};

const ALICE: ActorId = ActorId(1);
const BOB: ActorId = ActorId(2);

fn bundled_catalog() -> Arc<ItemCatalog> {
    let data_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../ledger/content/data");
    Arc::new(
        ContentFactory::new(data_dir)
            .load_catalog()
            .expect("bundled catalog should load"),
    )
}

async fn runtime_with(config: RuntimeConfig) -> Runtime {
    Runtime::builder()
        .config(config)
        .catalog(bundled_catalog())
        .build()
        .await
        .expect("runtime should start")
}

async fn add(
    handle: &AuthorityHandle,
    container: ContainerId,
    template: &str,
    n: u32,
) -> Vec<InstanceId> {
    match handle
        .submit(Requester::Server, MutationRequest::add(container, template, n))
        .await
        .expect("add should succeed")
    {
        MutationOutcome::Added(ids) => ids,
        other => panic!("unexpected outcome {other:?}"),
    }
}

async fn count(handle: &AuthorityHandle, container: ContainerId, template: &str) -> u64 {
    let snapshot = handle.snapshot(container).await.expect("container exists");
    ContainerReplica::from_snapshot(snapshot).count_of(&TemplateId::from(template))
}

async fn assert_in_sync(handle: &AuthorityHandle, replica: &ContainerReplica) {
    let authoritative = handle
        .snapshot(replica.container())
        .await
        .expect("container exists");
    assert_eq!(replica.sequence(), authoritative.sequence);
    assert_eq!(replica.snapshot().digest(), authoritative.digest());
}

#[tokio::test]
async fn replica_follows_transfers_between_actors() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut session = runtime.replica_session();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    let bob = handle.create_actor_container(BOB).await.unwrap();
    session.track(alice).await.unwrap();
    session.track(bob).await.unwrap();

    let wood = add(&handle, alice, "Wood", 25).await;
    let moved = handle
        .submit(
            Requester::Actor(ALICE),
            MutationRequest::Transfer {
                source: alice,
                target: bob,
                instance: wood[0],
                quantity: 12,
            },
        )
        .await
        .unwrap();
    assert!(matches!(moved, MutationOutcome::Transferred { quantity: 12, .. }));

    // Add (one delta) and the transfer's remove and add.
    assert_eq!(session.sync().await.unwrap(), 3);

    let alice_view = session.replica(alice).unwrap();
    let bob_view = session.replica(bob).unwrap();
    assert_eq!(alice_view.count_of(&TemplateId::from("Wood")), 13);
    assert_eq!(bob_view.count_of(&TemplateId::from("Wood")), 12);
    assert_in_sync(&handle, alice_view).await;
    assert_in_sync(&handle, bob_view).await;
    assert_eq!(session.resyncs(), 0);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn actors_cannot_touch_foreign_containers() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    let potion = add(&handle, alice, "HealthPotion", 3).await[0];

    let err = handle
        .submit(
            Requester::Actor(BOB),
            MutationRequest::Use {
                container: alice,
                instance: potion,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::Unauthorized { .. })));
    assert_eq!(count(&handle, alice, "HealthPotion").await, 3);
    assert_eq!(runtime.metrics().rejected(), 1);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn concurrent_claims_are_mutually_exclusive() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();

    let pile = handle.create_container(None, None).await.unwrap();
    add(&handle, pile, "Stone", 4).await;
    let chest = handle.register_interactable(pile).await.unwrap();

    let mut tasks = Vec::new();
    for actor in 1..=8 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .submit(
                    Requester::Actor(ActorId(actor)),
                    MutationRequest::Claim { interactable: chest },
                )
                .await
        }));
    }

    let mut winners = 0;
    let mut losers = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(MutationOutcome::Claimed(claim)) => {
                assert_eq!(claim.interactable, chest);
                winners += 1;
            }
            Err(error) => {
                assert_eq!(error.error_code(), "LEDGER_ALREADY_CLAIMED");
                assert!(error.severity().is_recoverable());
                losers += 1;
            }
            Ok(other) => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);

    runtime.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_conserve_items() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut session = runtime.replica_session();

    let pack = handle
        .create_container(Some(ALICE), Some(ContainerPolicy::unbounded()))
        .await
        .unwrap();
    let pouch = handle
        .create_container(
            Some(ALICE),
            Some(ContainerPolicy::unbounded().with_max_items(10)),
        )
        .await
        .unwrap();
    add(&handle, pack, "Stone", 30).await;
    session.track(pack).await.unwrap();
    session.track(pouch).await.unwrap();

    // Eight moves of 3 into the pouch against four back out cannot all fit.
    let mut tasks = Vec::new();
    for round in 0..12 {
        let (source, target) = if round % 3 == 2 {
            (pouch, pack)
        } else {
            (pack, pouch)
        };
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            let snapshot = handle.snapshot(source).await?;
            let Some(item) = snapshot.instances.first() else {
                return Ok::<_, RuntimeError>(false);
            };
            let request = MutationRequest::Transfer {
                source,
                target,
                instance: item.id,
                quantity: 3,
            };
            match handle.submit(Requester::Actor(ALICE), request).await {
                Ok(_) => Ok(true),
                // A racing move may have emptied the stack this task picked.
                Err(RuntimeError::Ledger(
                    LedgerError::CapacityExceeded { .. }
                    | LedgerError::InsufficientStack { .. }
                    | LedgerError::UnknownInstance { .. },
                )) => Ok(false),
                Err(error) => Err(error),
            }
        }));
    }

    let mut moved = 0;
    let mut refused = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() {
            moved += 1;
        } else {
            refused += 1;
        }
    }
    assert_eq!(moved + refused, 12);
    assert!(refused >= 1);

    let in_pack = count(&handle, pack, "Stone").await;
    let in_pouch = count(&handle, pouch, "Stone").await;
    assert_eq!(in_pack + in_pouch, 30);
    assert!(in_pouch <= 10);

    session.sync().await.unwrap();
    assert_in_sync(&handle, session.replica(pack).unwrap()).await;
    assert_in_sync(&handle, session.replica(pouch).unwrap()).await;

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn pickup_publishes_effects_interactions_and_grants() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut effects = handle.subscribe(Topic::Effects);
    let mut interactions = handle.subscribe(Topic::Interaction);
    let mut abilities = handle.subscribe(Topic::Abilities);

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    let pile = handle.create_container(None, None).await.unwrap();
    add(&handle, pile, "Torch", 2).await;
    let torch_pile = handle.register_interactable(pile).await.unwrap();

    // World containers never hold grants.
    assert!(abilities.try_recv().is_err());

    handle
        .submit(
            Requester::Actor(ALICE),
            MutationRequest::Claim {
                interactable: torch_pile,
            },
        )
        .await
        .unwrap();
    handle
        .submit(Requester::Actor(ALICE), MutationRequest::pickup(torch_pile, alice))
        .await
        .unwrap();

    match effects.try_recv() {
        Ok(Event::Effect(EffectEvent::ItemPickedUp {
            actor,
            container,
            quantity,
            ..
        })) => {
            assert_eq!(actor, ALICE);
            assert_eq!(container, alice);
            assert_eq!(quantity, 2);
        }
        other => panic!("expected pickup effect, got {other:?}"),
    }

    let mut phases = Vec::new();
    while let Ok(Event::Interaction(event)) = interactions.try_recv() {
        phases.push(event.to);
    }
    assert_eq!(
        phases,
        vec![
            PhaseKind::Claimed,
            PhaseKind::Transferring,
            PhaseKind::Released,
            PhaseKind::Idle
        ]
    );

    match abilities.try_recv() {
        Ok(Event::Ability(AbilityEvent::Granted {
            ability, container, ..
        })) => {
            assert_eq!(ability.as_str(), "Ability.Light");
            assert_eq!(container, alice);
        }
        other => panic!("expected grant, got {other:?}"),
    }
    assert_eq!(count(&handle, alice, "Torch").await, 2);
    assert_eq!(count(&handle, pile, "Torch").await, 0);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn lagging_subscription_resyncs_from_snapshot() {
    let config = RuntimeConfig {
        event_buffer_size: 2,
        ..RuntimeConfig::default()
    };
    let runtime = runtime_with(config).await;
    let handle = runtime.handle();
    let mut session = runtime.replica_session();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    session.track(alice).await.unwrap();

    for _ in 0..6 {
        add(&handle, alice, "Stone", 1).await;
    }

    session.sync().await.unwrap();
    assert_eq!(session.resyncs(), 1);

    let replica = session.replica(alice).unwrap();
    assert_eq!(replica.count_of(&TemplateId::from("Stone")), 6);
    assert_in_sync(&handle, replica).await;
    // Tracking and the in-sync check are plain reads; only recovery counts.
    assert_eq!(runtime.metrics().resyncs_served(), 1);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn agent_context_reads_are_not_resyncs() {
    let mut runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut session = runtime.replica_session();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    let chest = handle.create_container(None, None).await.unwrap();
    add(&handle, chest, "Wood", 3).await;
    handle.register_interactable(chest).await.unwrap();
    session.track(alice).await.unwrap();

    runtime.add_agent(ALICE, alice, ScavengerAgent::new());
    for _ in 0..5 {
        runtime.step_agents().await.unwrap();
        session.sync().await.unwrap();
    }

    assert_eq!(session.resyncs(), 0);
    assert_eq!(runtime.metrics().resyncs_served(), 0);
    assert_in_sync(&handle, session.replica(alice).unwrap()).await;

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn sequence_gap_triggers_snapshot_refetch() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut session = runtime.replica_session();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    session.track(alice).await.unwrap();
    for _ in 0..3 {
        add(&handle, alice, "Wood", 1).await;
    }

    let log = handle.deltas_since(alice, 0).await.unwrap();
    assert_eq!(log.iter().map(|d| d.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);

    // Delivering #2 before #1 is a gap.
    assert_eq!(session.ingest(&log[1]).await.unwrap(), SyncStatus::Resynced);
    assert_eq!(session.replica(alice).unwrap().sequence(), 3);

    // Everything still queued on the bus is now stale.
    assert_eq!(session.sync().await.unwrap(), 0);
    assert_in_sync(&handle, session.replica(alice).unwrap()).await;

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn destroyed_container_leaves_the_session() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut session = runtime.replica_session();
    let mut abilities = handle.subscribe(Topic::Abilities);

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    add(&handle, alice, "Lantern", 1).await;
    session.track(alice).await.unwrap();

    handle.destroy_container(alice).await.unwrap();
    session.resync(alice).await.unwrap();
    assert!(session.replica(alice).is_none());

    assert!(matches!(
        abilities.try_recv(),
        Ok(Event::Ability(AbilityEvent::Granted { .. }))
    ));
    assert!(matches!(
        abilities.try_recv(),
        Ok(Event::Ability(AbilityEvent::Revoked { .. }))
    ));

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn clock_worker_expires_idle_claims() {
    let config = RuntimeConfig {
        ledger: LedgerConfig::default().with_claim_ttl(2),
        tick_interval: Some(Duration::from_millis(5)),
        ..RuntimeConfig::default()
    };
    let runtime = runtime_with(config).await;
    let handle = runtime.handle();
    let mut interactions = handle.subscribe(Topic::Interaction);

    let pile = handle.create_container(None, None).await.unwrap();
    add(&handle, pile, "Wood", 3).await;
    let stack = handle.register_interactable(pile).await.unwrap();
    handle
        .submit(
            Requester::Actor(ALICE),
            MutationRequest::Claim { interactable: stack },
        )
        .await
        .unwrap();

    let expired = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match interactions.recv().await {
                Ok(Event::Interaction(event)) if event.to == PhaseKind::Expired => return event,
                Ok(_) => continue,
                Err(error) => panic!("interaction topic failed: {error}"),
            }
        }
    })
    .await
    .expect("claim should expire");
    assert_eq!(expired.actor, Some(ALICE));

    // The interactable is free again for someone else.
    let reclaimed = handle
        .submit(
            Requester::Actor(BOB),
            MutationRequest::Claim { interactable: stack },
        )
        .await;
    assert!(matches!(reclaimed, Ok(MutationOutcome::Claimed(_))));

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn spawner_respects_stock_limit() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();

    let grove = handle.create_container(None, None).await.unwrap();
    handle
        .register_spawner(SpawnerConfig::new("Wood", 3, 1, grove).with_max_stock(7))
        .await
        .unwrap();

    let report = handle.advance(5).await.unwrap();
    assert_eq!(report.now, 5);
    assert_eq!(count(&handle, grove, "Wood").await, 7);
    assert!(report.spawn_failures.is_empty());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn scavengers_split_the_loot() {
    let mut runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    let bob = handle.create_actor_container(BOB).await.unwrap();
    for template in ["Wood", "Stone"] {
        let pile = handle.create_container(None, None).await.unwrap();
        add(&handle, pile, template, 4).await;
        handle.register_interactable(pile).await.unwrap();
    }

    runtime.add_agent(ALICE, alice, ScavengerAgent::new());
    runtime.add_agent(BOB, bob, ScavengerAgent::new());

    let claims = runtime.step_agents().await.unwrap();
    assert!(claims.iter().all(|step| step.op == Some("claim") && step.result.is_ok()));

    let pickups = runtime.step_agents().await.unwrap();
    assert!(pickups.iter().all(|step| step.op == Some("interact") && step.result.is_ok()));

    assert_eq!(count(&handle, alice, "Wood").await, 4);
    assert_eq!(count(&handle, bob, "Stone").await, 4);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn scripted_rejections_are_reported_per_step() {
    let mut runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    let potion = add(&handle, alice, "HealthPotion", 1).await[0];

    runtime.add_agent(
        ALICE,
        alice,
        ScriptedAgent::new([
            MutationRequest::Use {
                container: alice,
                instance: potion,
            },
            MutationRequest::Use {
                container: alice,
                instance: potion,
            },
        ]),
    );

    let first = runtime.step_agents().await.unwrap();
    assert!(matches!(first[0].result, Ok(Some(MutationOutcome::Removed(1)))));

    let second = runtime.step_agents().await.unwrap();
    assert!(matches!(
        second[0].result,
        Err(LedgerError::UnknownInstance { .. })
    ));

    let idle = runtime.step_agents().await.unwrap();
    assert_eq!(idle[0].op, None);

    let snapshot = runtime.metrics().snapshot();
    assert_eq!(snapshot.applied, 2);
    assert_eq!(snapshot.rejected, 1);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn events_serialize_for_presentation_layers() {
    let runtime = runtime_with(RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut deltas = handle.subscribe(Topic::Replication);

    let alice = handle.create_actor_container(ALICE).await.unwrap();
    add(&handle, alice, "Wood", 2).await;

    let event = deltas.try_recv().expect("delta should be published");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["Delta"]["sequence"], 1);
    assert_eq!(json["Delta"]["template_id"], "Wood");

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_catalog_is_a_build_error() {
    let result = Runtime::builder().build().await;
    assert!(matches!(result, Err(RuntimeError::MissingCatalog)));
}
