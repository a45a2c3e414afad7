//! The single writable copy of every container.
//!
//! [`ReplicationAuthority`] validates [`MutationRequest`]s, applies them to
//! the containers it owns, assigns per-container sequence numbers and collects
//! the resulting deltas, effects and interaction events in an [`Outbox`].
//! It is synchronous and single-threaded: callers serialize access (the
//! runtime wraps it in one worker task), which makes every request atomic with
//! respect to every other, including transfers that touch two containers.
mod effects;
mod request;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

pub use effects::{EffectEvent, Outbox, SpawnFailure, TickReport};
pub use request::{MutationOutcome, MutationRequest, Requester};

use crate::catalog::ItemCatalog;
use crate::config::LedgerConfig;
use crate::delta::{DeltaLog, DeltaOp, ReplicationDelta};
use crate::error::{LedgerError, Result};
use crate::ids::{
    ActorId, ContainerId, InstanceAllocator, InstanceId, InteractableId, SpawnerId, TemplateId,
    Tick,
};
use crate::interaction::InteractionSystem;
use crate::inventory::{self, ContainerChange, ContainerPolicy, InventoryContainer, TransferOutcome};
use crate::observer::{ContainerMutation, MutationObserver, ObserverRegistry};
use crate::replica::ContainerSnapshot;
use crate::spawn::{SpawnDevice, SpawnerConfig};
use crate::tag::Tag;

#[derive(Debug)]
pub struct ReplicationAuthority {
    catalog: Arc<ItemCatalog>,
    config: LedgerConfig,
    clock: Tick,
    allocator: InstanceAllocator,
    next_container: u32,
    next_interactable: u32,
    next_spawner: u32,
    containers: BTreeMap<ContainerId, InventoryContainer>,
    logs: BTreeMap<ContainerId, DeltaLog>,
    /// Drop-created containers, destroyed once emptied.
    pickups: BTreeSet<ContainerId>,
    interactions: InteractionSystem,
    spawners: BTreeMap<SpawnerId, SpawnDevice>,
    observers: ObserverRegistry,
    outbox: Outbox,
}

impl ReplicationAuthority {
    /// The catalog must already be sealed.
    pub fn new(catalog: Arc<ItemCatalog>, config: LedgerConfig) -> Result<Self> {
        if !catalog.is_sealed() {
            return Err(LedgerError::CatalogNotSealed);
        }
        Ok(Self {
            catalog,
            config,
            clock: 0,
            allocator: InstanceAllocator::new(),
            next_container: 1,
            next_interactable: 1,
            next_spawner: 1,
            containers: BTreeMap::new(),
            logs: BTreeMap::new(),
            pickups: BTreeSet::new(),
            interactions: InteractionSystem::new(),
            spawners: BTreeMap::new(),
            observers: ObserverRegistry::new(),
            outbox: Outbox::default(),
        })
    }

    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn clock(&self) -> Tick {
        self.clock
    }

    pub fn register_observer(&mut self, observer: Box<dyn MutationObserver>) {
        self.observers.register(observer);
    }

    // ===== world setup =====

    pub fn create_container(
        &mut self,
        owner: Option<ActorId>,
        policy: ContainerPolicy,
    ) -> ContainerId {
        let id = ContainerId(self.next_container);
        self.next_container += 1;
        self.containers
            .insert(id, InventoryContainer::new(id, owner, policy));
        self.logs.insert(id, DeltaLog::new(id));
        id
    }

    pub fn create_actor_container(&mut self, actor: ActorId) -> ContainerId {
        let policy = self.config.default_policy.clone();
        self.create_container(Some(actor), policy)
    }

    /// Destroys a container and everything attached to it: its grants (via
    /// observers), the interactables it backs and the spawners feeding it.
    pub fn destroy_container(&mut self, id: ContainerId) -> Result<Vec<InteractableId>> {
        self.containers
            .remove(&id)
            .ok_or(LedgerError::UnknownContainer(id))?;
        self.logs.remove(&id);
        self.pickups.remove(&id);
        self.spawners
            .retain(|_, device| device.config().target != id);
        self.observers.notify_destroyed(id);
        Ok(self.interactions.remove_for_container(id))
    }

    pub fn register_interactable(&mut self, source: ContainerId) -> Result<InteractableId> {
        self.container(source)?;
        let id = InteractableId(self.next_interactable);
        self.next_interactable += 1;
        self.interactions.register(id, source);
        Ok(id)
    }

    pub fn register_spawner(&mut self, config: SpawnerConfig) -> Result<SpawnerId> {
        self.catalog.lookup(&config.template)?;
        self.container(config.target)?;
        let id = SpawnerId(self.next_spawner);
        let device = SpawnDevice::new(id, config, self.clock)?;
        self.next_spawner += 1;
        self.spawners.insert(id, device);
        Ok(id)
    }

    pub fn remove_spawner(&mut self, id: SpawnerId) -> Result<SpawnDevice> {
        self.spawners
            .remove(&id)
            .ok_or(LedgerError::UnknownSpawner(id))
    }

    // ===== mutation path =====

    /// Validates and applies one request.
    ///
    /// On error no container has changed. An `Interact` whose transfer fails
    /// still releases the claim, and the resulting interaction events are in
    /// the outbox.
    pub fn submit(
        &mut self,
        requester: Requester,
        request: MutationRequest,
    ) -> Result<MutationOutcome> {
        self.authorize(requester, &request)?;
        match request {
            MutationRequest::Add {
                container,
                template,
                quantity,
                instance_tags,
            } => {
                let change = self.add_items(container, &template, quantity, &instance_tags)?;
                Ok(MutationOutcome::Added(slot_instances(&change)))
            }
            MutationRequest::Remove {
                container,
                instance,
                quantity,
            } => {
                let target = lookup_mut(&mut self.containers, container)?;
                let change = target.remove(&self.catalog, instance, quantity)?;
                self.record(container, DeltaOp::Remove, &change, None);
                Ok(MutationOutcome::Removed(quantity))
            }
            MutationRequest::Consume {
                container,
                template,
                quantity,
            } => {
                let target = lookup_mut(&mut self.containers, container)?;
                let change = target.consume(&self.catalog, &template, quantity)?;
                self.record(container, DeltaOp::Remove, &change, None);
                Ok(MutationOutcome::Removed(quantity))
            }
            MutationRequest::Use {
                container,
                instance,
            } => {
                let target = lookup_mut(&mut self.containers, container)?;
                let change = target.remove(&self.catalog, instance, 1)?;
                self.record(container, DeltaOp::Remove, &change, None);
                self.outbox.effects.push(EffectEvent::ItemUsed {
                    actor: requester.actor(),
                    container,
                    template: change.template_id,
                });
                Ok(MutationOutcome::Removed(1))
            }
            MutationRequest::Transfer {
                source,
                target,
                instance,
                quantity,
            } => {
                let outcome = self.transfer_between(source, target, instance, quantity)?;
                Ok(MutationOutcome::Transferred {
                    quantity,
                    instances: slot_instances(&outcome.added),
                })
            }
            MutationRequest::Claim { interactable } => {
                let actor = require_actor(requester)?;
                let (claim, events) = self.interactions.claim(
                    interactable,
                    actor,
                    self.clock,
                    self.config.claim_ttl,
                )?;
                self.outbox.interactions.extend(events);
                Ok(MutationOutcome::Claimed(claim))
            }
            MutationRequest::Release { interactable } => {
                let actor = require_actor(requester)?;
                let events = self.interactions.release(interactable, actor)?;
                self.outbox.interactions.extend(events);
                Ok(MutationOutcome::Released)
            }
            MutationRequest::Interact {
                interactable,
                target,
                instance,
                quantity,
            } => {
                let actor = require_actor(requester)?;
                self.interact(actor, interactable, target, instance, quantity)
            }
            MutationRequest::Drop {
                container,
                instance,
                quantity,
            } => self.drop_items(requester.actor(), container, instance, quantity),
        }
    }

    fn authorize(&self, requester: Requester, request: &MutationRequest) -> Result<()> {
        let Requester::Actor(actor) = requester else {
            return match request {
                MutationRequest::Claim { .. }
                | MutationRequest::Release { .. }
                | MutationRequest::Interact { .. } => Err(LedgerError::Unauthorized {
                    reason: "interactions require an actor",
                }),
                _ => Ok(()),
            };
        };
        match request {
            MutationRequest::Add { .. } => Err(LedgerError::Unauthorized {
                reason: "only the server may create items",
            }),
            MutationRequest::Remove { container, .. }
            | MutationRequest::Consume { container, .. }
            | MutationRequest::Use { container, .. }
            | MutationRequest::Drop { container, .. } => self.require_owner(*container, actor),
            MutationRequest::Transfer { source, target, .. } => {
                self.require_owner(*source, actor)?;
                self.require_owner(*target, actor)
            }
            MutationRequest::Interact { target, .. } => self.require_owner(*target, actor),
            MutationRequest::Claim { .. } | MutationRequest::Release { .. } => Ok(()),
        }
    }

    fn require_owner(&self, container: ContainerId, actor: ActorId) -> Result<()> {
        if self.container(container)?.owner() == Some(actor) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                reason: "container is not owned by the requesting actor",
            })
        }
    }

    fn add_items(
        &mut self,
        container: ContainerId,
        template: &TemplateId,
        quantity: u32,
        instance_tags: &BTreeSet<Tag>,
    ) -> Result<ContainerChange> {
        let target = lookup_mut(&mut self.containers, container)?;
        let change = target.add(
            &self.catalog,
            &mut self.allocator,
            template,
            quantity,
            instance_tags,
        )?;
        self.record(container, DeltaOp::Add, &change, None);
        Ok(change)
    }

    /// The only cross-container path. Both containers are mutated inside this
    /// call; nothing else can run in between.
    fn transfer_between(
        &mut self,
        source: ContainerId,
        target: ContainerId,
        instance: InstanceId,
        quantity: u32,
    ) -> Result<TransferOutcome> {
        if source == target {
            return Err(LedgerError::SelfTransfer(source));
        }
        self.container(source)?;
        let mut receiving = self
            .containers
            .remove(&target)
            .ok_or(LedgerError::UnknownContainer(target))?;
        let result = match self.containers.get_mut(&source) {
            Some(giving) => inventory::transfer(
                giving,
                &mut receiving,
                &self.catalog,
                &mut self.allocator,
                instance,
                quantity,
            ),
            None => Err(LedgerError::UnknownContainer(source)),
        };
        self.containers.insert(target, receiving);

        let outcome = result?;
        self.record(source, DeltaOp::Transfer, &outcome.removed, Some(target));
        self.record(target, DeltaOp::Transfer, &outcome.added, Some(source));
        Ok(outcome)
    }

    fn interact(
        &mut self,
        actor: ActorId,
        interactable: InteractableId,
        target: ContainerId,
        instance: Option<InstanceId>,
        quantity: Option<u32>,
    ) -> Result<MutationOutcome> {
        let (source, event) = self
            .interactions
            .begin_transfer(interactable, actor, self.clock)?;
        self.outbox.interactions.push(event);

        let result = self
            .resolve_pickup(source, instance, quantity)
            .and_then(|(instance, quantity)| {
                self.transfer_between(source, target, instance, quantity)
            });

        // Success or failure, the claim is released.
        let events = self.interactions.finish_transfer(interactable)?;
        self.outbox.interactions.extend(events);
        let outcome = result?;

        self.outbox.effects.push(EffectEvent::ItemPickedUp {
            actor,
            interactable,
            container: target,
            template: outcome.added.template_id.clone(),
            quantity: outcome.added.quantity,
        });
        let emptied = self.containers.get(&source).is_some_and(InventoryContainer::is_empty);
        if emptied && self.pickups.contains(&source) {
            self.destroy_container(source)?;
        }
        Ok(MutationOutcome::Transferred {
            quantity: outcome.added.quantity,
            instances: slot_instances(&outcome.added),
        })
    }

    fn resolve_pickup(
        &self,
        source: ContainerId,
        instance: Option<InstanceId>,
        quantity: Option<u32>,
    ) -> Result<(InstanceId, u32)> {
        let container = self.container(source)?;
        let item = match instance {
            Some(id) => container.instance(id)?,
            None => container
                .instances()
                .first()
                .ok_or(LedgerError::InsufficientStack {
                    requested: u64::from(quantity.unwrap_or(1)),
                    available: 0,
                })?,
        };
        Ok((item.id, quantity.unwrap_or(item.stack_count)))
    }

    fn drop_items(
        &mut self,
        actor: Option<ActorId>,
        container: ContainerId,
        instance: InstanceId,
        quantity: u32,
    ) -> Result<MutationOutcome> {
        let template = self.container(container)?.instance(instance)?.template_id.clone();
        let policy = self.config.world_policy.clone();
        let pickup = self.create_container(None, policy);

        if let Err(error) = self.transfer_between(container, pickup, instance, quantity) {
            self.containers.remove(&pickup);
            self.logs.remove(&pickup);
            return Err(error);
        }
        let interactable = self.register_interactable(pickup)?;
        self.pickups.insert(pickup);
        self.outbox.effects.push(EffectEvent::ItemDropped {
            actor,
            interactable,
            container: pickup,
            template,
            quantity,
        });
        Ok(MutationOutcome::Dropped {
            container: pickup,
            interactable,
        })
    }

    fn record(
        &mut self,
        container: ContainerId,
        op: DeltaOp,
        change: &ContainerChange,
        peer: Option<ContainerId>,
    ) {
        let owner = self
            .containers
            .get(&container)
            .and_then(InventoryContainer::owner);
        let delta = self
            .logs
            .entry(container)
            .or_insert_with(|| DeltaLog::new(container))
            .append(op, change, peer)
            .clone();
        self.observers.notify(
            ContainerMutation {
                container,
                owner,
                change,
            },
            &self.catalog,
        );
        self.outbox.deltas.push(delta);
    }

    // ===== clock =====

    /// Advances the clock tick by tick, expiring claims and running spawners.
    pub fn advance(&mut self, ticks: u64) -> TickReport {
        let mut report = TickReport::default();
        for _ in 0..ticks {
            self.clock += 1;
            let (expired, events) = self.interactions.expire(self.clock);
            report.expired.extend(expired);
            self.outbox.interactions.extend(events);
            self.run_spawners(&mut report);
        }
        report.now = self.clock;
        report
    }

    fn run_spawners(&mut self, report: &mut TickReport) {
        let ids: Vec<SpawnerId> = self.spawners.keys().copied().collect();
        for id in ids {
            let Some(device) = self.spawners.get_mut(&id) else {
                continue;
            };
            let config = device.config();
            let stock = self
                .containers
                .get(&config.target)
                .map_or(0, |container| container.count_of(&config.template));
            let Some(order) = device.poll(self.clock, stock) else {
                continue;
            };

            match self.add_items(order.target, &order.template, order.quantity, &BTreeSet::new()) {
                Ok(_) => {
                    if let Some(device) = self.spawners.get_mut(&id) {
                        device.record_spawned(order.quantity);
                    }
                    report.spawned.push((id, order.target, order.quantity));
                }
                Err(error) => report.spawn_failures.push(SpawnFailure {
                    spawner: id,
                    target: order.target,
                    error,
                }),
            }
        }
    }

    // ===== reads =====

    /// Takes everything produced since the previous drain.
    pub fn drain(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }

    pub fn container(&self, id: ContainerId) -> Result<&InventoryContainer> {
        self.containers
            .get(&id)
            .ok_or(LedgerError::UnknownContainer(id))
    }

    pub fn container_ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.containers.keys().copied()
    }

    pub fn interactions(&self) -> &InteractionSystem {
        &self.interactions
    }

    pub fn spawner(&self, id: SpawnerId) -> Result<&SpawnDevice> {
        self.spawners.get(&id).ok_or(LedgerError::UnknownSpawner(id))
    }

    pub fn log(&self, id: ContainerId) -> Result<&DeltaLog> {
        self.logs.get(&id).ok_or(LedgerError::UnknownContainer(id))
    }

    pub fn deltas_since(&self, id: ContainerId, after: u64) -> Result<Vec<ReplicationDelta>> {
        Ok(self.log(id)?.since(after).to_vec())
    }

    pub fn snapshot(&self, id: ContainerId) -> Result<ContainerSnapshot> {
        let container = self.container(id)?;
        Ok(ContainerSnapshot {
            container: id,
            owner: container.owner(),
            sequence: self.log(id)?.last_sequence(),
            instances: container.instances().to_vec(),
            stacks: container.ledger().stacks().collect(),
        })
    }

    /// Human-readable dump of a container for debug overlays.
    pub fn debug_view(&self, id: ContainerId) -> Result<String> {
        let snapshot = self.snapshot(id)?;
        let mut out = String::new();
        let owner = snapshot
            .owner
            .map_or_else(|| "world".to_owned(), |actor| actor.to_string());
        let _ = writeln!(out, "{id} owner={owner} seq={}", snapshot.sequence);
        for item in &snapshot.instances {
            let _ = write!(out, "  [{}] {} x{}", item.id, item.template_id, item.stack_count);
            for tag in &item.instance_tags {
                let _ = write!(out, " +{tag}");
            }
            out.push('\n');
        }
        out.push_str(&self.container(id)?.ledger().debug_string());
        Ok(out)
    }
}

fn lookup_mut(
    containers: &mut BTreeMap<ContainerId, InventoryContainer>,
    id: ContainerId,
) -> Result<&mut InventoryContainer> {
    containers
        .get_mut(&id)
        .ok_or(LedgerError::UnknownContainer(id))
}

fn require_actor(requester: Requester) -> Result<ActorId> {
    requester.actor().ok_or(LedgerError::Unauthorized {
        reason: "interactions require an actor",
    })
}

fn slot_instances(change: &ContainerChange) -> Vec<InstanceId> {
    change.slots.iter().map(|slot| slot.instance).collect()
}
