//! Periodic item spawners.
use crate::error::{LedgerError, Result};
use crate::ids::{ContainerId, SpawnerId, TemplateId, Tick};

/// Static parameters of a spawner.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnerConfig {
    pub template: TemplateId,
    /// Units produced per activation.
    pub quantity: u32,
    /// Ticks between activations.
    pub interval: Tick,
    pub target: ContainerId,
    /// Stop producing while the target already holds this many units.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_stock: Option<u64>,
}

impl SpawnerConfig {
    pub fn new(
        template: impl Into<TemplateId>,
        quantity: u32,
        interval: Tick,
        target: ContainerId,
    ) -> Self {
        Self {
            template: template.into(),
            quantity,
            interval,
            target,
            max_stock: None,
        }
    }

    pub fn with_max_stock(mut self, max_stock: u64) -> Self {
        self.max_stock = Some(max_stock);
        self
    }
}

/// Request to add items, produced when a spawner comes due.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnOrder {
    pub spawner: SpawnerId,
    pub template: TemplateId,
    pub quantity: u32,
    pub target: ContainerId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnDevice {
    id: SpawnerId,
    config: SpawnerConfig,
    next_due: Tick,
    spawned_total: u64,
}

impl SpawnDevice {
    /// The first activation happens one interval after `now`.
    pub fn new(id: SpawnerId, config: SpawnerConfig, now: Tick) -> Result<Self> {
        if config.quantity == 0 || config.interval == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        Ok(Self {
            id,
            next_due: now.saturating_add(config.interval),
            config,
            spawned_total: 0,
        })
    }

    pub fn id(&self) -> SpawnerId {
        self.id
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn next_due(&self) -> Tick {
        self.next_due
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// Returns an order if the device is due at `now`.
    ///
    /// `stock` is the number of units of the template the target holds. The
    /// next activation is scheduled whether or not an order is produced or
    /// later succeeds, so a rejected spawn is retried one interval later.
    pub fn poll(&mut self, now: Tick, stock: u64) -> Option<SpawnOrder> {
        if now < self.next_due {
            return None;
        }
        self.next_due = now.saturating_add(self.config.interval);

        let quantity = match self.config.max_stock {
            Some(max) if stock >= max => return None,
            Some(max) => {
                let room = u32::try_from(max - stock).unwrap_or(u32::MAX);
                self.config.quantity.min(room)
            }
            None => self.config.quantity,
        };
        Some(SpawnOrder {
            spawner: self.id,
            template: self.config.template.clone(),
            quantity,
            target: self.config.target,
        })
    }

    pub fn record_spawned(&mut self, quantity: u32) {
        self.spawned_total += u64::from(quantity);
    }
}
