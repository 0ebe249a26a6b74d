//! Static world configuration and validation.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{PerTier, Tier};

/// Errors that can occur when constructing world state.
#[derive(Debug, Error, PartialEq)]
pub enum WorldStateError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A strategy name that no registered factory answers to.
    #[error("unknown strategy `{name}` (registered: {known})")]
    UnknownStrategy { name: String, known: String },
}

/// Static configuration for a WasteBots world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WastebotsConfig {
    /// Number of grid columns.
    pub width: u32,
    /// Number of grid rows.
    pub height: u32,
    /// Fraction of the width given to each zone; must sum to 1.
    pub zone_proportions: PerTier<f32>,
    /// Robots spawned per tier.
    pub robots: PerTier<u32>,
    /// Waste items scattered per tier at initialisation.
    pub waste: PerTier<u32>,
    /// Strategy used by every tier without an override.
    pub strategy: String,
    /// Per-tier strategy overrides.
    pub strategy_overrides: BTreeMap<Tier, String>,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Radioactivity of every cell in each zone.
    pub radioactivity: PerTier<f32>,
    /// Highest radioactivity each robot tier may enter.
    pub tolerance: PerTier<f32>,
    /// Carry capacity per robot tier.
    pub capacity: PerTier<usize>,
    /// Chance per tick that a seeking robot holding one item drops it.
    pub litter_probability: f64,
    /// Ticks during which a robot ignores the item it last dropped.
    pub drop_cooldown_ticks: u32,
    /// Number of recent actions retained in each robot's knowledge.
    pub action_history_len: usize,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for WastebotsConfig {
    fn default() -> Self {
        Self {
            width: 21,
            height: 10,
            zone_proportions: PerTier::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
            robots: PerTier::new(3, 3, 3),
            waste: PerTier::new(10, 10, 5),
            strategy: "random".to_string(),
            strategy_overrides: BTreeMap::new(),
            rng_seed: None,
            radioactivity: PerTier::new(0.1, 0.5, 0.9),
            tolerance: PerTier::new(1.0 / 3.0, 2.0 / 3.0, 1.0),
            capacity: PerTier::new(2, 2, 1),
            litter_probability: 0.05,
            drop_cooldown_ticks: 10,
            action_history_len: 10,
            history_capacity: 512,
        }
    }
}

impl WastebotsConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), WorldStateError> {
        self.zone_widths().map(|_| ())
    }

    /// Validates the configuration, returning the zone widths left to right.
    pub fn zone_widths(&self) -> Result<PerTier<u32>, WorldStateError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldStateError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if self
            .zone_proportions
            .iter()
            .any(|(_, p)| !p.is_finite() || *p < 0.0)
        {
            return Err(WorldStateError::InvalidConfig(
                "zone proportions must be finite and non-negative",
            ));
        }
        let sum: f32 = self.zone_proportions.iter().map(|(_, p)| *p).sum();
        if (sum - 1.0).abs() > 1e-3 {
            return Err(WorldStateError::InvalidConfig(
                "zone proportions must sum to 1",
            ));
        }
        for tier in Tier::ALL {
            if self.radioactivity[tier] > self.tolerance[tier] {
                return Err(WorldStateError::InvalidConfig(
                    "zone radioactivity cannot exceed the tolerance of its own tier",
                ));
            }
            if self.capacity[tier] == 0 {
                return Err(WorldStateError::InvalidConfig(
                    "carry capacity must be non-zero",
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.litter_probability) {
            return Err(WorldStateError::InvalidConfig(
                "litter_probability must be between 0.0 and 1.0",
            ));
        }
        if self.history_capacity == 0 || self.action_history_len == 0 {
            return Err(WorldStateError::InvalidConfig(
                "history_capacity and action_history_len must be non-zero",
            ));
        }

        let width = self.width as f32;
        let red = ((width * self.zone_proportions.red).floor() as u32).min(self.width);
        let yellow =
            ((width * self.zone_proportions.yellow).floor() as u32).min(self.width - red);
        let green = self.width - red - yellow;
        Ok(PerTier::new(green, yellow, red))
    }

    /// Strategy name assigned to robots of `tier`.
    #[must_use]
    pub fn strategy_for(&self, tier: Tier) -> &str {
        self.strategy_overrides
            .get(&tier)
            .map_or(self.strategy.as_str(), String::as_str)
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
