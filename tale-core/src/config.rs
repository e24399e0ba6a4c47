//! Kernel configuration.

use crate::character::MAX_ACTIVE_COMPANIONS;
use crate::combat::CombatRules;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest currency delta a single patch may apply.
pub const CURRENCY_DELTA_MIN: i64 = -200_000;
/// Largest currency delta a single patch may apply.
pub const CURRENCY_DELTA_MAX: i64 = 500_000;
/// History entries kept in memory and on disk.
pub const HISTORY_LIMIT: usize = 50;

/// Tunables for turn resolution.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// How long to wait for the narrator before falling back.
    pub narrator_timeout_ms: u64,

    /// Retaliation probabilities.
    pub combat: CombatRules,

    pub currency_delta_min: i64,
    pub currency_delta_max: i64,

    /// Largest hit point change a single patch may apply, in either direction.
    pub max_hp_delta: i32,

    /// Turns given to narrator status effects with no usable duration.
    pub default_status_duration: u32,

    pub history_limit: usize,

    pub max_active_companions: usize,

    /// Narration shown when the narrator fails or times out.
    pub fallback_narration: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            narrator_timeout_ms: 30_000,
            combat: CombatRules::default(),
            currency_delta_min: CURRENCY_DELTA_MIN,
            currency_delta_max: CURRENCY_DELTA_MAX,
            max_hp_delta: 100,
            default_status_duration: 3,
            history_limit: HISTORY_LIMIT,
            max_active_companions: MAX_ACTIVE_COMPANIONS,
            fallback_narration: "The world holds its breath for a moment. \
                (The narration could not be generated; your action still took effect.)"
                .to_string(),
        }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn narrator_timeout(&self) -> Duration {
        Duration::from_millis(self.narrator_timeout_ms)
    }

    /// Set the narrator timeout.
    pub fn with_narrator_timeout(mut self, timeout: Duration) -> Self {
        self.narrator_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Set the retaliation probabilities.
    pub fn with_combat_rules(mut self, rules: CombatRules) -> Self {
        self.combat = rules;
        self
    }

    /// Set the bounds applied to each currency delta.
    pub fn with_currency_bounds(mut self, min: i64, max: i64) -> Self {
        self.currency_delta_min = min.min(max);
        self.currency_delta_max = max.max(min);
        self
    }

    pub fn with_max_hp_delta(mut self, max: i32) -> Self {
        self.max_hp_delta = max.max(0);
        self
    }

    pub fn with_default_status_duration(mut self, turns: u32) -> Self {
        self.default_status_duration = turns.max(1);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_fallback_narration(mut self, text: impl Into<String>) -> Self {
        self.fallback_narration = text.into();
        self
    }
}
