//! Configuration for the adaptive map and its decision policy.

use crate::error::{Error, Result};
use crate::StructureKind;

/// Thresholds and cadence for the decision engine.
///
/// By default a check runs every 50 operations once 100 have been seen,
/// and no check runs within 200 operations of a switch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecisionConfig {
    /// Checks only run when the operation count is a multiple of this.
    pub check_interval: u64,
    /// No check runs before this many operations.
    pub min_ops_before_switch: u64,
    /// Operations that must elapse after a switch before the next check.
    pub switch_cooldown: u64,
    /// Order score above which the workload counts as sorted.
    pub sorted_threshold: f64,
    /// Search ratio above which the workload counts as search heavy.
    pub search_heavy_threshold: f64,
    /// Order score below which a search-heavy workload counts as random.
    pub random_order_threshold: f64,
    /// Order score bound for the random-access rule.
    pub random_access_order_threshold: f64,
    /// Search ratio bound for the random-access rule.
    pub random_access_search_threshold: f64,
    /// Insert ratio above which sorted inserts move a hash table to AVL.
    pub insert_heavy_threshold: f64,
    /// BST height above which a sorted workload moves to AVL.
    pub sorted_height_limit: usize,
    /// BST height above which the tree moves to AVL regardless of order.
    pub max_bst_height: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            check_interval: 50,
            min_ops_before_switch: 100,
            switch_cooldown: 200,
            sorted_threshold: 0.7,
            search_heavy_threshold: 0.6,
            random_order_threshold: 0.5,
            random_access_order_threshold: 0.4,
            random_access_search_threshold: 0.4,
            insert_heavy_threshold: 0.5,
            sorted_height_limit: 15,
            max_bst_height: 20,
        }
    }
}

/// Configuration for [`AdaptiveMap`](crate::AdaptiveMap).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Structure that is active when the map is created.
    pub initial_structure: StructureKind,
    /// Capacity of the recent-operation window used for ratios.
    pub window_size: usize,
    /// Number of most recent inserted keys scanned for the order score.
    pub order_window: usize,
    /// Lifetime inserts required before the order score leaves 0.5.
    pub min_keys_for_order: usize,
    /// Number of most recent durations averaged for latency.
    pub latency_window: usize,
    /// Starting bucket count of the hash structure. Must be a power of two.
    pub initial_hash_capacity: usize,
    /// Decision policy.
    pub decision: DecisionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_structure: StructureKind::Bst,
            window_size: 100,
            order_window: 50,
            min_keys_for_order: 10,
            latency_window: 100,
            initial_hash_capacity: 16,
            decision: DecisionConfig::default(),
        }
    }
}

impl Config {
    /// Start from the defaults with a different initial structure.
    pub fn starting_with(initial_structure: StructureKind) -> Self {
        Self {
            initial_structure,
            ..Self::default()
        }
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::invalid_config("window_size", "must be non-zero"));
        }
        if self.order_window < 2 {
            return Err(Error::invalid_config(
                "order_window",
                "must cover at least one adjacent pair",
            ));
        }
        if self.min_keys_for_order < 2 {
            return Err(Error::invalid_config(
                "min_keys_for_order",
                "must be at least 2",
            ));
        }
        if self.latency_window == 0 {
            return Err(Error::invalid_config("latency_window", "must be non-zero"));
        }
        if !self.initial_hash_capacity.is_power_of_two() {
            return Err(Error::invalid_config(
                "initial_hash_capacity",
                format!("{} is not a power of two", self.initial_hash_capacity),
            ));
        }

        let d = &self.decision;
        if d.check_interval == 0 {
            return Err(Error::invalid_config("check_interval", "must be non-zero"));
        }
        let ratios = [
            ("sorted_threshold", d.sorted_threshold),
            ("search_heavy_threshold", d.search_heavy_threshold),
            ("random_order_threshold", d.random_order_threshold),
            ("random_access_order_threshold", d.random_access_order_threshold),
            ("random_access_search_threshold", d.random_access_search_threshold),
            ("insert_heavy_threshold", d.insert_heavy_threshold),
        ];
        for (field, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid_config(
                    field,
                    format!("{value} is outside [0, 1]"),
                ));
            }
        }
        Ok(())
    }
}
