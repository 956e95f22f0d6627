//! Representation-switch policy.
//!
//! The engine samples at a fixed cadence and evaluates an ordered rule list
//! against a [`Summary`]; the first rule that fires names the target. It
//! never reads collector state directly.

use std::fmt;

use crate::config::DecisionConfig;
use crate::stats::Summary;
use crate::StructureKind;

/// Why a switch was (or was not) made.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwitchReason {
    /// Sorted inserts are degrading an unbalanced tree.
    DegradingTree { order_score: f64, height: usize },
    /// Sorted, insert-heavy traffic on the hash table.
    SortedInserts { order_score: f64 },
    /// Mostly searches over unordered keys.
    SearchHeavy { search_ratio: f64 },
    /// Random keys with a meaningful share of searches.
    RandomAccess { order_score: f64 },
    /// Unbalanced tree past the absolute height limit.
    TreeTooTall { height: usize },
    /// Requested through `force_switch`.
    Manual,
    /// No rule fired.
    NoSwitch,
}

impl fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SwitchReason::DegradingTree {
                order_score,
                height,
            } => write!(
                f,
                "high order score ({order_score:.2}) + tree height {height}"
            ),
            SwitchReason::SortedInserts { order_score } => {
                write!(f, "sorted inserts detected (order: {order_score:.2})")
            }
            SwitchReason::SearchHeavy { search_ratio } => {
                write!(f, "search-heavy ({search_ratio:.2}) with random keys")
            }
            SwitchReason::RandomAccess { order_score } => {
                write!(f, "random access pattern (order: {order_score:.2})")
            }
            SwitchReason::TreeTooTall { height } => write!(f, "BST height too high ({height})"),
            SwitchReason::Manual => f.write_str("manual switch"),
            SwitchReason::NoSwitch => f.write_str("no switch needed"),
        }
    }
}

/// Outcome of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub switch: bool,
    pub target: StructureKind,
    pub reason: SwitchReason,
}

impl Verdict {
    fn switch_to(target: StructureKind, reason: SwitchReason) -> Self {
        Self {
            switch: true,
            target,
            reason,
        }
    }

    fn stay(current: StructureKind) -> Self {
        Self {
            switch: false,
            target: current,
            reason: SwitchReason::NoSwitch,
        }
    }
}

/// One entry of the switch audit log.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchRecord {
    pub from: StructureKind,
    pub to: StructureKind,
    pub reason: SwitchReason,
    pub at_operation: u64,
}

/// Decides when to look at the statistics and which structure they call for.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: DecisionConfig,
    last_switch_at: Option<u64>,
    history: Vec<SwitchRecord>,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            last_switch_at: None,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Operation count of the most recent switch.
    pub fn last_switch_at(&self) -> Option<u64> {
        self.last_switch_at
    }

    /// Whether a decision should be taken at this operation count.
    ///
    /// Never before `min_ops_before_switch`, never within `switch_cooldown`
    /// operations of the last switch, and otherwise only on multiples of
    /// `check_interval`.
    pub fn should_check(&self, total_ops: u64) -> bool {
        if total_ops < self.config.min_ops_before_switch {
            return false;
        }
        if let Some(at) = self.last_switch_at {
            if total_ops.saturating_sub(at) < self.config.switch_cooldown {
                return false;
            }
        }
        total_ops % self.config.check_interval == 0
    }

    /// Evaluates the rules in priority order. `height` is the current tree
    /// height and is ignored for the hash table.
    pub fn decide(
        &self,
        current: StructureKind,
        summary: &Summary,
        height: Option<usize>,
    ) -> Verdict {
        let c = &self.config;
        let order_score = summary.order_score;
        let search_ratio = summary.search_ratio;

        // 1. Sorted workload. Falls through when neither branch applies.
        if order_score > c.sorted_threshold {
            match (current, height) {
                (StructureKind::Bst, Some(height)) if height > c.sorted_height_limit => {
                    return Verdict::switch_to(
                        StructureKind::Avl,
                        SwitchReason::DegradingTree {
                            order_score,
                            height,
                        },
                    );
                }
                (StructureKind::HashMap, _) if summary.insert_ratio > c.insert_heavy_threshold => {
                    return Verdict::switch_to(
                        StructureKind::Avl,
                        SwitchReason::SortedInserts { order_score },
                    );
                }
                _ => {}
            }
        }

        // 2. Search heavy over random keys.
        if search_ratio > c.search_heavy_threshold
            && order_score < c.random_order_threshold
            && current != StructureKind::HashMap
        {
            return Verdict::switch_to(
                StructureKind::HashMap,
                SwitchReason::SearchHeavy { search_ratio },
            );
        }

        // 3. Random access with a looser search share.
        if order_score < c.random_access_order_threshold
            && search_ratio > c.random_access_search_threshold
            && current != StructureKind::HashMap
        {
            return Verdict::switch_to(
                StructureKind::HashMap,
                SwitchReason::RandomAccess { order_score },
            );
        }

        // 4. Unbalanced tree too tall regardless of order.
        if let (StructureKind::Bst, Some(height)) = (current, height) {
            if height > c.max_bst_height {
                return Verdict::switch_to(
                    StructureKind::Avl,
                    SwitchReason::TreeTooTall { height },
                );
            }
        }

        Verdict::stay(current)
    }

    /// Starts the cooldown and appends to the history.
    pub fn record_switch(
        &mut self,
        from: StructureKind,
        to: StructureKind,
        reason: SwitchReason,
        total_ops: u64,
    ) {
        self.last_switch_at = Some(total_ops);
        self.history.push(SwitchRecord {
            from,
            to,
            reason,
            at_operation: total_ops,
        });
    }

    /// Every switch so far, oldest first.
    pub fn history(&self) -> &[SwitchRecord] {
        &self.history
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DecisionConfig::default())
    }
}
