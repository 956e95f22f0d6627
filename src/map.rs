//! The self-tuning map.
//!
//! `AdaptiveMap` owns one instance of every structure for its whole life and
//! routes each call to whichever is active. Calls are timed and recorded;
//! on sampled operations the decision engine may order a migration, which
//! drains the active structure into the (cleared) target before the active
//! tag moves. Only the active structure ever holds entries.

use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::avl::Avl;
use crate::bst::Bst;
use crate::chained::ChainedHashMap;
use crate::config::Config;
use crate::decision::{DecisionEngine, SwitchReason, SwitchRecord};
use crate::error::Result;
use crate::stats::{StatsCollector, Summary};
use crate::StructureKind;

/// Emitted after every completed migration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MigrationEvent {
    pub from: StructureKind,
    pub to: StructureKind,
    pub reason: SwitchReason,
    /// Total operation count when the migration ran.
    pub at_operation: u64,
    /// Entries moved.
    pub items: usize,
    /// Wall-clock time of the extract and reload.
    pub duration: Duration,
}

/// Callback invoked with every [`MigrationEvent`].
pub type MigrationHook = Box<dyn FnMut(&MigrationEvent) + Send>;

/// Structure-specific metrics of the active representation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructureStats {
    Bst {
        height: usize,
    },
    Avl {
        height: usize,
        rotation_count: u64,
    },
    HashMap {
        load_factor: f64,
        collision_rate: f64,
        capacity: usize,
    },
}

/// Snapshot returned by [`AdaptiveMap::stats`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapStats {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub summary: Summary,
    pub current_structure: StructureKind,
    pub len: usize,
    pub migration_count: u64,
    pub total_migration_time: Duration,
    pub switch_history: Vec<SwitchRecord>,
    pub structure: StructureStats,
}

impl MapStats {
    /// Height of the active tree, if a tree is active.
    pub fn tree_height(&self) -> Option<usize> {
        match self.structure {
            StructureStats::Bst { height } | StructureStats::Avl { height, .. } => Some(height),
            StructureStats::HashMap { .. } => None,
        }
    }
}

/// Key-value map that migrates between a BST, an AVL tree and a hash table
/// according to the observed workload.
pub struct AdaptiveMap<K, V> {
    bst: Bst<K, V>,
    avl: Avl<K, V>,
    hash: ChainedHashMap<K, V>,
    active: StructureKind,

    stats: StatsCollector<K>,
    engine: DecisionEngine,

    migration_count: u64,
    total_migration_time: Duration,
    hook: Option<MigrationHook>,

    config: Config,
}

impl<K, V> AdaptiveMap<K, V>
where
    K: Ord + Hash + Clone,
{
    /// Create a map with the default configuration, starting on the BST.
    pub fn new() -> Self {
        let config = Config::default();
        Self::build(config)
    }

    /// Create a map with the given configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        Self {
            bst: Bst::new(),
            avl: Avl::new(),
            hash: ChainedHashMap::with_capacity(config.initial_hash_capacity),
            active: config.initial_structure,
            stats: StatsCollector::with_config(&config),
            engine: DecisionEngine::new(config.decision.clone()),
            migration_count: 0,
            total_migration_time: Duration::ZERO,
            hook: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a callback run after every migration, replacing any
    /// previous one.
    pub fn set_migration_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&MigrationEvent) + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    pub fn clear_migration_hook(&mut self) {
        self.hook = None;
    }

    pub fn current_structure(&self) -> StructureKind {
        self.active
    }

    pub fn len(&self) -> usize {
        match self.active {
            StructureKind::Bst => self.bst.len(),
            StructureKind::Avl => self.avl.len(),
            StructureKind::HashMap => self.hash.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or overwrite. Returns `true` if the key was absent.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let recorded = key.clone();
        let start = Instant::now();
        let inserted = match self.active {
            StructureKind::Bst => self.bst.insert(key, value),
            StructureKind::Avl => self.avl.insert(key, value),
            StructureKind::HashMap => self.hash.insert(key, value),
        };
        let elapsed = start.elapsed();

        self.stats.record_insert(&recorded, elapsed);
        self.maybe_migrate();
        inserted
    }

    /// Look up `key`, recording the search. The value is cloned because the
    /// search may trigger a migration before it returns.
    pub fn search(&mut self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let start = Instant::now();
        let found = self.peek(key).cloned();
        let elapsed = start.elapsed();

        self.stats.record_search(key, elapsed);
        self.maybe_migrate();
        found
    }

    /// Remove `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let start = Instant::now();
        let deleted = match self.active {
            StructureKind::Bst => self.bst.delete(key),
            StructureKind::Avl => self.avl.delete(key),
            StructureKind::HashMap => self.hash.delete(key),
        };
        let elapsed = start.elapsed();

        self.stats.record_delete(key, elapsed);
        self.maybe_migrate();
        deleted
    }

    /// Look up `key` without recording anything.
    pub fn peek(&self, key: &K) -> Option<&V> {
        match self.active {
            StructureKind::Bst => self.bst.search(key),
            StructureKind::Avl => self.avl.search(key),
            StructureKind::HashMap => self.hash.search(key),
        }
    }

    /// Membership test without recording anything.
    pub fn contains_key(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Iterate the active structure. Ascending for trees, bucket order for
    /// the hash table.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        match self.active {
            StructureKind::Bst => Box::new(self.bst.iter()),
            StructureKind::Avl => Box::new(self.avl.iter()),
            StructureKind::HashMap => Box::new(self.hash.iter()),
        }
    }

    /// Copy of every entry, in the active structure's iteration order.
    pub fn items(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        match self.active {
            StructureKind::Bst => self.bst.items(),
            StructureKind::Avl => self.avl.items(),
            StructureKind::HashMap => self.hash.items(),
        }
    }

    fn tree_height(&self) -> Option<usize> {
        match self.active {
            StructureKind::Bst => Some(self.bst.height()),
            StructureKind::Avl => Some(self.avl.height()),
            StructureKind::HashMap => None,
        }
    }

    fn maybe_migrate(&mut self) {
        let total_ops = self.stats.total_ops();
        if !self.engine.should_check(total_ops) {
            return;
        }

        let summary = self.stats.summary();
        let height = self.tree_height();
        let verdict = self.engine.decide(self.active, &summary, height);
        debug!(
            total_ops,
            current = %self.active,
            order_score = summary.order_score,
            search_ratio = summary.search_ratio,
            height = ?height,
            switch = verdict.switch,
            target = %verdict.target,
            "decision check"
        );

        if verdict.switch && verdict.target != self.active {
            self.migrate(verdict.target, verdict.reason, total_ops);
        }
    }

    /// Move every entry into `target` and make it active.
    ///
    /// Reloading cannot fail, so the active tag only changes once the target
    /// holds every entry the source held.
    fn migrate(&mut self, target: StructureKind, reason: SwitchReason, total_ops: u64) -> MigrationEvent {
        let from = self.active;
        let start = Instant::now();

        let entries = match from {
            StructureKind::Bst => self.bst.drain(),
            StructureKind::Avl => self.avl.drain(),
            StructureKind::HashMap => self.hash.drain(),
        };
        let items = entries.len();

        match target {
            StructureKind::Bst => {
                self.bst.clear();
                for (k, v) in entries {
                    self.bst.insert(k, v);
                }
            }
            StructureKind::Avl => {
                self.avl.clear();
                for (k, v) in entries {
                    self.avl.insert(k, v);
                }
            }
            StructureKind::HashMap => {
                self.hash.clear();
                for (k, v) in entries {
                    self.hash.insert(k, v);
                }
            }
        }
        self.active = target;

        let duration = start.elapsed();
        self.migration_count += 1;
        self.total_migration_time += duration;
        self.engine.record_switch(from, target, reason, total_ops);

        let event = MigrationEvent {
            from,
            to: target,
            reason,
            at_operation: total_ops,
            items,
            duration,
        };
        info!(
            from = %from,
            to = %target,
            reason = %reason,
            items,
            duration_us = duration.as_micros() as u64,
            at_operation = total_ops,
            "migrated"
        );
        if let Some(hook) = self.hook.as_mut() {
            hook(&event);
        }
        event
    }

    /// Switch to the structure named `target`, bypassing the decision engine.
    ///
    /// Returns the migration that ran, or `None` if `target` was already
    /// active. Fails with [`Error::InvalidTarget`](crate::Error) for an
    /// unknown name, leaving the map untouched.
    pub fn force_switch(&mut self, target: &str) -> Result<Option<MigrationEvent>> {
        let target: StructureKind = target.parse()?;
        Ok(self.force_switch_to(target))
    }

    /// Typed form of [`force_switch`](Self::force_switch).
    pub fn force_switch_to(&mut self, target: StructureKind) -> Option<MigrationEvent> {
        if target == self.active {
            return None;
        }
        let total_ops = self.stats.total_ops();
        Some(self.migrate(target, SwitchReason::Manual, total_ops))
    }

    pub fn migration_count(&self) -> u64 {
        self.migration_count
    }

    pub fn total_migration_time(&self) -> Duration {
        self.total_migration_time
    }

    pub fn switch_history(&self) -> &[SwitchRecord] {
        self.engine.history()
    }

    /// The raw statistics collector.
    pub fn collector(&self) -> &StatsCollector<K> {
        &self.stats
    }

    /// Forget recorded statistics. Entries, migration counters and the
    /// switch history are kept.
    ///
    /// The decision engine also keeps the operation number of the last
    /// switch, measured on the old count. Checks stay off until the new
    /// count passes that point plus the cooldown.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn stats(&self) -> MapStats {
        let structure = match self.active {
            StructureKind::Bst => StructureStats::Bst {
                height: self.bst.height(),
            },
            StructureKind::Avl => StructureStats::Avl {
                height: self.avl.height(),
                rotation_count: self.avl.rotation_count(),
            },
            StructureKind::HashMap => StructureStats::HashMap {
                load_factor: self.hash.load_factor(),
                collision_rate: self.hash.collision_rate(),
                capacity: self.hash.capacity(),
            },
        };
        MapStats {
            summary: self.stats.summary(),
            current_structure: self.active,
            len: self.len(),
            migration_count: self.migration_count,
            total_migration_time: self.total_migration_time,
            switch_history: self.engine.history().to_vec(),
            structure,
        }
    }
}

impl<K: Ord + Hash + Clone, V> Default for AdaptiveMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for AdaptiveMap<K, V>
where
    K: Ord + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveMap")
            .field("active", &self.active)
            .field("len", &self.len())
            .field("total_ops", &self.stats.total_ops())
            .field("migration_count", &self.migration_count)
            .finish()
    }
}

#[cfg(test)]
impl<K: Ord + Hash + Clone, V> AdaptiveMap<K, V> {
    /// Asserts the active structure's invariants and that every inactive
    /// structure is empty.
    pub(crate) fn validate(&self) {
        match self.active {
            StructureKind::Bst => self.bst.validate(),
            StructureKind::Avl => self.avl.validate(),
            StructureKind::HashMap => self.hash.validate(),
        }
        let lens = [
            (StructureKind::Bst, self.bst.len()),
            (StructureKind::Avl, self.avl.len()),
            (StructureKind::HashMap, self.hash.len()),
        ];
        for (kind, len) in lens {
            if kind != self.active {
                assert_eq!(len, 0, "inactive {kind} holds entries");
            }
        }
        assert_eq!(self.migration_count as usize, self.engine.history().len());
    }
}
