//! Online workload statistics.
//!
//! The collector keeps a fixed-size window of recent operation kinds for the
//! read/write mix, the most recent inserted keys for the order score, and the
//! most recent durations for latency. Everything older is reduced to lifetime
//! counters. All updates are O(1).

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::Config;

/// Kind of a recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpKind {
    Insert,
    Search,
    Delete,
}

impl OpKind {
    fn index(self) -> usize {
        match self {
            OpKind::Insert => 0,
            OpKind::Search => 1,
            OpKind::Delete => 2,
        }
    }
}

/// Point-in-time view of the collector, the only input of the decision
/// engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    pub total_ops: u64,
    pub inserts: u64,
    pub searches: u64,
    pub deletes: u64,
    /// Fraction of searches in the recent window.
    pub search_ratio: f64,
    /// Fraction of inserts in the recent window.
    pub insert_ratio: f64,
    pub order_score: f64,
    /// `order_score` above the sorted threshold.
    pub is_sorted: bool,
    /// `search_ratio` above the search-heavy threshold.
    pub is_search_heavy: bool,
    /// Mean of the most recent recorded durations.
    pub avg_latency: Duration,
}

/// Neutral score reported before enough keys have been inserted.
pub const NEUTRAL_ORDER_SCORE: f64 = 0.5;

/// Collects operation statistics for one map.
#[derive(Debug, Clone)]
pub struct StatsCollector<K> {
    window: VecDeque<OpKind>,
    window_size: usize,
    /// Per-kind counts of `window`, indexed by `OpKind::index`.
    window_counts: [usize; 3],

    totals: [u64; 3],

    recent_keys: VecDeque<K>,
    order_window: usize,
    min_keys_for_order: usize,
    key_bounds: Option<(K, K)>,

    latencies: VecDeque<Duration>,
    latency_window: usize,
    /// Sum of `latencies`.
    latency_sum: Duration,
    total_latency: Duration,

    sorted_threshold: f64,
    search_heavy_threshold: f64,
}

impl<K: Ord + Clone> StatsCollector<K> {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size),
            window_size: config.window_size,
            window_counts: [0; 3],
            totals: [0; 3],
            recent_keys: VecDeque::with_capacity(config.order_window),
            order_window: config.order_window,
            min_keys_for_order: config.min_keys_for_order,
            key_bounds: None,
            latencies: VecDeque::with_capacity(config.latency_window),
            latency_window: config.latency_window,
            latency_sum: Duration::ZERO,
            total_latency: Duration::ZERO,
            sorted_threshold: config.decision.sorted_threshold,
            search_heavy_threshold: config.decision.search_heavy_threshold,
        }
    }

    pub fn record_insert(&mut self, key: &K, duration: Duration) {
        self.record(OpKind::Insert, duration);

        if self.recent_keys.len() == self.order_window {
            self.recent_keys.pop_front();
        }
        self.recent_keys.push_back(key.clone());

        self.key_bounds = match self.key_bounds.take() {
            None => Some((key.clone(), key.clone())),
            Some((mut min, mut max)) => {
                if *key < min {
                    min = key.clone();
                }
                if *key > max {
                    max = key.clone();
                }
                Some((min, max))
            }
        };
    }

    pub fn record_search(&mut self, _key: &K, duration: Duration) {
        self.record(OpKind::Search, duration);
    }

    pub fn record_delete(&mut self, _key: &K, duration: Duration) {
        self.record(OpKind::Delete, duration);
    }

    fn record(&mut self, kind: OpKind, duration: Duration) {
        if self.window.len() == self.window_size {
            if let Some(evicted) = self.window.pop_front() {
                self.window_counts[evicted.index()] -= 1;
            }
        }
        self.window.push_back(kind);
        self.window_counts[kind.index()] += 1;
        self.totals[kind.index()] += 1;

        if self.latencies.len() == self.latency_window {
            if let Some(evicted) = self.latencies.pop_front() {
                self.latency_sum -= evicted;
            }
        }
        self.latencies.push_back(duration);
        self.latency_sum += duration;
        self.total_latency += duration;
    }

    pub fn total_ops(&self) -> u64 {
        self.totals.iter().sum()
    }

    /// Lifetime count of operations of `kind`.
    pub fn total(&self, kind: OpKind) -> u64 {
        self.totals[kind.index()]
    }

    fn window_ratio(&self, kind: OpKind) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window_counts[kind.index()] as f64 / self.window.len() as f64
    }

    pub fn search_ratio(&self) -> f64 {
        self.window_ratio(OpKind::Search)
    }

    pub fn insert_ratio(&self) -> f64 {
        self.window_ratio(OpKind::Insert)
    }

    /// How monotonic the most recent inserted keys are, from 0 to 1.
    ///
    /// Counts ascending and descending adjacent pairs among the last
    /// `order_window` keys and returns the larger count over the number of
    /// pairs. Ties contribute to neither side. Returns 0.5 until
    /// `min_keys_for_order` keys have been inserted.
    pub fn order_score(&self) -> f64 {
        if self.total(OpKind::Insert) < self.min_keys_for_order as u64 {
            return NEUTRAL_ORDER_SCORE;
        }

        let mut ascending = 0usize;
        let mut descending = 0usize;
        let mut keys = self.recent_keys.iter();
        let Some(mut prev) = keys.next() else {
            return NEUTRAL_ORDER_SCORE;
        };
        for key in keys {
            if prev < key {
                ascending += 1;
            } else if prev > key {
                descending += 1;
            }
            prev = key;
        }

        let pairs = self.recent_keys.len().saturating_sub(1);
        if pairs == 0 {
            return NEUTRAL_ORDER_SCORE;
        }
        ascending.max(descending) as f64 / pairs as f64
    }

    /// Mean of the most recent `latency_window` durations.
    pub fn average_latency(&self) -> Duration {
        match u32::try_from(self.latencies.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.latency_sum / n,
        }
    }

    /// Sum of every duration recorded since creation or the last reset.
    pub fn total_latency(&self) -> Duration {
        self.total_latency
    }

    /// Smallest and largest key ever inserted.
    pub fn key_bounds(&self) -> Option<(&K, &K)> {
        self.key_bounds.as_ref().map(|(min, max)| (min, max))
    }

    pub fn summary(&self) -> Summary {
        let search_ratio = self.search_ratio();
        let order_score = self.order_score();
        Summary {
            total_ops: self.total_ops(),
            inserts: self.total(OpKind::Insert),
            searches: self.total(OpKind::Search),
            deletes: self.total(OpKind::Delete),
            search_ratio,
            insert_ratio: self.insert_ratio(),
            order_score,
            is_sorted: order_score > self.sorted_threshold,
            is_search_heavy: search_ratio > self.search_heavy_threshold,
            avg_latency: self.average_latency(),
        }
    }

    /// Forgets everything recorded so far. Window sizes and thresholds stay.
    pub fn reset(&mut self) {
        self.window.clear();
        self.window_counts = [0; 3];
        self.totals = [0; 3];
        self.recent_keys.clear();
        self.key_bounds = None;
        self.latencies.clear();
        self.latency_sum = Duration::ZERO;
        self.total_latency = Duration::ZERO;
    }
}

impl<K: Ord + Clone> Default for StatsCollector<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: Duration = Duration::ZERO;

    fn inserted(keys: impl IntoIterator<Item = i64>) -> StatsCollector<i64> {
        let mut s = StatsCollector::new();
        for k in keys {
            s.record_insert(&k, ZERO);
        }
        s
    }

    #[test]
    fn test_empty() {
        let s: StatsCollector<i64> = StatsCollector::new();
        assert_eq!(s.search_ratio(), 0.0);
        assert_eq!(s.insert_ratio(), 0.0);
        assert_eq!(s.order_score(), 0.5);
        assert_eq!(s.average_latency(), ZERO);
        assert_eq!(s.total_ops(), 0);
        assert_eq!(s.key_bounds(), None);
    }

    #[test]
    fn test_order_score_neutral_below_ten() {
        assert_eq!(inserted(0..9).order_score(), 0.5);
        assert_eq!(inserted((0..9).rev()).order_score(), 0.5);
        assert_eq!(inserted(0..10).order_score(), 1.0);
    }

    #[test]
    fn test_order_score_sorted_and_reversed() {
        assert_eq!(inserted(1..=50).order_score(), 1.0);
        assert_eq!(inserted((1..=50).rev()).order_score(), 1.0);
    }

    #[test]
    fn test_order_score_only_last_fifty() {
        // Shuffled history followed by 50 ascending keys.
        let mut keys: Vec<i64> = vec![9, 2, 7, 1, 8, 3, 6, 4, 5, 0];
        keys.extend(100..150);
        assert_eq!(inserted(keys).order_score(), 1.0);

        // Alternating keys have 49 pairs, 25 ascending and 24 descending.
        let zigzag = (0..50).map(|i| if i % 2 == 0 { i } else { -i });
        let score = inserted(zigzag).order_score();
        assert!((score - 25.0 / 49.0).abs() < 1e-12, "score {score}");
    }

    #[test]
    fn test_order_score_equal_keys_count_neither_way() {
        let s = inserted(std::iter::repeat(5).take(20));
        assert_eq!(s.order_score(), 0.0);
    }

    #[test]
    fn test_order_score_random_permutation_below_threshold() {
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(42);
        let mut high = 0;
        for _ in 0..200 {
            let mut keys: Vec<i64> = (0..50).collect();
            keys.shuffle(&mut rng);
            if inserted(keys).order_score() >= 0.8 {
                high += 1;
            }
        }
        assert_eq!(high, 0);
    }

    #[test]
    fn test_window_ratios_evict_oldest() {
        let mut s: StatsCollector<i64> = StatsCollector::new();
        for k in 0..100 {
            s.record_insert(&k, ZERO);
        }
        assert_eq!(s.insert_ratio(), 1.0);
        for k in 0..60 {
            s.record_search(&k, ZERO);
        }
        assert!((s.search_ratio() - 0.6).abs() < 1e-12);
        assert!((s.insert_ratio() - 0.4).abs() < 1e-12);
        for k in 0..100 {
            s.record_delete(&k, ZERO);
        }
        assert_eq!(s.search_ratio(), 0.0);
        assert_eq!(s.insert_ratio(), 0.0);

        assert_eq!(s.total(OpKind::Insert), 100);
        assert_eq!(s.total(OpKind::Search), 60);
        assert_eq!(s.total(OpKind::Delete), 100);
        assert_eq!(s.total_ops(), 260);
    }

    #[test]
    fn test_average_latency_last_hundred() {
        let mut s: StatsCollector<i64> = StatsCollector::new();
        for _ in 0..50 {
            s.record_search(&0, Duration::from_micros(1000));
        }
        for _ in 0..100 {
            s.record_search(&0, Duration::from_micros(10));
        }
        assert_eq!(s.average_latency(), Duration::from_micros(10));
        assert_eq!(s.total_latency(), Duration::from_micros(51_000));
    }

    #[test]
    fn test_summary_flags() {
        let mut s = inserted(0..40);
        for k in 0..60 {
            s.record_search(&k, ZERO);
        }
        let summary = s.summary();
        assert_eq!(summary.total_ops, 100);
        assert_eq!(summary.inserts, 40);
        assert_eq!(summary.searches, 60);
        assert_eq!(summary.deletes, 0);
        assert!(summary.is_sorted);
        // 0.6 is not strictly above the threshold.
        assert!(!summary.is_search_heavy);

        s.record_search(&0, ZERO);
        assert!(s.summary().is_search_heavy);
    }

    #[test]
    fn test_key_bounds_and_reset() {
        let mut s = inserted([5, -3, 12, 0]);
        assert_eq!(s.key_bounds(), Some((&-3, &12)));
        s.reset();
        assert_eq!(s.total_ops(), 0);
        assert_eq!(s.key_bounds(), None);
        assert_eq!(s.order_score(), 0.5);
        assert_eq!(s.total_latency(), ZERO);
    }
}
