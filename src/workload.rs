//! Synthetic operation streams for driving an [`AdaptiveMap`].
//!
//! Every generator takes the random source explicitly so runs can be
//! replayed from a seed. Keys are `i64` and values are `value_{n}` strings.

use std::hash::Hash;
use std::ops::Range;

use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::map::AdaptiveMap;

/// One operation of a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op<K, V> {
    Insert(K, V),
    Search(K),
    Delete(K),
}

impl<K, V> Op<K, V> {
    pub fn key(&self) -> &K {
        match self {
            Op::Insert(k, _) | Op::Search(k) | Op::Delete(k) => k,
        }
    }
}

/// Result of applying one [`Op`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<V> {
    /// `true` if the key was new.
    Inserted(bool),
    Found(Option<V>),
    /// `true` if the key was present.
    Deleted(bool),
}

/// Totals of a [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub ops: usize,
    pub inserted: usize,
    pub hits: usize,
    pub misses: usize,
    pub deleted: usize,
    /// Migrations that happened during the run.
    pub migrations: u64,
}

impl<K, V> AdaptiveMap<K, V>
where
    K: Ord + Hash + Clone,
    V: Clone,
{
    /// Feed one operation through the public surface.
    pub fn apply(&mut self, op: Op<K, V>) -> Outcome<V> {
        match op {
            Op::Insert(k, v) => Outcome::Inserted(self.insert(k, v)),
            Op::Search(k) => Outcome::Found(self.search(&k)),
            Op::Delete(k) => Outcome::Deleted(self.delete(&k)),
        }
    }
}

/// Apply every operation in order.
pub fn run<K, V, I>(map: &mut AdaptiveMap<K, V>, ops: I) -> RunReport
where
    K: Ord + Hash + Clone,
    V: Clone,
    I: IntoIterator<Item = Op<K, V>>,
{
    let before = map.migration_count();
    let mut report = RunReport::default();
    for op in ops {
        report.ops += 1;
        match map.apply(op) {
            Outcome::Inserted(true) => report.inserted += 1,
            Outcome::Inserted(false) => {}
            Outcome::Found(Some(_)) => report.hits += 1,
            Outcome::Found(None) => report.misses += 1,
            Outcome::Deleted(true) => report.deleted += 1,
            Outcome::Deleted(false) => {}
        }
    }
    report.migrations = map.migration_count() - before;
    report
}

fn value(n: i64) -> String {
    format!("value_{n}")
}

/// `start, start + 1, ..` ascending.
pub fn sorted_inserts(n: usize, start: i64) -> Vec<Op<i64, String>> {
    (0..n as i64)
        .map(|i| Op::Insert(start + i, value(i)))
        .collect()
}

/// `start, start - 1, ..` descending.
pub fn reverse_sorted_inserts(n: usize, start: i64) -> Vec<Op<i64, String>> {
    (0..n as i64)
        .map(|i| Op::Insert(start - i, value(i)))
        .collect()
}

/// Distinct keys drawn uniformly from `range`, at most `range.len()` of them.
pub fn random_inserts<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    range: Range<i64>,
) -> Vec<Op<i64, String>> {
    let span = usize::try_from(range.end.saturating_sub(range.start)).unwrap_or(0);
    index::sample(rng, span, n.min(span))
        .into_iter()
        .map(|offset| {
            let k = range.start + offset as i64;
            Op::Insert(k, value(k))
        })
        .collect()
}

/// Inserts of `keys` plus `n_searches` searches for keys among them,
/// shuffled together.
pub fn mixed<R: Rng + ?Sized>(
    rng: &mut R,
    keys: &[i64],
    n_searches: usize,
) -> Vec<Op<i64, String>> {
    let mut ops: Vec<Op<i64, String>> = keys.iter().map(|&k| Op::Insert(k, value(k))).collect();
    if !keys.is_empty() {
        for _ in 0..n_searches {
            if let Some(&k) = keys.choose(rng) {
                ops.push(Op::Search(k));
            }
        }
    }
    ops.shuffle(rng);
    ops
}

/// Searches needed next to `n_inserts` inserts for the given share of
/// searches. The share is clamped to `[0, 0.95]`.
fn searches_for(n_inserts: usize, search_ratio: f64) -> usize {
    let r = search_ratio.clamp(0.0, 0.95);
    (n_inserts as f64 * r / (1.0 - r)) as usize
}

/// Random keys, mostly searched.
pub fn search_heavy<R: Rng + ?Sized>(
    rng: &mut R,
    n_inserts: usize,
    search_ratio: f64,
) -> Vec<Op<i64, String>> {
    let keys: Vec<i64> = (0..n_inserts).map(|_| rng.gen_range(0..=10_000)).collect();
    mixed(rng, &keys, searches_for(n_inserts, search_ratio))
}

/// Sequential keys `0..n_inserts`, mostly inserted.
pub fn insert_heavy<R: Rng + ?Sized>(
    rng: &mut R,
    n_inserts: usize,
    search_ratio: f64,
) -> Vec<Op<i64, String>> {
    let keys: Vec<i64> = (0..n_inserts as i64).collect();
    mixed(rng, &keys, searches_for(n_inserts, search_ratio))
}

/// Three phases: 100 sorted inserts, 200 searches over them, then 150
/// random operations on a fresh key range, 60% of them searches.
pub fn evolving<R: Rng + ?Sized>(rng: &mut R) -> Vec<Op<i64, String>> {
    let mut ops = sorted_inserts(100, 0);
    ops.extend((0..200).map(|_| Op::Search(rng.gen_range(0..=99))));
    for _ in 0..150 {
        let k = rng.gen_range(1000..=2000);
        if rng.gen_bool(0.6) {
            ops.push(Op::Search(k));
        } else {
            ops.push(Op::Insert(k, value(k)));
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StructureKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, HashSet};

    #[test]
    fn test_sorted_and_reverse() {
        let ops = sorted_inserts(3, 10);
        assert_eq!(
            ops,
            vec![
                Op::Insert(10, "value_0".to_string()),
                Op::Insert(11, "value_1".to_string()),
                Op::Insert(12, "value_2".to_string()),
            ]
        );
        let keys: Vec<i64> = reverse_sorted_inserts(4, 1000)
            .iter()
            .map(|op| *op.key())
            .collect();
        assert_eq!(keys, vec![1000, 999, 998, 997]);
    }

    #[test]
    fn test_random_inserts_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let ops = random_inserts(&mut rng, 500, 0..10_000);
        assert_eq!(ops.len(), 500);
        let keys: HashSet<i64> = ops.iter().map(|op| *op.key()).collect();
        assert_eq!(keys.len(), 500);
        assert!(keys.iter().all(|k| (0..10_000).contains(k)));

        // Asking for more than the range holds yields the whole range.
        let ops = random_inserts(&mut rng, 50, 5..15);
        assert_eq!(ops.len(), 10);
    }

    #[test]
    fn test_mix_ratios() {
        let mut rng = StdRng::seed_from_u64(2);
        let ops = search_heavy(&mut rng, 100, 0.7);
        let searches = ops.iter().filter(|op| matches!(op, Op::Search(_))).count();
        assert_eq!(ops.len() - searches, 100);
        assert_eq!(searches, 233);

        let ops = insert_heavy(&mut rng, 100, 0.2);
        let searches = ops.iter().filter(|op| matches!(op, Op::Search(_))).count();
        assert_eq!(searches, 25);
        assert!(mixed(&mut rng, &[], 10).is_empty());
    }

    #[test]
    fn test_run_sorted_switches_to_avl() {
        let mut map: AdaptiveMap<i64, String> = AdaptiveMap::new();
        let report = run(&mut map, sorted_inserts(150, 0));
        assert_eq!(report.ops, 150);
        assert_eq!(report.inserted, 150);
        assert_eq!(report.migrations, 1);
        assert_eq!(map.current_structure(), StructureKind::Avl);
    }

    #[test]
    fn test_run_evolving_matches_btreemap() {
        let mut rng = StdRng::seed_from_u64(7);
        let ops = evolving(&mut rng);
        assert_eq!(ops.len(), 450);

        let mut map: AdaptiveMap<i64, String> = AdaptiveMap::new();
        let mut m: BTreeMap<i64, String> = BTreeMap::new();
        for op in ops {
            let expected = match &op {
                Op::Insert(k, v) => Outcome::Inserted(m.insert(*k, v.clone()).is_none()),
                Op::Search(k) => Outcome::Found(m.get(k).cloned()),
                Op::Delete(k) => Outcome::Deleted(m.remove(k).is_some()),
            };
            assert_eq!(map.apply(op), expected);
        }
        // The sorted phase always trips the degrading-tree rule at op 100.
        assert_eq!(map.switch_history()[0].at_operation, 100);
        assert_eq!(map.switch_history()[0].to, StructureKind::Avl);
        assert_eq!(map.len(), m.len());
    }
}
