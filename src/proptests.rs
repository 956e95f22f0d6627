use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

#[allow(non_local_definitions)]
#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "0u16..512")] u16, u32),
    #[proptest(weight = 25)]
    Delete(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 24)]
    Search(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 1)]
    Force(StructureKind),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=1500)
}

/// Sequential runs interleaved with random ones, so that the order score
/// swings both ways and automatic migrations happen.
fn phased_ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let sorted = (0u16..400, 20usize..120).prop_map(|(start, n)| {
        (0..n)
            .map(|i| Op::Insert(start.wrapping_add(i as u16), i as u32))
            .collect::<Vec<_>>()
    });
    let random = prop::collection::vec(any::<Op>(), 20..120);
    prop::collection::vec(prop_oneof![sorted, random], 1..12)
        .prop_map(|phases| phases.into_iter().flatten().collect())
}

/// Short cadence and cooldown so that small inputs still migrate.
fn eager_config() -> Config {
    let mut config = Config::default();
    config.decision.check_interval = 10;
    config.decision.min_ops_before_switch = 10;
    config.decision.switch_cooldown = 20;
    config
}

fn run_against_btreemap(
    map: &mut AdaptiveMap<u16, u32>,
    ops: Vec<Op>,
) -> std::result::Result<(), TestCaseError> {
    let mut m: BTreeMap<u16, u32> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Insert(key, value) => {
                let new_t = map.insert(key, value);
                let new_m = m.insert(key, value).is_none();
                prop_assert_eq!(new_t, new_m);
            }
            Op::Delete(key) => {
                prop_assert_eq!(map.delete(&key), m.remove(&key).is_some());
            }
            Op::Search(key) => {
                prop_assert_eq!(map.search(&key), m.get(&key).copied());
            }
            Op::Force(kind) => {
                let before = map.items().len();
                if let Some(event) = map.force_switch_to(kind) {
                    prop_assert_eq!(event.items, before);
                    prop_assert_eq!(event.to, kind);
                }
                prop_assert_eq!(map.current_structure(), kind);
            }
        }
        prop_assert_eq!(map.len(), m.len());
    }

    map.validate();
    let mut got = map.items();
    got.sort_unstable();
    let expected: Vec<(u16, u32)> = m.into_iter().collect();
    prop_assert_eq!(got, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_default_config(ops in ops_strategy()) {
        let mut map: AdaptiveMap<u16, u32> = AdaptiveMap::new();
        run_against_btreemap(&mut map, ops)?;
    }

    #[test]
    fn prop_equivalence_eager_config(ops in phased_ops_strategy()) {
        let mut map: AdaptiveMap<u16, u32> = AdaptiveMap::with_config(eager_config()).unwrap();
        run_against_btreemap(&mut map, ops)?;
        for record in map.switch_history() {
            prop_assert_ne!(record.from, record.to);
        }
    }

    #[test]
    fn prop_migration_preserves_entries(
        entries in prop::collection::vec((any::<u16>(), any::<u32>()), 0..300),
        targets in prop::collection::vec(any::<StructureKind>(), 1..8),
    ) {
        let mut map: AdaptiveMap<u16, u32> = AdaptiveMap::new();
        for (k, v) in entries {
            map.insert(k, v);
        }
        let mut before = map.items();
        before.sort_unstable();

        for target in targets {
            map.force_switch_to(target);
            map.validate();
            let mut after = map.items();
            after.sort_unstable();
            prop_assert_eq!(&after, &before);
            if target.is_tree() {
                // Trees report in ascending order without sorting.
                prop_assert_eq!(map.items(), before.clone());
            }
        }
    }

    #[test]
    fn prop_bst_matches_btreemap(ops in prop::collection::vec(any::<Op>(), 0..=600)) {
        let mut t: Bst<u16, u32> = Bst::new();
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();
        for op in ops {
            match op {
                Op::Insert(k, v) => prop_assert_eq!(t.insert(k, v), m.insert(k, v).is_none()),
                Op::Delete(k) => prop_assert_eq!(t.delete(&k), m.remove(&k).is_some()),
                Op::Search(k) => prop_assert_eq!(t.search(&k), m.get(&k)),
                Op::Force(_) => {}
            }
        }
        t.validate();
        let got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_avl_balanced_after_every_op(ops in prop::collection::vec(any::<Op>(), 0..=600)) {
        let mut t: Avl<u16, u32> = Avl::new();
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();
        for op in ops {
            match op {
                Op::Insert(k, v) => prop_assert_eq!(t.insert(k, v), m.insert(k, v).is_none()),
                Op::Delete(k) => prop_assert_eq!(t.delete(&k), m.remove(&k).is_some()),
                Op::Search(k) => prop_assert_eq!(t.search(&k), m.get(&k)),
                Op::Force(_) => continue,
            }
            t.validate();
        }
        let got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_hash_load_factor_bounded(
        keys in prop::collection::vec(any::<u32>(), 0..2000),
        capacity in 1usize..64,
    ) {
        let mut t: ChainedHashMap<u32, ()> = ChainedHashMap::with_capacity(capacity);
        for k in keys {
            t.insert(k, ());
            prop_assert!(t.load_factor() <= 0.75);
        }
        t.validate();
    }

    #[test]
    fn prop_order_score_random_permutation(
        keys in Just((0i64..50).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let mut s: StatsCollector<i64> = StatsCollector::new();
        for k in &keys {
            s.record_insert(k, std::time::Duration::ZERO);
        }
        // Distinct keys leave no ties, so the larger side has at least
        // half of the 49 pairs.
        let score = s.order_score();
        prop_assert!(score >= 0.5);
        prop_assert!(score < 0.8, "score {score}");
    }

    #[test]
    fn prop_should_check_gating(
        switches in prop::collection::btree_set(0u64..2000, 0..6),
    ) {
        let mut engine = DecisionEngine::default();
        let mut last = None;
        for ops in 0u64..2000 {
            if engine.should_check(ops) {
                prop_assert!(ops >= 100);
                prop_assert_eq!(ops % 50, 0);
                if let Some(at) = last {
                    prop_assert!(ops - at >= 200);
                }
            }
            if switches.contains(&ops) {
                engine.record_switch(StructureKind::Bst, StructureKind::Avl, SwitchReason::Manual, ops);
                last = Some(ops);
            }
        }
        prop_assert_eq!(engine.history().len(), switches.len());
    }
}

/// Visits every ordering of `keys` (Heap's algorithm, iterative) and
/// returns how many were visited.
fn for_each_key_order(keys: &[u32], mut visit: impl FnMut(&[u32])) -> usize {
    let mut order = keys.to_vec();
    let mut counters = vec![0usize; order.len()];
    let mut visited = 1;
    visit(&order);

    let mut i = 1;
    while i < order.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            order.swap(j, i);
            visit(&order);
            visited += 1;
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
    visited
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<u32> = (1..=7).collect();

    let orders = for_each_key_order(&keys, |order| {
        let mut bst: Bst<u32, u32> = Bst::new();
        let mut avl: Avl<u32, u32> = Avl::new();
        for &k in order {
            assert!(bst.insert(k, k * 10));
            assert!(avl.insert(k, k * 10));
            avl.validate();
        }
        bst.validate();
        assert!(bst.height() >= 3 && bst.height() <= 7);
        // 7 keys always fit in an AVL tree of height 3 or 4.
        assert!(avl.height() <= 4, "height {} for {order:?}", avl.height());

        let expected: Vec<(u32, u32)> = keys.iter().map(|&k| (k, k * 10)).collect();
        assert_eq!(bst.items(), expected);
        assert_eq!(avl.items(), expected);
    });
    assert_eq!(orders, 5040);
}

#[test]
fn exhaustive_delete_order_small_set() {
    let keys: Vec<u32> = vec![4, 2, 6, 1, 3, 5, 7];

    let orders = for_each_key_order(&keys, |order| {
        let mut bst: Bst<u32, ()> = Bst::new();
        let mut avl: Avl<u32, ()> = Avl::new();
        for &k in &keys {
            bst.insert(k, ());
            avl.insert(k, ());
        }
        assert_eq!(avl.rotation_count(), 0);
        let mut m: BTreeMap<u32, ()> = keys.iter().map(|&k| (k, ())).collect();

        for &k in order {
            let expected = m.remove(&k).is_some();
            assert_eq!(bst.delete(&k), expected);
            assert_eq!(avl.delete(&k), expected);
            assert_eq!(bst.len(), m.len());
            assert_eq!(avl.len(), m.len());
            bst.validate();
            avl.validate();
        }
        assert!(bst.is_empty());
        assert!(avl.is_empty());
        assert_eq!(avl.height(), 0);
    });
    assert_eq!(orders, 5040);
}
