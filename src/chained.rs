//! Separate-chaining hash table with capacity doubling.
//!
//! Buckets are short inline vectors; the table doubles its bucket count as
//! soon as an insert pushes the load factor past 0.75, so the load factor
//! never exceeds 0.75 once an insert returns. Iteration order follows bucket
//! layout and carries no key ordering.

use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use smallvec::SmallVec;

const DEFAULT_CAPACITY: usize = 16;

/// Load factor ceiling expressed as a ratio, `size / capacity <= 3 / 4`.
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

// Fixed seeds keep bucket placement reproducible between runs.
const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

type Bucket<K, V> = SmallVec<[(K, V); 2]>;

/// Hash table resolving collisions by chaining.
pub struct ChainedHashMap<K, V> {
    buckets: Vec<Bucket<K, V>>,
    len: usize,
    /// Insertions that landed in an already occupied bucket, counted since
    /// the last rehash or clear.
    collisions: usize,
    hasher: RandomState,
}

impl<K: Hash + Eq, V> ChainedHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a table with `capacity` buckets, rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            buckets: empty_buckets(capacity),
            len: 0,
            collisions: 0,
            hasher: RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn collision_count(&self) -> usize {
        self.collisions
    }

    /// `len / capacity`.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// `collision_count / len`, or 0 when empty.
    pub fn collision_rate(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.collisions as f64 / self.len as f64
        }
    }

    fn bucket_index(&self, key: &K) -> usize {
        (BuildHasher::hash_one(&self.hasher, key) % self.buckets.len() as u64) as usize
    }

    /// Inserts or overwrites. Returns `true` if the key was absent.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let idx = self.bucket_index(&key);
        let bucket = &mut self.buckets[idx];
        if let Some(slot) = bucket.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return false;
        }

        self.place(idx, key, value);
        if self.len * MAX_LOAD_DEN > self.capacity() * MAX_LOAD_NUM {
            self.rehash();
        }
        true
    }

    /// Appends a key known to be absent, with collision accounting.
    fn place(&mut self, idx: usize, key: K, value: V) {
        let bucket = &mut self.buckets[idx];
        if !bucket.is_empty() {
            self.collisions += 1;
        }
        bucket.push((key, value));
        self.len += 1;
    }

    /// Doubles the bucket count and replays every entry, rebuilding the
    /// size and collision counters from the new layout.
    fn rehash(&mut self) {
        let fresh = empty_buckets(self.capacity() * 2);
        let old = std::mem::replace(&mut self.buckets, fresh);
        self.len = 0;
        self.collisions = 0;
        for (key, value) in old.into_iter().flatten() {
            let idx = self.bucket_index(&key);
            self.place(idx, key, value);
        }
    }

    pub fn search(&self, key: &K) -> Option<&V> {
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let idx = self.bucket_index(key);
        let bucket = &mut self.buckets[idx];
        match bucket.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                bucket.remove(pos);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Iterates in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.buckets.iter().flatten().map(|(k, v)| (k, v))
    }

    /// Entries in bucket order. No key ordering is implied.
    pub fn items(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Moves every entry out in bucket order, keeping the capacity.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len);
        for bucket in &mut self.buckets {
            out.extend(bucket.drain(..));
        }
        self.len = 0;
        self.collisions = 0;
        out
    }

    /// Drops every entry, keeping the capacity.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
        self.collisions = 0;
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Bucket<K, V>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, SmallVec::new);
    buckets
}

impl<K: Hash + Eq, V> Default for ChainedHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for ChainedHashMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
impl<K: Hash + Eq, V> ChainedHashMap<K, V> {
    /// Asserts bucket placement, the load factor bound and the counters.
    pub(crate) fn validate(&self) {
        let mut count = 0;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            for (k, _) in bucket {
                assert_eq!(self.bucket_index(k), idx, "entry in wrong bucket");
            }
            count += bucket.len();
        }
        assert_eq!(count, self.len, "stored entry count must match len");
        assert!(self.capacity().is_power_of_two());
        assert!(
            self.len * MAX_LOAD_DEN <= self.capacity() * MAX_LOAD_NUM,
            "load factor above 0.75"
        );
    }
}
