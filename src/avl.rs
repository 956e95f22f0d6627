//! Height-balanced (AVL) binary search tree.
//!
//! Mutations recurse over owned subtrees and hand the (possibly rotated)
//! subtree root back to the caller, so no parent pointers are needed. After
//! every public call, each node's children differ in height by at most one.

use std::cmp::Ordering;

type Link<K, V> = Option<Box<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    /// 1 for a leaf.
    height: usize,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            left: None,
            right: None,
            height: 1,
        })
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// `height(left) - height(right)`.
    fn balance(&self) -> isize {
        height(&self.left) as isize - height(&self.right) as isize
    }
}

fn height<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |n| n.height)
}

fn balance<K, V>(link: &Link<K, V>) -> isize {
    link.as_ref().map_or(0, |n| n.balance())
}

fn rotate_right<K, V>(mut z: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let Some(mut y) = z.left.take() else {
        return z;
    };
    z.left = y.right.take();
    z.update_height();
    y.right = Some(z);
    y.update_height();
    y
}

fn rotate_left<K, V>(mut z: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let Some(mut y) = z.right.take() else {
        return z;
    };
    z.right = y.left.take();
    z.update_height();
    y.left = Some(z);
    y.update_height();
    y
}

fn delete_node<K: Ord, V>(link: Link<K, V>, key: &K) -> (Link<K, V>, bool) {
    let Some(mut node) = link else {
        return (None, false);
    };

    match key.cmp(&node.key) {
        Ordering::Less => {
            let (child, deleted) = delete_node(node.left.take(), key);
            node.left = child;
            if !deleted {
                return (Some(node), false);
            }
        }
        Ordering::Greater => {
            let (child, deleted) = delete_node(node.right.take(), key);
            node.right = child;
            if !deleted {
                return (Some(node), false);
            }
        }
        Ordering::Equal => {
            if node.left.is_none() {
                return (node.right.take(), true);
            }
            if node.right.is_none() {
                return (node.left.take(), true);
            }
            // Two children: adopt the in-order successor's entry.
            if let Some(right) = node.right.take() {
                let (rest, (k, v)) = take_min(right);
                node.right = rest;
                node.key = k;
                node.value = v;
            }
        }
    }

    (Some(rebalance(node)), true)
}

/// Unlinks the minimum of `node`'s subtree, rebalancing on the way up.
fn take_min<K, V>(mut node: Box<Node<K, V>>) -> (Link<K, V>, (K, V)) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            let Node { key, value, .. } = *node;
            (rest, (key, value))
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

/// Restores the balance invariant after a deletion below `node`. The heavy
/// child's own balance picks single versus double rotation.
fn rebalance<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.update_height();
    let balance = node.balance();

    if balance > 1 {
        if self::balance(&node.left) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if self::balance(&node.right) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

/// How an insert resolved at one subtree root.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Placed {
    /// Key already present; value overwritten, shape unchanged.
    Updated,
    /// A fresh leaf was created at this position.
    Leaf,
    /// The key went down the given side of this node and was added below.
    Below(Ordering),
}

/// Self-balancing binary search tree.
pub struct Avl<K, V> {
    root: Link<K, V>,
    len: usize,
    rotation_count: u64,
}

impl<K: Ord, V> Avl<K, V> {
    pub fn new() -> Self {
        Self {
            root: None,
            len: 0,
            rotation_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rotations performed by inserts since creation or the last `clear`.
    /// Double rotations count as two. Rebalancing after a delete is not
    /// counted.
    pub fn rotation_count(&self) -> u64 {
        self.rotation_count
    }

    pub fn height(&self) -> usize {
        height(&self.root)
    }

    /// Inserts or overwrites. Returns `true` if the key was absent.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let root = self.root.take();
        let (root, placed) = self.insert_node(root, key, value);
        self.root = Some(root);
        let inserted = placed != Placed::Updated;
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn insert_node(&mut self, link: Link<K, V>, key: K, value: V) -> (Box<Node<K, V>>, Placed) {
        let Some(mut node) = link else {
            return (Node::new(key, value), Placed::Leaf);
        };

        let side = key.cmp(&node.key);
        let below = match side {
            Ordering::Equal => {
                node.value = value;
                return (node, Placed::Updated);
            }
            Ordering::Less => {
                let (child, placed) = self.insert_node(node.left.take(), key, value);
                node.left = Some(child);
                placed
            }
            Ordering::Greater => {
                let (child, placed) = self.insert_node(node.right.take(), key, value);
                node.right = Some(child);
                placed
            }
        };
        if below == Placed::Updated {
            return (node, Placed::Updated);
        }

        node.update_height();
        let balance = node.balance();

        // `below` tells which side of the heavy child the new key took, which
        // is the same as comparing the new key against that child's key.
        let node = match below {
            Placed::Below(Ordering::Less) if balance > 1 => {
                self.rotation_count += 1;
                rotate_right(node)
            }
            Placed::Below(Ordering::Greater) if balance < -1 => {
                self.rotation_count += 1;
                rotate_left(node)
            }
            Placed::Below(Ordering::Greater) if balance > 1 => {
                self.rotation_count += 2;
                node.left = node.left.take().map(rotate_left);
                rotate_right(node)
            }
            Placed::Below(Ordering::Less) if balance < -1 => {
                self.rotation_count += 2;
                node.right = node.right.take().map(rotate_right);
                rotate_left(node)
            }
            _ => node,
        };
        (node, Placed::Below(side))
    }

    pub fn search(&self, key: &K) -> Option<&V> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match key.cmp(&node.key) {
                Ordering::Equal => return Some(&node.value),
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let (root, deleted) = delete_node(self.root.take(), key);
        self.root = root;
        if deleted {
            self.len -= 1;
        }
        deleted
    }

    /// In-order (ascending) iterator.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Entries in ascending key order.
    pub fn items(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Moves every entry out in ascending key order, leaving the tree empty.
    /// The rotation counter is kept.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        fn walk<K, V>(link: Link<K, V>, out: &mut Vec<(K, V)>) {
            if let Some(node) = link {
                let Node {
                    key,
                    value,
                    left,
                    right,
                    ..
                } = *node;
                walk(left, out);
                out.push((key, value));
                walk(right, out);
            }
        }

        let mut out = Vec::with_capacity(self.len);
        walk(self.root.take(), &mut out);
        self.len = 0;
        out
    }

    /// Drops every entry and resets the rotation counter.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
        self.rotation_count = 0;
    }
}

impl<K: Ord, V> Default for Avl<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for Avl<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut node: Option<&'a Node<K, V>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
impl<K: Ord, V> Avl<K, V> {
    /// Asserts ordering, stored heights, the balance bound and the cached
    /// length.
    pub(crate) fn validate(&self) {
        fn check<K: Ord, V>(link: &Link<K, V>, lo: Option<&K>, hi: Option<&K>) -> (usize, usize) {
            let Some(node) = link else {
                return (0, 0);
            };
            if let Some(lo) = lo {
                assert!(*lo < node.key, "left subtree key out of order");
            }
            if let Some(hi) = hi {
                assert!(node.key < *hi, "right subtree key out of order");
            }
            let (lh, lc) = check(&node.left, lo, Some(&node.key));
            let (rh, rc) = check(&node.right, Some(&node.key), hi);
            assert!(
                (lh as isize - rh as isize).abs() <= 1,
                "balance factor out of range"
            );
            assert_eq!(node.height, 1 + lh.max(rh), "stored height must match children");
            (node.height, lc + rc + 1)
        }

        let (_, count) = check(&self.root, None, None);
        assert_eq!(count, self.len, "reachable node count must match len");
    }
}
