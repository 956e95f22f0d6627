//! Unbalanced binary search tree.
//!
//! The baseline representation: inserts are cheap, but a sorted key stream
//! degenerates the tree into a list. Every walk is iterative so that such a
//! list-shaped tree cannot exhaust the stack.

use std::cmp::Ordering;

type Link<K, V> = Option<Box<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            left: None,
            right: None,
        })
    }
}

/// Binary search tree without rebalancing.
pub struct Bst<K, V> {
    root: Link<K, V>,
    len: usize,
}

/// Slot holding `key`, or the empty slot where it would be attached.
fn find_link<'a, K: Ord, V>(mut link: &'a mut Link<K, V>, key: &K) -> &'a mut Link<K, V> {
    loop {
        let ord = match link.as_deref() {
            Some(node) => key.cmp(&node.key),
            None => return link,
        };
        match (ord, link) {
            (Ordering::Less, Some(node)) => link = &mut node.left,
            (Ordering::Greater, Some(node)) => link = &mut node.right,
            (_, slot) => return slot,
        }
    }
}

/// Unlinks the minimum node of a non-empty subtree, splicing its right child
/// into its place.
fn take_min<K, V>(mut link: &mut Link<K, V>) -> Option<(K, V)> {
    while link.as_ref().is_some_and(|node| node.left.is_some()) {
        if let Some(node) = link {
            link = &mut node.left;
        }
    }
    let mut node = link.take()?;
    *link = node.right.take();
    Some((node.key, node.value))
}

impl<K: Ord, V> Bst<K, V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts or overwrites. Returns `true` if the key was absent.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let slot = find_link(&mut self.root, &key);
        match slot {
            Some(node) => {
                node.value = value;
                false
            }
            None => {
                *slot = Some(Node::new(key, value));
                self.len += 1;
                true
            }
        }
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
    ///
    /// A node with two children takes over its in-order successor's entry and
    /// the successor is unlinked from the right subtree instead.
    pub fn delete(&mut self, key: &K) -> bool {
        let slot = find_link(&mut self.root, key);
        let Some(mut node) = slot.take() else {
            return false;
        };

        *slot = if node.left.is_none() {
            node.right.take()
        } else if node.right.is_none() {
            node.left.take()
        } else {
            if let Some((k, v)) = take_min(&mut node.right) {
                node.key = k;
                node.value = v;
            }
            Some(node)
        };
        self.len -= 1;
        true
    }

    /// Number of nodes on the longest root-to-leaf path; 0 when empty.
    pub fn height(&self) -> usize {
        let mut max = 0;
        let mut stack: Vec<(&Node<K, V>, usize)> = Vec::new();
        if let Some(root) = self.root.as_deref() {
            stack.push((root, 1));
        }
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            if let Some(left) = node.left.as_deref() {
                stack.push((left, depth + 1));
            }
            if let Some(right) = node.right.as_deref() {
                stack.push((right, depth + 1));
            }
        }
        max
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
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<Box<Node<K, V>>> = Vec::new();
        let mut current = self.root.take();
        loop {
            while let Some(mut node) = current {
                current = node.left.take();
                stack.push(node);
            }
            let Some(mut node) = stack.pop() else {
                break;
            };
            current = node.right.take();
            out.push((node.key, node.value));
        }
        self.len = 0;
        out
    }

    pub fn clear(&mut self) {
        self.free_nodes();
        self.len = 0;
    }
}

impl<K, V> Bst<K, V> {
    fn free_nodes(&mut self) {
        let mut stack: Vec<Box<Node<K, V>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

impl<K, V> Drop for Bst<K, V> {
    fn drop(&mut self) {
        self.free_nodes();
    }
}

impl<K: Ord, V> Default for Bst<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for Bst<K, V> {
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
impl<K: Ord, V> Bst<K, V> {
    /// Asserts the search-tree ordering and the cached length.
    pub(crate) fn validate(&self) {
        let keys: Vec<&K> = self.iter().map(|(k, _)| k).collect();
        assert!(
            keys.windows(2).all(|w| w[0] < w[1]),
            "in-order keys must be strictly ascending"
        );
        assert_eq!(keys.len(), self.len, "reachable node count must match len");
    }
}
