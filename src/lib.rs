//! # adaptive-map
//!
//! A key-value map that picks its own representation. Every operation is
//! timed and recorded; at a fixed cadence the map asks a decision engine
//! whether the observed workload would be better served by a different
//! structure, and if so moves all entries across inline.
//!
//! Three representations are available:
//!
//! - [`Bst`]: unbalanced binary search tree, the cheap default that
//!   degrades under sorted keys.
//! - [`Avl`]: height-balanced tree, logarithmic under any insertion order.
//! - [`ChainedHashMap`]: separate-chaining hash table, near constant time
//!   for random access but unordered.
//!
//! ## Example
//!
//! ```rust
//! use adaptive_map::{AdaptiveMap, StructureKind};
//!
//! let mut map: AdaptiveMap<u64, String> = AdaptiveMap::new();
//! assert_eq!(map.current_structure(), StructureKind::Bst);
//!
//! // A long ascending run degrades the unbalanced tree.
//! for k in 0..150 {
//!     map.insert(k, format!("value_{k}"));
//! }
//! assert_eq!(map.current_structure(), StructureKind::Avl);
//! assert_eq!(map.search(&42), Some("value_42".to_string()));
//!
//! // Structures can also be chosen by hand.
//! map.force_switch("HashMap").unwrap();
//! assert_eq!(map.current_structure(), StructureKind::HashMap);
//! assert!(map.force_switch("Trie").is_err());
//! ```
//!
//! The map is single-threaded: it provides no internal synchronization and
//! callers sharing it across threads must serialize access themselves.

#![warn(clippy::all)]

pub mod avl;
pub mod bst;
pub mod chained;
pub mod config;
pub mod decision;
pub mod error;
pub mod map;
pub mod stats;
#[cfg(feature = "workload")]
pub mod workload;

use std::fmt;
use std::str::FromStr;

pub use avl::Avl;
pub use bst::Bst;
pub use chained::ChainedHashMap;
pub use config::{Config, DecisionConfig};
pub use decision::{DecisionEngine, SwitchReason, SwitchRecord, Verdict};
pub use error::{Error, Result};
pub use map::{AdaptiveMap, MapStats, MigrationEvent, StructureStats};
pub use stats::{OpKind, StatsCollector, Summary};

/// The three backing representations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[cfg_attr(test, allow(non_local_definitions))]
pub enum StructureKind {
    #[default]
    Bst,
    Avl,
    HashMap,
}

impl StructureKind {
    pub const ALL: [StructureKind; 3] = [StructureKind::Bst, StructureKind::Avl, StructureKind::HashMap];

    pub fn name(self) -> &'static str {
        match self {
            StructureKind::Bst => "BST",
            StructureKind::Avl => "AVL",
            StructureKind::HashMap => "HashMap",
        }
    }

    /// Tree representations report a height.
    pub fn is_tree(self) -> bool {
        matches!(self, StructureKind::Bst | StructureKind::Avl)
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StructureKind {
    type Err = Error;

    /// Accepts the display names in any case, plus `hash`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bst" => Ok(StructureKind::Bst),
            "avl" => Ok(StructureKind::Avl),
            "hashmap" | "hash" => Ok(StructureKind::HashMap),
            _ => Err(Error::invalid_target(s)),
        }
    }
}


#[cfg(test)]
mod proptests;
