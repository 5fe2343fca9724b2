//! Single-flight admission for page fetches.
//!
//! Advisory bookkeeping only: the cache never blocks, it just reports whether
//! a new fetch for a parent should start.

use crate::cache::TreeCache;
use crate::models::NodeId;
use std::collections::HashSet;

/// Admission key: a parent id, or the root sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Root,
    Parent(NodeId),
}

impl FetchKey {
    pub fn for_parent(parent: Option<&str>) -> Self {
        match parent {
            None => FetchKey::Root,
            Some(id) => FetchKey::Parent(id.to_string()),
        }
    }
}

/// Set of outstanding fetches
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    in_flight: HashSet<FetchKey>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant admission unless a fetch for `key` is already outstanding
    pub fn begin(&mut self, key: FetchKey) -> bool {
        self.in_flight.insert(key)
    }

    /// Release `key`; returns whether it was outstanding
    pub fn finish(&mut self, key: &FetchKey) -> bool {
        self.in_flight.remove(key)
    }

    pub fn contains(&self, key: &FetchKey) -> bool {
        self.in_flight.contains(key)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl TreeCache {
    /// Ask to start fetching children of `parent` (root list when `None`).
    ///
    /// Returns `false` when a fetch for the same key is already outstanding.
    pub fn begin_fetch(&mut self, parent: Option<&str>) -> bool {
        let granted = self.fetches.begin(FetchKey::for_parent(parent));
        if !granted {
            tracing::trace!(?parent, "Fetch already in flight");
        }
        granted
    }

    /// Release the admission taken by [`begin_fetch`](Self::begin_fetch)
    pub fn finish_fetch(&mut self, parent: Option<&str>) {
        self.fetches.finish(&FetchKey::for_parent(parent));
    }

    /// Whether a fetch for `parent` is outstanding
    pub fn is_fetching(&self, parent: Option<&str>) -> bool {
        self.fetches.contains(&FetchKey::for_parent(parent))
    }
}
