//! Dangling index: children whose parent is not in the node table yet.
//!
//! Buckets are keyed by the missing parent id and keep arrival order; the
//! children are sorted when they are merged into the parent's child list.

use crate::models::{Node, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DanglingIndex {
    buckets: HashMap<NodeId, Vec<NodeId>>,
}

impl DanglingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `child` under the unknown `parent`
    pub fn park(&mut self, parent: &str, child: &str) {
        let bucket = self.buckets.entry(parent.to_string()).or_default();
        if !bucket.iter().any(|id| id == child) {
            bucket.push(child.to_string());
        }
    }

    /// Remove `child` from `parent`'s bucket, dropping the bucket when empty
    pub fn unpark(&mut self, parent: &str, child: &str) -> bool {
        let Some(bucket) = self.buckets.get_mut(parent) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|id| id != child);
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.buckets.remove(parent);
        }
        removed
    }

    /// Take every child parked under `parent`
    pub fn take(&mut self, parent: &str) -> Vec<NodeId> {
        self.buckets.remove(parent).unwrap_or_default()
    }

    /// Strip `id` from every bucket
    pub fn scrub(&mut self, id: &str) {
        self.buckets.retain(|_, bucket| {
            bucket.retain(|child| child != id);
            !bucket.is_empty()
        });
    }

    /// Children parked under `parent`
    pub fn bucket(&self, parent: &str) -> &[NodeId] {
        self.buckets.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parents with a non-empty bucket that are now present in `nodes`, sorted
    /// for a deterministic resolution order
    pub fn ready_parents(&self, nodes: &HashMap<NodeId, Node>) -> Vec<NodeId> {
        let mut ready: Vec<NodeId> = self
            .buckets
            .keys()
            .filter(|parent| nodes.contains_key(*parent))
            .cloned()
            .collect();
        ready.sort();
        ready
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Vec<NodeId>)> {
        self.buckets.iter()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn node_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}
