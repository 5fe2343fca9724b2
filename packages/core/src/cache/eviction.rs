//! Eviction store: children hidden while their parent is collapsed.
//!
//! A collapsed parent keeps `has_children = true` while its children live here
//! instead of in the child index. Expanding restores exactly what was evicted,
//! in sibling order. Grandchildren evicted under an already-evicted child stay
//! where they are; collapsing an ancestor does not re-evict them.

use crate::cache::ordering::{merge_sorted, remove_id};
use crate::models::{Node, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct EvictionStore {
    buckets: HashMap<NodeId, Vec<NodeId>>,
}

impl EvictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `children` into `parent`'s bucket
    pub fn evict(
        &mut self,
        parent: &str,
        children: Vec<NodeId>,
        nodes: &HashMap<NodeId, Node>,
    ) -> usize {
        if children.is_empty() {
            return 0;
        }
        let bucket = self.buckets.entry(parent.to_string()).or_default();
        merge_sorted(bucket, children, nodes)
    }

    /// Evict a single child that arrived while `parent` was collapsed
    pub fn insert(&mut self, parent: &str, child: &str, nodes: &HashMap<NodeId, Node>) {
        self.evict(parent, vec![child.to_string()], nodes);
    }

    /// Take everything evicted under `parent`
    pub fn restore(&mut self, parent: &str) -> Vec<NodeId> {
        self.buckets.remove(parent).unwrap_or_default()
    }

    /// Remove one child from `parent`'s bucket
    pub fn remove_child(&mut self, parent: &str, child: &str) -> bool {
        let Some(bucket) = self.buckets.get_mut(parent) else {
            return false;
        };
        let removed = remove_id(bucket, child);
        if bucket.is_empty() {
            self.buckets.remove(parent);
        }
        removed
    }

    /// Drop `id`'s own bucket and strip `id` from every other bucket
    pub fn scrub(&mut self, id: &str) {
        self.buckets.remove(id);
        self.buckets.retain(|_, bucket| {
            remove_id(bucket, id);
            !bucket.is_empty()
        });
    }

    /// Children evicted under `parent`
    pub fn bucket(&self, parent: &str) -> &[NodeId] {
        self.buckets.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_bucket(&self, parent: &str) -> bool {
        self.buckets.contains_key(parent)
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
