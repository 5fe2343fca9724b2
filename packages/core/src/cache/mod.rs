//! Incrementally maintained tree cache
//!
//! [`TreeCache`] owns every index needed to render a partially loaded outline:
//!
//! - **Node table** - id -> [`Node`]
//! - **Child index** - id -> [`NodeMeta`] (visible children, expansion, pagination)
//! - **Root index** - [`RootMeta`] for the top level
//! - **Dangling index** - missing parent id -> children waiting for it
//! - **Depth cache** (optional) - id -> depth
//! - **Eviction store** (optional) - collapsed parent -> hidden children
//!
//! The optional components are chosen once from [`CacheConfig`] and composed into
//! the cache; the four combinations are the [`CacheVariant`]s.
//!
//! # Invariants
//!
//! Between calls, for every node:
//!
//! - it sits in at most one of: the root list, one parent's visible list, one
//!   parent's eviction bucket, one dangling bucket
//! - `has_children == visible + evicted > 0`
//! - every list is in sibling order without duplicates
//! - with the depth cache enabled, cached depth equals structural depth for all
//!   nodes reachable from a root
//! - it hangs below a root or a parked node, unless one of its ancestors is
//!   missing from the node table
//!
//! Parked nodes wait for a parent that is not loaded (or was removed), or for a
//! record that breaks a parent loop. Child edges never form a cycle.
//!
//! [`TreeCache::check_invariants`] verifies all of the above.
//!
//! # Concurrency
//!
//! The cache is single-threaded and synchronous. Concurrency lives at the fetch
//! boundary, which coordinates through [`TreeCache::begin_fetch`] /
//! [`TreeCache::finish_fetch`] and merges results with [`TreeCache::upsert_page`].

mod admission;
mod apply;
mod dangling;
mod depth;
mod error;
mod eviction;
mod flatten;
mod invariants;
pub mod ordering;
mod upsert;

#[cfg(test)]
mod apply_test;

pub use admission::{FetchKey, SingleFlight};
pub use dangling::DanglingIndex;
pub use depth::DepthCache;
pub use error::CacheError;
pub use eviction::EvictionStore;
pub use upsert::UpsertOutcome;

use crate::config::{CacheConfig, CacheVariant};
use crate::models::{Node, NodeId, NodeMeta, PageInfo, RootMeta};
use std::collections::HashMap;

/// Read-only view of parent -> child edges (visible and evicted)
pub struct ChildEdges<'a> {
    meta: &'a HashMap<NodeId, NodeMeta>,
    eviction: Option<&'a EvictionStore>,
}

impl<'a> ChildEdges<'a> {
    /// Call `f` for every visible, then every evicted, child of `id`
    pub fn for_each_child(&self, id: &str, mut f: impl FnMut(&'a str)) {
        if let Some(meta) = self.meta.get(id) {
            meta.children_ids.iter().for_each(|child| f(child));
        }
        if let Some(store) = self.eviction {
            store.bucket(id).iter().for_each(|child| f(child));
        }
    }

    /// Number of visible plus evicted children of `id`
    pub fn child_count(&self, id: &str) -> usize {
        let visible = self.meta.get(id).map_or(0, |m| m.children_ids.len());
        let evicted = self.eviction.map_or(0, |s| s.bucket(id).len());
        visible + evicted
    }
}

/// Statistics about the cache contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Nodes in the node table
    pub nodes: usize,
    /// Ids in the root list
    pub roots: usize,
    /// Missing parents with parked children
    pub dangling_buckets: usize,
    /// Children parked in the dangling index
    pub dangling_nodes: usize,
    /// Collapsed parents holding evicted children
    pub evicted_buckets: usize,
    /// Children held in the eviction store
    pub evicted_nodes: usize,
    /// Outstanding fetch admissions
    pub in_flight_fetches: usize,
}

/// In-memory cache of a partially loaded tree
#[derive(Debug, Clone)]
pub struct TreeCache {
    config: CacheConfig,
    nodes: HashMap<NodeId, Node>,
    meta: HashMap<NodeId, NodeMeta>,
    root: RootMeta,
    dangling: DanglingIndex,
    depth: Option<DepthCache>,
    eviction: Option<EvictionStore>,
    fetches: SingleFlight,
    next_local_id: u64,
}

impl TreeCache {
    /// Create an empty cache with the capabilities named in `config`
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create an empty cache for one of the four structural variants
    pub fn with_variant(variant: CacheVariant) -> Self {
        Self::build(variant.config())
    }

    fn build(config: CacheConfig) -> Self {
        let depth = config.depth_cache.then(DepthCache::new);
        let eviction = config.eviction.then(EvictionStore::new);

        tracing::debug!(
            variant = %config.variant(),
            "Created tree cache"
        );

        Self {
            config,
            nodes: HashMap::new(),
            meta: HashMap::new(),
            root: RootMeta::default(),
            dangling: DanglingIndex::new(),
            depth,
            eviction,
            fetches: SingleFlight::new(),
            next_local_id: 0,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn variant(&self) -> CacheVariant {
        self.config.variant()
    }

    /// Node record by id
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the node table
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level ids in sibling order
    pub fn root_ids(&self) -> &[NodeId] {
        &self.root.children_ids
    }

    /// Visible children of `id` in sibling order
    pub fn children_of(&self, id: &str) -> &[NodeId] {
        self.meta
            .get(id)
            .map(|m| m.children_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Children of `id` currently held in the eviction store
    pub fn evicted_children_of(&self, id: &str) -> &[NodeId] {
        self.eviction
            .as_ref()
            .map(|store| store.bucket(id))
            .unwrap_or(&[])
    }

    /// Children waiting for the unknown `parent` to arrive
    pub fn dangling_children_of(&self, parent: &str) -> &[NodeId] {
        self.dangling.bucket(parent)
    }

    /// Child index entry for `id`
    pub fn meta(&self, id: &str) -> Option<&NodeMeta> {
        self.meta.get(id)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.meta.get(id).is_some_and(|m| m.is_expanded)
    }

    /// Pagination state for `parent` (root list when `None`)
    pub fn page_state(&self, parent: Option<&str>) -> Option<&PageInfo> {
        match parent {
            None => Some(&self.root.page),
            Some(id) => self.meta.get(id).map(|m| &m.page),
        }
    }

    /// Cached depth of `id`; `None` when the depth cache is disabled
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.depth.as_ref().and_then(|d| d.get(id))
    }

    /// Depth computed by walking parent links up to a root.
    ///
    /// `None` when `id` is unknown or its ancestor chain reaches a node that is
    /// not loaded (the node is not attached to a root).
    pub fn structural_depth(&self, id: &str) -> Option<usize> {
        let mut node = self.nodes.get(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent_id.as_deref() {
            node = self.nodes.get(parent)?;
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            nodes: self.nodes.len(),
            roots: self.root.children_ids.len(),
            dangling_buckets: self.dangling.bucket_count(),
            dangling_nodes: self.dangling.node_count(),
            evicted_buckets: self.eviction.as_ref().map_or(0, EvictionStore::bucket_count),
            evicted_nodes: self.eviction.as_ref().map_or(0, EvictionStore::node_count),
            in_flight_fetches: self.fetches.len(),
        }
    }

    fn edges(&self) -> ChildEdges<'_> {
        ChildEdges {
            meta: &self.meta,
            eviction: self.eviction.as_ref(),
        }
    }

    fn new_meta(&self) -> NodeMeta {
        NodeMeta::new(self.config.expand_by_default)
    }
}
