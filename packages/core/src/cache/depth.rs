//! Depth cache: id -> depth, maintained incrementally so the flattener never
//! walks ancestors. Roots sit at depth 0.

use crate::cache::ChildEdges;
use crate::models::NodeId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct DepthCache {
    depths: HashMap<NodeId, usize>,
}

impl DepthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.depths.get(id).copied()
    }

    pub fn set(&mut self, id: &str, depth: usize) {
        self.depths.insert(id.to_string(), depth);
    }

    pub fn remove(&mut self, id: &str) -> Option<usize> {
        self.depths.remove(id)
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Set `root` to `depth` and every node below it (visible or evicted) relative
    /// to that. Cost is linear in the subtree size; each node is written once
    /// even if the edges loop back.
    ///
    /// Returns the number of entries written.
    pub fn reassign_subtree<'a>(
        &mut self,
        edges: &ChildEdges<'a>,
        root: &'a str,
        depth: usize,
    ) -> usize {
        let mut written = 0;
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, usize)> = vec![(root, depth)];

        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            self.depths.insert(id.to_string(), depth);
            written += 1;
            edges.for_each_child(id, |child| stack.push((child, depth + 1)));
        }

        written
    }
}
