//! Structural self-check used by tests and the variant harness.

use crate::cache::ordering::is_sorted;
use crate::cache::TreeCache;
use crate::models::NodeId;
use std::collections::{HashMap, HashSet};

impl TreeCache {
    /// Verify every cross-index invariant.
    ///
    /// Returns the list of violations found; an empty cache is always valid.
    pub fn check_invariants(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        let mut placements: HashMap<&str, usize> = HashMap::new();

        self.check_list(
            "root list",
            None,
            &self.root.children_ids,
            true,
            &mut placements,
            &mut violations,
        );

        for (parent, meta) in &self.meta {
            if meta.children_ids.is_empty() {
                continue;
            }
            if !self.nodes.contains_key(parent) {
                violations.push(format!("unloaded node {parent} has visible children"));
            }
            self.check_list(
                &format!("children of {parent}"),
                Some(parent),
                &meta.children_ids,
                true,
                &mut placements,
                &mut violations,
            );
        }

        if let Some(store) = &self.eviction {
            for (parent, bucket) in store.iter() {
                self.check_list(
                    &format!("evicted children of {parent}"),
                    Some(parent),
                    bucket,
                    true,
                    &mut placements,
                    &mut violations,
                );
            }
        }

        for (parent, bucket) in self.dangling.iter() {
            // Loaded parents may only hold records whose link loops back
            if self.nodes.contains_key(parent)
                && bucket.iter().any(|child| !self.is_in_subtree(child, parent))
            {
                violations.push(format!("dangling bucket {parent} was never resolved"));
            }
            self.check_list(
                &format!("dangling children of {parent}"),
                Some(parent),
                bucket,
                false,
                &mut placements,
                &mut violations,
            );
        }

        for (id, count) in &placements {
            if *count > 1 {
                violations.push(format!("{id} is held by {count} lists"));
            }
        }

        let edges = self.edges();
        for (id, node) in &self.nodes {
            let expected = edges.child_count(id) > 0;
            if node.has_children != expected {
                violations.push(format!(
                    "{id} has_children={} but holds {} children",
                    node.has_children,
                    edges.child_count(id)
                ));
            }
        }

        // Everything hangs below a root or a parked node, unless an ancestor
        // is missing from the node table
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = self
            .root
            .children_ids
            .iter()
            .chain(self.dangling.iter().flat_map(|(_, bucket)| bucket.iter()))
            .map(String::as_str)
            .collect();
        while let Some(id) = stack.pop() {
            if reachable.insert(id) {
                edges.for_each_child(id, |child| stack.push(child));
            }
        }
        for id in self.nodes.keys() {
            if !reachable.contains(id.as_str()) && self.structural_depth(id).is_some() {
                violations.push(format!("{id} is unreachable although its parents are loaded"));
            }
        }

        if let Some(depth) = &self.depth {
            let mut visited: HashSet<&str> = HashSet::new();
            let mut stack: Vec<(&str, usize)> = self
                .root
                .children_ids
                .iter()
                .map(|id| (id.as_str(), 0))
                .collect();
            while let Some((id, expected)) = stack.pop() {
                if !visited.insert(id) {
                    violations.push(format!("{id} is reachable twice from the roots"));
                    continue;
                }
                match depth.get(id) {
                    Some(cached) if cached == expected => {}
                    cached => violations.push(format!(
                        "{id} cached depth {cached:?}, structural depth {expected}"
                    )),
                }
                edges.for_each_child(id, |child| stack.push((child, expected + 1)));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check_list<'a>(
        &self,
        label: &str,
        parent: Option<&str>,
        list: &'a [NodeId],
        sorted: bool,
        placements: &mut HashMap<&'a str, usize>,
        violations: &mut Vec<String>,
    ) {
        if sorted && !is_sorted(list, &self.nodes) {
            violations.push(format!("{label} is out of sibling order"));
        }
        for id in list {
            *placements.entry(id.as_str()).or_default() += 1;
            match self.nodes.get(id) {
                Some(node) if node.parent_id.as_deref() == parent => {}
                Some(node) => violations.push(format!(
                    "{label} holds {id} whose parent is {:?}",
                    node.parent_id
                )),
                None => violations.push(format!("{label} holds unknown node {id}")),
            }
        }
    }
}
