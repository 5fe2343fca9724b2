//! Mutation applier
//!
//! Applies one [`Operation`] to the cache indices. Operations on unknown ids are
//! absorbed: `Insert` parks under a missing parent, everything else is a no-op
//! reported as [`Applied::Ignored`]. The only rejected operation is a move that
//! would place a node beneath itself.

use crate::cache::ordering::{merge_sorted, remove_id};
use crate::cache::{CacheError, ChildEdges, TreeCache};
use crate::models::{Node, NodeId, NodeMeta};
use crate::operations::{Applied, Operation};
use chrono::{DateTime, Utc};

/// Where an attached node ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Root,
    Visible,
    Evicted,
    Dangling,
    /// Parked because the parent lies below the node
    Cyclic,
}

impl TreeCache {
    /// Apply a single mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::CyclicMove`] when a move targets the moving node or
    /// one of its descendants. The cache is left untouched in that case.
    pub fn apply(&mut self, op: Operation) -> Result<Applied, CacheError> {
        let name = op.name();
        let applied = match op {
            Operation::Insert {
                parent_id,
                created_at,
            } => Applied::Inserted(self.insert(parent_id, created_at)),
            Operation::Move { id, new_parent_id } => self.move_node(&id, new_parent_id)?,
            Operation::Remove { id } => self.remove(&id),
            Operation::Collapse { id } => self.collapse(&id),
            Operation::Expand { id } => self.expand(&id),
            Operation::SetHasMore {
                parent_id,
                has_more,
            } => self.set_has_more(parent_id.as_deref(), has_more),
        };

        tracing::debug!(operation = name, ?applied, "Applied operation");
        Ok(applied)
    }

    fn insert(&mut self, parent_id: Option<NodeId>, created_at: DateTime<Utc>) -> NodeId {
        let id = self.allocate_id();
        let node = Node::new(id.clone(), parent_id.clone(), String::new(), created_at);
        self.nodes.insert(id.clone(), node);
        let meta = self.new_meta();
        self.meta.insert(id.clone(), meta);

        let placement = self.attach(&id, parent_id.as_deref(), false);
        self.refresh_depth(&id, false);
        tracing::trace!(%id, ?parent_id, ?placement, "Inserted node");

        // Something may already be parked under the freshly allocated id
        if !self.dangling.bucket(&id).is_empty() {
            self.resolve_bucket(&id);
        }
        id
    }

    fn move_node(
        &mut self,
        id: &str,
        new_parent_id: Option<NodeId>,
    ) -> Result<Applied, CacheError> {
        if !self.nodes.contains_key(id) {
            return Ok(Applied::Ignored);
        }

        if let Some(target) = new_parent_id.as_deref() {
            if self.is_in_subtree(id, target) {
                tracing::warn!(%id, %target, "Rejected cyclic move");
                return Err(CacheError::cyclic_move(id, target));
            }
        }

        self.detach(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = new_parent_id.clone();
        }
        let placement = self.attach(id, new_parent_id.as_deref(), true);
        let written = self.refresh_depth(id, true);
        tracing::trace!(%id, ?new_parent_id, ?placement, depths = written, "Moved node");

        // The move may have broken a loop that kept a record parked
        self.resolve_dangling();

        Ok(Applied::Done)
    }

    fn remove(&mut self, id: &str) -> Applied {
        if !self.nodes.contains_key(id) {
            return Applied::Ignored;
        }

        let mut orphans: Vec<NodeId> = Vec::new();
        self.edges()
            .for_each_child(id, |child| orphans.push(child.to_string()));

        self.detach(id);
        self.nodes.remove(id);
        self.meta.remove(id);
        if let Some(depth) = self.depth.as_mut() {
            depth.remove(id);
        }

        remove_id(&mut self.root.children_ids, id);
        for meta in self.meta.values_mut() {
            remove_id(&mut meta.children_ids, id);
        }
        self.dangling.scrub(id);
        if let Some(store) = self.eviction.as_mut() {
            store.scrub(id);
        }

        // Orphans keep their parent link and wait for the id to be loaded again,
        // next to anything already parked under it
        for orphan in &orphans {
            self.dangling.park(id, orphan);
        }

        tracing::trace!(%id, orphans = orphans.len(), "Removed node");
        Applied::Done
    }

    fn collapse(&mut self, id: &str) -> Applied {
        if !self.nodes.contains_key(id) {
            return Applied::Ignored;
        }

        let fresh = self.config.expand_by_default;
        let meta = self
            .meta
            .entry(id.to_string())
            .or_insert_with(|| NodeMeta::new(fresh));
        meta.is_expanded = false;

        if let Some(store) = self.eviction.as_mut() {
            if !meta.children_ids.is_empty() {
                let children = std::mem::take(&mut meta.children_ids);
                let evicted = store.evict(id, children, &self.nodes);
                tracing::trace!(%id, evicted, "Evicted children of collapsed node");
            }
        }
        Applied::Done
    }

    fn expand(&mut self, id: &str) -> Applied {
        if !self.nodes.contains_key(id) {
            return Applied::Ignored;
        }

        let fresh = self.config.expand_by_default;
        self.meta
            .entry(id.to_string())
            .or_insert_with(|| NodeMeta::new(fresh))
            .is_expanded = true;

        let restored = self.restore_evicted(id);
        self.refresh_subtrees(id, &restored);
        Applied::Done
    }

    fn set_has_more(&mut self, parent_id: Option<&str>, has_more: bool) -> Applied {
        match parent_id {
            None => {
                self.root.page.has_more = has_more;
                Applied::Done
            }
            Some(parent) => match self.meta.get_mut(parent) {
                Some(meta) => {
                    meta.page.has_more = has_more;
                    Applied::Done
                }
                None => Applied::Ignored,
            },
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        loop {
            self.next_local_id += 1;
            let id = format!("{}-{}", self.config.local_id_prefix, self.next_local_id);
            if !self.nodes.contains_key(&id) && !self.meta.contains_key(&id) {
                return id;
            }
        }
    }

    /// Link a known node under `parent` (root list when `None`).
    ///
    /// `reveal` expands the destination first, which is what a move does.
    pub(crate) fn attach(&mut self, id: &str, parent: Option<&str>, reveal: bool) -> Placement {
        let Some(parent) = parent else {
            merge_sorted(&mut self.root.children_ids, [id.to_string()], &self.nodes);
            return Placement::Root;
        };

        if !self.nodes.contains_key(parent) {
            self.dangling.park(parent, id);
            return Placement::Dangling;
        }

        let fresh = self.config.expand_by_default;
        let meta = self
            .meta
            .entry(parent.to_string())
            .or_insert_with(|| NodeMeta::new(fresh));
        if reveal {
            meta.is_expanded = true;
        }

        let placement = match self.eviction.as_mut() {
            Some(store) if !meta.is_expanded => {
                store.insert(parent, id, &self.nodes);
                Placement::Evicted
            }
            Some(store) => {
                let restored = store.restore(parent);
                merge_sorted(&mut meta.children_ids, restored, &self.nodes);
                merge_sorted(&mut meta.children_ids, [id.to_string()], &self.nodes);
                Placement::Visible
            }
            None => {
                merge_sorted(&mut meta.children_ids, [id.to_string()], &self.nodes);
                Placement::Visible
            }
        };

        if let Some(node) = self.nodes.get_mut(parent) {
            node.has_children = true;
        }
        placement
    }

    /// Unlink `id` from wherever its current parent holds it
    pub(crate) fn detach(&mut self, id: &str) -> bool {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent_id.clone()) else {
            return false;
        };

        match parent {
            None => remove_id(&mut self.root.children_ids, id),
            Some(parent) => {
                let mut removed = false;
                if let Some(meta) = self.meta.get_mut(&parent) {
                    removed |= remove_id(&mut meta.children_ids, id);
                }
                if let Some(store) = self.eviction.as_mut() {
                    removed |= store.remove_child(&parent, id);
                }
                removed |= self.dangling.unpark(&parent, id);
                self.refresh_has_children(&parent);
                removed
            }
        }
    }

    /// Move evicted children of `id` back into its visible list
    pub(crate) fn restore_evicted(&mut self, id: &str) -> Vec<NodeId> {
        let Some(store) = self.eviction.as_mut() else {
            return Vec::new();
        };
        let restored = store.restore(id);
        if restored.is_empty() {
            return restored;
        }

        let fresh = self.config.expand_by_default;
        let meta = self
            .meta
            .entry(id.to_string())
            .or_insert_with(|| NodeMeta::new(fresh));
        merge_sorted(&mut meta.children_ids, restored.iter().cloned(), &self.nodes);
        restored
    }

    /// Recompute the cached depth of `id` (and its subtree when `subtree` is set)
    /// from its parent's current position. Returns the number of entries written.
    pub(crate) fn refresh_depth(&mut self, id: &str, subtree: bool) -> usize {
        if self.depth.is_none() {
            return 0;
        }
        let Some(parent) = self.nodes.get(id).map(|n| n.parent_id.clone()) else {
            return 0;
        };
        let base = self.child_depth(parent.as_deref());

        let edges = ChildEdges {
            meta: &self.meta,
            eviction: self.eviction.as_ref(),
        };
        let Some(depth) = self.depth.as_mut() else {
            return 0;
        };
        if subtree {
            depth.reassign_subtree(&edges, id, base)
        } else {
            depth.set(id, base);
            1
        }
    }

    /// Recompute depths below `parent` for the given children
    pub(crate) fn refresh_subtrees(&mut self, parent: &str, children: &[NodeId]) {
        if self.depth.is_none() || children.is_empty() {
            return;
        }
        let base = self.child_depth(Some(parent));

        let edges = ChildEdges {
            meta: &self.meta,
            eviction: self.eviction.as_ref(),
        };
        if let Some(depth) = self.depth.as_mut() {
            for child in children {
                depth.reassign_subtree(&edges, child, base);
            }
        }
    }

    /// Depth a child of `parent` should have.
    ///
    /// Falls back to a structural walk when the parent has no cached depth and
    /// to 1 (assume the parent will turn out to be a root) when the parent is
    /// not loaded at all.
    fn child_depth(&self, parent: Option<&str>) -> usize {
        match parent {
            None => 0,
            Some(parent) => self
                .depth_of(parent)
                .or_else(|| self.structural_depth(parent))
                .map_or(1, |depth| depth + 1),
        }
    }

    fn refresh_has_children(&mut self, id: &str) {
        let count = self.edges().child_count(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.has_children = count > 0;
        }
    }

    /// Whether `candidate` is `root` or lies below it, following recorded
    /// parent links (parked records included)
    pub(crate) fn is_in_subtree(&self, root: &str, candidate: &str) -> bool {
        let mut current = Some(candidate);
        let mut steps = 0;
        while let Some(id) = current {
            if id == root {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        }
        false
    }
}
