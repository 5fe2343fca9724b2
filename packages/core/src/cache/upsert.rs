//! Page upsert and dangling resolution
//!
//! Pages from the fetch layer may arrive in any order. A child whose parent is
//! not loaded yet is parked in the dangling index and attached as soon as the
//! parent shows up, possibly several generations at once within one batch.
//! Upserting the same page twice leaves the cache unchanged.
//!
//! Records come from a server whose view may be newer than ours, so a parent
//! link can point below the node itself. Such a node waits in the dangling
//! index under its new parent until a later record breaks the loop.

use crate::cache::apply::Placement;
use crate::cache::TreeCache;
use crate::models::{Node, NodeMeta, PageInfo};

/// What a page upsert changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Nodes new to the node table
    pub inserted: usize,
    /// Known nodes whose title changed
    pub updated: usize,
    /// Known nodes whose parent or ordering key changed
    pub relocated: usize,
    /// Previously dangling children attached during this upsert
    pub resolved: usize,
    /// Records parked because their parent link would close a cycle
    pub cyclic: usize,
}

impl UpsertOutcome {
    /// Whether the upsert left node data untouched
    pub fn is_noop(&self) -> bool {
        self.inserted + self.updated + self.relocated + self.resolved == 0
    }
}

enum NodeChange {
    Inserted,
    Updated,
    Relocated,
    Unchanged,
}

impl TreeCache {
    /// Merge a page of children of `parent_id` (root list when `None`).
    ///
    /// Node records are attached under their own `parent_id`; the page key only
    /// selects which pagination record `page` replaces. Pagination for a parent
    /// that is not loaded yet is kept and survives the parent's arrival.
    pub fn upsert_page(
        &mut self,
        parent_id: Option<&str>,
        nodes: Vec<Node>,
        page: PageInfo,
    ) -> UpsertOutcome {
        let mut outcome = UpsertOutcome::default();
        let count = nodes.len();

        for node in nodes {
            if node.parent_id.as_deref() != parent_id {
                tracing::warn!(
                    node_id = %node.id,
                    page_parent = ?parent_id,
                    node_parent = ?node.parent_id,
                    "Page node names a different parent; attaching by the node record"
                );
            }
            let (change, placement) = self.upsert_node(node);
            match change {
                NodeChange::Inserted => outcome.inserted += 1,
                NodeChange::Updated => outcome.updated += 1,
                NodeChange::Relocated => outcome.relocated += 1,
                NodeChange::Unchanged => {}
            }
            if placement == Some(Placement::Cyclic) {
                outcome.cyclic += 1;
            }
        }

        match parent_id {
            None => self.root.page = page,
            Some(parent) => {
                let fresh = self.config.expand_by_default;
                self.meta
                    .entry(parent.to_string())
                    .or_insert_with(|| NodeMeta::new(fresh))
                    .page = page;
            }
        }

        outcome.resolved = self.resolve_dangling();

        tracing::debug!(
            parent = ?parent_id,
            nodes = count,
            inserted = outcome.inserted,
            relocated = outcome.relocated,
            resolved = outcome.resolved,
            cyclic = outcome.cyclic,
            "Upserted page"
        );
        outcome
    }

    fn upsert_node(&mut self, incoming: Node) -> (NodeChange, Option<Placement>) {
        let id = incoming.id.clone();

        if let Some(existing) = self.nodes.get_mut(&id) {
            let relocate = existing.parent_id != incoming.parent_id
                || existing.created_at != incoming.created_at;
            let retitled = existing.title != incoming.title;
            existing.title = incoming.title;

            if !relocate {
                let change = if retitled {
                    NodeChange::Updated
                } else {
                    NodeChange::Unchanged
                };
                return (change, None);
            }

            self.detach(&id);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.parent_id = incoming.parent_id.clone();
                node.created_at = incoming.created_at;
            }
            let placement = self.place(&id, incoming.parent_id.as_deref());
            self.refresh_depth(&id, true);
            return (NodeChange::Relocated, Some(placement));
        }

        let parent = incoming.parent_id.clone();
        self.nodes.insert(
            id.clone(),
            Node {
                has_children: false,
                ..incoming
            },
        );
        if !self.meta.contains_key(&id) {
            let meta = self.new_meta();
            self.meta.insert(id.clone(), meta);
        }
        let placement = self.place(&id, parent.as_deref());
        self.refresh_depth(&id, true);
        (NodeChange::Inserted, Some(placement))
    }

    /// Attach `id` under `parent`, or park it there when `parent` lies below `id`
    fn place(&mut self, id: &str, parent: Option<&str>) -> Placement {
        if let Some(parent) = parent {
            if self.is_in_subtree(id, parent) {
                tracing::warn!(%id, %parent, "Parent link closes a cycle; parking node");
                self.dangling.park(parent, id);
                return Placement::Cyclic;
            }
        }
        self.attach(id, parent, false)
    }

    /// Attach every parked child whose parent is now loaded.
    ///
    /// Children whose parent link still closes a cycle stay parked.
    pub(crate) fn resolve_dangling(&mut self) -> usize {
        let mut resolved = 0;
        loop {
            let ready = self.dangling.ready_parents(&self.nodes);
            let mut attached = 0;
            for parent in ready {
                attached += self.resolve_bucket(&parent);
            }
            if attached == 0 {
                break;
            }
            resolved += attached;
        }
        resolved
    }

    /// Attach the children parked under `parent`, which must be loaded
    pub(crate) fn resolve_bucket(&mut self, parent: &str) -> usize {
        let mut resolved = 0;
        for child in self.dangling.take(parent) {
            let waiting = self
                .nodes
                .get(&child)
                .is_some_and(|n| n.parent_id.as_deref() == Some(parent));
            if !waiting {
                continue;
            }
            if self.is_in_subtree(&child, parent) {
                self.dangling.park(parent, &child);
                continue;
            }
            self.attach(&child, Some(parent), false);
            self.refresh_depth(&child, true);
            resolved += 1;
        }

        if resolved > 0 {
            tracing::trace!(%parent, resolved, "Resolved dangling children");
        }
        resolved
    }
}
