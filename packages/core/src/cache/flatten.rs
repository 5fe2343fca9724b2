//! Flattener: turns the indices into the ordered rows of a virtualized list.
//!
//! The walk is an explicit stack so trees far deeper than the call stack
//! tolerates flatten fine. Rows are rebuilt on every call; the cost is linear
//! in the number of visible nodes.

use crate::cache::TreeCache;
use crate::models::{NodeId, Row};

enum Frame {
    Node { id: NodeId, depth: usize },
    LoadMore { parent_id: NodeId, depth: usize },
}

impl TreeCache {
    /// Produce the visible rows in display order.
    ///
    /// Read-mostly: with the eviction store enabled, an expanded node that still
    /// has evicted children gets them promoted back to visible before its
    /// children are emitted, so expand-then-flatten always shows the real
    /// children. That is the only state this method changes.
    pub fn flatten(&mut self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.root.children_ids.len());
        let mut stack: Vec<Frame> = self
            .root
            .children_ids
            .iter()
            .rev()
            .map(|id| Frame::Node {
                id: id.clone(),
                depth: 0,
            })
            .collect();

        while let Some(frame) = stack.pop() {
            let (id, carried) = match frame {
                Frame::LoadMore { parent_id, depth } => {
                    rows.push(Row::LoadMore {
                        parent_id: Some(parent_id),
                        depth,
                    });
                    continue;
                }
                Frame::Node { id, depth } => (id, depth),
            };

            let depth = self.depth_of(&id).unwrap_or(carried);
            rows.push(Row::Node {
                id: id.clone(),
                depth,
            });

            if !self.is_expanded(&id) {
                continue;
            }

            if self.eviction.as_ref().is_some_and(|s| s.has_bucket(&id)) {
                let restored = self.restore_evicted(&id);
                self.refresh_subtrees(&id, &restored);
            }

            let Some(meta) = self.meta.get(&id) else {
                continue;
            };
            if meta.page.has_more {
                stack.push(Frame::LoadMore {
                    parent_id: id.clone(),
                    depth: depth + 1,
                });
            }
            stack.extend(meta.children_ids.iter().rev().map(|child| Frame::Node {
                id: child.clone(),
                depth: depth + 1,
            }));
        }

        if self.root.page.has_more {
            rows.push(Row::LoadMore {
                parent_id: None,
                depth: 0,
            });
        }

        tracing::trace!(rows = rows.len(), "Flattened tree");
        rows
    }

    /// Ids of the node rows produced by [`flatten`](Self::flatten)
    pub fn visible_ids(&mut self) -> Vec<NodeId> {
        self.flatten()
            .into_iter()
            .filter_map(|row| match row {
                Row::Node { id, .. } => Some(id),
                Row::LoadMore { .. } => None,
            })
            .collect()
    }
}
