//! Tree Mutation Operations
//!
//! The closed set of mutations accepted by [`TreeCache::apply`](crate::cache::TreeCache::apply).
//! Operations are plain data so that a workload script can be generated once and replayed
//! against every cache variant.

use crate::models::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tree mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    /// Create a node under `parent_id` (root when `None`); the cache allocates the id
    #[serde(rename_all = "camelCase")]
    Insert {
        parent_id: Option<NodeId>,
        created_at: DateTime<Utc>,
    },

    /// Reattach `id` under `new_parent_id`, expanding the destination
    #[serde(rename_all = "camelCase")]
    Move {
        id: NodeId,
        new_parent_id: Option<NodeId>,
    },

    /// Delete `id` and strip it from every index (descendants are orphaned)
    Remove { id: NodeId },

    /// Hide the children of `id`
    Collapse { id: NodeId },

    /// Show the children of `id`
    Expand { id: NodeId },

    /// Update the pagination flag of `parent_id` (root when `None`)
    #[serde(rename_all = "camelCase")]
    SetHasMore {
        parent_id: Option<NodeId>,
        has_more: bool,
    },
}

impl Operation {
    /// Operation name used for logging and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Move { .. } => "move",
            Operation::Remove { .. } => "remove",
            Operation::Collapse { .. } => "collapse",
            Operation::Expand { .. } => "expand",
            Operation::SetHasMore { .. } => "set_has_more",
        }
    }
}

/// Result of applying an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A node was created with this id
    Inserted(NodeId),

    /// The operation changed (or re-affirmed) cache state
    Done,

    /// The operation referenced an unknown id and was skipped
    Ignored,
}

impl Applied {
    /// Id allocated by an insert
    pub fn inserted_id(&self) -> Option<&str> {
        match self {
            Applied::Inserted(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Applied::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_wire_format() {
        let op = Operation::Move {
            id: "a".to_string(),
            new_parent_id: Some("b".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "move", "id": "a", "newParentId": "b"})
        );

        let op: Operation = serde_json::from_value(json!({
            "op": "setHasMore",
            "parentId": null,
            "hasMore": true
        }))
        .unwrap();
        assert_eq!(
            op,
            Operation::SetHasMore {
                parent_id: None,
                has_more: true
            }
        );
        assert_eq!(op.name(), "set_has_more");
    }

    #[test]
    fn test_applied_helpers() {
        assert_eq!(
            Applied::Inserted("local-1".to_string()).inserted_id(),
            Some("local-1")
        );
        assert_eq!(Applied::Done.inserted_id(), None);
        assert!(Applied::Ignored.is_ignored());
    }
}
