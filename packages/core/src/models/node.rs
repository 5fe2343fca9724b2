//! Node Data Structures
//!
//! This module defines the records the tree cache stores and hands back to callers:
//!
//! - [`Node`] - one row of the outline as delivered by the fetch layer
//! - [`PageInfo`] - pagination state for one parent (or the root list)
//! - [`NodeMeta`] / [`RootMeta`] - per-parent child index entries
//! - [`Row`] - one line of the flattened, virtualized view
//!
//! # Examples
//!
//! ```rust
//! use outline_core::models::Node;
//! use chrono::{TimeZone, Utc};
//!
//! let created = Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap();
//! let node = Node::new("a", Some("parent".to_string()), "Buy milk", created);
//! assert_eq!(node.parent_id.as_deref(), Some("parent"));
//! assert!(!node.has_children);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a node. Opaque to the cache apart from equality and ordering.
pub type NodeId = String;

/// A single outline node.
///
/// # Fields
///
/// - `id`: Unique identifier
/// - `parent_id`: Parent node (`None` means the node is a root)
/// - `title`: Display text, carried through untouched
/// - `created_at`: Sibling ordering key (newest first)
/// - `has_children`: Derived by the cache from its child indices; any value
///   supplied by the fetch layer is ignored on upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,

    /// Parent node ID (`None` for roots)
    pub parent_id: Option<NodeId>,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Creation timestamp, primary sibling ordering key
    pub created_at: DateTime<Utc>,

    /// Whether the node currently has visible or evicted children
    #[serde(default)]
    pub has_children: bool,
}

impl Node {
    /// Create a node record with `has_children = false`.
    pub fn new(
        id: impl Into<NodeId>,
        parent_id: Option<NodeId>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id,
            title: title.into(),
            created_at,
            has_children: false,
        }
    }

    /// Whether the node sits at the top level of the outline
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Pagination state reported by the fetch layer for one parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// More children exist beyond what has been loaded
    pub has_more: bool,

    /// Opaque cursor for the next page, if any
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl PageInfo {
    /// The final page of a listing
    pub fn last() -> Self {
        Self::default()
    }

    /// A page followed by more data at `cursor`
    pub fn more(cursor: impl Into<String>) -> Self {
        Self {
            has_more: true,
            next_cursor: Some(cursor.into()),
        }
    }
}

/// Child index entry for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    /// Visible children in sibling order
    pub children_ids: Vec<NodeId>,

    /// Expansion state in the view
    pub is_expanded: bool,

    /// Pagination state for this node's children
    pub page: PageInfo,
}

impl NodeMeta {
    pub fn new(is_expanded: bool) -> Self {
        Self {
            children_ids: Vec::new(),
            is_expanded,
            page: PageInfo::default(),
        }
    }
}

/// Child index entry for the top level. Roots are always "expanded".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootMeta {
    pub children_ids: Vec<NodeId>,
    pub page: PageInfo,
}

/// One line of the flattened view consumed by a virtualized list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Row {
    /// A node rendered at `depth`
    Node { id: NodeId, depth: usize },

    /// Placeholder that triggers loading the next page of `parent_id`
    /// (`None` for the root list)
    #[serde(rename_all = "camelCase")]
    LoadMore {
        parent_id: Option<NodeId>,
        depth: usize,
    },
}

impl Row {
    /// Depth of the row in the view
    pub fn depth(&self) -> usize {
        match self {
            Row::Node { depth, .. } | Row::LoadMore { depth, .. } => *depth,
        }
    }

    /// Node id for `Row::Node`, `None` for placeholders
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Row::Node { id, .. } => Some(id),
            Row::LoadMore { .. } => None,
        }
    }
}
