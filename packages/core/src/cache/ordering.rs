//! Sibling ordering and the single list-merge primitive.
//!
//! Siblings are ordered newest first (`created_at` descending), ties broken by
//! id ascending. Every insertion into a child list, root list or eviction bucket
//! goes through [`merge_sorted`] so ordering and de-duplication live in one place.

use crate::models::{Node, NodeId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Compare two sibling records
pub fn compare_siblings(a: &Node, b: &Node) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Compare two sibling ids by their records.
///
/// Ids missing from the node table sort after every known id (as the oldest
/// possible entries), then by id, which keeps the order total.
pub fn compare_ids(a: &str, b: &str, nodes: &HashMap<NodeId, Node>) -> Ordering {
    let created_a = nodes.get(a).map(|n| n.created_at);
    let created_b = nodes.get(b).map(|n| n.created_at);
    created_b.cmp(&created_a).then_with(|| a.cmp(b))
}

/// Merge `incoming` ids into the sorted `list`. Ids already present are skipped.
///
/// Returns the number of ids actually added.
pub fn merge_sorted<I>(list: &mut Vec<NodeId>, incoming: I, nodes: &HashMap<NodeId, Node>) -> usize
where
    I: IntoIterator<Item = NodeId>,
{
    let mut added = 0;
    for id in incoming {
        match list.binary_search_by(|probe| compare_ids(probe, &id, nodes)) {
            Ok(_) => {}
            Err(pos) => {
                // Keys only change while a node is detached
                debug_assert!(!list.contains(&id), "{id} is listed under a stale key");
                list.insert(pos, id);
                added += 1;
            }
        }
    }
    added
}

/// Remove `id` from `list`, returning whether it was present
pub fn remove_id(list: &mut Vec<NodeId>, id: &str) -> bool {
    match list.iter().position(|x| x == id) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

/// Whether `list` is strictly ordered by the sibling comparator
pub fn is_sorted(list: &[NodeId], nodes: &HashMap<NodeId, Node>) -> bool {
    list.windows(2)
        .all(|pair| compare_ids(&pair[0], &pair[1], nodes) == Ordering::Less)
}
