//! Data Models
//!
//! Records stored by the tree cache and the rows it produces:
//!
//! - `Node` - one outline node as delivered by the fetch layer
//! - `NodeMeta` / `RootMeta` - child index entries (visible order, expansion, pagination)
//! - `Row` - one line of the flattened view

mod node;

pub use node::{Node, NodeId, NodeMeta, PageInfo, RootMeta, Row};
