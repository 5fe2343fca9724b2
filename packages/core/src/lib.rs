//! Outline Core: incremental tree cache for virtualized outlines
//!
//! This crate keeps a partially loaded tree in memory and turns it into the
//! ordered rows a virtualized list renders. Pages of children arrive from an
//! asynchronous fetch layer in any order; local edits arrive as [`Operation`]s.
//!
//! # Architecture
//!
//! - **Incremental indices**: node table, child/root index and dangling index are
//!   updated per operation, never rebuilt
//! - **Optional capabilities**: a depth cache and an eviction store, chosen once
//!   per cache through [`CacheConfig`]
//! - **Single-flight fetches**: at most one outstanding page request per parent
//! - **Deterministic workloads**: seeded fixtures and mutation scripts replayed
//!   against all four [`CacheVariant`]s
//!
//! # Modules
//!
//! - [`cache`] - The [`TreeCache`] and its indices
//! - [`models`] - Node records, pagination state and flattened rows
//! - [`operations`] - The mutation vocabulary
//! - [`fetch`] - Async page source boundary and loaders
//! - [`workload`] - Synthetic fixtures and mutation scripts
//! - [`harness`] - Cross-variant comparison and timing metrics
//! - [`config`] - Cache and workload configuration

pub mod cache;
pub mod config;
pub mod fetch;
pub mod harness;
pub mod models;
pub mod operations;
pub mod workload;

// Re-export commonly used types
pub use cache::{CacheError, CacheStats, TreeCache, UpsertOutcome};
pub use config::{CacheConfig, CacheVariant, WorkloadConfig};
pub use fetch::{
    admit, load_all, load_all_shared, load_next_page, load_next_page_shared, FixturePageSource,
    Page, PageSource, PendingFetch, SharedCache,
};
pub use harness::{HarnessError, HarnessReport, MetricsCollector, VariantHarness};
pub use models::{Node, NodeId, NodeMeta, PageInfo, RootMeta, Row};
pub use operations::{Applied, Operation};
pub use workload::{build_script, generate_fixture, Fixture};
