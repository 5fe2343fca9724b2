//! Cross-variant comparison harness
//!
//! Replays one seeded workload on every [`CacheVariant`](crate::config::CacheVariant),
//! checks that they agree and collects timing metrics per operation.

mod error;
mod metrics;
mod runner;

pub use error::HarnessError;
pub use metrics::{MetricsCollector, MetricsStats, OperationMetric};
pub use runner::{HarnessReport, VariantHarness, VariantRun, FLATTEN_PHASE, LOAD_PHASE};
