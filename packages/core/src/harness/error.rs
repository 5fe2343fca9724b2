//! Variant Harness Error Types

use crate::cache::CacheError;
use crate::config::CacheVariant;
use thiserror::Error;

/// Errors raised while replaying a workload across cache variants
#[derive(Error, Debug)]
pub enum HarnessError {
    /// A variant produced different results from the baseline variant
    #[error("Variant {variant} diverged at {operation}: {detail}")]
    VariantDivergence {
        variant: CacheVariant,
        operation: String,
        detail: String,
    },

    /// A variant's indices violate the cache invariants
    #[error("Variant {variant} violates cache invariants: {}", .violations.join("; "))]
    InvariantViolation {
        variant: CacheVariant,
        violations: Vec<String>,
    },

    /// The cache rejected a scripted operation
    #[error("Variant {variant} rejected operation #{index}: {source}")]
    Rejected {
        variant: CacheVariant,
        index: usize,
        #[source]
        source: CacheError,
    },

    /// Cache configuration failed validation
    #[error("Cache configuration error: {0}")]
    Config(#[from] CacheError),

    /// Workload configuration failed validation
    #[error("Invalid workload: {0}")]
    Workload(String),
}

impl HarnessError {
    /// Create a divergence error
    pub fn divergence(
        variant: CacheVariant,
        operation: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::VariantDivergence {
            variant,
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Create an invalid workload error
    pub fn workload(msg: impl Into<String>) -> Self {
        Self::Workload(msg.into())
    }
}
