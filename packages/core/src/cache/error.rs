//! Tree Cache Error Types
//!
//! Almost every cache operation is total: unknown ids are parked or ignored
//! rather than rejected. The errors here cover the remaining cases that must
//! not be absorbed silently.

use thiserror::Error;

/// Tree cache errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Moving `id` under `target` would put it beneath itself
    #[error("Cyclic move rejected: {target} is {id} or one of its descendants")]
    CyclicMove { id: String, target: String },

    /// Configuration failed validation
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Create a cyclic move error
    pub fn cyclic_move(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self::CyclicMove {
            id: id.into(),
            target: target.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
