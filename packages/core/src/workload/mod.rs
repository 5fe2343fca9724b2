//! Synthetic workloads
//!
//! - [`generate_fixture`] - seeded trees mixing wide, balanced and deep shapes
//! - [`Fixture::pages`] - the fixture split into shuffled page batches
//! - [`build_script`] - seeded mutation scripts replayable on any cache variant

mod fixture;
mod script;

pub use fixture::{fixture_epoch, generate_fixture, Fixture, PageBatch};
pub use script::build_script;
