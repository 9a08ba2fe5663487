//! Whole-world tests for the tick driver.
//!
//! - `determinism.rs`: same seed and inputs give the same state hash
//! - `integration.rs`: end-to-end scenarios through [`Simulation::step`](crate::Simulation::step)
//! - `properties.rs`: randomized invariants of the table and the grid
//! - `helpers.rs`: world and entity factories

mod helpers;

// Re-export for convenience
pub use helpers::*;
