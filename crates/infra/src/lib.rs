//! Infrastructure layer: administrative operations and pipeline wiring.

pub mod rebuild;

pub use rebuild::{LedgerRebuilder, REBUILD_RESPONSIBLE};

#[cfg(test)]
mod integration_tests;
