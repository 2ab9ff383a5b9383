//! Conversion catalog module.
//!
//! Maps product models to the conversion factor that translates ordered area
//! (m²) into native stock units. Read-only from the ledger's perspective.

pub mod catalog;
pub mod model;

pub use catalog::{ConversionCatalog, InMemoryCatalog};
pub use model::Model;
