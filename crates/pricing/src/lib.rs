//! Pricing module.
//!
//! Recomputes order totals from current stock price cards. Independent of
//! the inventory counters.

pub mod recalculator;

pub use recalculator::{CREDIT_SURCHARGE_PCT, PricingRecalculator};
