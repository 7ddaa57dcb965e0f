//! Tally Types - Foundation domain types
//!
//! Shared read-model types consumed by the smart-accounting pipeline:
//! transaction categories, budgets, account books, and the workspace
//! error type. This crate has no dependency on any other tally crate.

pub mod account;
pub mod budget;
pub mod category;
pub mod error;

pub use account::*;
pub use budget::*;
pub use category::*;
pub use error::*;
