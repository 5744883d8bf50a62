//! Core types and constants for the state estimators

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
