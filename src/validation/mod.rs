//! Error types and input validation

pub mod data;
pub mod error;

pub use data::{check_finite, check_measurement, check_shape, check_square, check_vector};
pub use error::{FilterError, FilterResult, InputSource, RecoveryStrategy};
