//! Discrete-time Kalman state estimators
//!
//! A linear Kalman filter with constant system matrices and an extended
//! variant that linearizes a nonlinear measurement model at every predicted
//! state, sharing one predict/update recursion. Named presets cover a scalar
//! voltage filter, position/velocity filters and radar slant-range tracking.

pub mod core;
pub mod processing;
pub mod validation;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{Estimate, InitialCovariance, StateLayout};
pub use processing::{
    ConfiguredFilter, ExtendedKalmanFilter, FilterOptions, FilterRunner, FnMeasurement, KalmanFilter,
    LinearKalmanFilter, LinearMeasurement, MeasurementModel, RadarRange, RunSummary,
};
pub use processing::presets::{
    CustomLinearParams, KinematicParams, PositionVelocityParams, RadarParams, VoltageParams,
};
pub use utils::{ConfigError, FilterConfig, FilterPreset};
pub use validation::{FilterError, FilterResult, InputSource, RecoveryStrategy};
