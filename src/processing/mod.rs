//! Filter recursion, measurement models and named presets

pub mod extended;
pub mod kalman;
pub mod linalg;
pub mod model;
pub mod presets;
pub mod runner;

pub use extended::{ExtendedKalmanFilter, FnMeasurement, RadarRange};
pub use kalman::{FilterOptions, KalmanFilter, LinearKalmanFilter};
pub use model::{LinearMeasurement, MeasurementModel};
pub use presets::ConfiguredFilter;
pub use runner::{FilterRunner, Rejection, RunSummary};
