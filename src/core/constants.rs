//! Numerical constants shared by the filters

/// Innovation covariances whose unit-diagonal determinant is at or below this are singular
pub const DEFAULT_SINGULARITY_EPSILON: f64 = 1e-12;

/// Largest |P_ij - P_ji| a configured covariance may have before validation warns
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Slant ranges at or below this value make the radar linearization undefined (meters)
pub const MIN_SLANT_RANGE: f64 = 1e-9;
