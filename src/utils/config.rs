use crate::core::SYMMETRY_TOLERANCE;
use crate::processing::kalman::FilterOptions;
use crate::processing::linalg::is_symmetric;
use crate::processing::presets::{
    self, ConfiguredFilter, CustomLinearParams, KinematicParams, PositionVelocityParams, RadarParams,
    VoltageParams,
};
use crate::validation::FilterError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which model to build, with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterPreset {
    Voltage(VoltageParams),
    PositionFromPositionVelocity(PositionVelocityParams),
    VelocityFromPosition(KinematicParams),
    PositionFromVelocity(KinematicParams),
    RadarRange(RadarParams),
    CustomLinear(CustomLinearParams),
}

impl FilterPreset {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            FilterPreset::Voltage(_) => "voltage",
            FilterPreset::PositionFromPositionVelocity(_) => "position_from_position_velocity",
            FilterPreset::VelocityFromPosition(_) => "velocity_from_position",
            FilterPreset::PositionFromVelocity(_) => "position_from_velocity",
            FilterPreset::RadarRange(_) => "radar_range",
            FilterPreset::CustomLinear(_) => "custom_linear",
        }
    }

    /// Sampling interval, if the preset has one
    pub fn dt(&self) -> Option<f64> {
        match self {
            FilterPreset::Voltage(p) => Some(p.dt),
            FilterPreset::PositionFromPositionVelocity(p) => Some(p.dt),
            FilterPreset::VelocityFromPosition(p) | FilterPreset::PositionFromVelocity(p) => Some(p.dt),
            FilterPreset::RadarRange(p) => Some(p.dt),
            FilterPreset::CustomLinear(p) => p.dt,
        }
    }
}

/// Complete filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub preset: FilterPreset,
    #[serde(default)]
    pub options: FilterOptions,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid parameter value
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    IoError { message: String },
    /// JSON serialization/deserialization error
    SerializationError { message: String },
    /// The parameters do not describe a consistent model
    Model { error: FilterError },
}

impl From<FilterError> for ConfigError {
    fn from(error: FilterError) -> Self {
        ConfigError::Model { error }
    }
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl FilterConfig {
    pub fn new(preset: FilterPreset) -> Self {
        Self {
            preset,
            options: FilterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse filter config: {}", e),
        })
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize filter config: {}", e),
        })
    }

    /// Load and validate configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config = Self::from_json(&content)?;
        let validation = config.validate();
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = self.to_json()?;
        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    /// Check parameter ranges; shape consistency is checked by `build`
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Some(dt) = self.preset.dt() {
            if !dt.is_finite() || dt <= 0.0 {
                errors.push(invalid("dt", dt, "Sampling interval must be positive and finite"));
            }
        }

        let epsilon = self.options.singularity_epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            errors.push(invalid(
                "singularity_epsilon",
                epsilon,
                "Singularity threshold must be non-negative and finite",
            ));
        }
        if !self.options.symmetrize_covariance {
            warnings.push("Covariance symmetrization disabled; P may drift from symmetry".to_string());
        }

        let (initial_covariance, variances, measurement_variances) = self.noise_summary();
        if let Some(p) = initial_covariance {
            if !p.is_finite() || p < 0.0 {
                errors.push(invalid("initial_covariance", p, "Initial covariance scale must be non-negative"));
            }
        }
        for q in variances {
            if !q.is_finite() || q < 0.0 {
                errors.push(invalid("process_noise", q, "Process noise variances must be non-negative"));
            }
        }
        for r in measurement_variances {
            if !r.is_finite() || r < 0.0 {
                errors.push(invalid(
                    "measurement_noise",
                    r,
                    "Measurement noise variances must be non-negative",
                ));
            } else if r == 0.0 {
                warnings.push(format!(
                    "Zero measurement noise in preset '{}' can make the innovation covariance singular",
                    self.preset.name()
                ));
            }
        }

        for (name, matrix) in self.covariance_matrices() {
            if !is_symmetric(&matrix, SYMMETRY_TOLERANCE) {
                warnings.push(format!("{} is not symmetric; the filter assumes a covariance", name));
            }
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Initial covariance scale, process noise diagonal and measurement noise diagonal
    fn noise_summary(&self) -> (Option<f64>, Vec<f64>, Vec<f64>) {
        fn diag<const N: usize>(m: &[[f64; N]; N]) -> Vec<f64> {
            (0..N).map(|i| m[i][i]).collect()
        }
        fn diag_rows(m: &[Vec<f64>]) -> Vec<f64> {
            m.iter().enumerate().filter_map(|(i, row)| row.get(i).copied()).collect()
        }

        match &self.preset {
            FilterPreset::Voltage(p) => (
                Some(p.initial_covariance),
                vec![p.process_noise],
                vec![p.measurement_noise],
            ),
            FilterPreset::PositionFromPositionVelocity(p) => (
                Some(p.initial_covariance),
                diag(&p.process_noise),
                diag(&p.measurement_noise),
            ),
            FilterPreset::VelocityFromPosition(p) | FilterPreset::PositionFromVelocity(p) => (
                Some(p.initial_covariance),
                diag(&p.process_noise),
                vec![p.measurement_noise],
            ),
            FilterPreset::RadarRange(p) => (
                Some(p.initial_covariance),
                diag(&p.process_noise),
                vec![p.measurement_noise],
            ),
            FilterPreset::CustomLinear(p) => (
                None,
                diag_rows(&p.process_noise),
                diag_rows(&p.measurement_noise),
            ),
        }
    }

    /// Full covariance matrices given in the configuration; ragged rows are left to `build`
    fn covariance_matrices(&self) -> Vec<(&'static str, DMatrix<f64>)> {
        fn square<const N: usize>(m: &[[f64; N]; N]) -> DMatrix<f64> {
            DMatrix::from_fn(N, N, |i, j| m[i][j])
        }

        match &self.preset {
            FilterPreset::Voltage(_) => Vec::new(),
            FilterPreset::PositionFromPositionVelocity(p) => vec![
                ("process_noise", square(&p.process_noise)),
                ("measurement_noise", square(&p.measurement_noise)),
            ],
            FilterPreset::VelocityFromPosition(p) | FilterPreset::PositionFromVelocity(p) => {
                vec![("process_noise", square(&p.process_noise))]
            }
            FilterPreset::RadarRange(p) => vec![("process_noise", square(&p.process_noise))],
            FilterPreset::CustomLinear(p) => [
                ("process_noise", &p.process_noise),
                ("measurement_noise", &p.measurement_noise),
                ("initial_covariance", &p.initial_covariance),
            ]
            .into_iter()
            .filter_map(|(name, rows)| presets::rows_to_matrix(name, rows).ok().map(|m| (name, m)))
            .collect(),
        }
    }

    /// Validate and build the configured filter
    pub fn build(&self) -> Result<ConfiguredFilter, ConfigError> {
        let validation = self.validate();
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }

        let filter = match &self.preset {
            FilterPreset::Voltage(p) => ConfiguredFilter::Linear(presets::voltage(p)?),
            FilterPreset::PositionFromPositionVelocity(p) => {
                ConfiguredFilter::Linear(presets::position_from_position_velocity(p)?)
            }
            FilterPreset::VelocityFromPosition(p) => ConfiguredFilter::Linear(presets::velocity_from_position(p)?),
            FilterPreset::PositionFromVelocity(p) => ConfiguredFilter::Linear(presets::position_from_velocity(p)?),
            FilterPreset::RadarRange(p) => ConfiguredFilter::Radar(presets::radar_range(p)?),
            FilterPreset::CustomLinear(p) => ConfiguredFilter::Linear(presets::custom_linear(p)?),
        };
        Ok(filter.with_options(self.options))
    }
}

fn invalid(parameter: &str, value: f64, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::IoError { message } => {
                write!(f, "I/O error: {}", message)
            }
            ConfigError::SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
            ConfigError::Model { error } => {
                write!(f, "Model error: {}", error)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
