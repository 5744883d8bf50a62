//! Filter error types and recovery classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised while constructing or stepping a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterError {
    /// A matrix or vector does not have the shape the model requires
    DimensionMismatch {
        what: String,
        expected: (usize, usize),
        found: (usize, usize),
        #[serde(default)]
        source: InputSource,
    },
    /// H Pp H^T + R could not be inverted
    SingularInnovationCovariance { determinant: f64 },
    /// Nonlinear measurement function or its Jacobian is undefined at the state
    UndefinedLinearization { reason: String },
    /// NaN or infinity in an input
    NonFiniteInput {
        what: String,
        #[serde(default)]
        source: InputSource,
    },
}

/// Where a rejected input came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    /// Matrices, initial conditions or the measurement model
    #[default]
    Model,
    /// The measurement passed to a step
    Measurement,
}

/// What a caller should do after a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// Drop this measurement and keep the prior estimate
    DiscardMeasurement,
    /// The model itself is malformed and has to be rebuilt
    FixModel,
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

impl FilterError {
    pub fn dimension_mismatch(what: impl Into<String>, expected: (usize, usize), found: (usize, usize)) -> Self {
        FilterError::DimensionMismatch {
            what: what.into(),
            expected,
            found,
            source: InputSource::Model,
        }
    }

    pub fn non_finite(what: impl Into<String>) -> Self {
        FilterError::NonFiniteInput {
            what: what.into(),
            source: InputSource::Model,
        }
    }

    /// Attribute the error to the step's measurement rather than the model
    pub fn for_measurement(self) -> Self {
        match self {
            FilterError::DimensionMismatch { what, expected, found, .. } => FilterError::DimensionMismatch {
                what,
                expected,
                found,
                source: InputSource::Measurement,
            },
            FilterError::NonFiniteInput { what, .. } => FilterError::NonFiniteInput {
                what,
                source: InputSource::Measurement,
            },
            other => other,
        }
    }

    pub fn undefined_linearization(reason: impl Into<String>) -> Self {
        FilterError::UndefinedLinearization { reason: reason.into() }
    }

    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            FilterError::DimensionMismatch { source, .. } | FilterError::NonFiniteInput { source, .. } => {
                match source {
                    InputSource::Measurement => RecoveryStrategy::DiscardMeasurement,
                    InputSource::Model => RecoveryStrategy::FixModel,
                }
            }
            FilterError::SingularInnovationCovariance { .. } => RecoveryStrategy::DiscardMeasurement,
            FilterError::UndefinedLinearization { .. } => RecoveryStrategy::DiscardMeasurement,
        }
    }

    /// Check if the filter stays usable after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::DiscardMeasurement)
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::DimensionMismatch { what, expected, found, .. } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}x{}, found {}x{}",
                    what, expected.0, expected.1, found.0, found.1
                )
            }
            FilterError::SingularInnovationCovariance { determinant } => {
                write!(f, "Innovation covariance is singular (determinant {:e})", determinant)
            }
            FilterError::UndefinedLinearization { reason } => {
                write!(f, "Measurement linearization undefined: {}", reason)
            }
            FilterError::NonFiniteInput { what, .. } => {
                write!(f, "Non-finite value in {}", what)
            }
        }
    }
}

impl std::error::Error for FilterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_errors_are_recoverable() {
        let errors = vec![
            FilterError::dimension_mismatch("z", (1, 1), (2, 1)).for_measurement(),
            FilterError::SingularInnovationCovariance { determinant: 0.0 },
            FilterError::undefined_linearization("slant range is zero"),
            FilterError::non_finite("z").for_measurement(),
        ];
        for error in errors {
            assert!(error.is_recoverable(), "{} should be recoverable", error);
        }
    }

    #[test]
    fn test_construction_errors_require_model_fix() {
        let error = FilterError::dimension_mismatch("process noise Q", (2, 2), (3, 3));
        assert_eq!(error.recovery_strategy(), RecoveryStrategy::FixModel);
        assert!(!error.is_recoverable());
        assert_eq!(
            FilterError::non_finite("initial state").recovery_strategy(),
            RecoveryStrategy::FixModel
        );
    }

    #[test]
    fn test_recovery_follows_source_not_label() {
        // A model error labelled "measurement" is still a model error
        let model = FilterError::dimension_mismatch("measurement", (1, 1), (2, 1));
        assert_eq!(model.recovery_strategy(), RecoveryStrategy::FixModel);

        let renamed = FilterError::dimension_mismatch("observation z", (1, 1), (2, 1)).for_measurement();
        assert_eq!(renamed.recovery_strategy(), RecoveryStrategy::DiscardMeasurement);

        let unchanged = FilterError::undefined_linearization("origin").for_measurement();
        assert_eq!(unchanged, FilterError::undefined_linearization("origin"));
    }

    #[test]
    fn test_source_defaults_to_model_when_deserialized() {
        let json = r#"{"NonFiniteInput":{"what":"Q"}}"#;
        let error: FilterError = serde_json::from_str(json).unwrap();
        assert_eq!(error, FilterError::non_finite("Q"));
    }

    #[test]
    fn test_display_messages() {
        let error = FilterError::dimension_mismatch("measurement", (1, 1), (2, 1));
        assert_eq!(error.to_string(), "Dimension mismatch for measurement: expected 1x1, found 2x1");

        let error = FilterError::undefined_linearization("range is zero");
        assert!(error.to_string().contains("range is zero"));
    }
}
