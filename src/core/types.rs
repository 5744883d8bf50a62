//! Core data types for the state estimators

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Semantic layout of a state vector.
///
/// Purely a read-only view: named quantities are pulled out of the state by
/// fixed index and carry no separate state of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateLayout {
    /// No named components
    Generic,
    /// `[voltage]`
    Voltage,
    /// `[position, velocity]`
    PositionVelocity,
    /// `[horizontal position, velocity, altitude]`
    PositionVelocityAltitude,
}

impl StateLayout {
    /// Index of the position component, if the layout has one
    pub fn position_index(&self) -> Option<usize> {
        match self {
            StateLayout::PositionVelocity | StateLayout::PositionVelocityAltitude => Some(0),
            _ => None,
        }
    }

    /// Index of the velocity component, if the layout has one
    pub fn velocity_index(&self) -> Option<usize> {
        match self {
            StateLayout::PositionVelocity | StateLayout::PositionVelocityAltitude => Some(1),
            _ => None,
        }
    }

    /// Index of the altitude component, if the layout has one
    pub fn altitude_index(&self) -> Option<usize> {
        match self {
            StateLayout::PositionVelocityAltitude => Some(2),
            _ => None,
        }
    }

    /// Index of the voltage component, if the layout has one
    pub fn voltage_index(&self) -> Option<usize> {
        match self {
            StateLayout::Voltage => Some(0),
            _ => None,
        }
    }

    /// State dimension implied by the layout (`None` for generic states)
    pub fn state_dim(&self) -> Option<usize> {
        match self {
            StateLayout::Generic => None,
            StateLayout::Voltage => Some(1),
            StateLayout::PositionVelocity => Some(2),
            StateLayout::PositionVelocityAltitude => Some(3),
        }
    }
}

/// Initial error covariance supplied at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitialCovariance {
    /// Scalar multiple of the identity
    Scaled(f64),
    /// Explicit n x n matrix
    Matrix(DMatrix<f64>),
}

impl InitialCovariance {
    /// Expand into an n x n matrix
    pub fn to_matrix(&self, n: usize) -> DMatrix<f64> {
        match self {
            InitialCovariance::Scaled(scale) => DMatrix::identity(n, n) * *scale,
            InitialCovariance::Matrix(p) => p.clone(),
        }
    }
}

impl From<f64> for InitialCovariance {
    fn from(scale: f64) -> Self {
        InitialCovariance::Scaled(scale)
    }
}

impl From<DMatrix<f64>> for InitialCovariance {
    fn from(p: DMatrix<f64>) -> Self {
        InitialCovariance::Matrix(p)
    }
}

/// Result of one successful filter step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Updated state vector x
    pub state: DVector<f64>,
    /// Updated error covariance P
    pub covariance: DMatrix<f64>,
    /// Kalman gain K used for this update (n x m)
    pub gain: DMatrix<f64>,
    /// Innovation z - h(xp)
    pub innovation: DVector<f64>,
    /// Innovation covariance S = H Pp H^T + R
    pub innovation_covariance: DMatrix<f64>,
    /// Semantic layout of `state`
    pub layout: StateLayout,
}

impl Estimate {
    /// State component by index
    pub fn component(&self, index: usize) -> Option<f64> {
        self.state.get(index).copied()
    }

    /// Diagonal covariance entry by index
    pub fn variance(&self, index: usize) -> Option<f64> {
        if index < self.covariance.nrows() {
            Some(self.covariance[(index, index)])
        } else {
            None
        }
    }

    /// Standard deviation of a state component
    pub fn standard_deviation(&self, index: usize) -> Option<f64> {
        self.variance(index).map(|v| v.max(0.0).sqrt())
    }

    /// Sum of the covariance diagonal
    pub fn covariance_trace(&self) -> f64 {
        self.covariance.trace()
    }

    pub fn position(&self) -> Option<f64> {
        self.layout.position_index().and_then(|i| self.component(i))
    }

    pub fn velocity(&self) -> Option<f64> {
        self.layout.velocity_index().and_then(|i| self.component(i))
    }

    pub fn altitude(&self) -> Option<f64> {
        self.layout.altitude_index().and_then(|i| self.component(i))
    }

    pub fn voltage(&self) -> Option<f64> {
        self.layout.voltage_index().and_then(|i| self.component(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(layout: StateLayout, state: &[f64]) -> Estimate {
        let n = state.len();
        Estimate {
            state: DVector::from_column_slice(state),
            covariance: DMatrix::from_fn(n, n, |i, j| if i == j { (i + 1) as f64 * 4.0 } else { 0.0 }),
            gain: DMatrix::zeros(n, 1),
            innovation: DVector::zeros(1),
            innovation_covariance: DMatrix::identity(1, 1),
            layout,
        }
    }

    #[test]
    fn test_named_components_follow_layout() {
        let radar = estimate(StateLayout::PositionVelocityAltitude, &[10.0, 90.0, 1100.0]);
        assert_eq!(radar.position(), Some(10.0));
        assert_eq!(radar.velocity(), Some(90.0));
        assert_eq!(radar.altitude(), Some(1100.0));
        assert_eq!(radar.voltage(), None);

        let battery = estimate(StateLayout::Voltage, &[14.0]);
        assert_eq!(battery.voltage(), Some(14.0));
        assert_eq!(battery.position(), None);
    }

    #[test]
    fn test_variance_and_standard_deviation() {
        let est = estimate(StateLayout::PositionVelocity, &[0.0, 20.0]);
        assert_eq!(est.variance(1), Some(8.0));
        assert_eq!(est.standard_deviation(0), Some(2.0));
        assert_eq!(est.variance(2), None);
        assert!((est.covariance_trace() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_initial_covariance_expansion() {
        let p = InitialCovariance::Scaled(5.0).to_matrix(2);
        assert_eq!(p, DMatrix::identity(2, 2) * 5.0);
        assert_eq!(StateLayout::PositionVelocity.state_dim(), Some(2));
        assert_eq!(StateLayout::Generic.state_dim(), None);
    }
}
