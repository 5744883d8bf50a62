//! Extended Kalman filter: nonlinear measurement models linearized every step.
//!
//! The recursion is the one in [`KalmanFilter`]; only the measurement model
//! differs. The innovation uses the nonlinear prediction h(xp) and the gain
//! uses the Jacobian evaluated at the predicted state xp.

use crate::core::MIN_SLANT_RANGE;
use crate::processing::kalman::KalmanFilter;
use crate::processing::model::MeasurementModel;
use crate::validation::{check_vector, FilterError, FilterResult};
use nalgebra::{DMatrix, DVector};

/// Kalman filter whose measurement model is linearized at each predicted state
pub type ExtendedKalmanFilter<M> = KalmanFilter<M>;

/// Measurement model built from caller-supplied h(x) and Jacobian J(x)
pub struct FnMeasurement<H, J> {
    state_dim: usize,
    measurement_dim: usize,
    measure: H,
    jacobian: J,
}

impl<H, J> FnMeasurement<H, J>
where
    H: Fn(&DVector<f64>) -> FilterResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> FilterResult<DMatrix<f64>>,
{
    pub fn new(state_dim: usize, measurement_dim: usize, measure: H, jacobian: J) -> Self {
        Self {
            state_dim,
            measurement_dim,
            measure,
            jacobian,
        }
    }
}

impl<H, J> MeasurementModel for FnMeasurement<H, J>
where
    H: Fn(&DVector<f64>) -> FilterResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> FilterResult<DMatrix<f64>>,
{
    fn state_dim(&self) -> usize {
        self.state_dim
    }

    fn measurement_dim(&self) -> usize {
        self.measurement_dim
    }

    fn predict(&self, state: &DVector<f64>) -> FilterResult<DVector<f64>> {
        (self.measure)(state)
    }

    fn jacobian(&self, state: &DVector<f64>) -> FilterResult<DMatrix<f64>> {
        (self.jacobian)(state)
    }
}

/// Slant range to a target with state `[horizontal position, velocity, altitude]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarRange {
    min_range: f64,
}

impl Default for RadarRange {
    fn default() -> Self {
        Self {
            min_range: MIN_SLANT_RANGE,
        }
    }
}

impl RadarRange {
    /// Model that treats ranges at or below `min_range` as undefined
    pub fn with_min_range(min_range: f64) -> Self {
        Self { min_range }
    }

    /// sqrt(x0^2 + x2^2)
    pub fn slant_range(&self, state: &DVector<f64>) -> FilterResult<f64> {
        check_vector("radar state", state, 3)?;
        let range = state[0].hypot(state[2]);
        if !range.is_finite() {
            return Err(FilterError::undefined_linearization("slant range is not finite"));
        }
        if range <= self.min_range {
            return Err(FilterError::undefined_linearization(format!(
                "slant range {:e} is at the origin; position and altitude are both zero",
                range
            )));
        }
        Ok(range)
    }
}

impl MeasurementModel for RadarRange {
    fn state_dim(&self) -> usize {
        3
    }

    fn measurement_dim(&self) -> usize {
        1
    }

    fn predict(&self, state: &DVector<f64>) -> FilterResult<DVector<f64>> {
        Ok(DVector::from_element(1, self.slant_range(state)?))
    }

    fn jacobian(&self, state: &DVector<f64>) -> FilterResult<DMatrix<f64>> {
        let range = self.slant_range(state)?;
        Ok(DMatrix::from_row_slice(1, 3, &[state[0] / range, 0.0, state[2] / range]))
    }
}
