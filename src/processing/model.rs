//! Measurement models plugged into the shared Kalman recursion

use crate::validation::{check_finite, FilterError, FilterResult};
use nalgebra::{DMatrix, DVector};

/// A model that predicts a measurement from a state and linearizes itself at that state.
///
/// Linear models return a constant Jacobian; nonlinear models recompute it every step.
pub trait MeasurementModel {
    /// Dimension n of the state the model reads
    fn state_dim(&self) -> usize;

    /// Dimension m of the measurement the model produces
    fn measurement_dim(&self) -> usize;

    /// Predicted measurement h(x)
    fn predict(&self, state: &DVector<f64>) -> FilterResult<DVector<f64>>;

    /// m x n Jacobian of h evaluated at `state`
    fn jacobian(&self, state: &DVector<f64>) -> FilterResult<DMatrix<f64>>;
}

/// Constant measurement matrix H
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMeasurement {
    h: DMatrix<f64>,
}

impl LinearMeasurement {
    pub fn new(h: DMatrix<f64>) -> FilterResult<Self> {
        if h.nrows() == 0 || h.ncols() == 0 {
            return Err(FilterError::dimension_mismatch("measurement matrix H", (1, 1), h.shape()));
        }
        check_finite("measurement matrix H", h.iter())?;
        Ok(Self { h })
    }

    /// Single-row H from a slice
    pub fn row(coefficients: &[f64]) -> FilterResult<Self> {
        Self::new(DMatrix::from_row_slice(1, coefficients.len(), coefficients))
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.h
    }
}

impl MeasurementModel for LinearMeasurement {
    fn state_dim(&self) -> usize {
        self.h.ncols()
    }

    fn measurement_dim(&self) -> usize {
        self.h.nrows()
    }

    fn predict(&self, state: &DVector<f64>) -> FilterResult<DVector<f64>> {
        Ok(&self.h * state)
    }

    fn jacobian(&self, _state: &DVector<f64>) -> FilterResult<DMatrix<f64>> {
        Ok(self.h.clone())
    }
}
