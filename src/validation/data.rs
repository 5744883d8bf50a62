//! Shape and finiteness checks for model inputs

use crate::validation::error::{FilterError, FilterResult};
use nalgebra::{DMatrix, DVector};

/// Require an n x n matrix
pub fn check_square(what: &str, m: &DMatrix<f64>, n: usize) -> FilterResult<()> {
    check_shape(what, m, n, n)
}

/// Require a rows x cols matrix
pub fn check_shape(what: &str, m: &DMatrix<f64>, rows: usize, cols: usize) -> FilterResult<()> {
    if m.nrows() != rows || m.ncols() != cols {
        return Err(FilterError::dimension_mismatch(what, (rows, cols), m.shape()));
    }
    Ok(())
}

/// Require a column vector of length n
pub fn check_vector(what: &str, v: &DVector<f64>, n: usize) -> FilterResult<()> {
    if v.len() != n {
        return Err(FilterError::dimension_mismatch(what, (n, 1), (v.len(), 1)));
    }
    Ok(())
}

/// Reject NaN and infinite entries
pub fn check_finite<'a, I>(what: &str, values: I) -> FilterResult<()>
where
    I: IntoIterator<Item = &'a f64>,
{
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(FilterError::non_finite(what))
    }
}

/// Require a finite measurement of length m; failures are attributed to the measurement
pub fn check_measurement(measurement: &DVector<f64>, m: usize) -> FilterResult<()> {
    check_vector("measurement", measurement, m)
        .and_then(|_| check_finite("measurement", measurement.iter()))
        .map_err(FilterError::for_measurement)
}
