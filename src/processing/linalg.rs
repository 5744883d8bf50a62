//! Small dense linear algebra helpers used by the filter recursion

use crate::validation::{FilterError, FilterResult};
use nalgebra::DMatrix;
use tracing::trace;

/// Invert the innovation covariance S.
///
/// 1x1 matrices use the reciprocal. Larger matrices are rejected when the
/// determinant of S scaled to unit diagonal is within `epsilon` of zero, or
/// when `try_inverse` fails. The scaled determinant lies in [0, 1] for a
/// covariance and does not depend on the units of the measurement.
pub fn invert_innovation(s: &DMatrix<f64>, epsilon: f64) -> FilterResult<DMatrix<f64>> {
    if s.nrows() != s.ncols() {
        return Err(FilterError::dimension_mismatch(
            "innovation covariance",
            (s.nrows(), s.nrows()),
            s.shape(),
        ));
    }

    if s.nrows() == 1 {
        let value = s[(0, 0)];
        let reciprocal = 1.0 / value;
        if !value.is_finite() || value == 0.0 || !reciprocal.is_finite() {
            return Err(FilterError::SingularInnovationCovariance { determinant: value });
        }
        return Ok(DMatrix::from_element(1, 1, reciprocal));
    }

    let determinant = s.determinant();
    let scaled = scaled_determinant(s);
    trace!(determinant, scaled, "innovation covariance");
    if !determinant.is_finite() || !scaled.is_finite() || scaled.abs() <= epsilon {
        return Err(FilterError::SingularInnovationCovariance { determinant });
    }

    s.clone()
        .try_inverse()
        .filter(|inverse| inverse.iter().all(|v| v.is_finite()))
        .ok_or(FilterError::SingularInnovationCovariance { determinant })
}

/// det(D^-1/2 S D^-1/2) with D = diag(|S|); zero when a diagonal entry is zero
fn scaled_determinant(s: &DMatrix<f64>) -> f64 {
    let scale: Vec<f64> = s.diagonal().iter().map(|d| d.abs().sqrt()).collect();
    if scale.iter().any(|d| *d == 0.0) {
        return 0.0;
    }
    DMatrix::from_fn(s.nrows(), s.ncols(), |i, j| s[(i, j)] / (scale[i] * scale[j])).determinant()
}

/// (P + P^T) / 2
pub fn symmetrize(p: &DMatrix<f64>) -> DMatrix<f64> {
    (p + p.transpose()) * 0.5
}

/// Check symmetry entrywise within `tolerance`
pub fn is_symmetric(p: &DMatrix<f64>, tolerance: f64) -> bool {
    if p.nrows() != p.ncols() {
        return false;
    }
    (0..p.nrows()).all(|i| (0..i).all(|j| (p[(i, j)] - p[(j, i)]).abs() <= tolerance))
}

/// Constant-velocity transition: identity with `dt` coupling velocity (index 1) into position (index 0)
pub fn constant_velocity_transition(dt: f64, n: usize) -> DMatrix<f64> {
    let mut a = DMatrix::identity(n, n);
    if n >= 2 {
        a[(0, 1)] = dt;
    }
    a
}

/// Diagonal matrix from a slice
pub fn diagonal(values: &[f64]) -> DMatrix<f64> {
    let n = values.len();
    DMatrix::from_fn(n, n, |i, j| if i == j { values[i] } else { 0.0 })
}
