//! Named filter configurations built on the shared recursion.
//!
//! Each preset is just a choice of A, H, Q, R, dt and initial conditions.

use crate::core::{Estimate, StateLayout};
use crate::processing::extended::{ExtendedKalmanFilter, RadarRange};
use crate::processing::kalman::{FilterOptions, KalmanFilter, LinearKalmanFilter};
use crate::processing::linalg::constant_velocity_transition;
use crate::validation::{FilterError, FilterResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Battery voltage with measurement noise: A = H = [1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageParams {
    pub dt: f64,
    pub initial_state: f64,
    /// Initial P as a scalar
    pub initial_covariance: f64,
    pub process_noise: f64,
    pub measurement_noise: f64,
}

impl Default for VoltageParams {
    fn default() -> Self {
        Self {
            dt: 0.2,
            initial_state: 14.0,
            initial_covariance: 6.0,
            process_noise: 0.0,
            measurement_noise: 4.0,
        }
    }
}

/// Position/velocity state observed through both components (H = I)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionVelocityParams {
    pub dt: f64,
    pub initial_state: [f64; 2],
    /// Initial P as a multiple of the identity
    pub initial_covariance: f64,
    pub process_noise: [[f64; 2]; 2],
    pub measurement_noise: [[f64; 2]; 2],
}

impl Default for PositionVelocityParams {
    fn default() -> Self {
        Self {
            dt: 0.1,
            initial_state: [0.0, 20.0],
            initial_covariance: 5.0,
            process_noise: [[1.0, 0.0], [0.0, 3.0]],
            measurement_noise: [[10.0, 0.0], [0.0, 10.0]],
        }
    }
}

/// Position/velocity state observed through a single component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicParams {
    pub dt: f64,
    pub initial_state: [f64; 2],
    pub initial_covariance: f64,
    pub process_noise: [[f64; 2]; 2],
    pub measurement_noise: f64,
}

impl Default for KinematicParams {
    fn default() -> Self {
        Self {
            dt: 0.1,
            initial_state: [0.0, 20.0],
            initial_covariance: 5.0,
            process_noise: [[1.0, 0.0], [0.0, 3.0]],
            measurement_noise: 10.0,
        }
    }
}

/// Radar slant-range tracking of `[position, velocity, altitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarParams {
    pub dt: f64,
    pub initial_state: [f64; 3],
    pub initial_covariance: f64,
    pub process_noise: [[f64; 3]; 3],
    pub measurement_noise: f64,
}

impl Default for RadarParams {
    fn default() -> Self {
        Self {
            dt: 0.05,
            initial_state: [0.0, 90.0, 1100.0],
            initial_covariance: 10.0,
            process_noise: [[0.0, 0.0, 0.0], [0.0, 0.001, 0.0], [0.0, 0.0, 0.001]],
            measurement_noise: 10.0,
        }
    }
}

/// Arbitrary linear model given as nested rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomLinearParams {
    #[serde(default)]
    pub dt: Option<f64>,
    pub transition: Vec<Vec<f64>>,
    pub measurement_matrix: Vec<Vec<f64>>,
    pub process_noise: Vec<Vec<f64>>,
    pub measurement_noise: Vec<Vec<f64>>,
    pub initial_state: Vec<f64>,
    pub initial_covariance: Vec<Vec<f64>>,
}

fn square<const N: usize>(rows: &[[f64; N]; N]) -> DMatrix<f64> {
    DMatrix::from_fn(N, N, |i, j| rows[i][j])
}

fn scalar(value: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, value)
}

/// Convert nested rows into a matrix, rejecting ragged input
pub fn rows_to_matrix(what: &str, rows: &[Vec<f64>]) -> FilterResult<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(FilterError::dimension_mismatch(what, (nrows, ncols), (nrows, bad.len())));
    }
    let data: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(nrows, ncols, &data))
}

/// Scalar battery voltage filter
pub fn voltage(params: &VoltageParams) -> FilterResult<LinearKalmanFilter> {
    Ok(LinearKalmanFilter::linear(
        DMatrix::identity(1, 1),
        DMatrix::identity(1, 1),
        scalar(params.process_noise),
        scalar(params.measurement_noise),
        DVector::from_element(1, params.initial_state),
        params.initial_covariance,
    )?
    .with_layout(StateLayout::Voltage)?
    .with_sample_interval(params.dt))
}

/// Position estimation from position and velocity measurements
pub fn position_from_position_velocity(params: &PositionVelocityParams) -> FilterResult<LinearKalmanFilter> {
    Ok(LinearKalmanFilter::linear(
        constant_velocity_transition(params.dt, 2),
        DMatrix::identity(2, 2),
        square(&params.process_noise),
        square(&params.measurement_noise),
        DVector::from_row_slice(&params.initial_state),
        params.initial_covariance,
    )?
    .with_layout(StateLayout::PositionVelocity)?
    .with_sample_interval(params.dt))
}

/// Velocity estimation from position measurements
pub fn velocity_from_position(params: &KinematicParams) -> FilterResult<LinearKalmanFilter> {
    kinematic(params, [1.0, 0.0])
}

/// Position estimation from velocity measurements
pub fn position_from_velocity(params: &KinematicParams) -> FilterResult<LinearKalmanFilter> {
    kinematic(params, [0.0, 1.0])
}

fn kinematic(params: &KinematicParams, observed: [f64; 2]) -> FilterResult<LinearKalmanFilter> {
    Ok(LinearKalmanFilter::linear(
        constant_velocity_transition(params.dt, 2),
        DMatrix::from_row_slice(1, 2, &observed),
        square(&params.process_noise),
        scalar(params.measurement_noise),
        DVector::from_row_slice(&params.initial_state),
        params.initial_covariance,
    )?
    .with_layout(StateLayout::PositionVelocity)?
    .with_sample_interval(params.dt))
}

/// Radar slant-range tracking (extended filter)
pub fn radar_range(params: &RadarParams) -> FilterResult<ExtendedKalmanFilter<RadarRange>> {
    Ok(KalmanFilter::new(
        constant_velocity_transition(params.dt, 3),
        RadarRange::default(),
        square(&params.process_noise),
        scalar(params.measurement_noise),
        DVector::from_row_slice(&params.initial_state),
        params.initial_covariance,
    )?
    .with_layout(StateLayout::PositionVelocityAltitude)?
    .with_sample_interval(params.dt))
}

/// Linear filter from explicit matrices
pub fn custom_linear(params: &CustomLinearParams) -> FilterResult<LinearKalmanFilter> {
    let filter = LinearKalmanFilter::linear(
        rows_to_matrix("state transition A", &params.transition)?,
        rows_to_matrix("measurement matrix H", &params.measurement_matrix)?,
        rows_to_matrix("process noise Q", &params.process_noise)?,
        rows_to_matrix("measurement noise R", &params.measurement_noise)?,
        DVector::from_column_slice(&params.initial_state),
        rows_to_matrix("initial covariance P", &params.initial_covariance)?,
    )?;
    Ok(match params.dt {
        Some(dt) => filter.with_sample_interval(dt),
        None => filter,
    })
}

/// A filter built from configuration, linear or radar-range extended
#[derive(Debug, Clone)]
pub enum ConfiguredFilter {
    Linear(LinearKalmanFilter),
    Radar(ExtendedKalmanFilter<RadarRange>),
}

impl ConfiguredFilter {
    pub fn step(&mut self, measurement: &DVector<f64>) -> FilterResult<Estimate> {
        match self {
            ConfiguredFilter::Linear(filter) => filter.step(measurement),
            ConfiguredFilter::Radar(filter) => filter.step(measurement),
        }
    }

    pub fn step_scalar(&mut self, measurement: f64) -> FilterResult<Estimate> {
        self.step(&DVector::from_element(1, measurement))
    }

    /// Time update without a measurement
    pub fn predict(&mut self) -> &DVector<f64> {
        match self {
            ConfiguredFilter::Linear(filter) => filter.predict(),
            ConfiguredFilter::Radar(filter) => filter.predict(),
        }
    }

    pub fn with_options(self, options: FilterOptions) -> Self {
        match self {
            ConfiguredFilter::Linear(filter) => ConfiguredFilter::Linear(filter.with_options(options)),
            ConfiguredFilter::Radar(filter) => ConfiguredFilter::Radar(filter.with_options(options)),
        }
    }

    pub fn state(&self) -> &DVector<f64> {
        match self {
            ConfiguredFilter::Linear(filter) => filter.state(),
            ConfiguredFilter::Radar(filter) => filter.state(),
        }
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        match self {
            ConfiguredFilter::Linear(filter) => filter.covariance(),
            ConfiguredFilter::Radar(filter) => filter.covariance(),
        }
    }

    pub fn layout(&self) -> StateLayout {
        match self {
            ConfiguredFilter::Linear(filter) => filter.layout(),
            ConfiguredFilter::Radar(filter) => filter.layout(),
        }
    }

    pub fn options(&self) -> FilterOptions {
        match self {
            ConfiguredFilter::Linear(filter) => filter.options(),
            ConfiguredFilter::Radar(filter) => filter.options(),
        }
    }

    pub fn measurement_dim(&self) -> usize {
        match self {
            ConfiguredFilter::Linear(filter) => filter.measurement_dim(),
            ConfiguredFilter::Radar(filter) => filter.measurement_dim(),
        }
    }

    pub fn steps(&self) -> u64 {
        match self {
            ConfiguredFilter::Linear(filter) => filter.steps(),
            ConfiguredFilter::Radar(filter) => filter.steps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_voltage_defaults() {
        let filter = voltage(&VoltageParams::default()).unwrap();
        assert_eq!(filter.state(), &DVector::from_element(1, 14.0));
        assert_eq!(filter.covariance(), &DMatrix::from_element(1, 1, 6.0));
        assert_eq!(filter.measurement_noise(), &DMatrix::from_element(1, 1, 4.0));
        assert_eq!(filter.sample_interval(), Some(0.2));
        assert_eq!(filter.layout(), StateLayout::Voltage);
    }

    #[test]
    fn test_voltage_filter_smooths_noisy_readings() {
        let mut filter = voltage(&VoltageParams::default()).unwrap();
        let readings = [14.4, 13.1, 14.9, 13.6, 14.2, 15.0, 13.3, 14.5, 13.8, 14.6];
        let mut last = None;
        for z in readings {
            last = Some(filter.step_scalar(z).unwrap());
        }
        let estimate = last.unwrap();
        let mean = readings.iter().sum::<f64>() / readings.len() as f64;
        assert!((estimate.voltage().unwrap() - mean).abs() < 0.2);
    }

    #[test]
    fn test_kinematic_presets_observe_one_component() {
        let dv = velocity_from_position(&KinematicParams::default()).unwrap();
        assert_eq!(dv.measurement_matrix(), &DMatrix::from_row_slice(1, 2, &[1.0, 0.0]));
        assert_eq!(dv.transition(), &DMatrix::from_row_slice(2, 2, &[1.0, 0.1, 0.0, 1.0]));
        assert_eq!(dv.process_noise(), &DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 3.0]));
        assert_eq!(dv.covariance(), &(DMatrix::identity(2, 2) * 5.0));

        let int = position_from_velocity(&KinematicParams::default()).unwrap();
        assert_eq!(int.measurement_matrix(), &DMatrix::from_row_slice(1, 2, &[0.0, 1.0]));
        assert_eq!(int.state(), &DVector::from_vec(vec![0.0, 20.0]));
    }

    #[test]
    fn test_velocity_from_position_rejects_vector_measurement() {
        let mut filter = velocity_from_position(&KinematicParams::default()).unwrap();
        let state_before = filter.state().clone();
        let covariance_before = filter.covariance().clone();

        let result = filter.step(&DVector::from_vec(vec![1.0, 2.0]));

        assert!(matches!(result, Err(FilterError::DimensionMismatch { .. })));
        assert_eq!(filter.state(), &state_before);
        assert_eq!(filter.covariance(), &covariance_before);
    }

    #[test]
    fn test_velocity_recovered_from_positions() {
        let mut filter = velocity_from_position(&KinematicParams {
            initial_state: [0.0, 0.0],
            ..KinematicParams::default()
        })
        .unwrap();
        let mut last = None;
        for k in 1..=300 {
            last = Some(filter.step_scalar(80.0 * k as f64 * 0.1).unwrap());
        }
        let estimate = last.unwrap();
        assert_abs_diff_eq!(estimate.velocity().unwrap(), 80.0, epsilon = 0.5);
    }

    #[test]
    fn test_position_from_position_velocity_keeps_initial_state() {
        let params = PositionVelocityParams {
            initial_state: [3.0, 20.0],
            ..PositionVelocityParams::default()
        };
        let mut filter = position_from_position_velocity(&params).unwrap();
        assert_eq!(filter.state(), &DVector::from_vec(vec![3.0, 20.0]));
        assert_eq!(filter.measurement_dim(), 2);

        let estimate = filter.step(&DVector::from_vec(vec![5.0, 20.0])).unwrap();
        assert_eq!(estimate.gain.shape(), (2, 2));
        assert!(estimate.position().unwrap() > 3.0);
        assert!(filter.step_scalar(5.0).is_err());
    }

    #[test]
    fn test_radar_preset_matrices() {
        let filter = radar_range(&RadarParams::default()).unwrap();
        let expected_a = DMatrix::from_row_slice(3, 3, &[1.0, 0.05, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(filter.transition(), &expected_a);
        assert_eq!(filter.covariance(), &(DMatrix::identity(3, 3) * 10.0));
        assert_eq!(filter.state(), &DVector::from_vec(vec![0.0, 90.0, 1100.0]));
        assert_eq!(filter.layout(), StateLayout::PositionVelocityAltitude);
    }

    #[test]
    fn test_custom_linear_rejects_ragged_rows() {
        let params = CustomLinearParams {
            dt: None,
            transition: vec![vec![1.0, 0.1], vec![0.0]],
            measurement_matrix: vec![vec![1.0, 0.0]],
            process_noise: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            measurement_noise: vec![vec![1.0]],
            initial_state: vec![0.0, 0.0],
            initial_covariance: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        assert_eq!(
            custom_linear(&params).unwrap_err(),
            FilterError::dimension_mismatch("state transition A", (2, 2), (2, 1))
        );
    }

    #[test]
    fn test_configured_filter_dispatch() {
        let mut radar = ConfiguredFilter::Radar(radar_range(&RadarParams::default()).unwrap());
        assert_eq!(radar.measurement_dim(), 1);
        radar.step_scalar(1000.0).unwrap();
        assert_eq!(radar.steps(), 1);
        assert_eq!(radar.layout(), StateLayout::PositionVelocityAltitude);

        let mut linear = ConfiguredFilter::Linear(voltage(&VoltageParams::default()).unwrap());
        let predicted = linear.predict().clone();
        assert_eq!(predicted, DVector::from_element(1, 14.0));
        assert_eq!(linear.steps(), 0);
    }
}
