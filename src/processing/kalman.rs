use crate::core::{Estimate, InitialCovariance, StateLayout, DEFAULT_SINGULARITY_EPSILON};
use crate::processing::linalg::{invert_innovation, symmetrize};
use crate::processing::model::{LinearMeasurement, MeasurementModel};
use crate::validation::{
    check_finite, check_measurement, check_shape, check_square, check_vector, FilterError, FilterResult,
};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Numerical options for the recursion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Replace P by (P + P^T) / 2 after every update
    pub symmetrize_covariance: bool,
    /// Innovation covariances whose determinant, scaled to unit diagonal, is at or below this are singular
    pub singularity_epsilon: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            symmetrize_covariance: true,
            singularity_epsilon: DEFAULT_SINGULARITY_EPSILON,
        }
    }
}

/// Discrete-time Kalman filter with a constant transition matrix A.
///
/// The measurement side is supplied by a [`MeasurementModel`]: a constant H
/// gives the linear filter, a state-dependent Jacobian gives the extended one.
/// Every step is predict-then-correct and either commits both x and P or
/// leaves them untouched.
#[derive(Debug, Clone)]
pub struct KalmanFilter<M> {
    /// State transition matrix A (n x n)
    transition: DMatrix<f64>,
    /// Process noise covariance Q (n x n)
    process_noise: DMatrix<f64>,
    /// Measurement noise covariance R (m x m)
    measurement_noise: DMatrix<f64>,
    /// Measurement model
    model: M,
    /// Current state estimate x
    state: DVector<f64>,
    /// Current error covariance P
    covariance: DMatrix<f64>,
    /// Gain used by the last successful step
    last_gain: Option<DMatrix<f64>>,
    /// Sampling interval A was built from, if any
    sample_interval: Option<f64>,
    layout: StateLayout,
    options: FilterOptions,
    steps: u64,
}

/// Kalman filter with a constant measurement matrix H
pub type LinearKalmanFilter = KalmanFilter<LinearMeasurement>;

impl LinearKalmanFilter {
    /// Create a linear filter from A, H, Q, R and the initial state
    pub fn linear(
        transition: DMatrix<f64>,
        measurement_matrix: DMatrix<f64>,
        process_noise: DMatrix<f64>,
        measurement_noise: DMatrix<f64>,
        initial_state: DVector<f64>,
        initial_covariance: impl Into<InitialCovariance>,
    ) -> FilterResult<Self> {
        let model = LinearMeasurement::new(measurement_matrix)?;
        Self::new(transition, model, process_noise, measurement_noise, initial_state, initial_covariance)
    }

    /// Constant measurement matrix H
    pub fn measurement_matrix(&self) -> &DMatrix<f64> {
        self.model.matrix()
    }
}

impl<M: MeasurementModel> KalmanFilter<M> {
    /// Create a filter, validating every shape against the initial state dimension
    pub fn new(
        transition: DMatrix<f64>,
        model: M,
        process_noise: DMatrix<f64>,
        measurement_noise: DMatrix<f64>,
        initial_state: DVector<f64>,
        initial_covariance: impl Into<InitialCovariance>,
    ) -> FilterResult<Self> {
        let n = initial_state.len();
        let m = model.measurement_dim();
        if n == 0 {
            return Err(FilterError::dimension_mismatch("initial state", (1, 1), (0, 1)));
        }
        if model.state_dim() != n {
            return Err(FilterError::dimension_mismatch(
                "measurement model",
                (m, n),
                (m, model.state_dim()),
            ));
        }

        let covariance = initial_covariance.into().to_matrix(n);
        check_square("state transition A", &transition, n)?;
        check_square("process noise Q", &process_noise, n)?;
        check_square("measurement noise R", &measurement_noise, m)?;
        check_square("initial covariance P", &covariance, n)?;

        check_finite("state transition A", transition.iter())?;
        check_finite("process noise Q", process_noise.iter())?;
        check_finite("measurement noise R", measurement_noise.iter())?;
        check_finite("initial state", initial_state.iter())?;
        check_finite("initial covariance P", covariance.iter())?;

        Ok(Self {
            transition,
            process_noise,
            measurement_noise,
            model,
            state: initial_state,
            covariance,
            last_gain: None,
            sample_interval: None,
            layout: StateLayout::Generic,
            options: FilterOptions::default(),
            steps: 0,
        })
    }

    /// Attach a semantic layout; its dimension must match the state
    pub fn with_layout(mut self, layout: StateLayout) -> FilterResult<Self> {
        if let Some(n) = layout.state_dim() {
            if n != self.state.len() {
                return Err(FilterError::dimension_mismatch("state layout", (n, 1), (self.state.len(), 1)));
            }
        }
        self.layout = layout;
        Ok(self)
    }

    pub fn with_options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    /// Record the sampling interval A was built from
    pub fn with_sample_interval(mut self, dt: f64) -> Self {
        self.sample_interval = Some(dt);
        self
    }

    /// Predicted state and covariance without committing them
    pub fn time_update(&self) -> (DVector<f64>, DMatrix<f64>) {
        let predicted_state = &self.transition * &self.state;
        let predicted_covariance =
            &self.transition * &self.covariance * self.transition.transpose() + &self.process_noise;
        (predicted_state, predicted_covariance)
    }

    /// Propagate the estimate one interval without a measurement
    pub fn predict(&mut self) -> &DVector<f64> {
        let (state, covariance) = self.time_update();
        self.state = state;
        self.covariance = if self.options.symmetrize_covariance {
            symmetrize(&covariance)
        } else {
            covariance
        };
        &self.state
    }

    /// Predict, then correct with one measurement.
    ///
    /// On error the persisted state and covariance are unchanged.
    pub fn step(&mut self, measurement: &DVector<f64>) -> FilterResult<Estimate> {
        let estimate = match self.evaluate(measurement) {
            Ok(estimate) => estimate,
            Err(error) => {
                debug!(step = self.steps, %error, "rejected measurement");
                return Err(error);
            }
        };

        self.state = estimate.state.clone();
        self.covariance = estimate.covariance.clone();
        self.last_gain = Some(estimate.gain.clone());
        self.steps += 1;
        trace!(
            step = self.steps,
            innovation = ?estimate.innovation.as_slice(),
            trace_p = estimate.covariance_trace(),
            "measurement update"
        );
        Ok(estimate)
    }

    /// Step with a scalar measurement (m = 1)
    pub fn step_scalar(&mut self, measurement: f64) -> FilterResult<Estimate> {
        self.step(&DVector::from_element(1, measurement))
    }

    /// Run the full recursion against the current state without touching it
    fn evaluate(&self, measurement: &DVector<f64>) -> FilterResult<Estimate> {
        let n = self.state.len();
        let m = self.model.measurement_dim();
        check_measurement(measurement, m)?;

        let (predicted_state, predicted_covariance) = self.time_update();

        // Linearize at the predicted state
        let h = self.model.jacobian(&predicted_state)?;
        check_shape("measurement Jacobian", &h, m, n)?;
        if !h.iter().all(|v| v.is_finite()) {
            return Err(FilterError::undefined_linearization("Jacobian is not finite at the predicted state"));
        }

        let predicted_measurement = self.model.predict(&predicted_state)?;
        check_vector("predicted measurement", &predicted_measurement, m)?;
        if !predicted_measurement.iter().all(|v| v.is_finite()) {
            return Err(FilterError::undefined_linearization(
                "predicted measurement is not finite at the predicted state",
            ));
        }

        let pp_ht = &predicted_covariance * h.transpose();
        let innovation_covariance = &h * &pp_ht + &self.measurement_noise;
        let s_inv = invert_innovation(&innovation_covariance, self.options.singularity_epsilon)?;
        let gain = pp_ht * s_inv;

        let innovation = measurement - predicted_measurement;
        let state = &predicted_state + &gain * &innovation;
        let covariance = &predicted_covariance - &gain * &h * &predicted_covariance;
        let covariance = if self.options.symmetrize_covariance {
            symmetrize(&covariance)
        } else {
            covariance
        };

        Ok(Estimate {
            state,
            covariance,
            gain,
            innovation,
            innovation_covariance,
            layout: self.layout,
        })
    }

    /// Replace the state and covariance, keeping the model
    pub fn reset(
        &mut self,
        state: DVector<f64>,
        covariance: impl Into<InitialCovariance>,
    ) -> FilterResult<()> {
        let n = self.state.len();
        let covariance = covariance.into().to_matrix(n);
        check_vector("initial state", &state, n)?;
        check_square("initial covariance P", &covariance, n)?;
        check_finite("initial state", state.iter())?;
        check_finite("initial covariance P", covariance.iter())?;

        self.state = state;
        self.covariance = covariance;
        self.last_gain = None;
        self.steps = 0;
        Ok(())
    }

    /// Current state estimate x
    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    /// Current error covariance P
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Kalman gain from the last successful step
    pub fn last_gain(&self) -> Option<&DMatrix<f64>> {
        self.last_gain.as_ref()
    }

    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.process_noise
    }

    pub fn measurement_noise(&self) -> &DMatrix<f64> {
        &self.measurement_noise
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn sample_interval(&self) -> Option<f64> {
        self.sample_interval
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn options(&self) -> FilterOptions {
        self.options
    }

    pub fn state_dim(&self) -> usize {
        self.state.len()
    }

    pub fn measurement_dim(&self) -> usize {
        self.model.measurement_dim()
    }

    /// Number of successful steps since construction or the last reset
    pub fn steps(&self) -> u64 {
        self.steps
    }
}
