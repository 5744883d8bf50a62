//! Drives a filter over a measurement stream.
//!
//! Failed steps discard the measurement and keep the prior estimate; the
//! rejection is logged and recorded in the summary.

use crate::core::Estimate;
use crate::processing::presets::ConfiguredFilter;
use crate::validation::FilterError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// A measurement the filter refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// Position of the measurement in the stream
    pub index: usize,
    pub error: FilterError,
}

/// Outcome of running a stream through the filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// One estimate per accepted measurement
    pub estimates: Vec<Estimate>,
    pub rejected: Vec<Rejection>,
}

impl RunSummary {
    /// Estimate after the last accepted measurement
    pub fn final_estimate(&self) -> Option<&Estimate> {
        self.estimates.last()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct FilterRunner {
    filter: ConfiguredFilter,
    processed: usize,
    latest: Option<Estimate>,
}

impl FilterRunner {
    pub fn new(filter: ConfiguredFilter) -> Self {
        Self {
            filter,
            processed: 0,
            latest: None,
        }
    }

    /// Feed one measurement; `Err` means it was discarded and the prior estimate kept
    pub fn process(&mut self, measurement: &DVector<f64>) -> Result<&Estimate, Rejection> {
        let index = self.processed;
        self.processed += 1;

        match self.filter.step(measurement) {
            Ok(estimate) => Ok(self.latest.insert(estimate)),
            Err(err) => {
                if err.is_recoverable() {
                    warn!(index, error = %err, "discarding measurement");
                } else {
                    error!(index, error = %err, "filter model rejected measurement");
                }
                Err(Rejection { index, error: err })
            }
        }
    }

    /// Run a stream of vector measurements
    pub fn run<I>(&mut self, measurements: I) -> RunSummary
    where
        I: IntoIterator<Item = DVector<f64>>,
    {
        let mut summary = RunSummary::default();
        for z in measurements {
            match self.process(&z) {
                Ok(estimate) => summary.estimates.push(estimate.clone()),
                Err(rejection) => summary.rejected.push(rejection),
            }
        }
        summary
    }

    /// Run a stream of scalar measurements
    pub fn run_scalar<I>(&mut self, measurements: I) -> RunSummary
    where
        I: IntoIterator<Item = f64>,
    {
        self.run(measurements.into_iter().map(|z| DVector::from_element(1, z)))
    }

    /// Last accepted estimate
    pub fn latest(&self) -> Option<&Estimate> {
        self.latest.as_ref()
    }

    /// Measurements seen so far, accepted or not
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn filter(&self) -> &ConfiguredFilter {
        &self.filter
    }

    pub fn into_filter(self) -> ConfiguredFilter {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::presets::{radar_range, voltage, RadarParams, VoltageParams};

    fn voltage_runner() -> FilterRunner {
        FilterRunner::new(ConfiguredFilter::Linear(voltage(&VoltageParams::default()).unwrap()))
    }

    #[test]
    fn test_run_scalar_stream() {
        let mut runner = voltage_runner();
        let summary = runner.run_scalar(std::iter::repeat(14.0).take(20));
        assert_eq!(summary.estimates.len(), 20);
        assert!(summary.rejected.is_empty());
        assert!((summary.final_estimate().unwrap().voltage().unwrap() - 14.0).abs() < 1e-3);
        assert_eq!(runner.processed(), 20);
    }

    #[test]
    fn test_rejected_measurements_keep_prior_estimate() {
        let mut runner = voltage_runner();
        let stream = vec![
            DVector::from_element(1, 14.2),
            DVector::from_vec(vec![14.0, 14.0]),
            DVector::from_element(1, f64::NAN),
            DVector::from_element(1, 13.9),
        ];

        let summary = runner.run(stream);

        assert_eq!(summary.estimates.len(), 2);
        let indices: Vec<usize> = summary.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(matches!(summary.rejected[0].error, FilterError::DimensionMismatch { .. }));
        assert_eq!(runner.filter().steps(), 2);
        assert_eq!(runner.latest(), summary.final_estimate());
    }

    #[test]
    fn test_process_returns_rejection() {
        let mut runner = voltage_runner();
        let first = runner.process(&DVector::from_element(1, 14.5)).unwrap().clone();
        let rejection = runner.process(&DVector::zeros(3)).unwrap_err();
        assert_eq!(rejection.index, 1);
        assert_eq!(runner.latest(), Some(&first));
        assert_eq!(runner.filter().state(), &first.state);
    }

    #[test]
    fn test_radar_runner_and_json_summary() {
        let filter = ConfiguredFilter::Radar(radar_range(&RadarParams::default()).unwrap());
        let mut runner = FilterRunner::new(filter);
        let ranges = (1..=20).map(|k| (100.0 * k as f64 * 0.05).hypot(1000.0));

        let summary = runner.run_scalar(ranges);

        assert_eq!(summary.estimates.len(), 20);
        let json = summary.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["estimates"].as_array().unwrap().len(), 20);
        assert_eq!(value["rejected"].as_array().unwrap().len(), 0);
    }
}
