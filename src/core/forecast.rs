//! Forecast result of the hybrid pipeline.

use crate::core::outcome::Degradation;
use crate::core::time_series::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// Timestamp-aligned sum of a linear forecast and a residual forecast.
///
/// `values[i] == linear[i] + residual[i]` for every step. The residual
/// component is all zeros when the residual stage was unavailable; the
/// reasons are listed in [`HybridForecast::degradations`].
#[derive(Debug, Clone, PartialEq)]
pub struct HybridForecast {
    timestamps: Vec<DateTime<Utc>>,
    linear: Vec<f64>,
    residual: Vec<f64>,
    values: Vec<f64>,
    degradations: Vec<Degradation>,
}

impl HybridForecast {
    /// Combine the two components.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        linear: Vec<f64>,
        residual: Vec<f64>,
        degradations: Vec<Degradation>,
    ) -> Result<Self> {
        if linear.len() != timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: linear.len(),
            });
        }
        if residual.len() != linear.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: linear.len(),
                got: residual.len(),
            });
        }

        let values = linear.iter().zip(&residual).map(|(l, r)| l + r).collect();

        Ok(Self {
            timestamps,
            linear,
            residual,
            values,
            degradations,
        })
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Combined point forecast.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Seasonal linear component.
    pub fn linear(&self) -> &[f64] {
        &self.linear
    }

    /// Residual correction component.
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    /// Problems that replaced part of this forecast with placeholders.
    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    /// Whether both stages contributed a real forecast.
    pub fn is_complete(&self) -> bool {
        self.degradations.is_empty()
    }

    /// The combined forecast as a time series.
    pub fn to_series(&self) -> Result<TimeSeries> {
        TimeSeries::new(self.timestamps.clone(), self.values.clone())
    }
}
