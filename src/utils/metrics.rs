//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Actual values with magnitude below this are excluded from MAPE.
pub const MAPE_EPSILON: f64 = 1e-6;

/// Accuracy metrics for evaluating forecast performance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
}

impl AccuracyMetrics {
    /// Metrics of an empty comparison.
    pub fn undefined() -> Self {
        Self {
            mae: f64::NAN,
            rmse: f64::NAN,
            mape: f64::NAN,
        }
    }

    /// Map keyed by "MAE", "RMSE" and "MAPE".
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("MAE".to_string(), self.mae),
            ("RMSE".to_string(), self.rmse),
            ("MAPE".to_string(), self.mape),
        ])
    }
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// Empty input yields NaN for every metric. MAPE skips actual values with
/// `|y| < MAPE_EPSILON` and is NaN when none remain.
///
/// # Example
/// ```
/// use hybrid_forecast::utils::calculate_metrics;
///
/// let m = calculate_metrics(&[10.0, 20.0], &[11.0, 18.0]).unwrap();
/// assert!((m.mae - 1.5).abs() < 1e-12);
/// assert!((m.mape - 10.0).abs() < 1e-12);
/// ```
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Ok(AccuracyMetrics::undefined());
    }

    Ok(AccuracyMetrics {
        mae: mae(actual, predicted),
        rmse: rmse(actual, predicted),
        mape: mape(actual, predicted),
    })
}

/// Mean absolute error; NaN on empty input.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Mean squared error; NaN on empty input.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Root mean squared error; NaN on empty input.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean absolute percentage error in percent, over actuals with `|y| >= MAPE_EPSILON`.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| a.abs() >= MAPE_EPSILON)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });
    if count == 0 {
        f64::NAN
    } else {
        100.0 * sum / count as f64
    }
}
