//! TimeSeries data structure for representing temporal data.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// A univariate time series: strictly increasing UTC timestamps paired with
/// scalar values.
///
/// Gaps between timestamps are allowed. Missing observations may be encoded
/// as NaN and removed with [`TimeSeries::drop_missing`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new series, validating that timestamps strictly increase.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }
        validate_increasing(&timestamps)?;

        Ok(Self { timestamps, values })
    }

    /// Build a series on a regular grid `start, start + cadence, ...`.
    pub fn regular(start: DateTime<Utc>, cadence: Duration, values: Vec<f64>) -> Result<Self> {
        if cadence <= Duration::zero() {
            return Err(ForecastError::InvalidParameter(
                "cadence must be positive".to_string(),
            ));
        }
        let timestamps = regular_index(start, cadence, values.len())?;
        Ok(Self { timestamps, values })
    }

    /// Create an empty series.
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get timestamps.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Iterate over `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Value observed at `timestamp`, if any.
    pub fn value_at(&self, timestamp: &DateTime<Utc>) -> Option<f64> {
        self.timestamps
            .binary_search(timestamp)
            .ok()
            .map(|i| self.values[i])
    }

    /// Extract a slice of the time series.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end {
            return Err(ForecastError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// The last `n` observations (the whole series when shorter).
    pub fn tail(&self, n: usize) -> TimeSeries {
        let start = self.len().saturating_sub(n);
        TimeSeries {
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Return a copy without NaN/Inf observations.
    pub fn drop_missing(&self) -> TimeSeries {
        let (timestamps, values) = self
            .iter()
            .filter(|(_, v)| v.is_finite())
            .unzip();
        TimeSeries { timestamps, values }
    }

    /// Restrict this series to the timestamps it shares with `timestamps`.
    ///
    /// Both inputs are sorted, so this is a single merge pass.
    pub fn intersect(&self, timestamps: &[DateTime<Utc>]) -> TimeSeries {
        let mut kept_ts = Vec::new();
        let mut kept_values = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < self.timestamps.len() && j < timestamps.len() {
            match self.timestamps[i].cmp(&timestamps[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    kept_ts.push(self.timestamps[i]);
                    kept_values.push(self.values[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        TimeSeries {
            timestamps: kept_ts,
            values: kept_values,
        }
    }

    /// Replace the timestamps of this series, keeping the values.
    pub fn with_timestamps(&self, timestamps: Vec<DateTime<Utc>>) -> Result<TimeSeries> {
        TimeSeries::new(timestamps, self.values.clone())
    }

    /// Infer frequency from timestamps.
    ///
    /// Returns the modal spacing when it accounts for at least `tolerance`
    /// of all consecutive differences.
    pub fn infer_frequency(&self, tolerance: f64) -> Result<Duration> {
        if self.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for w in self.timestamps.windows(2) {
            *counts.entry((w[1] - w[0]).num_seconds()).or_insert(0) += 1;
        }

        // Ties resolve to the shortest spacing so the result is deterministic.
        let (modal_diff, modal_count) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&diff, &count)| (diff, count))
            .ok_or(ForecastError::FrequencyInference(
                "empty spacing data".to_string(),
            ))?;

        let total_count: usize = counts.values().sum();
        let modal_ratio = modal_count as f64 / total_count as f64;

        if modal_ratio < tolerance {
            return Err(ForecastError::FrequencyInference(
                "no unique modal spacing found".to_string(),
            ));
        }

        Ok(Duration::seconds(modal_diff))
    }
}

/// Timestamps `start, start + cadence, ...` of length `n`.
///
/// Fails with `TimestampError` when the grid runs past the representable
/// date range.
pub(crate) fn regular_index(
    start: DateTime<Utc>,
    cadence: Duration,
    n: usize,
) -> Result<Vec<DateTime<Utc>>> {
    let mut timestamps = Vec::with_capacity(n);
    let mut next = Some(start);
    for i in 0..n {
        let current = next.ok_or_else(|| {
            ForecastError::TimestampError(format!(
                "regular grid from {} overflows at step {}",
                start, i
            ))
        })?;
        timestamps.push(current);
        next = current.checked_add_signed(cadence);
    }
    Ok(timestamps)
}

pub(crate) fn validate_increasing(timestamps: &[DateTime<Utc>]) -> Result<()> {
    if timestamps.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ForecastError::TimestampError(
            "timestamps must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}
