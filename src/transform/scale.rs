//! Fitted scalers for the residual learner.
//!
//! Scalers are fitted once and never mutated afterwards. Prediction-time code
//! receives the fitted state and applies exactly the same parameters.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

const MIN_SCALE: f64 = 1e-10;

/// Min-max scaler mapping the fitted range onto [0, 1].
///
/// x_scaled = (x - min) / (max - min)
///
/// A constant input gets a unit range, so it maps to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// Fit on finite values; non-finite entries are ignored.
    pub fn fit(data: &[f64]) -> Result<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &x in data.iter().filter(|x| x.is_finite()) {
            min = min.min(x);
            max = max.max(x);
        }
        if !min.is_finite() {
            return Err(ForecastError::EmptyData);
        }

        let range = max - min;
        Ok(Self {
            min,
            range: if range < MIN_SCALE { 1.0 } else { range },
        })
    }

    pub fn data_min(&self) -> f64 {
        self.min
    }

    pub fn data_range(&self) -> f64 {
        self.range
    }

    pub fn transform_one(&self, x: f64) -> f64 {
        (x - self.min) / self.range
    }

    pub fn inverse_one(&self, x: f64) -> f64 {
        x * self.range + self.min
    }

    pub fn transform(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.transform_one(x)).collect()
    }

    pub fn inverse(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.inverse_one(x)).collect()
    }
}

/// Per-column z-score scaler.
///
/// x_scaled = (x - mean) / std, with the population standard deviation.
/// Zero-variance columns keep a unit scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data; every row must have the same width.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or(ForecastError::EmptyData)?;
        let width = first.len();
        for row in rows {
            if row.len() != width {
                return Err(ForecastError::DimensionMismatch {
                    expected: width,
                    got: row.len(),
                });
            }
        }

        let n = rows.len() as f64;
        let means: Vec<f64> = (0..width)
            .map(|c| rows.iter().map(|row| row[c]).sum::<f64>() / n)
            .collect();
        let stds = (0..width)
            .map(|c| {
                let var = rows.iter().map(|row| (row[c] - means[c]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std < MIN_SCALE {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { means, stds })
    }

    /// Number of columns the scaler was fitted on.
    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    pub fn inverse_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&m, &s))| x * s + m)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    fn check_width(&self, got: usize) -> Result<()> {
        if got != self.width() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.width(),
                got,
            });
        }
        Ok(())
    }
}

/// Scaling parameters captured when the residual learner was fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    /// Scaler for the residual target.
    pub target: MinMaxScaler,
    /// Scaler for exogenous features, when the learner was trained with them.
    pub features: Option<StandardScaler>,
}

impl ScalerState {
    /// Width of one input timestep (target plus features).
    pub fn input_width(&self) -> usize {
        1 + self.features.as_ref().map_or(0, StandardScaler::width)
    }
}
