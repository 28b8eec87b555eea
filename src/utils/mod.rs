//! Utility functions for forecasting models.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{calculate_metrics, mae, mape, rmse, AccuracyMetrics, MAPE_EPSILON};
pub use ols::{ols_fit, solve_symmetric, OlsFit};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{mean, normal_cdf, variance};
