//! Hybrid SARIMA + LSTM composer.
//!
//! Fits the seasonal linear stage, trains the residual learner on its
//! in-sample residuals and sums both forecasts.

mod config;
mod forecaster;

pub use config::{HybridConfig, DEFAULT_HORIZON};
pub use forecaster::{FitReport, FitState, HybridForecaster};
