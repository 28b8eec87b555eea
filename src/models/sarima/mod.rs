//! Seasonal ARIMA (SARIMA) linear stage.
//!
//! This module provides:
//! - [`ModelOrder`] for (p, d, q)(P, D, Q)\[s\] specifications
//! - [`SarimaFit`], a single order estimated by conditional sum of squares
//! - [`SeasonalForecaster`], which selects an order, falls back on failure
//!   and produces timestamped forecasts and residuals

mod config;
mod forecaster;
mod model;
mod order;
pub mod polynomial;

pub use config::{SarimaConfig, MIN_SEARCH_OBSERVATIONS};
pub use forecaster::{LinearFitReport, OrderSource, SeasonalForecaster};
pub use model::{EstimationSettings, SarimaCoefficients, SarimaFit};
pub use order::ModelOrder;
