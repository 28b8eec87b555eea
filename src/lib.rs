//! # hybrid-forecast
//!
//! Hybrid SARIMA + LSTM forecasting for hourly weather series.
//!
//! A seasonal ARIMA model captures trend and daily seasonality; a stacked
//! LSTM trained on its in-sample residuals captures the nonlinear structure
//! left over. Forecasts are the timestamp-aligned sum of both stages.
//!
//! ```no_run
//! use hybrid_forecast::prelude::*;
//! # fn load() -> (TimeSeries, TimeSeries) { unimplemented!() }
//!
//! let (train, test) = load();
//! let mut model = HybridForecaster::new(HybridConfig::default());
//! let report = model.fit_default(&train, None)?;
//! if !report.is_complete() {
//!     eprintln!("degraded fit: {:?}", report.degradations);
//! }
//!
//! let forecast = model.forecast(None)?;
//! let metrics = model.evaluate(&test, None)?;
//! println!("{} steps, MAE {:.2}", forecast.horizon(), metrics["MAE"]);
//! # Ok::<(), ForecastError>(())
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Degradation, FeatureFrame, HybridForecast, Outcome, Stage, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::hybrid::{FitReport, FitState, HybridConfig, HybridForecaster};
    pub use crate::models::lstm::{LstmConfig, ResidualLearner};
    pub use crate::models::sarima::{ModelOrder, SarimaConfig, SeasonalForecaster};
    pub use crate::models::ModelProvider;
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}
