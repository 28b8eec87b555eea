//! Forecasting models.
//!
//! - [`sarima`]: seasonal ARIMA linear stage
//! - [`lstm`]: LSTM residual stage
//! - [`hybrid`]: composer summing both stages

pub mod hybrid;
pub mod lstm;
mod provider;
pub mod sarima;

pub use hybrid::{HybridConfig, HybridForecaster};
pub use provider::ModelProvider;
