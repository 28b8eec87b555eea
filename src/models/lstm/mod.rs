//! LSTM residual stage.
//!
//! A stacked LSTM trained on windows of linear-stage residuals, with
//! optional exogenous features, forecasting by iterative rollout.

mod cell;
mod config;
mod learner;
mod network;

pub use config::{LstmConfig, MIN_EXTRA_SAMPLES};
pub use learner::{EpochMetrics, ResidualLearner, TrainingReport};
pub use network::{LstmNetwork, OptimizerConfig};
