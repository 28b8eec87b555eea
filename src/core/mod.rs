//! Core data structures for the hybrid forecasting pipeline.

mod feature_frame;
mod forecast;
mod outcome;
pub(crate) mod time_series;

pub use feature_frame::FeatureFrame;
pub use forecast::HybridForecast;
pub use outcome::{Degradation, Outcome, Stage};
pub use time_series::TimeSeries;
