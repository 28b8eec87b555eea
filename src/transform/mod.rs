//! Data transformations for the residual learner.
//!
//! Provides fitted scalers and the supervised window builder.
//!
//! # Example
//!
//! ```
//! use hybrid_forecast::transform::{build_windows, stack_columns, MinMaxScaler};
//!
//! let residuals = vec![0.1, -0.2, 0.3, 0.0, -0.1, 0.2];
//! let scaler = MinMaxScaler::fit(&residuals).unwrap();
//! let scaled = scaler.transform(&residuals);
//!
//! let steps = stack_columns(&scaled, None).unwrap();
//! let samples = build_windows(&steps, 3).unwrap();
//! assert_eq!(samples.len(), 3);
//! ```

pub mod scale;
pub mod window;

pub use scale::{MinMaxScaler, ScalerState, StandardScaler};
pub use window::{build_windows, stack_columns, SequenceWindow, WindowedSamples};
