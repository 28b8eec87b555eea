//! Stationarity testing used to choose differencing orders.
//!
//! # Example
//!
//! ```
//! use hybrid_forecast::validation::{adf_test, make_stationary, MAX_DIFFERENCES};
//!
//! let series: Vec<f64> = (0..120)
//!     .map(|i| (i as f64 * 0.7).sin() + ((i * 37) % 11) as f64 * 0.1)
//!     .collect();
//!
//! if let Ok(adf) = adf_test(&series, None) {
//!     println!("ADF statistic {:.3}, p = {:.3}", adf.statistic, adf.p_value);
//! }
//! if let Ok(transformed) = make_stationary(&series, MAX_DIFFERENCES) {
//!     assert!(transformed.differences <= MAX_DIFFERENCES);
//! }
//! ```

pub mod stationarity;

pub use stationarity::{
    adf_test, is_stationary, mackinnon_p_value, make_stationary, CriticalValues,
    StationarityResult, StationaryTransform, MAX_DIFFERENCES, STATIONARITY_ALPHA,
};
