//! Configuration for the seasonal linear forecaster.

use crate::error::{ForecastError, Result};
use crate::models::sarima::order::ModelOrder;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Series shorter than this are fitted with the configured order, without search.
pub const MIN_SEARCH_OBSERVATIONS: usize = 100;

/// Configuration for [`SeasonalForecaster`](super::SeasonalForecaster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarimaConfig {
    /// Order used when automatic selection is off or skipped.
    pub order: ModelOrder,
    /// Order tried once when the chosen order fails to fit.
    pub fallback_order: ModelOrder,
    /// Seasonal period of the candidate orders.
    pub seasonal_period: usize,
    /// Optimizer iteration cap for the final fit.
    pub max_iter: usize,
    /// Optimizer iteration cap for each search candidate.
    pub search_max_iter: usize,
    /// Optimizer iteration cap for the fallback fit.
    pub fallback_max_iter: usize,
    /// Convergence tolerance of the optimizer.
    pub tolerance: f64,
    /// Restrict AR and MA coefficients to (-0.99, 0.99).
    pub enforce_stationarity: bool,
    /// Spacing between forecast timestamps, in minutes.
    pub cadence_minutes: i64,
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            order: ModelOrder::default_hourly(),
            fallback_order: ModelOrder::default_hourly(),
            seasonal_period: 24,
            max_iter: 1000,
            search_max_iter: 500,
            fallback_max_iter: 500,
            tolerance: 1e-8,
            enforce_stationarity: false,
            cadence_minutes: 60,
        }
    }
}

impl SarimaConfig {
    /// Set the default order.
    pub fn with_order(mut self, order: ModelOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the fallback order.
    pub fn with_fallback_order(mut self, order: ModelOrder) -> Self {
        self.fallback_order = order;
        self
    }

    /// Set the seasonal period used for candidate orders.
    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    /// Set the iteration caps for the final, search and fallback fits.
    pub fn with_max_iter(mut self, fit: usize, search: usize, fallback: usize) -> Self {
        self.max_iter = fit;
        self.search_max_iter = search;
        self.fallback_max_iter = fallback;
        self
    }

    /// Constrain coefficients to the stationary/invertible box.
    pub fn enforcing_stationarity(mut self) -> Self {
        self.enforce_stationarity = true;
        self
    }

    /// Set the forecast cadence.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence_minutes = cadence.num_minutes();
        self
    }

    /// Forecast cadence as a duration.
    pub fn cadence(&self) -> Duration {
        Duration::minutes(self.cadence_minutes)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cadence_minutes <= 0 {
            return Err(ForecastError::InvalidParameter(
                "cadence must be positive".to_string(),
            ));
        }
        if self.max_iter == 0 || self.search_max_iter == 0 || self.fallback_max_iter == 0 {
            return Err(ForecastError::InvalidParameter(
                "iteration caps must be positive".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sarima_config_builders() {
        let config = SarimaConfig::default()
            .with_order(ModelOrder::non_seasonal(2, 1, 0))
            .with_seasonal_period(12)
            .with_max_iter(200, 50, 50)
            .with_cadence(Duration::minutes(30))
            .enforcing_stationarity();

        assert_eq!(config.order, ModelOrder::non_seasonal(2, 1, 0));
        assert_eq!(config.seasonal_period, 12);
        assert_eq!(config.search_max_iter, 50);
        assert_eq!(config.cadence(), Duration::minutes(30));
        assert!(config.enforce_stationarity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sarima_config_rejects_bad_values() {
        let mut config = SarimaConfig::default();
        config.cadence_minutes = 0;
        assert!(config.validate().is_err());

        let config = SarimaConfig::default().with_max_iter(0, 1, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn sarima_config_deserializes_with_defaults() {
        let config: SarimaConfig = serde_json::from_str(r#"{"seasonal_period": 168}"#).unwrap();
        assert_eq!(config.seasonal_period, 168);
        assert_eq!(config.order, ModelOrder::default_hourly());
        assert_eq!(config.cadence_minutes, 60);
    }
}
