//! Configuration for the hybrid composer.

use crate::error::{ForecastError, Result};
use crate::models::lstm::LstmConfig;
use crate::models::sarima::{ModelOrder, SarimaConfig};
use serde::{Deserialize, Serialize};

/// Default forecast horizon: seven days of hourly steps.
pub const DEFAULT_HORIZON: usize = 168;

/// Configuration for [`HybridForecaster`](super::HybridForecaster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub sarima: SarimaConfig,
    pub lstm: LstmConfig,
    /// Search the SARIMA order by AIC when the series is long enough.
    pub auto_select: bool,
    /// Horizon used by [`HybridForecaster::forecast`](super::HybridForecaster::forecast).
    pub horizon: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            sarima: SarimaConfig::default(),
            lstm: LstmConfig::default(),
            auto_select: true,
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl HybridConfig {
    pub fn with_sarima(mut self, sarima: SarimaConfig) -> Self {
        self.sarima = sarima;
        self
    }

    pub fn with_lstm(mut self, lstm: LstmConfig) -> Self {
        self.lstm = lstm;
        self
    }

    /// Set the SARIMA order used without search.
    pub fn with_order(mut self, order: ModelOrder) -> Self {
        self.sarima.order = order;
        self
    }

    pub fn with_sequence_length(mut self, sequence_length: usize) -> Self {
        self.lstm.sequence_length = sequence_length;
        self
    }

    pub fn with_units(mut self, units: Vec<usize>) -> Self {
        self.lstm.units = units;
        self
    }

    pub fn with_auto_select(mut self, auto_select: bool) -> Self {
        self.auto_select = auto_select;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.sarima.validate()?;
        self.lstm.validate()?;
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hybrid_config_defaults() {
        let config = HybridConfig::default();
        assert_eq!(config.horizon, 168);
        assert!(config.auto_select);
        assert_eq!(config.sarima.order, ModelOrder::default_hourly());
        assert_eq!(config.lstm.sequence_length, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn hybrid_config_builders_reach_stages() {
        let config = HybridConfig::default()
            .with_order(ModelOrder::non_seasonal(1, 1, 0))
            .with_sequence_length(24)
            .with_units(vec![16])
            .with_auto_select(false)
            .with_horizon(24);

        assert_eq!(config.sarima.order, ModelOrder::non_seasonal(1, 1, 0));
        assert_eq!(config.lstm.sequence_length, 24);
        assert_eq!(config.lstm.units, vec![16]);
        assert!(!config.auto_select);
        assert!(config.validate().is_ok());

        assert!(config.clone().with_horizon(0).validate().is_err());
        assert!(config.with_sequence_length(0).validate().is_err());
    }

    #[test]
    fn hybrid_config_from_json() {
        let json = r#"{
            "auto_select": false,
            "lstm": {"sequence_length": 12, "dropout": 0.1},
            "sarima": {"cadence_minutes": 30}
        }"#;
        let config: HybridConfig = serde_json::from_str(json).unwrap();
        assert!(!config.auto_select);
        assert_eq!(config.lstm.sequence_length, 12);
        assert_eq!(config.lstm.units, vec![64, 32]);
        assert_eq!(config.sarima.cadence_minutes, 30);
        assert_eq!(config.horizon, 168);
    }
}
