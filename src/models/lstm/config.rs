//! Configuration for the residual sequence learner.

use crate::error::{ForecastError, Result};
use crate::models::lstm::network::OptimizerConfig;
use serde::{Deserialize, Serialize};

/// Usable samples required beyond the sequence length before training.
pub const MIN_EXTRA_SAMPLES: usize = 10;

/// Configuration for [`ResidualLearner`](super::ResidualLearner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Timesteps in each input window.
    pub sequence_length: usize,
    /// Hidden units of each stacked LSTM layer, bottom first.
    pub units: Vec<usize>,
    /// Dropout rate after each LSTM layer during training.
    pub dropout: f64,
    pub optimizer: OptimizerConfig,
    pub epochs: usize,
    pub batch_size: usize,
    /// Trailing share of windows held out for validation.
    pub validation_fraction: f64,
    /// Seed for weight initialization and dropout masks.
    pub seed: u64,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            sequence_length: 30,
            units: vec![64, 32],
            dropout: 0.2,
            optimizer: OptimizerConfig::default(),
            epochs: 50,
            batch_size: 32,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

impl LstmConfig {
    pub fn with_sequence_length(mut self, sequence_length: usize) -> Self {
        self.sequence_length = sequence_length;
        self
    }

    pub fn with_units(mut self, units: Vec<usize>) -> Self {
        self.units = units;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.optimizer.learning_rate = learning_rate;
        self
    }

    /// Set the default epochs and batch size.
    pub fn with_training(mut self, epochs: usize, batch_size: usize) -> Self {
        self.epochs = epochs;
        self.batch_size = batch_size;
        self
    }

    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Samples needed before the learner will train.
    pub fn min_samples(&self) -> usize {
        self.sequence_length + MIN_EXTRA_SAMPLES
    }

    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "sequence_length must be positive".to_string(),
            ));
        }
        if self.units.is_empty() || self.units.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "every LSTM layer needs at least one unit".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        let lr = self.optimizer.learning_rate;
        if !lr.is_finite() || lr <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be positive".to_string(),
            ));
        }
        validate_training(self.epochs, self.batch_size)?;
        validate_fraction(self.validation_fraction)
    }
}

pub(crate) fn validate_training(epochs: usize, batch_size: usize) -> Result<()> {
    if epochs == 0 || batch_size == 0 {
        return Err(ForecastError::InvalidParameter(
            "epochs and batch_size must be positive".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_fraction(fraction: f64) -> Result<()> {
    if (0.0..1.0).contains(&fraction) {
        Ok(())
    } else {
        Err(ForecastError::InvalidParameter(format!(
            "validation_fraction must be in [0, 1), got {}",
            fraction
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lstm_config_defaults() {
        let config = LstmConfig::default();
        assert_eq!(config.sequence_length, 30);
        assert_eq!(config.units, vec![64, 32]);
        assert_eq!(config.dropout, 0.2);
        assert_eq!(config.optimizer.learning_rate, 0.001);
        assert_eq!(config.min_samples(), 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lstm_config_rejects_bad_values() {
        assert!(LstmConfig::default().with_sequence_length(0).validate().is_err());
        assert!(LstmConfig::default().with_units(vec![]).validate().is_err());
        assert!(LstmConfig::default().with_units(vec![16, 0]).validate().is_err());
        assert!(LstmConfig::default().with_dropout(1.0).validate().is_err());
        assert!(LstmConfig::default().with_dropout(-0.1).validate().is_err());
        assert!(LstmConfig::default().with_learning_rate(0.0).validate().is_err());
        assert!(LstmConfig::default().with_training(10, 0).validate().is_err());
        assert!(LstmConfig::default().with_training(0, 32).validate().is_err());
        assert!(LstmConfig::default()
            .with_validation_fraction(1.0)
            .validate()
            .is_err());
        assert!(LstmConfig::default()
            .with_validation_fraction(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn lstm_config_deserializes_with_defaults() {
        let config: LstmConfig =
            serde_json::from_str(r#"{"sequence_length": 24, "units": [16, 8]}"#).unwrap();
        assert_eq!(config.sequence_length, 24);
        assert_eq!(config.units, vec![16, 8]);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.seed, 42);
    }
}
