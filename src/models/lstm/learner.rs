//! Residual sequence learner: scaling, windowing, training and rollout.

use crate::core::{Degradation, FeatureFrame, Outcome, Stage, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::lstm::config::{validate_fraction, validate_training, LstmConfig};
use crate::models::lstm::network::LstmNetwork;
use crate::transform::{
    build_windows, stack_columns, MinMaxScaler, ScalerState, SequenceWindow, StandardScaler,
    WindowedSamples,
};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Losses recorded after one training epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean MSE over the epoch's batches (dropout active).
    pub train_loss: f64,
    /// Validation MSE, when a validation split exists.
    pub val_loss: Option<f64>,
    pub val_mae: Option<f64>,
}

/// Summary of a learner fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub history: Vec<EpochMetrics>,
    /// Supervised windows built from the residuals.
    pub windows: usize,
    /// Windows held out for validation.
    pub validation_windows: usize,
    /// Columns per timestep (residual plus features).
    pub input_width: usize,
    /// Feature columns the network was trained with.
    pub features: Vec<String>,
}

impl TrainingReport {
    /// Metrics of the last epoch.
    pub fn last_epoch(&self) -> Option<&EpochMetrics> {
        self.history.last()
    }
}

/// LSTM regressor over windows of SARIMA residuals.
///
/// Learns `r_t` from the previous `sequence_length` residuals (plus
/// exogenous features when supplied) and forecasts by iterative rollout.
#[derive(Debug, Clone)]
pub struct ResidualLearner {
    config: LstmConfig,
    network: Option<LstmNetwork>,
    scalers: Option<ScalerState>,
    feature_names: Vec<String>,
    /// Scaled feature rows of the last training window.
    feature_tail: Vec<Vec<f64>>,
    /// Timestamps of `feature_tail`.
    feature_tail_timestamps: Vec<DateTime<Utc>>,
}

impl ResidualLearner {
    pub fn new(config: LstmConfig) -> Self {
        Self {
            config,
            network: None,
            scalers: None,
            feature_names: Vec::new(),
            feature_tail: Vec::new(),
            feature_tail_timestamps: Vec::new(),
        }
    }

    pub fn config(&self) -> &LstmConfig {
        &self.config
    }

    pub fn sequence_length(&self) -> usize {
        self.config.sequence_length
    }

    pub fn is_fitted(&self) -> bool {
        self.network.is_some()
    }

    /// Scaling parameters captured at fit time.
    pub fn scalers(&self) -> Option<&ScalerState> {
        self.scalers.as_ref()
    }

    /// Feature columns used in training (empty when trained on residuals only).
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn network(&self) -> Option<&LstmNetwork> {
        self.network.as_ref()
    }

    /// Fit with the epochs, batch size and validation split from the config.
    pub fn fit_default(
        &mut self,
        residuals: &TimeSeries,
        features: Option<&FeatureFrame>,
    ) -> Result<Outcome<TrainingReport>> {
        let LstmConfig {
            epochs,
            batch_size,
            validation_fraction,
            ..
        } = self.config;
        self.fit(residuals, features, epochs, batch_size, validation_fraction)
    }

    /// Train on `residuals`, optionally with timestamp-aligned `features`.
    ///
    /// Missing residuals are dropped. Features are used only when their
    /// overlap with the residuals is longer than the sequence length. With
    /// fewer than `sequence_length + 10` usable samples, or when training
    /// diverges, the learner stays unfitted and the outcome is degraded.
    /// Invalid arguments are hard errors.
    pub fn fit(
        &mut self,
        residuals: &TimeSeries,
        features: Option<&FeatureFrame>,
        epochs: usize,
        batch_size: usize,
        validation_fraction: f64,
    ) -> Result<Outcome<TrainingReport>> {
        self.network = None;
        self.scalers = None;
        self.feature_names.clear();
        self.feature_tail.clear();
        self.feature_tail_timestamps.clear();

        self.config.validate()?;
        validate_training(epochs, batch_size)?;
        validate_fraction(validation_fraction)?;

        let sequence_length = self.config.sequence_length;
        let needed = self.config.min_samples();
        let mut report = TrainingReport::default();

        let clean = residuals.drop_missing();
        if clean.is_empty() {
            return Ok(insufficient(report, needed, 0));
        }
        let mut target_scaler = MinMaxScaler::fit(clean.values())?;
        let mut target = clean.values().to_vec();
        let mut feature_rows: Option<Vec<Vec<f64>>> = None;
        let mut feature_timestamps: Vec<DateTime<Utc>> = Vec::new();
        let mut feature_scaler: Option<StandardScaler> = None;

        if let Some(frame) = features {
            let aligned = frame.drop_missing().align_to(clean.timestamps());
            if aligned.len() > sequence_length {
                let rows = aligned.rows();
                let scaler = StandardScaler::fit(&rows)?;
                feature_rows = Some(scaler.transform(&rows)?);
                feature_scaler = Some(scaler);
                feature_timestamps = aligned.timestamps().to_vec();

                target = clean.intersect(aligned.timestamps()).values().to_vec();
                target_scaler = MinMaxScaler::fit(&target)?;
                report.features = aligned.columns().to_vec();
            } else {
                debug!(
                    overlap = aligned.len(),
                    sequence_length, "feature overlap too short, training on residuals only"
                );
            }
        }

        if target.len() < needed {
            return Ok(insufficient(report, needed, target.len()));
        }

        let scaled = target_scaler.transform(&target);
        let data = stack_columns(&scaled, feature_rows.as_deref())?;
        let samples = build_windows(&data, sequence_length)?;
        report.windows = samples.len();
        report.input_width = data.first().map_or(1, Vec::len);

        let (train, validation) = samples.split_tail(validation_fraction);
        report.validation_windows = validation.len();
        if train.is_empty() {
            return Ok(insufficient(report, needed, target.len()));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = LstmNetwork::new(
            report.input_width,
            &self.config.units,
            self.config.dropout,
            self.config.optimizer,
            &mut rng,
        )?;

        match train_network(&mut network, &train, &validation, epochs, batch_size, &mut rng) {
            Ok(history) => report.history = history,
            Err(err) => {
                let reason = Degradation::FitFailed {
                    stage: Stage::Residual,
                    reason: err.to_string(),
                };
                warn!(%reason, "residual learner left unfitted");
                return Ok(Outcome::degraded(report, reason));
            }
        }

        if let Some(rows) = &feature_rows {
            self.feature_tail = rows[rows.len() - sequence_length..].to_vec();
            self.feature_tail_timestamps =
                feature_timestamps[feature_timestamps.len() - sequence_length..].to_vec();
        }
        self.feature_names = report.features.clone();
        self.scalers = Some(ScalerState {
            target: target_scaler,
            features: feature_scaler,
        });
        self.network = Some(network);

        info!(
            windows = report.windows,
            input_width = report.input_width,
            epochs,
            train_loss = report.last_epoch().map(|m| m.train_loss),
            val_loss = report.last_epoch().and_then(|m| m.val_loss),
            "residual learner fitted"
        );
        Ok(Outcome::Complete(report))
    }

    /// Roll the network forward `steps` times from a scaled window.
    ///
    /// Each prediction is appended to the window together with that step's
    /// scaled feature row from `future_features`; once those run out the
    /// last known feature values are carried forward. Returns scaled values.
    pub fn predict(
        &self,
        window: &SequenceWindow,
        steps: usize,
        future_features: Option<&[Vec<f64>]>,
    ) -> Result<Vec<f64>> {
        let network = self.network.as_ref().ok_or(ForecastError::FitRequired)?;
        let (length, _) = window.shape();
        if length != self.config.sequence_length {
            return Err(ForecastError::DimensionMismatch {
                expected: self.config.sequence_length,
                got: length,
            });
        }

        let mut window = window.clone();
        let mut predictions = Vec::with_capacity(steps);
        for step in 0..steps {
            let value = network.predict(&window)?;
            if !value.is_finite() {
                return Err(ForecastError::ComputationError(format!(
                    "non-finite residual prediction at step {}",
                    step
                )));
            }
            predictions.push(value);

            let known = &window.last()[1..];
            let features = future_features
                .and_then(|rows| rows.get(step))
                .map_or(known, Vec::as_slice);
            let mut next = Vec::with_capacity(1 + features.len());
            next.push(value);
            next.extend_from_slice(features);
            window.slide(next)?;
        }
        Ok(predictions)
    }

    /// Forecast `steps` residuals in residual units.
    ///
    /// The last `sequence_length` values of `last_residuals` are scaled with
    /// the fit-time target scaler. When trained with features, the window is
    /// completed with the final training feature rows and `future_features`
    /// (restricted to the trained columns) are scaled with the fit-time
    /// feature scaler. Those feature rows must carry the same timestamps as
    /// the residual window, otherwise a `TimestampError` is returned.
    pub fn predict_residuals(
        &self,
        last_residuals: &TimeSeries,
        steps: usize,
        future_features: Option<&FeatureFrame>,
    ) -> Result<Vec<f64>> {
        let scalers = self.scalers.as_ref().ok_or(ForecastError::FitRequired)?;
        let length = self.config.sequence_length;
        if last_residuals.len() < length {
            return Err(ForecastError::InsufficientData {
                needed: length,
                got: last_residuals.len(),
            });
        }

        let tail = last_residuals.tail(length);
        let scaled = scalers.target.transform(tail.values());

        let (history, future) = match &scalers.features {
            Some(scaler) => {
                if tail.timestamps() != self.feature_tail_timestamps.as_slice() {
                    return Err(ForecastError::TimestampError(format!(
                        "feature history covers {} to {}, residual window covers {} to {}",
                        fmt_bound(self.feature_tail_timestamps.first()),
                        fmt_bound(self.feature_tail_timestamps.last()),
                        fmt_bound(tail.timestamps().first()),
                        fmt_bound(tail.timestamps().last()),
                    )));
                }
                let future = match future_features {
                    Some(frame) => {
                        let selected = frame.select(&self.feature_names)?;
                        Some(scaler.transform(&selected.rows())?)
                    }
                    None => None,
                };
                (Some(self.feature_tail.as_slice()), future)
            }
            None => {
                if future_features.is_some() {
                    debug!("learner trained without features, ignoring future features");
                }
                (None, None)
            }
        };

        let window = SequenceWindow::new(stack_columns(&scaled, history)?)?;
        let predictions = self.predict(&window, steps, future.as_deref())?;
        Ok(scalers.target.inverse(&predictions))
    }
}

impl Default for ResidualLearner {
    fn default() -> Self {
        Self::new(LstmConfig::default())
    }
}

fn fmt_bound(timestamp: Option<&DateTime<Utc>>) -> String {
    timestamp.map_or_else(|| "nothing".to_string(), |t| t.to_rfc3339())
}

fn insufficient(report: TrainingReport, needed: usize, got: usize) -> Outcome<TrainingReport> {
    let reason = Degradation::InsufficientData {
        stage: Stage::Residual,
        needed,
        got,
    };
    warn!(%reason, "residual learner left unfitted");
    Outcome::degraded(report, reason)
}

/// Mini-batch training in sample order, validating after every epoch.
fn train_network(
    network: &mut LstmNetwork,
    train: &WindowedSamples,
    validation: &WindowedSamples,
    epochs: usize,
    batch_size: usize,
    rng: &mut StdRng,
) -> Result<Vec<EpochMetrics>> {
    let mut history = Vec::with_capacity(epochs);
    for epoch in 1..=epochs {
        let mut total = 0.0;
        for (inputs, targets) in train
            .inputs
            .chunks(batch_size)
            .zip(train.targets.chunks(batch_size))
        {
            total += network.train_batch(inputs, targets, rng)? * targets.len() as f64;
        }
        let train_loss = total / train.len() as f64;

        let (val_loss, val_mae) = if validation.is_empty() {
            (None, None)
        } else {
            let (mse, mae) = network.evaluate(&validation.inputs, &validation.targets)?;
            (Some(mse), Some(mae))
        };

        debug!(epoch, train_loss, ?val_loss, ?val_mae, "lstm epoch");
        history.push(EpochMetrics {
            epoch,
            train_loss,
            val_loss,
            val_mae,
        });
    }
    Ok(history)
}
