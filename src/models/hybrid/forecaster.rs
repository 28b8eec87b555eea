//! Hybrid composer: SARIMA for the linear part, LSTM for its residuals.

use crate::core::{Degradation, FeatureFrame, HybridForecast, Outcome, Stage, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::hybrid::config::HybridConfig;
use crate::models::lstm::{ResidualLearner, TrainingReport};
use crate::models::sarima::{LinearFitReport, SeasonalForecaster};
use crate::utils::{calculate_metrics, AccuracyMetrics};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Lifecycle of a [`HybridForecaster`].
#[derive(Debug, Clone, PartialEq)]
pub enum FitState {
    Unfitted,
    /// The linear stage is fitted; the residual stage may not be.
    Fitted,
    /// The linear stage could not be fitted.
    Failed(Degradation),
}

/// What happened during [`HybridForecaster::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub linear: LinearFitReport,
    /// `None` when the residual stage was never attempted.
    pub residual: Option<TrainingReport>,
    pub degradations: Vec<Degradation>,
}

impl FitReport {
    /// Both stages fitted without degradation.
    pub fn is_complete(&self) -> bool {
        self.degradations.is_empty()
    }
}

/// Two-stage forecaster summing a SARIMA forecast and an LSTM forecast of
/// the SARIMA residuals.
///
/// The composer counts as fitted once the linear stage is fitted; without a
/// usable residual stage its forecasts are linear-only and say so in
/// [`HybridForecast::degradations`].
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use hybrid_forecast::core::TimeSeries;
/// use hybrid_forecast::models::hybrid::{HybridConfig, HybridForecaster};
/// use hybrid_forecast::models::sarima::ModelOrder;
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let values: Vec<f64> = (0..80).map(|i| 10.0 + 0.1 * i as f64 + (i as f64 * 0.5).sin()).collect();
/// let series = TimeSeries::regular(start, Duration::hours(1), values).unwrap();
///
/// let config = HybridConfig::default()
///     .with_order(ModelOrder::non_seasonal(1, 1, 0))
///     .with_sequence_length(12)
///     .with_units(vec![8]);
/// let mut model = HybridForecaster::new(config);
/// model.fit(&series, None, 2, 16).unwrap();
///
/// let forecast = model.predict(6, None, None).unwrap();
/// assert_eq!(forecast.horizon(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct HybridForecaster {
    config: HybridConfig,
    linear: SeasonalForecaster,
    residual: ResidualLearner,
    state: FitState,
    /// Feature columns supplied at fit time.
    feature_columns: Option<Vec<String>>,
}

impl HybridForecaster {
    pub fn new(config: HybridConfig) -> Self {
        Self {
            linear: SeasonalForecaster::new(config.sarima.clone()),
            residual: ResidualLearner::new(config.lstm.clone()),
            config,
            state: FitState::Unfitted,
            feature_columns: None,
        }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn state(&self) -> &FitState {
        &self.state
    }

    /// Whether forecasts can be produced.
    pub fn is_fitted(&self) -> bool {
        self.state == FitState::Fitted
    }

    /// Whether both stages are fitted.
    pub fn is_fully_fitted(&self) -> bool {
        self.is_fitted() && self.residual.is_fitted()
    }

    pub fn linear(&self) -> &SeasonalForecaster {
        &self.linear
    }

    pub fn residual(&self) -> &ResidualLearner {
        &self.residual
    }

    pub fn feature_columns(&self) -> Option<&[String]> {
        self.feature_columns.as_deref()
    }

    /// Fit with the epochs and batch size from the LSTM config.
    pub fn fit_default(
        &mut self,
        series: &TimeSeries,
        features: Option<&FeatureFrame>,
    ) -> Result<FitReport> {
        let (epochs, batch_size) = (self.config.lstm.epochs, self.config.lstm.batch_size);
        self.fit(series, features, epochs, batch_size)
    }

    /// Fit the linear stage on `series`, then the residual stage on its
    /// in-sample residuals (with `features` aligned to the residual index).
    ///
    /// A linear-stage failure leaves the composer in [`FitState::Failed`].
    /// A residual stage that cannot be trained is recorded in the report and
    /// later forecasts are linear-only. Invalid configuration is an error.
    pub fn fit(
        &mut self,
        series: &TimeSeries,
        features: Option<&FeatureFrame>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<FitReport> {
        self.config.validate()?;
        self.state = FitState::Unfitted;
        self.feature_columns = None;

        let (linear, linear_reason) = self
            .linear
            .fit(series, self.config.auto_select)
            .into_parts();
        let mut report = FitReport {
            linear,
            residual: None,
            degradations: linear_reason.into_iter().collect(),
        };

        if !self.linear.is_fitted() {
            let reason = report
                .degradations
                .last()
                .cloned()
                .unwrap_or(Degradation::Unfitted {
                    stage: Stage::Linear,
                });
            warn!(%reason, "hybrid fit failed");
            self.state = FitState::Failed(reason);
            return Ok(report);
        }

        let residuals = self.linear.residuals()?;
        let aligned = features.map(|frame| {
            self.feature_columns = Some(frame.columns().to_vec());
            frame.align_to(residuals.timestamps())
        });

        let outcome = match self.residual.fit(
            &residuals,
            aligned.as_ref(),
            epochs,
            batch_size,
            self.config.lstm.validation_fraction,
        ) {
            Ok(outcome) => outcome,
            Err(err @ ForecastError::InvalidParameter(_)) => return Err(err),
            Err(err) => {
                let reason = Degradation::FitFailed {
                    stage: Stage::Residual,
                    reason: err.to_string(),
                };
                warn!(%reason, "residual stage unavailable");
                Outcome::degraded(TrainingReport::default(), reason)
            }
        };
        let (training, residual_reason) = outcome.into_parts();
        report.residual = Some(training);
        report.degradations.extend(residual_reason);

        self.state = FitState::Fitted;
        info!(
            order = ?self.linear.order(),
            residuals = residuals.len(),
            fully_fitted = self.is_fully_fitted(),
            "hybrid model fitted"
        );
        Ok(report)
    }

    /// Fit on a worker thread, handing the model back when done.
    pub fn spawn_fit(
        mut self,
        series: TimeSeries,
        features: Option<FeatureFrame>,
        epochs: usize,
        batch_size: usize,
    ) -> JoinHandle<(Self, Result<FitReport>)> {
        thread::spawn(move || {
            let report = self.fit(&series, features.as_ref(), epochs, batch_size);
            (self, report)
        })
    }

    /// Forecast `steps` values starting at `start` (or one cadence after the
    /// training data).
    ///
    /// The residual component falls back to zeros, with a recorded
    /// degradation, when there are fewer residuals than the sequence length,
    /// the residual stage is unfitted, or its rollout fails.
    pub fn predict(
        &self,
        steps: usize,
        start: Option<DateTime<Utc>>,
        future_features: Option<&FeatureFrame>,
    ) -> Result<HybridForecast> {
        if !self.is_fitted() {
            return Err(ForecastError::FitRequired);
        }

        let (linear, linear_reason) = self.linear.predict(steps, start)?.into_parts();
        let mut degradations: Vec<Degradation> = linear_reason.into_iter().collect();

        let (residual, residual_reason) = self.residual_forecast(steps, future_features)?.into_parts();
        if let Some(reason) = residual_reason {
            warn!(%reason, "linear-only forecast");
            degradations.push(reason);
        }

        HybridForecast::new(
            linear.timestamps().to_vec(),
            linear.values().to_vec(),
            residual,
            degradations,
        )
    }

    /// Forecast the configured horizon from the end of the training data.
    pub fn forecast(&self, future_features: Option<&FeatureFrame>) -> Result<HybridForecast> {
        self.predict(self.config.horizon, None, future_features)
    }

    /// MAE, RMSE and MAPE of a forecast over the timestamps of `test`.
    ///
    /// Forecasts `test.len()` steps from the first test timestamp and scores
    /// the timestamps shared with the (non-missing) test values. With no
    /// shared timestamps every metric is NaN.
    pub fn evaluate(
        &self,
        test: &TimeSeries,
        test_features: Option<&FeatureFrame>,
    ) -> Result<BTreeMap<String, f64>> {
        Ok(self.evaluate_metrics(test, test_features)?.to_map())
    }

    /// [`evaluate`](Self::evaluate) as a typed result.
    pub fn evaluate_metrics(
        &self,
        test: &TimeSeries,
        test_features: Option<&FeatureFrame>,
    ) -> Result<AccuracyMetrics> {
        if !self.is_fitted() {
            return Err(ForecastError::FitRequired);
        }
        let Some(start) = test.first_timestamp() else {
            return Ok(AccuracyMetrics::undefined());
        };

        let predicted = self
            .predict(test.len(), Some(start), test_features)?
            .to_series()?;
        let actual = test.drop_missing().intersect(predicted.timestamps());
        let predicted = predicted.intersect(actual.timestamps());

        calculate_metrics(actual.values(), predicted.values())
    }

    fn residual_forecast(
        &self,
        steps: usize,
        future_features: Option<&FeatureFrame>,
    ) -> Result<Outcome<Vec<f64>>> {
        let zeros = vec![0.0; steps];
        let residuals = self.linear.residuals()?;
        let length = self.residual.sequence_length();

        if residuals.len() < length {
            return Ok(Outcome::degraded(
                zeros,
                Degradation::InsufficientData {
                    stage: Stage::Residual,
                    needed: length,
                    got: residuals.len(),
                },
            ));
        }
        if !self.residual.is_fitted() {
            return Ok(Outcome::degraded(
                zeros,
                Degradation::Unfitted {
                    stage: Stage::Residual,
                },
            ));
        }

        match self
            .residual
            .predict_residuals(&residuals, steps, future_features)
        {
            Ok(values) => Ok(Outcome::Complete(values)),
            Err(err) => Ok(Outcome::degraded(
                zeros,
                Degradation::InferenceFailed {
                    stage: Stage::Residual,
                    reason: err.to_string(),
                },
            )),
        }
    }
}

impl Default for HybridForecaster {
    fn default() -> Self {
        Self::new(HybridConfig::default())
    }
}
