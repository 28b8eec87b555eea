//! Seasonal linear forecaster: order selection, fallback and timestamped output.

use crate::core::time_series::regular_index;
use crate::core::{Degradation, Outcome, Stage, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::sarima::config::{SarimaConfig, MIN_SEARCH_OBSERVATIONS};
use crate::models::sarima::model::{EstimationSettings, SarimaFit};
use crate::models::sarima::order::ModelOrder;
use crate::validation::{make_stationary, MAX_DIFFERENCES};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// How the final order of a fit was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    /// The configured order, no search.
    Configured,
    /// Minimum-AIC candidate of the automatic search.
    Searched,
    /// The fallback order after the chosen one failed.
    Fallback,
}

/// Summary of a linear-stage fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFitReport {
    /// Order of the fitted model, `None` when every attempt failed.
    pub order: Option<ModelOrder>,
    pub source: Option<OrderSource>,
    /// Candidates that fitted during the search, sorted by AIC over their shared residual sample.
    pub candidates: Vec<(ModelOrder, f64)>,
    /// Differences the ADF loop needed to reach stationarity, reported
    /// alongside the order search.
    pub suggested_differences: Option<usize>,
    /// Observations left after dropping missing values.
    pub observations: usize,
}

/// Seasonal ARIMA stage of the hybrid pipeline.
///
/// Fits SARIMA(p,d,q)(P,D,Q)s by conditional sum of squares, optionally
/// choosing the order by AIC among a small candidate set.
#[derive(Debug, Clone)]
pub struct SeasonalForecaster {
    config: SarimaConfig,
    fit: Option<SarimaFit>,
    /// Timestamps of the cleaned training series.
    timestamps: Vec<DateTime<Utc>>,
}

impl SeasonalForecaster {
    pub fn new(config: SarimaConfig) -> Self {
        Self {
            config,
            fit: None,
            timestamps: Vec::new(),
        }
    }

    pub fn config(&self) -> &SarimaConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fit.is_some()
    }

    /// The fitted model, if any.
    pub fn fitted_model(&self) -> Option<&SarimaFit> {
        self.fit.as_ref()
    }

    pub fn order(&self) -> Option<ModelOrder> {
        self.fit.as_ref().map(SarimaFit::order)
    }

    /// Timestamp of the last training observation.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Fit to `series`, replacing any previous fit.
    ///
    /// Missing values are dropped first. With fewer than 100 observations the
    /// configured order is used without search. A failed fit is retried once
    /// with the fallback order; if that also fails the forecaster is left
    /// unfitted and the outcome is degraded.
    pub fn fit(&mut self, series: &TimeSeries, auto_select: bool) -> Outcome<LinearFitReport> {
        self.fit = None;
        self.timestamps.clear();

        let clean = series.drop_missing();
        let values = clean.values();
        let mut report = LinearFitReport {
            order: None,
            source: None,
            candidates: Vec::new(),
            suggested_differences: None,
            observations: values.len(),
        };

        let (order, source) = if values.len() < MIN_SEARCH_OBSERVATIONS || !auto_select {
            if auto_select {
                debug!(
                    observations = values.len(),
                    "too few observations for order search"
                );
            }
            (self.config.order, OrderSource::Configured)
        } else {
            report.suggested_differences = make_stationary(values, MAX_DIFFERENCES)
                .ok()
                .map(|t| t.differences);
            debug!(
                suggested_differences = ?report.suggested_differences,
                "stationarity check before order search"
            );
            report.candidates = self.search(values);
            match report.candidates.first() {
                Some(&(best, _)) => (best, OrderSource::Searched),
                None => (self.config.order, OrderSource::Configured),
            }
        };

        let primary = SarimaFit::estimate(values, order, self.settings(self.config.max_iter));
        let outcome = match primary {
            Ok(fit) => {
                report.order = Some(order);
                report.source = Some(source);
                self.install(fit, &clean);
                Outcome::Complete(report)
            }
            Err(primary_err) => {
                warn!(%order, error = %primary_err, "sarima fit failed, trying fallback order");
                let fallback = self.config.fallback_order;
                match SarimaFit::estimate(
                    values,
                    fallback,
                    self.settings(self.config.fallback_max_iter),
                ) {
                    Ok(fit) => {
                        report.order = Some(fallback);
                        report.source = Some(OrderSource::Fallback);
                        self.install(fit, &clean);
                        Outcome::degraded(
                            report,
                            Degradation::FitFailed {
                                stage: Stage::Linear,
                                reason: format!("order {} failed: {}", order, primary_err),
                            },
                        )
                    }
                    Err(fallback_err) => {
                        warn!(%fallback, error = %fallback_err, "fallback sarima fit failed");
                        Outcome::degraded(
                            report,
                            Degradation::FitFailed {
                                stage: Stage::Linear,
                                reason: format!(
                                    "order {} failed: {}; fallback {} failed: {}",
                                    order, primary_err, fallback, fallback_err
                                ),
                            },
                        )
                    }
                }
            }
        };

        if let Some(fit) = &self.fit {
            info!(
                order = %fit.order(),
                aic = fit.aic(),
                converged = fit.converged(),
                "sarima fitted"
            );
        }
        outcome
    }

    /// Point forecast of `steps` values at the configured cadence.
    ///
    /// Starts at `start`, or one cadence after the last training timestamp.
    /// A forecast with non-finite values is replaced by a flat forecast of the
    /// one-step estimate (or the last observation) and tagged degraded.
    pub fn predict(
        &self,
        steps: usize,
        start: Option<DateTime<Utc>>,
    ) -> Result<Outcome<TimeSeries>> {
        let fit = self.fit.as_ref().ok_or(ForecastError::FitRequired)?;
        let cadence = self.config.cadence();
        let start = match start {
            Some(start) => start,
            None => self
                .last_timestamp()
                .ok_or(ForecastError::FitRequired)?
                .checked_add_signed(cadence)
                .ok_or_else(|| {
                    ForecastError::TimestampError("forecast start is out of range".to_string())
                })?,
        };
        let timestamps = regular_index(start, cadence, steps)?;

        let values = fit.forecast(steps);
        if values.iter().all(|v| v.is_finite()) {
            return Ok(Outcome::Complete(TimeSeries::new(timestamps, values)?));
        }

        let one_step = values.first().copied().filter(|v| v.is_finite());
        let last_observed = fit.fitted_values().last().zip(fit.residuals().last()).map(|(f, r)| f + r);
        let level = one_step
            .or(last_observed.filter(|v| v.is_finite()))
            .unwrap_or(0.0);
        let reason = Degradation::InferenceFailed {
            stage: Stage::Linear,
            reason: "forecast contains non-finite values".to_string(),
        };
        warn!(%reason, level, "using flat linear forecast");

        Ok(Outcome::degraded(
            TimeSeries::new(timestamps, vec![level; steps])?,
            reason,
        ))
    }

    /// In-sample residuals at the training timestamps, burn-in excluded.
    pub fn residuals(&self) -> Result<TimeSeries> {
        let fit = self.fit.as_ref().ok_or(ForecastError::FitRequired)?;
        let timestamps = self.timestamps[fit.burn_in()..].to_vec();
        TimeSeries::new(timestamps, fit.residuals().to_vec())
    }

    /// In-sample one-step predictions at the training timestamps, burn-in excluded.
    pub fn fitted_values(&self) -> Result<TimeSeries> {
        let fit = self.fit.as_ref().ok_or(ForecastError::FitRequired)?;
        let timestamps = self.timestamps[fit.burn_in()..].to_vec();
        TimeSeries::new(timestamps, fit.fitted_values().to_vec())
    }

    fn settings(&self, max_iter: usize) -> EstimationSettings {
        EstimationSettings {
            max_iter,
            tolerance: self.config.tolerance,
            enforce_stationarity: self.config.enforce_stationarity,
        }
    }

    fn install(&mut self, fit: SarimaFit, series: &TimeSeries) {
        self.timestamps = series.timestamps().to_vec();
        self.fit = Some(fit);
    }

    /// Fit every candidate with relaxed constraints; failures are skipped.
    ///
    /// Scores are AICs over the residuals every candidate shares, i.e. the
    /// observations after the largest burn-in among the candidates.
    fn search(&self, values: &[f64]) -> Vec<(ModelOrder, f64)> {
        let settings = EstimationSettings {
            max_iter: self.config.search_max_iter,
            tolerance: self.config.tolerance,
            enforce_stationarity: false,
        };

        let candidates = ModelOrder::candidates(self.config.seasonal_period);
        let common = candidates
            .iter()
            .map(|order| order.burn_in())
            .max()
            .map_or(0, |burn_in| values.len().saturating_sub(burn_in));

        let mut scores: Vec<(ModelOrder, f64)> = candidates
            .into_iter()
            .filter_map(|order| match SarimaFit::estimate(values, order, settings) {
                Ok(fit) => match fit.aic_over_last(common).filter(|aic| aic.is_finite()) {
                    Some(aic) => {
                        debug!(%order, aic, sample = common, "candidate fitted");
                        Some((order, aic))
                    }
                    None => None,
                },
                Err(err) => {
                    debug!(%order, error = %err, "candidate skipped");
                    None
                }
            })
            .collect();

        scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }
}

impl Default for SeasonalForecaster {
    fn default() -> Self {
        Self::new(SarimaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    fn temperature(n: usize) -> TimeSeries {
        let values = (0..n)
            .map(|i| {
                let t = i as f64;
                12.0 + 6.0 * (2.0 * std::f64::consts::PI * t / 24.0).sin()
                    + 0.3 * (t * 1.3).cos()
                    + 0.01 * t
            })
            .collect();
        TimeSeries::new(make_timestamps(n), values).unwrap()
    }

    #[test]
    fn predict_requires_fit() {
        let model = SeasonalForecaster::default();
        assert_eq!(model.predict(5, None).err(), Some(ForecastError::FitRequired));
        assert_eq!(model.residuals().err(), Some(ForecastError::FitRequired));
        assert!(!model.is_fitted());
    }

    #[test]
    fn short_series_skips_search() {
        let series = temperature(80);
        let mut model = SeasonalForecaster::default();
        let outcome = model.fit(&series, true);

        assert!(outcome.is_complete());
        let report = outcome.value();
        assert!(report.candidates.is_empty());
        assert!(report.suggested_differences.is_none());
        assert_eq!(report.source, Some(OrderSource::Configured));
        assert_eq!(model.order(), Some(ModelOrder::default_hourly()));
    }

    #[test]
    fn long_series_searches_candidates() {
        let series = temperature(240);
        let config = SarimaConfig::default().with_max_iter(300, 100, 100);
        let mut model = SeasonalForecaster::new(config);
        let outcome = model.fit(&series, true);

        let report = outcome.value();
        assert!(!report.candidates.is_empty());
        assert!(report.candidates.len() <= 4);
        assert!(report
            .candidates
            .windows(2)
            .all(|w| w[0].1 <= w[1].1));
        assert!(model.is_fitted());
        if outcome.is_complete() {
            assert_eq!(report.order, Some(report.candidates[0].0));
        }
    }

    #[test]
    fn forecast_starts_one_cadence_after_training() {
        let series = temperature(120);
        let mut model = SeasonalForecaster::default();
        model.fit(&series, false);

        let forecast = model.predict(24, None).unwrap().into_value();
        assert_eq!(forecast.len(), 24);
        let last = series.last_timestamp().unwrap();
        assert_eq!(forecast.timestamps()[0], last + Duration::hours(1));
        assert_eq!(
            forecast.timestamps()[23] - forecast.timestamps()[0],
            Duration::hours(23)
        );
    }

    #[test]
    fn forecast_honors_explicit_start() {
        let series = temperature(120);
        let mut model = SeasonalForecaster::default();
        model.fit(&series, false);

        let start = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let forecast = model.predict(3, Some(start)).unwrap().into_value();
        assert_eq!(forecast.timestamps()[0], start);
        assert_eq!(forecast.timestamps()[2], start + Duration::hours(2));
    }

    #[test]
    fn residuals_cover_post_burn_in_timestamps() {
        let series = temperature(150);
        let mut model = SeasonalForecaster::default();
        model.fit(&series, false);

        let residuals = model.residuals().unwrap();
        assert_eq!(residuals.len(), 100);
        assert_eq!(residuals.timestamps()[0], series.timestamps()[50]);
        assert_eq!(residuals.last_timestamp(), series.last_timestamp());

        let fitted = model.fitted_values().unwrap();
        assert_eq!(fitted.timestamps(), residuals.timestamps());
    }

    #[test]
    fn fit_drops_missing_values() {
        let mut values = temperature(120).values().to_vec();
        values[10] = f64::NAN;
        values[70] = f64::INFINITY;
        let series = TimeSeries::new(make_timestamps(120), values).unwrap();

        let mut model = SeasonalForecaster::default();
        let report = model.fit(&series, false).into_value();
        assert_eq!(report.observations, 118);
        assert_eq!(model.residuals().unwrap().len(), 68);

        // 118 observations are enough to search; the residual count follows the winner
        let mut searched = SeasonalForecaster::default();
        let report = searched.fit(&series, true).into_value();
        assert_eq!(report.source, Some(OrderSource::Searched));
        let burn_in = searched.order().unwrap().burn_in();
        assert_eq!(searched.residuals().unwrap().len(), 118 - burn_in);
    }

    #[test]
    fn candidates_are_scored_on_a_shared_sample() {
        let series = temperature(130);
        let values = series.values();
        let config = SarimaConfig::default().with_max_iter(300, 100, 100);
        let tolerance = config.tolerance;
        let mut model = SeasonalForecaster::new(config);
        let report = model.fit(&series, true).into_value();
        assert!(!report.candidates.is_empty());

        let candidates = ModelOrder::candidates(24);
        let common = values.len() - candidates.iter().map(|o| o.burn_in()).max().unwrap();
        let settings = EstimationSettings {
            max_iter: 100,
            tolerance,
            enforce_stationarity: false,
        };
        for &(order, score) in &report.candidates {
            let fit = SarimaFit::estimate(values, order, settings).unwrap();
            assert_eq!(fit.aic_over_last(common), Some(score));
        }
    }

    #[test]
    fn fallback_then_unfitted_when_data_is_too_short() {
        let series = temperature(30);
        let mut model = SeasonalForecaster::new(
            SarimaConfig::default().with_order(ModelOrder::new((2, 1, 2), (1, 1, 1, 24))),
        );

        let outcome = model.fit(&series, true);
        assert!(outcome.is_degraded());
        assert!(matches!(
            outcome.reason(),
            Some(Degradation::FitFailed {
                stage: Stage::Linear,
                ..
            })
        ));
        assert!(!model.is_fitted());
        assert_eq!(model.predict(1, None).err(), Some(ForecastError::FitRequired));
    }

    #[test]
    fn fallback_order_is_used_when_primary_fails() {
        let series = temperature(60);
        let config = SarimaConfig::default()
            .with_order(ModelOrder::new((1, 1, 1), (2, 1, 2, 24)))
            .with_fallback_order(ModelOrder::non_seasonal(1, 1, 0));
        let mut model = SeasonalForecaster::new(config);

        let outcome = model.fit(&series, false);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.value().source, Some(OrderSource::Fallback));
        assert_eq!(model.order(), Some(ModelOrder::non_seasonal(1, 1, 0)));
        assert!(model.predict(4, None).unwrap().is_complete());
    }

    #[test]
    fn refit_replaces_previous_model() {
        let mut model = SeasonalForecaster::default();
        model.fit(&temperature(120), false);
        assert!(model.is_fitted());

        model.fit(&temperature(20), false);
        assert!(!model.is_fitted());
    }
}
