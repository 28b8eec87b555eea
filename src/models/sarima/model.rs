//! Conditional-sum-of-squares estimation of a single SARIMA order.

use crate::error::{ForecastError, Result};
use crate::models::sarima::order::ModelOrder;
use crate::models::sarima::polynomial::{
    apply_difference, differencing_polynomial, expand_ar, expand_ma, undifference_step,
};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::mean;

/// Coefficient bound used when constraints are relaxed.
const RELAXED_BOUND: f64 = 2.0;
/// Coefficient bound used when stationarity and invertibility are enforced.
const ENFORCED_BOUND: f64 = 0.99;

/// Optimizer settings for one estimation run.
#[derive(Debug, Clone, Copy)]
pub struct EstimationSettings {
    pub max_iter: usize,
    pub tolerance: f64,
    pub enforce_stationarity: bool,
}

/// Estimated SARIMA coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SarimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Constant of the differenced series; only estimated without differencing.
    pub intercept: Option<f64>,
}

impl SarimaCoefficients {
    /// Parameter vector layout: [intercept?, ar.., ma.., seasonal_ar.., seasonal_ma..]
    fn unpack(params: &[f64], order: &ModelOrder) -> Self {
        let seasonal = order.is_seasonal();
        let mut rest = params;
        let mut take = |len: usize| {
            let (head, tail) = rest.split_at(len.min(rest.len()));
            rest = tail;
            head.to_vec()
        };

        let intercept = order.has_intercept().then(|| take(1)).and_then(|v| v.first().copied());
        let ar = take(order.p);
        let ma = take(order.q);
        let seasonal_ar = take(if seasonal { order.seasonal_p } else { 0 });
        let seasonal_ma = take(if seasonal { order.seasonal_q } else { 0 });

        Self {
            ar,
            ma,
            seasonal_ar,
            seasonal_ma,
            intercept,
        }
    }
}

/// Lag-form model used by both the objective and the forecast recursion.
#[derive(Debug, Clone)]
struct LagModel {
    ar: Vec<f64>,
    ma: Vec<f64>,
    mu: f64,
}

impl LagModel {
    fn new(coefs: &SarimaCoefficients, order: &ModelOrder) -> Self {
        let s = order.period();
        Self {
            ar: expand_ar(&coefs.ar, &coefs.seasonal_ar, s),
            ma: expand_ma(&coefs.ma, &coefs.seasonal_ma, s),
            mu: coefs.intercept.unwrap_or(0.0),
        }
    }

    /// One-step prediction of `w[t]` from everything before it.
    fn predict(&self, w: &[f64], e: &[f64], t: usize) -> f64 {
        let mut pred = self.mu;
        for (k, a) in self.ar.iter().enumerate().skip(1) {
            if k <= t {
                pred += a * (w[t - k] - self.mu);
            }
        }
        for (k, m) in self.ma.iter().enumerate().skip(1) {
            if k <= t {
                pred += m * e[t - k];
            }
        }
        pred
    }

    /// Innovations over the differenced series; zero before `start`.
    fn innovations(&self, w: &[f64], start: usize) -> Vec<f64> {
        let mut e = vec![0.0; w.len()];
        for t in start..w.len() {
            e[t] = w[t] - self.predict(w, &e, t);
        }
        e
    }
}

fn css(w: &[f64], start: usize, model: &LagModel) -> f64 {
    let e = model.innovations(w, start);
    let total: f64 = e[start..].iter().map(|x| x * x).sum();
    if total.is_finite() {
        total
    } else {
        f64::MAX
    }
}

/// A fitted SARIMA model with its in-sample diagnostics.
#[derive(Debug, Clone)]
pub struct SarimaFit {
    order: ModelOrder,
    coefficients: SarimaCoefficients,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    converged: bool,
    iterations: usize,
    /// In-sample one-step predictions from `burn_in` onward.
    fitted: Vec<f64>,
    /// `actual - fitted` from `burn_in` onward.
    residuals: Vec<f64>,
    history: Vec<f64>,
    differenced: Vec<f64>,
    innovations: Vec<f64>,
    delta: Vec<f64>,
    lag_model: LagModel,
}

impl SarimaFit {
    /// Estimate `order` on finite `values` by minimizing the conditional sum of squares.
    pub fn estimate(
        values: &[f64],
        order: ModelOrder,
        settings: EstimationSettings,
    ) -> Result<SarimaFit> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.iter().any(|x| !x.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let k = order.num_params();
        let needed = order.burn_in() + k + 3;
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let delta = differencing_polynomial(&order);
        let w = apply_difference(values, &delta);
        let start = order.max_ar_lag();

        let (coefficients, converged, iterations) = if k == 0 {
            (SarimaCoefficients::default(), true, 0)
        } else {
            let (initial, bounds) = initial_parameters(&w, &order, settings.enforce_stationarity);
            let result = nelder_mead(
                |params| {
                    let coefs = SarimaCoefficients::unpack(params, &order);
                    css(&w, start, &LagModel::new(&coefs, &order))
                },
                &initial,
                Some(&bounds),
                NelderMeadConfig {
                    max_iter: settings.max_iter,
                    tolerance: settings.tolerance,
                    ..Default::default()
                },
            );
            if !result.optimal_value.is_finite() || result.optimal_value >= f64::MAX {
                return Err(ForecastError::ComputationError(format!(
                    "conditional sum of squares is not finite for order {}",
                    order
                )));
            }
            (
                SarimaCoefficients::unpack(&result.optimal_point, &order),
                result.converged,
                result.iterations,
            )
        };

        let lag_model = LagModel::new(&coefficients, &order);
        let innovations = lag_model.innovations(&w, start);
        let n_eff = w.len() - start;
        let css_value: f64 = innovations[start..].iter().map(|x| x * x).sum();
        if !css_value.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "residuals are not finite for order {}",
                order
            )));
        }

        let sigma2 = css_value / n_eff as f64;
        let log_likelihood = -0.5
            * n_eff as f64
            * (1.0 + sigma2.max(f64::MIN_POSITIVE).ln() + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k as f64;
        let bic = -2.0 * log_likelihood + k as f64 * (n_eff as f64).ln();

        // w index t maps to values index t + degree
        let degree = delta.len() - 1;
        let residuals = innovations[start..].to_vec();
        let fitted = residuals
            .iter()
            .enumerate()
            .map(|(j, e)| values[degree + start + j] - e)
            .collect();

        Ok(SarimaFit {
            order,
            coefficients,
            sigma2,
            log_likelihood,
            aic,
            bic,
            converged,
            iterations,
            fitted,
            residuals,
            history: values.to_vec(),
            differenced: w,
            innovations,
            delta,
            lag_model,
        })
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn coefficients(&self) -> &SarimaCoefficients {
        &self.coefficients
    }

    /// Innovation variance estimate (CSS / effective observations).
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// AIC computed from the last `m` residuals only.
    ///
    /// Orders with different burn-in keep different numbers of residuals, so
    /// candidates are compared on a shared trailing sample. `None` when fewer
    /// than `m` residuals exist or `m` is zero.
    pub fn aic_over_last(&self, m: usize) -> Option<f64> {
        if m == 0 || m > self.residuals.len() {
            return None;
        }
        let tail = &self.residuals[self.residuals.len() - m..];
        let sigma2 = tail.iter().map(|e| e * e).sum::<f64>() / m as f64;
        let log_likelihood = -0.5
            * m as f64
            * (1.0 + sigma2.max(f64::MIN_POSITIVE).ln() + (2.0 * std::f64::consts::PI).ln());
        Some(-2.0 * log_likelihood + 2.0 * self.order.num_params() as f64)
    }

    /// Whether the optimizer met its tolerance before the iteration cap.
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Index of the first observation with a residual.
    pub fn burn_in(&self) -> usize {
        self.history.len() - self.residuals.len()
    }

    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Point forecasts for the next `steps` observations.
    ///
    /// Future innovations are zero; the differenced forecasts are integrated
    /// back through the differencing polynomial.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let mut w = self.differenced.clone();
        let mut e = self.innovations.clone();
        let mut y = self.history.clone();
        let mut out = Vec::with_capacity(steps);

        for _ in 0..steps {
            let t = w.len();
            let next_w = self.lag_model.predict(&w, &e, t);
            w.push(next_w);
            e.push(0.0);

            let next_y = undifference_step(next_w, &y, &self.delta);
            y.push(next_y);
            out.push(next_y);
        }

        out
    }
}

fn initial_parameters(
    w: &[f64],
    order: &ModelOrder,
    enforce_stationarity: bool,
) -> (Vec<f64>, Vec<(f64, f64)>) {
    let bound = if enforce_stationarity {
        ENFORCED_BOUND
    } else {
        RELAXED_BOUND
    };
    let seasonal = order.is_seasonal();

    let mut initial = Vec::with_capacity(order.num_params());
    let mut bounds = Vec::with_capacity(order.num_params());

    if order.has_intercept() {
        initial.push(mean(w));
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));
    }
    let groups = [
        order.p,
        order.q,
        if seasonal { order.seasonal_p } else { 0 },
        if seasonal { order.seasonal_q } else { 0 },
    ];
    for len in groups {
        for i in 0..len {
            initial.push(0.1 / (i + 1) as f64);
            bounds.push((-bound, bound));
        }
    }

    (initial, bounds)
}
