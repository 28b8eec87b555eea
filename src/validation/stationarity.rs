//! Augmented Dickey-Fuller unit-root test and differencing to stationarity.

use crate::error::{ForecastError, Result};
use crate::utils::{normal_cdf, ols_fit};
use tracing::debug;

/// Significance level at which the unit-root null is rejected.
pub const STATIONARITY_ALPHA: f64 = 0.05;

/// Default cap on the number of differences applied by [`make_stationary`].
pub const MAX_DIFFERENCES: usize = 2;

const MIN_OBSERVATIONS: usize = 10;

/// Result of an ADF test.
#[derive(Debug, Clone, PartialEq)]
pub struct StationarityResult {
    /// t-statistic of the lagged level coefficient.
    pub statistic: f64,
    /// MacKinnon approximate p-value.
    pub p_value: f64,
    /// Number of lagged differences in the regression.
    pub lags: usize,
    /// Observations used in the final regression.
    pub n_obs: usize,
    /// `p_value <= STATIONARITY_ALPHA`
    pub is_stationary: bool,
    pub critical_values: CriticalValues,
}

/// Critical values for the constant-only ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CriticalValues {
    pub cv_1pct: f64,
    pub cv_5pct: f64,
    pub cv_10pct: f64,
}

impl CriticalValues {
    /// MacKinnon (2010) response-surface values for sample size `n`.
    fn for_sample_size(n: usize) -> Self {
        let inv = 1.0 / n as f64;
        let surface = |c: [f64; 4]| c[0] + c[1] * inv + c[2] * inv.powi(2) + c[3] * inv.powi(3);
        Self {
            cv_1pct: surface([-3.43035, -6.5393, -16.786, -79.433]),
            cv_5pct: surface([-2.86154, -2.8903, -4.234, -40.040]),
            cv_10pct: surface([-2.56677, -1.5384, -2.809, 0.0]),
        }
    }
}

/// Augmented Dickey-Fuller test with a constant.
///
/// Regression: Δy_t = α + γ·y_{t-1} + Σ β_i·Δy_{t-i} + ε_t. The number of
/// lagged differences is chosen by AIC over `0..=max_lags` on a common
/// sample; `max_lags` defaults to `ceil(12·(n/100)^(1/4))`.
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> Result<StationarityResult> {
    let n = series.len();
    if n < MIN_OBSERVATIONS {
        return Err(ForecastError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            got: n,
        });
    }
    if series.iter().any(|x| !x.is_finite()) {
        return Err(ForecastError::MissingValues);
    }

    let default_lags = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lags = max_lags.unwrap_or(default_lags).min((n - 1) / 3);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // AIC lag selection on the sample shared by every candidate.
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lags {
        let Ok((columns, target)) = adf_design(series, &diff, lag, max_lags) else {
            continue;
        };
        let Ok(fit) = ols_fit(&target, &columns) else {
            continue;
        };
        let nobs = target.len() as f64;
        let rss: f64 = fit.residuals.iter().map(|r| r * r).sum();
        let aic = nobs * (rss / nobs).ln() + 2.0 * columns.len() as f64;
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lag, aic));
        }
    }
    let lags = best.map_or(0, |(lag, _)| lag);

    let (columns, target) = adf_design(series, &diff, lags, lags)?;
    let fit = ols_fit(&target, &columns)?;
    let statistic = fit.t_stat(0).ok_or_else(|| {
        ForecastError::ComputationError("ADF regression has zero variance".to_string())
    })?;
    let p_value = mackinnon_p_value(statistic);

    debug!(statistic, p_value, lags, "adf test");

    Ok(StationarityResult {
        statistic,
        p_value,
        lags,
        n_obs: target.len(),
        is_stationary: p_value <= STATIONARITY_ALPHA,
        critical_values: CriticalValues::for_sample_size(target.len()),
    })
}

/// Design matrix [y_{t-1}, Δy_{t-1..t-lag}, 1] and target Δy_t, rows from `start`.
fn adf_design(
    level: &[f64],
    diff: &[f64],
    lag: usize,
    start: usize,
) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    if start < lag || start >= diff.len() {
        return Err(ForecastError::InsufficientData {
            needed: start + 1,
            got: diff.len(),
        });
    }

    let rows = start..diff.len();
    let target: Vec<f64> = rows.clone().map(|j| diff[j]).collect();

    let mut columns = Vec::with_capacity(lag + 2);
    columns.push(rows.clone().map(|j| level[j]).collect());
    for i in 1..=lag {
        columns.push(rows.clone().map(|j| diff[j - i]).collect());
    }
    columns.push(vec![1.0; target.len()]);

    Ok((columns, target))
}

/// MacKinnon (1994) approximate p-value for the constant-only ADF statistic.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    const TAU_MAX: f64 = 2.74;
    const TAU_MIN: f64 = -18.83;
    const TAU_STAR: f64 = -1.61;
    const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
    const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let coefs: &[f64] = if statistic <= TAU_STAR {
        &SMALL_P
    } else {
        &LARGE_P
    };
    let z = coefs
        .iter()
        .enumerate()
        .map(|(i, c)| c * statistic.powi(i as i32))
        .sum::<f64>();
    normal_cdf(z)
}

/// Whether the ADF test rejects a unit root at the 5% level.
///
/// Series too short or degenerate for the regression count as non-stationary.
pub fn is_stationary(series: &[f64]) -> bool {
    adf_test(series, None).is_ok_and(|r| r.is_stationary)
}

/// Output of [`make_stationary`].
#[derive(Debug, Clone)]
pub struct StationaryTransform {
    /// Series after `differences` rounds of first differencing.
    pub data: Vec<f64>,
    /// Number of differences applied.
    pub differences: usize,
    /// Test on the returned data.
    pub test: StationarityResult,
}

/// Difference until the ADF test reports stationarity or `max_differences` is reached.
pub fn make_stationary(series: &[f64], max_differences: usize) -> Result<StationaryTransform> {
    let mut data = series.to_vec();
    let mut differences = 0;

    loop {
        let test = adf_test(&data, None)?;
        if test.is_stationary || differences >= max_differences {
            debug!(differences, p_value = test.p_value, "differencing finished");
            return Ok(StationaryTransform {
                data,
                differences,
                test,
            });
        }
        data = data.windows(2).map(|w| w[1] - w[0]).collect();
        differences += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Deterministic pseudo-noise in [-0.5, 0.5).
    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        noise(n, seed)
            .iter()
            .scan(0.0, |acc, e| {
                *acc += e;
                Some(*acc)
            })
            .collect()
    }

    #[test]
    fn adf_white_noise_is_stationary() {
        let series = noise(200, 7);
        let result = adf_test(&series, None).unwrap();

        assert!(result.statistic < result.critical_values.cv_1pct);
        assert!(result.p_value < 0.01);
        assert!(result.is_stationary);
        assert!(is_stationary(&series));
    }

    #[test]
    fn adf_trend_plus_walk_is_not_stationary() {
        let series: Vec<f64> = random_walk(200, 11)
            .iter()
            .enumerate()
            .map(|(i, x)| x * 5.0 + i as f64 * 0.5)
            .collect();

        let result = adf_test(&series, None).unwrap();
        assert!(!result.is_stationary);
        assert!(result.p_value > STATIONARITY_ALPHA);
    }

    #[test]
    fn adf_rejects_short_or_missing_input() {
        assert!(matches!(
            adf_test(&[1.0, 2.0, 3.0], None),
            Err(ForecastError::InsufficientData { .. })
        ));
        let mut series = noise(50, 3);
        series[10] = f64::NAN;
        assert_eq!(adf_test(&series, None), Err(ForecastError::MissingValues));
        assert!(!is_stationary(&series));
    }

    #[test]
    fn mackinnon_p_value_is_monotone_with_clamped_tails() {
        assert_relative_eq!(mackinnon_p_value(3.0), 1.0);
        assert_relative_eq!(mackinnon_p_value(-20.0), 0.0);

        let grid = [-6.0, -4.0, -3.5, -2.86, -2.0, -1.61, -1.0, 0.0, 1.0, 2.0];
        let ps: Vec<f64> = grid.iter().map(|&t| mackinnon_p_value(t)).collect();
        assert!(ps.windows(2).all(|w| w[0] <= w[1]));

        // The 5% critical value maps to roughly p = 0.05
        assert!((mackinnon_p_value(-2.86) - 0.05).abs() < 0.01);
    }

    #[test]
    fn critical_values_approach_asymptotic_values() {
        let cv = CriticalValues::for_sample_size(100_000);
        assert_relative_eq!(cv.cv_5pct, -2.86154, epsilon = 1e-3);
        assert!(cv.cv_1pct < cv.cv_5pct && cv.cv_5pct < cv.cv_10pct);
    }

    #[test]
    fn make_stationary_differences_a_drifting_walk() {
        let walk: Vec<f64> = random_walk(300, 5)
            .iter()
            .enumerate()
            .map(|(i, x)| x * 5.0 + i as f64 * 0.5)
            .collect();
        let result = make_stationary(&walk, MAX_DIFFERENCES).unwrap();

        assert!(result.differences >= 1);
        assert!(result.differences <= MAX_DIFFERENCES);
        assert_eq!(result.data.len(), walk.len() - result.differences);
        assert!(result.test.is_stationary);
    }

    #[test]
    fn make_stationary_leaves_stationary_series_alone() {
        let series = noise(150, 21);
        let result = make_stationary(&series, MAX_DIFFERENCES).unwrap();
        assert_eq!(result.differences, 0);
        assert_eq!(result.data, series);
    }
}
