//! Property-based tests for the hybrid pipeline.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hybrid_forecast::core::{HybridForecast, TimeSeries};
use hybrid_forecast::models::hybrid::{HybridConfig, HybridForecaster};
use hybrid_forecast::models::sarima::{ModelOrder, SarimaConfig, SeasonalForecaster};
use hybrid_forecast::transform::{build_windows, stack_columns, MinMaxScaler, StandardScaler};
use hybrid_forecast::utils::calculate_metrics;
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn make_ts(values: &[f64]) -> TimeSeries {
    TimeSeries::regular(base(), Duration::hours(1), values.to_vec()).unwrap()
}

/// Trend plus daily cycle plus bounded jitter.
fn weather_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        (
            -5.0..30.0_f64,
            -0.05..0.05_f64,
            1.0..8.0_f64,
            prop::collection::vec(-0.5..0.5_f64, len),
        )
            .prop_map(move |(level, slope, amplitude, jitter)| {
                (0..len)
                    .map(|i| {
                        let t = i as f64;
                        level
                            + slope * t
                            + amplitude * (2.0 * std::f64::consts::PI * t / 24.0).sin()
                            + jitter[i]
                    })
                    .collect()
            })
    })
}

fn residual_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-50.0..50.0_f64, min_len..max_len)
}

// =============================================================================
// Property: linear forecasts have the requested length and hourly cadence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn linear_forecast_length_and_cadence(
        values in weather_strategy(40, 90),
        horizon in 1usize..48
    ) {
        let config = SarimaConfig::default().with_order(ModelOrder::non_seasonal(1, 1, 1));
        let mut model = SeasonalForecaster::new(config);
        let ts = make_ts(&values);
        model.fit(&ts, false);
        prop_assume!(model.is_fitted());

        let forecast = model.predict(horizon, None).unwrap().into_value();
        prop_assert_eq!(forecast.len(), horizon);
        prop_assert_eq!(
            forecast.timestamps()[0],
            ts.last_timestamp().unwrap() + Duration::hours(1)
        );
        for w in forecast.timestamps().windows(2) {
            prop_assert_eq!(w[1] - w[0], Duration::hours(1));
        }
    }

    #[test]
    fn residuals_exclude_burn_in(values in weather_strategy(40, 90)) {
        let order = ModelOrder::non_seasonal(2, 1, 0);
        let mut model = SeasonalForecaster::new(SarimaConfig::default().with_order(order));
        model.fit(&make_ts(&values), false);
        prop_assume!(model.is_fitted());

        let residuals = model.residuals().unwrap();
        prop_assert_eq!(residuals.len(), values.len() - order.burn_in());
        prop_assert!(residuals.values().iter().all(|r| r.is_finite()));
    }
}

// =============================================================================
// Property: scalers round-trip
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn min_max_scaler_round_trip(values in residual_strategy(2, 200)) {
        let scaler = MinMaxScaler::fit(&values).unwrap();
        let scaled = scaler.transform(&values);
        prop_assert!(scaled.iter().all(|&x| (-1e-12..=1.0 + 1e-12).contains(&x)));

        let restored = scaler.inverse(&scaled);
        for (a, b) in values.iter().zip(&restored) {
            prop_assert!((a - b).abs() <= 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn standard_scaler_round_trip(
        rows in prop::collection::vec(prop::collection::vec(-100.0..100.0_f64, 3), 2..60)
    ) {
        let scaler = StandardScaler::fit(&rows).unwrap();
        for row in &rows {
            let restored = scaler.inverse_row(&scaler.transform_row(row).unwrap()).unwrap();
            for (a, b) in row.iter().zip(&restored) {
                prop_assert!((a - b).abs() <= 1e-6);
            }
        }
    }
}

// =============================================================================
// Property: window counts and shapes
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn window_count_and_shape(
        n in 2usize..150,
        width in 0usize..4,
        length in 1usize..40
    ) {
        prop_assume!(n > length);
        let target: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let features: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 * 0.5; width]).collect();
        let data = stack_columns(&target, (width > 0).then_some(features.as_slice())).unwrap();

        let samples = build_windows(&data, length).unwrap();
        prop_assert_eq!(samples.len(), n - length);
        for (window, &target) in samples.inputs.iter().zip(&samples.targets) {
            prop_assert_eq!(window.shape(), (length, 1 + width));
            // The target is the step right after the window
            prop_assert_eq!(target, window.last()[0] + 1.0);
        }
    }
}

// =============================================================================
// Property: composition and metrics
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn hybrid_forecast_is_elementwise_sum(
        pairs in prop::collection::vec((-100.0..100.0_f64, -10.0..10.0_f64), 0..50)
    ) {
        let timestamps: Vec<_> = (0..pairs.len())
            .map(|i| base() + Duration::hours(i as i64))
            .collect();
        let (linear, residual): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let forecast =
            HybridForecast::new(timestamps, linear.clone(), residual.clone(), Vec::new()).unwrap();
        for i in 0..linear.len() {
            prop_assert_eq!(forecast.values()[i], linear[i] + residual[i]);
        }
    }

    #[test]
    fn rmse_dominates_mae(
        pairs in prop::collection::vec((1.0..100.0_f64, 1.0..100.0_f64), 1..100)
    ) {
        let (actual, predicted): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let metrics = calculate_metrics(&actual, &predicted).unwrap();
        prop_assert!(metrics.mae >= 0.0);
        prop_assert!(metrics.rmse + 1e-12 >= metrics.mae);
        prop_assert!(metrics.mape >= 0.0);
    }
}

// =============================================================================
// Property: hybrid forecasts honor the horizon and are repeatable
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn hybrid_predict_horizon_and_idempotence(
        values in weather_strategy(60, 90),
        horizon in 1usize..30
    ) {
        let config = HybridConfig::default()
            .with_order(ModelOrder::non_seasonal(1, 1, 0))
            .with_auto_select(false)
            .with_sequence_length(8)
            .with_units(vec![4]);
        let mut model = HybridForecaster::new(config);
        model.fit(&make_ts(&values), None, 1, 32).unwrap();
        prop_assume!(model.is_fitted());

        let first = model.predict(horizon, None, None).unwrap();
        let second = model.predict(horizon, None, None).unwrap();
        prop_assert_eq!(first.horizon(), horizon);
        prop_assert_eq!(first, second);
    }
}
