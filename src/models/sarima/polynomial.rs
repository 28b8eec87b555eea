//! Lag polynomials for seasonal ARIMA models.
//!
//! A polynomial is stored as its coefficient vector in powers of the
//! backshift operator B: `poly[k]` multiplies `B^k`, and `poly[0] == 1`.

use crate::models::sarima::order::ModelOrder;

/// Product of two lag polynomials.
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `1 + sign * Σ coefs[i] B^{(i+1)·step}`
fn lag_polynomial(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// Differencing operator (1 - B)^d (1 - B^s)^D.
pub fn differencing_polynomial(order: &ModelOrder) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..order.d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    if order.is_seasonal() {
        let seasonal = lag_polynomial(&[1.0], order.s, -1.0);
        for _ in 0..order.seasonal_d {
            poly = multiply(&poly, &seasonal);
        }
    }
    poly
}

/// Apply a differencing polynomial: `w_t = Σ δ_k y_{t+deg-k}`.
///
/// The output is shorter than the input by the polynomial degree.
pub fn apply_difference(series: &[f64], delta: &[f64]) -> Vec<f64> {
    let degree = delta.len().saturating_sub(1);
    if series.len() <= degree {
        return Vec::new();
    }
    (degree..series.len())
        .map(|t| delta.iter().enumerate().map(|(k, c)| c * series[t - k]).sum())
        .collect()
}

/// Recover the next level from its differenced value and the level history.
///
/// Inverts `w_t = y_t + Σ_{k≥1} δ_k y_{t-k}` for `y_t`; `history` ends at
/// `y_{t-1}` and must hold at least the polynomial degree.
pub fn undifference_step(w: f64, history: &[f64], delta: &[f64]) -> f64 {
    let n = history.len();
    w - delta
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| c * history[n - k])
        .sum::<f64>()
}

/// Expanded AR prediction coefficients `a_k`, k = 1..=max lag.
///
/// From φ(B)Φ(B^s) = 1 - Σ a_k B^k, so that
/// `w_t = Σ a_k w_{t-k} + …`. The element at index 0 is unused and zero.
pub fn expand_ar(ar: &[f64], seasonal_ar: &[f64], s: usize) -> Vec<f64> {
    let poly = multiply(
        &lag_polynomial(ar, 1, -1.0),
        &lag_polynomial(seasonal_ar, s.max(1), -1.0),
    );
    let mut coefs: Vec<f64> = poly.iter().map(|c| -c).collect();
    coefs[0] = 0.0;
    coefs
}

/// Expanded MA coefficients `m_k` from θ(B)Θ(B^s) = 1 + Σ m_k B^k.
///
/// The element at index 0 is unused and zero.
pub fn expand_ma(ma: &[f64], seasonal_ma: &[f64], s: usize) -> Vec<f64> {
    let mut coefs = multiply(
        &lag_polynomial(ma, 1, 1.0),
        &lag_polynomial(seasonal_ma, s.max(1), 1.0),
    );
    coefs[0] = 0.0;
    coefs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn differencing_polynomial_combines_regular_and_seasonal() {
        let order = ModelOrder::new((0, 1, 0), (0, 1, 0, 4));
        let delta = differencing_polynomial(&order);
        // (1 - B)(1 - B^4) = 1 - B - B^4 + B^5
        assert_eq!(delta, vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]);

        let order = ModelOrder::non_seasonal(0, 2, 0);
        assert_eq!(differencing_polynomial(&order), vec![1.0, -2.0, 1.0]);
    }

    #[test]
    fn apply_and_invert_difference() {
        let order = ModelOrder::new((0, 1, 0), (0, 1, 0, 3));
        let delta = differencing_polynomial(&order);
        let series: Vec<f64> = (0..20).map(|i| (i * i) as f64 + (i % 3) as f64).collect();

        let w = apply_difference(&series, &delta);
        assert_eq!(w.len(), series.len() - 4);

        // Rebuild the last value from its differenced form
        let t = series.len() - 1;
        let rebuilt = undifference_step(w[w.len() - 1], &series[..t], &delta);
        assert_relative_eq!(rebuilt, series[t], epsilon = 1e-9);
    }

    #[test]
    fn first_difference_matches_windows() {
        let series = vec![3.0, 5.0, 4.0, 8.0];
        let w = apply_difference(&series, &[1.0, -1.0]);
        assert_eq!(w, vec![2.0, -1.0, 4.0]);
        assert!(apply_difference(&[1.0], &[1.0, -1.0]).is_empty());
    }

    #[test]
    fn expanded_ar_has_multiplicative_cross_term() {
        let a = expand_ar(&[0.5], &[0.3], 4);
        assert_eq!(a.len(), 6);
        assert_relative_eq!(a[1], 0.5);
        assert_relative_eq!(a[4], 0.3);
        assert_relative_eq!(a[5], -0.15);
        assert_relative_eq!(a[2], 0.0);
    }

    #[test]
    fn expanded_ma_has_multiplicative_cross_term() {
        let m = expand_ma(&[0.4], &[-0.2], 3);
        assert_eq!(m.len(), 5);
        assert_relative_eq!(m[1], 0.4);
        assert_relative_eq!(m[3], -0.2);
        assert_relative_eq!(m[4], -0.08);
    }

    #[test]
    fn empty_polynomials_expand_to_identity() {
        assert_eq!(expand_ar(&[], &[], 24), vec![0.0]);
        assert_eq!(expand_ma(&[0.7], &[], 24), vec![0.0, 0.7]);
    }
}
