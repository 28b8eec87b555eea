//! SARIMA order specification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Model order (p, d, q)(P, D, Q, s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub seasonal_p: usize,
    /// Seasonal differencing order.
    pub seasonal_d: usize,
    /// Seasonal MA order.
    pub seasonal_q: usize,
    /// Seasonal period.
    pub s: usize,
}

impl ModelOrder {
    pub fn new(
        (p, d, q): (usize, usize, usize),
        (seasonal_p, seasonal_d, seasonal_q, s): (usize, usize, usize, usize),
    ) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p,
            seasonal_d,
            seasonal_q,
            s,
        }
    }

    /// ARIMA(p, d, q) without a seasonal part.
    pub fn non_seasonal(p: usize, d: usize, q: usize) -> Self {
        Self::new((p, d, q), (0, 0, 0, 0))
    }

    /// (1,1,1)(1,1,1,24), the default for hourly data with a daily cycle.
    pub fn default_hourly() -> Self {
        Self::new((1, 1, 1), (1, 1, 1, 24))
    }

    /// Orders tried by automatic selection for period `s`.
    pub fn candidates(s: usize) -> [ModelOrder; 4] {
        [
            Self::new((1, 1, 1), (1, 1, 1, s)),
            Self::new((2, 1, 2), (1, 1, 1, s)),
            Self::new((1, 1, 1), (2, 1, 2, s)),
            Self::new((1, 1, 0), (1, 1, 0, s)),
        ]
    }

    /// Whether the seasonal part is active.
    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.seasonal_p > 0 || self.seasonal_d > 0 || self.seasonal_q > 0)
    }

    /// Seasonal period in effect (0 when non-seasonal).
    pub fn period(&self) -> usize {
        if self.is_seasonal() {
            self.s
        } else {
            0
        }
    }

    /// Whether a constant is estimated (no differencing of either kind).
    pub fn has_intercept(&self) -> bool {
        self.d == 0 && (!self.is_seasonal() || self.seasonal_d == 0)
    }

    /// Number of estimated coefficients, including the constant when present.
    pub fn num_params(&self) -> usize {
        let seasonal = if self.is_seasonal() {
            self.seasonal_p + self.seasonal_q
        } else {
            0
        };
        self.p + self.q + seasonal + usize::from(self.has_intercept())
    }

    /// Observations consumed by differencing.
    pub fn differencing_lag(&self) -> usize {
        self.d + self.seasonal_d * self.period()
    }

    /// Largest lag of the expanded AR polynomial.
    pub fn max_ar_lag(&self) -> usize {
        self.p + self.seasonal_p * self.period()
    }

    /// Largest lag of the expanded MA polynomial.
    pub fn max_ma_lag(&self) -> usize {
        self.q + self.seasonal_q * self.period()
    }

    /// Leading observations without a residual.
    pub fn burn_in(&self) -> usize {
        self.differencing_lag() + self.max_ar_lag()
    }
}

impl Default for ModelOrder {
    fn default() -> Self {
        Self::default_hourly()
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})({},{},{},{})",
            self.p, self.d, self.q, self.seasonal_p, self.seasonal_d, self.seasonal_q, self.s
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hourly_order() {
        let order = ModelOrder::default_hourly();
        assert!(order.is_seasonal());
        assert_eq!(order.to_string(), "(1,1,1)(1,1,1,24)");
        assert_eq!(order.num_params(), 4);
        assert!(!order.has_intercept());
        assert_eq!(order.differencing_lag(), 25);
        assert_eq!(order.max_ar_lag(), 25);
        assert_eq!(order.max_ma_lag(), 25);
        assert_eq!(order.burn_in(), 50);
    }

    #[test]
    fn seasonal_part_ignored_for_short_period() {
        let order = ModelOrder::new((1, 0, 1), (1, 1, 1, 1));
        assert!(!order.is_seasonal());
        assert_eq!(order.period(), 0);
        assert!(order.has_intercept());
        assert_eq!(order.num_params(), 3);
        assert_eq!(order.burn_in(), 1);
    }

    #[test]
    fn candidates_use_requested_period() {
        let candidates = ModelOrder::candidates(12);
        assert_eq!(candidates.len(), 4);
        assert!(candidates.iter().all(|c| c.s == 12 && c.d == 1));
        assert_eq!(candidates[1], ModelOrder::new((2, 1, 2), (1, 1, 1, 12)));
        assert_eq!(candidates[3].num_params(), 2);
    }
}
