//! Ordinary Least Squares (OLS) regression for the unit-root test.
//!
//! The design matrix is passed column by column; callers add a constant
//! column themselves when they want an intercept.

use crate::error::{ForecastError, Result};

/// Result of an OLS fit.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// One coefficient per design column.
    pub coefficients: Vec<f64>,
    /// Standard error of each coefficient.
    pub std_errors: Vec<f64>,
    /// y - X @ beta
    pub residuals: Vec<f64>,
    /// Residual variance with n - k degrees of freedom.
    pub sigma2: f64,
}

impl OlsFit {
    /// t-statistic of coefficient `index`.
    pub fn t_stat(&self, index: usize) -> Option<f64> {
        let beta = self.coefficients.get(index)?;
        let se = self.std_errors.get(index)?;
        if *se > 0.0 && se.is_finite() {
            Some(beta / se)
        } else {
            None
        }
    }

    /// Number of regressors.
    pub fn num_regressors(&self) -> usize {
        self.coefficients.len()
    }
}

/// Fit y = X @ beta by solving the normal equations with Cholesky.
///
/// # Arguments
/// * `y` - Target values (length n)
/// * `columns` - Design matrix columns (each length n)
pub fn ols_fit(y: &[f64], columns: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    let k = columns.len();

    if k == 0 {
        return Err(ForecastError::InvalidParameter(
            "OLS needs at least one regressor".into(),
        ));
    }
    if n <= k {
        return Err(ForecastError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }
    for col in columns {
        if col.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: col.len(),
            });
        }
    }

    // X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in 0..=i {
            let s: f64 = columns[i].iter().zip(&columns[j]).map(|(a, b)| a * b).sum();
            xtx[i][j] = s;
            xtx[j][i] = s;
        }
        xty[i] = columns[i].iter().zip(y).map(|(a, b)| a * b).sum();
    }

    let l = cholesky(&xtx).ok_or_else(|| {
        ForecastError::ComputationError(
            "OLS regression failed: matrix not positive definite".into(),
        )
    })?;
    let coefficients = cholesky_solve(&l, &xty);

    let residuals: Vec<f64> = (0..n)
        .map(|t| {
            let fitted: f64 = (0..k).map(|j| columns[j][t] * coefficients[j]).sum();
            y[t] - fitted
        })
        .collect();
    let sigma2 = residuals.iter().map(|r| r * r).sum::<f64>() / (n - k) as f64;

    // diag((X'X)^-1) column by column
    let std_errors = (0..k)
        .map(|j| {
            let mut unit = vec![0.0; k];
            unit[j] = 1.0;
            let inv_col = cholesky_solve(&l, &unit);
            (sigma2 * inv_col[j]).max(0.0).sqrt()
        })
        .collect();

    Ok(OlsFit {
        coefficients,
        std_errors,
        residuals,
        sigma2,
    })
}

/// Solve symmetric positive definite system A @ x = b.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    if b.is_empty() || a.len() != b.len() {
        return None;
    }
    let l = cholesky(a)?;
    Some(cholesky_solve(&l, b))
}

/// Cholesky decomposition A = L @ L'.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    Some(l)
}

fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    // L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ols_fit_simple_linear() {
        // y = 2 + 3*x
        let y = vec![5.0, 8.0, 11.0, 14.0, 17.0];
        let ones = vec![1.0; 5];
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        let fit = ols_fit(&y, &[ones, x]).unwrap();

        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-9);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-9));
        assert_eq!(fit.num_regressors(), 2);
    }

    #[test]
    fn ols_standard_errors_match_closed_form() {
        // Simple regression: se(b1) = sqrt(sigma2 / Sxx)
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = vec![1.1, 1.9, 3.2, 3.8, 5.1, 6.0];
        let fit = ols_fit(&y, &[vec![1.0; 6], x.clone()]).unwrap();

        let mean_x = x.iter().sum::<f64>() / 6.0;
        let sxx: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
        assert_relative_eq!(fit.std_errors[1], (fit.sigma2 / sxx).sqrt(), epsilon = 1e-9);

        let t = fit.t_stat(1).unwrap();
        assert_relative_eq!(t, fit.coefficients[1] / fit.std_errors[1]);
    }

    #[test]
    fn ols_rejects_degenerate_input() {
        assert!(ols_fit(&[1.0, 2.0], &[]).is_err());
        assert!(matches!(
            ols_fit(&[1.0, 2.0], &[vec![1.0, 1.0], vec![1.0, 2.0]]),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert!(matches!(
            ols_fit(&[1.0, 2.0, 3.0], &[vec![1.0, 1.0]]),
            Err(ForecastError::DimensionMismatch { .. })
        ));
        // Singular design
        assert!(ols_fit(&[1.0, 2.0, 3.0], &[vec![1.0; 3], vec![0.0; 3]]).is_err());
    }

    #[test]
    fn solve_symmetric_2x2() {
        let a = vec![vec![4.0, 1.0], vec![1.0, 3.0]];
        let x = solve_symmetric(&a, &[1.0, 2.0]).unwrap();
        assert_relative_eq!(4.0 * x[0] + x[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[0] + 3.0 * x[1], 2.0, epsilon = 1e-12);
    }
}
