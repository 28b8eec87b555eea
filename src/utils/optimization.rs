//! Derivative-free minimization used for SARIMA parameter estimation.

use serde::{Deserialize, Serialize};

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    pub optimal_point: Vec<f64>,
    pub optimal_value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on both objective spread and simplex size.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrinkage coefficient.
    pub sigma: f64,
    /// Initial simplex step, relative to the starting coordinate when non-zero.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Box constraints; a point is clamped coordinate-wise after every move.
struct Bounds<'a>(Option<&'a [(f64, f64)]>);

impl Bounds<'_> {
    fn clamp(&self, mut point: Vec<f64>) -> Vec<f64> {
        if let Some(bounds) = self.0 {
            for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
                *x = x.clamp(lo, hi);
            }
        }
        point
    }
}

/// `from + t * (to - from)`, coordinate-wise.
fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Minimize `objective` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `f64::MAX`, so the simplex
/// moves away from regions where the objective is undefined.
///
/// # Example
/// ```
/// use hybrid_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] + 1.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: Vec::new(),
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let bounds = Bounds(bounds);
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::MAX
        }
    };

    // Vertices paired with their objective values, kept sorted best-first.
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    let start = bounds.clamp(initial.to_vec());
    let start_value = eval(&start);
    simplex.push((start, start_value));
    for i in 0..n {
        let mut vertex = initial.to_vec();
        vertex[i] += if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        let vertex = bounds.clamp(vertex);
        let value = eval(&vertex);
        simplex.push((vertex, value));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let best_value = simplex[0].1;
        let worst_value = simplex[n].1;
        let second_worst_value = simplex[n - 1].1;

        let mut centroid = vec![0.0; n];
        for (vertex, _) in &simplex[..n] {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x / n as f64;
            }
        }
        let spread = simplex
            .iter()
            .map(|(v, _)| distance(v, &centroid))
            .fold(0.0, f64::max);
        // Equal values can sit on opposite sides of the minimum, so the
        // simplex must also have collapsed.
        if worst_value - best_value < config.tolerance && spread < config.tolerance {
            converged = true;
            break;
        }

        let reflected = bounds.clamp(lerp(&centroid, &simplex[n].0, -config.alpha));
        let reflected_value = eval(&reflected);

        if reflected_value < best_value {
            let expanded = bounds.clamp(lerp(&centroid, &reflected, config.gamma));
            let expanded_value = eval(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < second_worst_value {
            simplex[n] = (reflected, reflected_value);
            continue;
        }

        // Contract toward the better of the reflected and worst points.
        let (contracted, accept) = if reflected_value < worst_value {
            let point = bounds.clamp(lerp(&centroid, &reflected, config.rho));
            let value = eval(&point);
            ((point, value), value <= reflected_value)
        } else {
            let point = bounds.clamp(lerp(&centroid, &simplex[n].0, config.rho));
            let value = eval(&point);
            ((point, value), value < worst_value)
        };
        if accept {
            simplex[n] = contracted;
            continue;
        }

        // Shrink
        let best = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let point = bounds.clamp(lerp(&best, &vertex.0, config.sigma));
            let value = eval(&point);
            *vertex = (point, value);
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let (optimal_point, optimal_value) = simplex.swap_remove(0);

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}
