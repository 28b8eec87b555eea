//! Stacked LSTM regressor with dropout, a dense scalar head and Adam updates.

use crate::error::{ForecastError, Result};
use crate::models::lstm::cell::{glorot_uniform, LayerGrads, LayerTrace, LstmLayer};
use crate::transform::SequenceWindow;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    /// Epsilon for numerical stability.
    pub eps: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
        }
    }
}

/// First and second moment estimates for every parameter tensor.
#[derive(Debug, Clone)]
struct Adam {
    config: OptimizerConfig,
    step: i32,
    first: Vec<Vec<f64>>,
    second: Vec<Vec<f64>>,
}

impl Adam {
    fn new(config: OptimizerConfig, sizes: &[usize]) -> Self {
        Self {
            config,
            step: 0,
            first: sizes.iter().map(|&n| vec![0.0; n]).collect(),
            second: sizes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    fn update(&mut self, params: Vec<&mut [f64]>, grads: Vec<&[f64]>) {
        self.step += 1;
        let OptimizerConfig {
            learning_rate,
            beta1,
            beta2,
            eps,
        } = self.config;
        let correction1 = 1.0 - beta1.powi(self.step);
        let correction2 = 1.0 - beta2.powi(self.step);

        for (k, (param, grad)) in params.into_iter().zip(grads).enumerate() {
            let m = &mut self.first[k];
            let v = &mut self.second[k];
            for j in 0..param.len() {
                let g = grad[j];
                m[j] = beta1 * m[j] + (1.0 - beta1) * g;
                v[j] = beta2 * v[j] + (1.0 - beta2) * g * g;
                let m_hat = m[j] / correction1;
                let v_hat = v[j] / correction2;
                param[j] -= learning_rate * m_hat / (v_hat.sqrt() + eps);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct NetworkGrads {
    layers: Vec<LayerGrads>,
    head_weights: Vec<f64>,
    head_bias: [f64; 1],
}

impl NetworkGrads {
    fn tensors(&self) -> Vec<&[f64]> {
        let mut out: Vec<&[f64]> = Vec::with_capacity(self.layers.len() * 3 + 2);
        for layer in &self.layers {
            out.push(&layer.w_input);
            out.push(&layer.w_hidden);
            out.push(&layer.bias);
        }
        out.push(&self.head_weights);
        out.push(&self.head_bias);
        out
    }

    fn scale(&mut self, factor: f64) {
        for layer in &mut self.layers {
            for g in layer
                .w_input
                .iter_mut()
                .chain(layer.w_hidden.iter_mut())
                .chain(layer.bias.iter_mut())
            {
                *g *= factor;
            }
        }
        for g in self.head_weights.iter_mut().chain(self.head_bias.iter_mut()) {
            *g *= factor;
        }
    }
}

/// Forward state of one training sample.
struct SampleTrace {
    layers: Vec<LayerTrace>,
    /// Inverted-dropout masks applied to each layer's outputs.
    masks: Vec<Option<Vec<Vec<f64>>>>,
    /// Head input: masked last hidden state of the top layer.
    features: Vec<f64>,
    prediction: f64,
}

/// Stacked LSTM layers followed by a linear head.
///
/// Every LSTM layer returns its full sequence; the head reads the top
/// layer's last state. Dropout is applied after each LSTM layer while
/// training and is the identity at inference.
#[derive(Debug, Clone)]
pub struct LstmNetwork {
    layers: Vec<LstmLayer>,
    head_weights: Vec<f64>,
    head_bias: [f64; 1],
    dropout: f64,
    optimizer: Adam,
}

impl LstmNetwork {
    /// Glorot-initialized network for inputs of `input_width` columns.
    pub fn new(
        input_width: usize,
        units: &[usize],
        dropout: f64,
        optimizer: OptimizerConfig,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if input_width == 0 || units.is_empty() || units.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "network needs a positive input width and layer sizes".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "dropout must be in [0, 1), got {}",
                dropout
            )));
        }

        let mut layers = Vec::with_capacity(units.len());
        let mut width = input_width;
        for &hidden in units {
            layers.push(LstmLayer::new(width, hidden, rng));
            width = hidden;
        }
        let head_weights = glorot_uniform(rng, width, width, 1);

        let mut sizes: Vec<usize> = layers
            .iter()
            .flat_map(|l| [l.w_input.len(), l.w_hidden.len(), l.bias.len()])
            .collect();
        sizes.extend([head_weights.len(), 1]);

        Ok(Self {
            layers,
            head_weights,
            head_bias: [0.0],
            dropout,
            optimizer: Adam::new(optimizer, &sizes),
        })
    }

    /// Columns expected per timestep.
    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, LstmLayer::input_size)
    }

    /// Hidden units per layer, bottom first.
    pub fn units(&self) -> Vec<usize> {
        self.layers.iter().map(LstmLayer::hidden_size).collect()
    }

    /// Total trainable parameters.
    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.w_input.len() + l.w_hidden.len() + l.bias.len())
            .sum::<usize>()
            + self.head_weights.len()
            + 1
    }

    /// Inference on one window; dropout is disabled.
    pub fn predict(&self, window: &SequenceWindow) -> Result<f64> {
        let (_, width) = window.shape();
        if width != self.input_width() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.input_width(),
                got: width,
            });
        }

        let mut sequence = window.steps().to_vec();
        let last = self.layers.len() - 1;
        for (k, layer) in self.layers.iter().enumerate() {
            if k == last {
                let h = layer.forward_last(&sequence);
                return Ok(self.head(&h));
            }
            sequence = layer.forward(&sequence).outputs().to_vec();
        }
        Ok(self.head_bias[0])
    }

    /// Mean squared error and mean absolute error over a sample set.
    pub fn evaluate(&self, inputs: &[SequenceWindow], targets: &[f64]) -> Result<(f64, f64)> {
        if inputs.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let mut sse = 0.0;
        let mut sae = 0.0;
        for (window, &target) in inputs.iter().zip(targets) {
            let err = self.predict(window)? - target;
            sse += err * err;
            sae += err.abs();
        }
        let n = inputs.len() as f64;
        Ok((sse / n, sae / n))
    }

    /// One Adam step on a mini-batch; returns the batch MSE.
    pub fn train_batch(
        &mut self,
        inputs: &[SequenceWindow],
        targets: &[f64],
        rng: &mut StdRng,
    ) -> Result<f64> {
        if inputs.is_empty() || inputs.len() != targets.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: targets.len(),
                got: inputs.len(),
            });
        }

        let mut grads = NetworkGrads {
            layers: self.layers.iter().map(LayerGrads::zeros_like).collect(),
            head_weights: vec![0.0; self.head_weights.len()],
            head_bias: [0.0],
        };

        let mut loss = 0.0;
        for (window, &target) in inputs.iter().zip(targets) {
            let trace = self.forward_train(window, rng)?;
            let err = trace.prediction - target;
            loss += err * err;
            self.backward(&trace, 2.0 * err, &mut grads);
        }

        let n = inputs.len() as f64;
        loss /= n;
        if !loss.is_finite() {
            return Err(ForecastError::ComputationError(
                "training loss is not finite".to_string(),
            ));
        }
        grads.scale(1.0 / n);

        let mut params: Vec<&mut [f64]> = Vec::with_capacity(self.layers.len() * 3 + 2);
        for layer in &mut self.layers {
            params.push(&mut layer.w_input);
            params.push(&mut layer.w_hidden);
            params.push(&mut layer.bias);
        }
        params.push(&mut self.head_weights);
        params.push(&mut self.head_bias);
        self.optimizer.update(params, grads.tensors());

        Ok(loss)
    }

    fn head(&self, features: &[f64]) -> f64 {
        self.head_bias[0]
            + self
                .head_weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    fn dropout_mask(&self, steps: usize, width: usize, rng: &mut StdRng) -> Option<Vec<Vec<f64>>> {
        if self.dropout <= 0.0 {
            return None;
        }
        let keep = 1.0 - self.dropout;
        Some(
            (0..steps)
                .map(|_| {
                    (0..width)
                        .map(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
                        .collect()
                })
                .collect(),
        )
    }

    fn forward_train(&self, window: &SequenceWindow, rng: &mut StdRng) -> Result<SampleTrace> {
        let (steps, width) = window.shape();
        if width != self.input_width() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.input_width(),
                got: width,
            });
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut masks = Vec::with_capacity(self.layers.len());
        let mut sequence = window.steps().to_vec();
        for layer in &self.layers {
            let trace = layer.forward(&sequence);
            let mask = self.dropout_mask(steps, layer.hidden_size(), rng);
            sequence = trace.outputs().to_vec();
            if let Some(mask) = &mask {
                for (h, m) in sequence.iter_mut().zip(mask) {
                    for (v, keep) in h.iter_mut().zip(m) {
                        *v *= keep;
                    }
                }
            }
            layers.push(trace);
            masks.push(mask);
        }

        let features = sequence.pop().unwrap_or_default();
        let prediction = self.head(&features);
        Ok(SampleTrace {
            layers,
            masks,
            features,
            prediction,
        })
    }

    fn backward(&self, trace: &SampleTrace, d_prediction: f64, grads: &mut NetworkGrads) {
        for (g, x) in grads.head_weights.iter_mut().zip(&trace.features) {
            *g += d_prediction * x;
        }
        grads.head_bias[0] += d_prediction;

        let Some(top) = trace.layers.last() else {
            return;
        };
        let steps = top.outputs().len();
        let mut d_outputs = vec![vec![0.0; self.head_weights.len()]; steps];
        if let Some(last) = d_outputs.last_mut() {
            for (d, w) in last.iter_mut().zip(&self.head_weights) {
                *d = d_prediction * w;
            }
        }

        for k in (0..self.layers.len()).rev() {
            if let Some(mask) = &trace.masks[k] {
                for (d, m) in d_outputs.iter_mut().zip(mask) {
                    for (v, keep) in d.iter_mut().zip(m) {
                        *v *= keep;
                    }
                }
            }
            d_outputs = self.layers[k].backward(&trace.layers[k], &d_outputs, &mut grads.layers[k]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn windows(n: usize, len: usize) -> (Vec<SequenceWindow>, Vec<f64>) {
        let series: Vec<f64> = (0..n + len)
            .map(|i| 0.5 + 0.4 * (i as f64 * 0.3).sin())
            .collect();
        let inputs = (0..n)
            .map(|i| SequenceWindow::new(series[i..i + len].iter().map(|&x| vec![x]).collect()).unwrap())
            .collect();
        let targets = (0..n).map(|i| series[i + len]).collect();
        (inputs, targets)
    }

    fn network(dropout: f64, seed: u64) -> LstmNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        LstmNetwork::new(1, &[8, 4], dropout, OptimizerConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn parameter_count() {
        let net = network(0.0, 1);
        // 4H(I + H + 1) per layer plus the head
        let expected = 32 * (1 + 8 + 1) + 16 * (8 + 4 + 1) + 4 + 1;
        assert_eq!(net.num_parameters(), expected);
        assert_eq!(net.units(), vec![8, 4]);
        assert_eq!(net.input_width(), 1);
    }

    #[test]
    fn rejects_bad_architecture() {
        let mut rng = StdRng::seed_from_u64(0);
        let cfg = OptimizerConfig::default();
        assert!(LstmNetwork::new(0, &[4], 0.0, cfg, &mut rng).is_err());
        assert!(LstmNetwork::new(1, &[], 0.0, cfg, &mut rng).is_err());
        assert!(LstmNetwork::new(1, &[4, 0], 0.0, cfg, &mut rng).is_err());
        assert!(LstmNetwork::new(1, &[4], 1.0, cfg, &mut rng).is_err());
    }

    #[test]
    fn predict_checks_width() {
        let net = network(0.0, 1);
        let window = SequenceWindow::new(vec![vec![0.1, 0.2]; 5]).unwrap();
        assert!(matches!(
            net.predict(&window),
            Err(ForecastError::DimensionMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn inference_is_deterministic() {
        let net = network(0.2, 3);
        let (inputs, _) = windows(1, 10);
        let a = net.predict(&inputs[0]).unwrap();
        let b = net.predict(&inputs[0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn training_reduces_loss() {
        let mut net = network(0.0, 11);
        let mut rng = StdRng::seed_from_u64(5);
        let (inputs, targets) = windows(48, 8);

        let (before, _) = net.evaluate(&inputs, &targets).unwrap();
        for _ in 0..30 {
            for (xs, ys) in inputs.chunks(16).zip(targets.chunks(16)) {
                net.train_batch(xs, ys, &mut rng).unwrap();
            }
        }
        let (after, mae) = net.evaluate(&inputs, &targets).unwrap();
        assert!(after < before, "loss {} -> {}", before, after);
        assert!(mae.is_finite());
    }

    #[test]
    fn training_is_reproducible_with_same_seed() {
        let (inputs, targets) = windows(20, 6);
        let run = || {
            let mut net = network(0.2, 9);
            let mut rng = StdRng::seed_from_u64(9);
            let loss = net.train_batch(&inputs, &targets, &mut rng).unwrap();
            (loss, net.predict(&inputs[0]).unwrap())
        };
        let (loss_a, pred_a) = run();
        let (loss_b, pred_b) = run();
        assert_relative_eq!(loss_a, loss_b);
        assert_relative_eq!(pred_a, pred_b);
    }

    #[test]
    fn head_gradient_matches_finite_difference() {
        let net = network(0.0, 4);
        let (inputs, targets) = windows(1, 5);
        let mut rng = StdRng::seed_from_u64(0);

        let trace = net.forward_train(&inputs[0], &mut rng).unwrap();
        let mut grads = NetworkGrads {
            layers: net.layers.iter().map(LayerGrads::zeros_like).collect(),
            head_weights: vec![0.0; 4],
            head_bias: [0.0],
        };
        let err = trace.prediction - targets[0];
        net.backward(&trace, 2.0 * err, &mut grads);

        let loss = |n: &LstmNetwork| {
            let e = n.predict(&inputs[0]).unwrap() - targets[0];
            e * e
        };
        let eps = 1e-6;
        let mut plus = net.clone();
        plus.head_weights[2] += eps;
        let mut minus = net.clone();
        minus.head_weights[2] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert_relative_eq!(grads.head_weights[2], numeric, epsilon = 1e-6);

        let mut plus = net.clone();
        plus.layers[0].w_input[3] += eps;
        let mut minus = net.clone();
        minus.layers[0].w_input[3] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert_relative_eq!(grads.layers[0].w_input[3], numeric, epsilon = 1e-6);
    }
}
