//! A single LSTM layer with full-sequence forward pass and backpropagation
//! through time.
//!
//! Gate rows are stacked in the order input, forget, candidate, output, so
//! every weight matrix has `4 * hidden_size` rows stored row-major.

use rand::{rngs::StdRng, Rng};

const GATES: usize = 4;

/// Numerically stable logistic function.
#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `out = W x` for a row-major `[rows, cols]` matrix.
pub(crate) fn matmul_vec(matrix: &[f64], x: &[f64], out: &mut [f64], cols: usize) {
    for (i, o) in out.iter_mut().enumerate() {
        let row = &matrix[i * cols..(i + 1) * cols];
        *o = row.iter().zip(x).map(|(w, v)| w * v).sum();
    }
}

/// `out += Wᵀ d` for a row-major `[rows, cols]` matrix.
fn matmul_transpose_acc(matrix: &[f64], d: &[f64], out: &mut [f64], cols: usize) {
    for (i, &di) in d.iter().enumerate() {
        if di == 0.0 {
            continue;
        }
        let row = &matrix[i * cols..(i + 1) * cols];
        for (o, w) in out.iter_mut().zip(row) {
            *o += w * di;
        }
    }
}

/// `grad += d ⊗ x`
fn outer_acc(grad: &mut [f64], d: &[f64], x: &[f64]) {
    let cols = x.len();
    for (i, &di) in d.iter().enumerate() {
        if di == 0.0 {
            continue;
        }
        let row = &mut grad[i * cols..(i + 1) * cols];
        for (g, xj) in row.iter_mut().zip(x) {
            *g += di * xj;
        }
    }
}

/// Glorot uniform draw of `len` weights with the given fan sizes.
pub(crate) fn glorot_uniform(rng: &mut StdRng, len: usize, fan_in: usize, fan_out: usize) -> Vec<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    (0..len).map(|_| rng.gen_range(-limit..limit)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LstmLayer {
    input_size: usize,
    hidden_size: usize,
    /// Input weights, `[4H, I]`.
    pub(crate) w_input: Vec<f64>,
    /// Recurrent weights, `[4H, H]`.
    pub(crate) w_hidden: Vec<f64>,
    pub(crate) bias: Vec<f64>,
}

/// Activations kept from a forward pass for the backward pass.
#[derive(Debug, Clone)]
pub(crate) struct LayerTrace {
    inputs: Vec<Vec<f64>>,
    /// Activated gates per step: `[i | f | g | o]`.
    gates: Vec<Vec<f64>>,
    /// Cell states `c_0..=c_T`.
    cells: Vec<Vec<f64>>,
    /// Hidden states `h_0..=h_T`.
    hidden: Vec<Vec<f64>>,
}

impl LayerTrace {
    /// Hidden outputs `h_1..=h_T`.
    pub(crate) fn outputs(&self) -> &[Vec<f64>] {
        &self.hidden[1..]
    }
}

/// Gradients with the same layout as [`LstmLayer`]'s parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayerGrads {
    pub(crate) w_input: Vec<f64>,
    pub(crate) w_hidden: Vec<f64>,
    pub(crate) bias: Vec<f64>,
}

impl LayerGrads {
    pub(crate) fn zeros_like(layer: &LstmLayer) -> Self {
        Self {
            w_input: vec![0.0; layer.w_input.len()],
            w_hidden: vec![0.0; layer.w_hidden.len()],
            bias: vec![0.0; layer.bias.len()],
        }
    }
}

impl LstmLayer {
    /// Glorot-initialized layer with zero biases and a unit forget-gate bias.
    pub(crate) fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let rows = GATES * hidden_size;
        let w_input = glorot_uniform(rng, rows * input_size, input_size, rows);
        let w_hidden = glorot_uniform(rng, rows * hidden_size, hidden_size, rows);
        let mut bias = vec![0.0; rows];
        bias[hidden_size..2 * hidden_size].fill(1.0);

        Self {
            input_size,
            hidden_size,
            w_input,
            w_hidden,
            bias,
        }
    }

    pub(crate) fn input_size(&self) -> usize {
        self.input_size
    }

    pub(crate) fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Run the layer over a sequence starting from zero state.
    pub(crate) fn forward(&self, inputs: &[Vec<f64>]) -> LayerTrace {
        let h = self.hidden_size;
        let rows = GATES * h;
        let mut trace = LayerTrace {
            inputs: inputs.to_vec(),
            gates: Vec::with_capacity(inputs.len()),
            cells: vec![vec![0.0; h]],
            hidden: vec![vec![0.0; h]],
        };

        let mut from_input = vec![0.0; rows];
        let mut from_hidden = vec![0.0; rows];
        for x in inputs {
            let h_prev = &trace.hidden[trace.hidden.len() - 1];
            let c_prev = &trace.cells[trace.cells.len() - 1];
            matmul_vec(&self.w_input, x, &mut from_input, self.input_size);
            matmul_vec(&self.w_hidden, h_prev, &mut from_hidden, h);

            let mut gates = vec![0.0; rows];
            for (k, gate) in gates.iter_mut().enumerate() {
                let z = from_input[k] + from_hidden[k] + self.bias[k];
                *gate = if (2 * h..3 * h).contains(&k) {
                    z.tanh()
                } else {
                    sigmoid(z)
                };
            }

            let mut cell = vec![0.0; h];
            let mut hidden = vec![0.0; h];
            for j in 0..h {
                let (i, f, g, o) = (gates[j], gates[h + j], gates[2 * h + j], gates[3 * h + j]);
                cell[j] = f * c_prev[j] + i * g;
                hidden[j] = o * cell[j].tanh();
            }

            trace.gates.push(gates);
            trace.cells.push(cell);
            trace.hidden.push(hidden);
        }
        trace
    }

    /// Final hidden state only, without keeping the trace.
    pub(crate) fn forward_last(&self, inputs: &[Vec<f64>]) -> Vec<f64> {
        self.forward(inputs)
            .hidden
            .pop()
            .unwrap_or_else(|| vec![0.0; self.hidden_size])
    }

    /// Backpropagate `d_outputs` (gradient w.r.t. each `h_t`) through time.
    ///
    /// Accumulates parameter gradients into `grads` and returns the gradient
    /// w.r.t. each input step.
    pub(crate) fn backward(
        &self,
        trace: &LayerTrace,
        d_outputs: &[Vec<f64>],
        grads: &mut LayerGrads,
    ) -> Vec<Vec<f64>> {
        let h = self.hidden_size;
        let steps = trace.gates.len();
        let mut d_inputs = vec![vec![0.0; self.input_size]; steps];
        let mut dh_next = vec![0.0; h];
        let mut dc_next = vec![0.0; h];
        let mut dz = vec![0.0; GATES * h];

        for t in (0..steps).rev() {
            let gates = &trace.gates[t];
            let c = &trace.cells[t + 1];
            let c_prev = &trace.cells[t];

            for j in 0..h {
                let (i, f, g, o) = (gates[j], gates[h + j], gates[2 * h + j], gates[3 * h + j]);
                let dh = d_outputs[t][j] + dh_next[j];
                let tanh_c = c[j].tanh();

                let d_o = dh * tanh_c;
                let dc = dh * o * (1.0 - tanh_c * tanh_c) + dc_next[j];
                let d_i = dc * g;
                let d_f = dc * c_prev[j];
                let d_g = dc * i;
                dc_next[j] = dc * f;

                dz[j] = d_i * i * (1.0 - i);
                dz[h + j] = d_f * f * (1.0 - f);
                dz[2 * h + j] = d_g * (1.0 - g * g);
                dz[3 * h + j] = d_o * o * (1.0 - o);
            }

            outer_acc(&mut grads.w_input, &dz, &trace.inputs[t]);
            outer_acc(&mut grads.w_hidden, &dz, &trace.hidden[t]);
            for (b, d) in grads.bias.iter_mut().zip(&dz) {
                *b += d;
            }

            matmul_transpose_acc(&self.w_input, &dz, &mut d_inputs[t], self.input_size);
            dh_next.fill(0.0);
            matmul_transpose_acc(&self.w_hidden, &dz, &mut dh_next, h);
        }

        d_inputs
    }
}
