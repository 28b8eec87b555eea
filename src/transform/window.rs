//! Sliding windows that turn a scaled sequence into supervised samples.

use crate::error::{ForecastError, Result};

/// Fixed-length input window: `steps[t][c]`, column 0 is the target.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWindow {
    steps: Vec<Vec<f64>>,
}

impl SequenceWindow {
    /// Build a window from timesteps of equal width.
    pub fn new(steps: Vec<Vec<f64>>) -> Result<Self> {
        let width = steps.first().map(Vec::len).ok_or(ForecastError::EmptyData)?;
        for step in &steps {
            if step.len() != width {
                return Err(ForecastError::DimensionMismatch {
                    expected: width,
                    got: step.len(),
                });
            }
        }
        Ok(Self { steps })
    }

    /// (sequence length, input width)
    pub fn shape(&self) -> (usize, usize) {
        (self.steps.len(), self.steps.first().map_or(0, Vec::len))
    }

    pub fn steps(&self) -> &[Vec<f64>] {
        &self.steps
    }

    /// Last timestep.
    pub fn last(&self) -> &[f64] {
        self.steps.last().map_or(&[], Vec::as_slice)
    }

    /// Drop the oldest timestep and append `step`.
    pub fn slide(&mut self, step: Vec<f64>) -> Result<()> {
        let width = self.shape().1;
        if step.len() != width {
            return Err(ForecastError::DimensionMismatch {
                expected: width,
                got: step.len(),
            });
        }
        self.steps.remove(0);
        self.steps.push(step);
        Ok(())
    }
}

/// Supervised samples: each window is paired with the target that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSamples {
    pub inputs: Vec<SequenceWindow>,
    pub targets: Vec<f64>,
}

impl WindowedSamples {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Split off the trailing `fraction` of samples, keeping order.
    pub fn split_tail(self, fraction: f64) -> (WindowedSamples, WindowedSamples) {
        let n_val = ((self.len() as f64) * fraction).floor() as usize;
        let cut = self.len() - n_val.min(self.len());

        let mut inputs = self.inputs;
        let mut targets = self.targets;
        let val_inputs = inputs.split_off(cut);
        let val_targets = targets.split_off(cut);

        (
            WindowedSamples { inputs, targets },
            WindowedSamples {
                inputs: val_inputs,
                targets: val_targets,
            },
        )
    }
}

/// Combine a target column with optional feature rows into timesteps.
pub fn stack_columns(target: &[f64], features: Option<&[Vec<f64>]>) -> Result<Vec<Vec<f64>>> {
    match features {
        None => Ok(target.iter().map(|&x| vec![x]).collect()),
        Some(rows) => {
            if rows.len() != target.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: target.len(),
                    got: rows.len(),
                });
            }
            Ok(target
                .iter()
                .zip(rows)
                .map(|(&x, row)| {
                    let mut step = Vec::with_capacity(1 + row.len());
                    step.push(x);
                    step.extend_from_slice(row);
                    step
                })
                .collect())
        }
    }
}

/// Build supervised windows over `data` (timesteps, column 0 = target).
///
/// For each `i` in `sequence_length..data.len()`, the input is
/// `data[i - sequence_length..i]` and the target is `data[i][0]`.
pub fn build_windows(data: &[Vec<f64>], sequence_length: usize) -> Result<WindowedSamples> {
    if sequence_length == 0 {
        return Err(ForecastError::InvalidParameter(
            "sequence_length must be positive".to_string(),
        ));
    }
    if data.len() <= sequence_length {
        return Err(ForecastError::InsufficientData {
            needed: sequence_length + 1,
            got: data.len(),
        });
    }

    let mut inputs = Vec::with_capacity(data.len() - sequence_length);
    let mut targets = Vec::with_capacity(data.len() - sequence_length);
    for i in sequence_length..data.len() {
        inputs.push(SequenceWindow::new(data[i - sequence_length..i].to_vec())?);
        targets.push(data[i][0]);
    }

    Ok(WindowedSamples { inputs, targets })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_windows_pairs_inputs_with_next_target() {
        let data = stack_columns(&[0.0, 1.0, 2.0, 3.0, 4.0], None).unwrap();
        let samples = build_windows(&data, 3).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples.inputs[0].shape(), (3, 1));
        assert_eq!(samples.inputs[0].steps()[2], vec![2.0]);
        assert_eq!(samples.targets, vec![3.0, 4.0]);
        assert_eq!(samples.inputs[1].steps()[0], vec![1.0]);
    }

    #[test]
    fn build_windows_with_features() {
        let target: Vec<f64> = (0..300).map(|i| i as f64).collect();
        let features: Vec<Vec<f64>> = (0..300).map(|i| vec![i as f64; 3]).collect();
        let data = stack_columns(&target, Some(&features)).unwrap();

        let samples = build_windows(&data, 30).unwrap();
        assert_eq!(samples.len(), 270);
        assert!(samples.inputs.iter().all(|w| w.shape() == (30, 4)));
        assert_eq!(samples.targets[0], 30.0);
    }

    #[test]
    fn build_windows_rejects_short_input() {
        let data = stack_columns(&[1.0, 2.0], None).unwrap();
        assert!(matches!(
            build_windows(&data, 2),
            Err(ForecastError::InsufficientData { needed: 3, got: 2 })
        ));
        assert!(build_windows(&data, 0).is_err());
    }

    #[test]
    fn split_tail_holds_out_trailing_samples() {
        let data = stack_columns(&(0..15).map(|i| i as f64).collect::<Vec<_>>(), None).unwrap();
        let samples = build_windows(&data, 5).unwrap();

        let (train, val) = samples.split_tail(0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert_eq!(val.targets, vec![13.0, 14.0]);
    }

    #[test]
    fn window_slides_by_one_step() {
        let mut window = SequenceWindow::new(vec![vec![1.0, 0.0], vec![2.0, 0.0]]).unwrap();
        window.slide(vec![3.0, 1.0]).unwrap();

        assert_eq!(window.steps(), &[vec![2.0, 0.0], vec![3.0, 1.0]]);
        assert_eq!(window.last(), &[3.0, 1.0]);
        assert!(window.slide(vec![1.0]).is_err());
    }
}
