use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Clipping added to probabilities before taking the log.
pub const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    CategoricalCrossEntropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
}

impl Loss {
    pub fn compute(self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        match self {
            Loss::CategoricalCrossEntropy => categorical_cross_entropy(predictions, targets),
        }
    }
}

/// Cross-entropy for softmax probabilities against one-hot targets, averaged over the batch.
///
/// * `predictions` - probabilities `[batch_size x num_classes]`
/// * `targets` - one-hot labels `[batch_size x num_classes]`
pub fn categorical_cross_entropy(predictions: &Tensor, targets: &Tensor) -> Tensor {
    let batch = predictions.shape().first().copied().unwrap_or(1).max(1);
    let log_preds = predictions.add_scalar(EPSILON).log();
    let per_sample = targets.clone() * log_preds;
    -(per_sample.sum() * (1.0 / batch as f32))
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_val), (idx, &val)| {
            if val > best_val {
                (idx, val)
            } else {
                (best, best_val)
            }
        })
        .0
}

/// Fraction of rows whose highest prediction matches the one-hot target.
pub fn accuracy(predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
    let rows = predictions.nrows();
    if rows == 0 {
        return 0.0;
    }
    let correct = predictions
        .rows()
        .into_iter()
        .zip(targets.rows())
        .filter(|(pred, target)| argmax(pred.view()) == argmax(target.view()))
        .count();
    correct as f32 / rows as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn cross_entropy_of_confident_correct_prediction_is_small() {
        let predictions = Tensor::new(array![[0.98, 0.01, 0.01]].into_dyn());
        let targets = Tensor::new(array![[1.0, 0.0, 0.0]].into_dyn());
        let loss = categorical_cross_entropy(&predictions, &targets).item();
        assert!((loss - (-(0.98f32 + EPSILON).ln())).abs() < 1e-6);
    }

    #[test]
    fn cross_entropy_averages_over_batch() {
        let predictions = Tensor::new(array![[0.5, 0.5], [0.25, 0.75]].into_dyn());
        let targets = Tensor::new(array![[1.0, 0.0], [0.0, 1.0]].into_dyn());
        let loss = categorical_cross_entropy(&predictions, &targets).item();
        let expected = -((0.5f32).ln() + (0.75f32).ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn softmax_cross_entropy_gradient_is_prediction_minus_target() {
        let logits = Tensor::new(array![[1.0, 2.0, 3.0]].into_dyn());
        let targets = Tensor::new(array![[0.0, 0.0, 1.0]].into_dyn());
        let probs = logits.softmax();
        let p = probs.data();
        categorical_cross_entropy(&probs, &targets).backward();

        let grad = logits.grad().unwrap();
        let expected = [p[[0, 0]], p[[0, 1]], p[[0, 2]] - 1.0];
        for (g, e) in grad.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 1e-4, "{g} vs {e}");
        }
    }

    #[test]
    fn accuracy_counts_argmax_matches() {
        let predictions = array![[0.7, 0.2, 0.1], [0.1, 0.3, 0.6], [0.3, 0.4, 0.3]];
        let targets = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let acc = accuracy(predictions.view(), targets.view());
        assert!((acc - 2.0 / 3.0).abs() < 1e-6);
    }
}
