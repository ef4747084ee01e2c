use std::rc::Rc;

use ndarray::{ArrayD, Axis};

use crate::ops::Operation;
use crate::tensor::Tensor;

/// Numerically stable softmax over the last axis.
pub fn softmax_last_axis(input: &ArrayD<f32>) -> ArrayD<f32> {
    let last = Axis(input.ndim().saturating_sub(1));
    if input.ndim() == 0 {
        return ArrayD::ones(input.raw_dim());
    }
    let max_vals = input
        .map_axis(last, |row| {
            row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
        })
        .insert_axis(last);
    let exp_vals = (input - &max_vals).mapv(f32::exp);
    let sum_exp = exp_vals.sum_axis(last).insert_axis(last);
    exp_vals / &sum_exp
}

#[derive(Debug, Clone)]
struct TensorSoftmax {
    inp: Tensor,
    output: ArrayD<f32>,
}

impl TensorSoftmax {
    /// For a batch of predictions `(batch_size, num_classes)`, softmax is applied per sample.
    fn forward(inp: Tensor) -> Tensor {
        let result = softmax_last_axis(&inp.container.borrow().array);
        let node = TensorSoftmax {
            inp,
            output: result.clone(),
        };
        Tensor::new_with_prev(result, Rc::new(node))
    }
}

impl Operation for TensorSoftmax {
    fn backward(&self, output: &Tensor) {
        let grad_output = output
            .grad()
            .unwrap_or_else(|| ArrayD::ones(output.shape()));
        let softmax_output = &self.output;
        if softmax_output.ndim() == 0 {
            self.inp.backward_internal(ArrayD::zeros(softmax_output.raw_dim()));
            return;
        }
        let last = Axis(softmax_output.ndim() - 1);

        // softmax * (grad_output - sum(softmax * grad_output, last axis))
        let sum_term = (softmax_output * &grad_output)
            .sum_axis(last)
            .insert_axis(last);
        let grad_input = softmax_output * &(&grad_output - &sum_term);
        self.inp.backward_internal(grad_input);
    }

    fn zero_graph(&self) {
        self.inp.zero_graph();
    }

    fn build_graph(&self) {
        self.inp.build_graph();
    }
}

impl Tensor {
    pub fn softmax(&self) -> Tensor {
        TensorSoftmax::forward(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn test_softmax_forward() {
        let input = Tensor::new(array![[1.0, 2.0, 3.0], [1.0, 1.0, 1.0]].into_dyn());
        let output = input.softmax().data();

        for i in 0..2 {
            let row_sum: f32 = (0..3).map(|j| output[[i, j]]).sum();
            assert!((row_sum - 1.0).abs() < 1e-6);
        }
        for val in output.iter() {
            assert!(*val > 0.0 && *val < 1.0);
        }
        assert!((output[[1, 0]] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_is_shift_invariant_for_large_logits() {
        let input = Tensor::new(array![[1000.0, 1001.0, 1002.0]].into_dyn());
        let shifted = Tensor::new(array![[0.0, 1.0, 2.0]].into_dyn());
        let a = input.softmax().data();
        let b = shifted.softmax().data();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.is_finite());
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn gradient_of_row_sum_is_zero() {
        let input = Tensor::new(array![[0.5, -1.0, 2.0]].into_dyn());
        input.softmax().sum().backward();
        let grad = input.grad().unwrap();
        assert!(grad.iter().all(|g| g.abs() < 1e-6));
    }
}
