use std::rc::Rc;

use itertools::{
    EitherOrBoth::{Both, Left, Right},
    Itertools,
};
use ndarray::{ArrayD, Axis, IxDyn};

use crate::ops::Operation;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct Broadcast {
    input: Tensor,
    input_shape: Vec<usize>,
}

impl Broadcast {
    pub fn forward(input: Tensor, target_shape: &[usize]) -> Tensor {
        let broadcasted = input
            .container
            .borrow()
            .array
            .broadcast(IxDyn(target_shape))
            .unwrap_or_else(|| {
                panic!(
                    "cannot broadcast {:?} to {:?}",
                    input.shape(),
                    target_shape
                )
            })
            .to_owned();

        let op = Broadcast {
            input_shape: input.shape(),
            input,
        };
        Tensor::new_with_prev(broadcasted, Rc::new(op))
    }
}

/// Sums `grad` back down to `input_shape`, undoing numpy-style broadcasting.
fn reduce_to_shape(grad: ArrayD<f32>, input_shape: &[usize]) -> ArrayD<f32> {
    let output_shape = grad.shape().to_vec();
    let out_ndim = output_shape.len();
    let mut grad = grad;
    let mut leading_axes = 0;
    assert!(
        input_shape.len() <= out_ndim,
        "broadcast output has fewer dimensions than its input"
    );

    for (offset, dims) in input_shape
        .iter()
        .rev()
        .zip_longest(output_shape.iter().rev())
        .enumerate()
    {
        let axis = out_ndim - 1 - offset;
        match dims {
            Both(input_dim, output_dim) if input_dim == output_dim => {}
            Both(&1, _) => {
                grad = grad.sum_axis(Axis(axis)).insert_axis(Axis(axis));
            }
            Both(input_dim, output_dim) => {
                panic!("dimension {input_dim} cannot broadcast to {output_dim}")
            }
            Right(_) => leading_axes += 1,
            Left(_) => unreachable!(),
        }
    }
    for _ in 0..leading_axes {
        grad = grad.sum_axis(Axis(0));
    }
    grad
}

impl Operation for Broadcast {
    fn backward(&self, output: &Tensor) {
        let grad = output
            .grad()
            .unwrap_or_else(|| ArrayD::zeros(output.shape()));
        self.input
            .backward_internal(reduce_to_shape(grad, &self.input_shape));
    }

    fn zero_graph(&self) {
        self.input.zero_graph();
    }

    fn build_graph(&self) {
        self.input.build_graph();
    }
}

impl Tensor {
    pub fn broadcast_to(&self, shape: &[usize]) -> Tensor {
        Broadcast::forward(self.clone(), shape)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn broadcast_row_vector_over_batch() {
        let a = Tensor::new(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn());
        let b = Tensor::new(array![10.0, 20.0].into_dyn());
        let c = a.clone() + b.broadcast_to(&[3, 2]);

        assert_eq!(
            c.data(),
            array![[11.0, 22.0], [13.0, 24.0], [15.0, 26.0]].into_dyn()
        );

        c.sum().backward();
        assert_eq!(b.grad(), Some(array![3.0, 3.0].into_dyn()));
        assert_eq!(a.grad().map(|g| g.sum()), Some(6.0));
    }

    #[test]
    fn broadcast_column_keeps_singleton_axis() {
        let col = Tensor::new(array![[1.0], [2.0]].into_dyn());
        let wide = col.broadcast_to(&[2, 3]);
        assert_eq!(wide.data(), array![[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]].into_dyn());

        (wide * Tensor::new(array![[1.0, 2.0, 3.0], [1.0, 1.0, 1.0]].into_dyn()))
            .sum()
            .backward();
        assert_eq!(col.grad(), Some(array![[6.0], [3.0]].into_dyn()));
    }
}
