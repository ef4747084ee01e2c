use std::ops::Add;
use std::rc::Rc;

use crate::ops::Operation;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct TensorAdd {
    lhs: Tensor,
    rhs: Tensor,
}

impl TensorAdd {
    fn forward(lhs: Tensor, rhs: Tensor) -> Tensor {
        assert_eq!(
            lhs.shape(),
            rhs.shape(),
            "add requires matching shapes; broadcast first"
        );
        let result = &lhs.container.borrow().array + &rhs.container.borrow().array;
        let node = TensorAdd { lhs, rhs };
        Tensor::new_with_prev(result, Rc::new(node))
    }
}

impl Operation for TensorAdd {
    fn backward(&self, output: &Tensor) {
        let grad = output
            .grad()
            .unwrap_or_else(|| ndarray::ArrayD::zeros(output.shape()));
        self.lhs.backward_internal(grad.clone());
        self.rhs.backward_internal(grad);
    }

    fn zero_graph(&self) {
        self.lhs.zero_graph();
        self.rhs.zero_graph();
    }

    fn build_graph(&self) {
        self.lhs.build_graph();
        self.rhs.build_graph();
    }
}

impl Add<Tensor> for Tensor {
    type Output = Tensor;

    fn add(self, other: Tensor) -> Tensor {
        TensorAdd::forward(self, other)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn add_passes_gradient_to_both_sides() {
        let a = Tensor::new(array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        let b = Tensor::new(array![[10.0, 20.0], [30.0, 40.0]].into_dyn());
        let c = a.clone() + b.clone();
        assert_eq!(c.data(), array![[11.0, 22.0], [33.0, 44.0]].into_dyn());

        c.sum().backward();
        assert_eq!(a.grad(), Some(array![[1.0, 1.0], [1.0, 1.0]].into_dyn()));
        assert_eq!(b.grad(), Some(array![[1.0, 1.0], [1.0, 1.0]].into_dyn()));
    }

    #[test]
    #[should_panic(expected = "matching shapes")]
    fn add_rejects_mismatched_shapes() {
        let a = Tensor::new(array![1.0, 2.0].into_dyn());
        let b = Tensor::new(array![1.0, 2.0, 3.0].into_dyn());
        let _ = a + b;
    }
}
