use std::rc::Rc;

use ndarray::{arr0, ArrayD};

use crate::ops::Operation;
use crate::tensor::Tensor;

/// Reduces every element to a 0-dimensional scalar.
#[derive(Debug, Clone)]
pub struct Sum {
    input: Tensor,
}

impl Sum {
    pub fn forward(input: Tensor) -> Tensor {
        let summed = arr0(input.container.borrow().array.sum()).into_dyn();
        let op = Sum { input };
        Tensor::new_with_prev(summed, Rc::new(op))
    }
}

impl Operation for Sum {
    fn backward(&self, output: &Tensor) {
        let grad = output.grad().map(|g| g.sum()).unwrap_or(0.0);
        let broadcasted = ArrayD::from_elem(self.input.shape(), grad);
        self.input.backward_internal(broadcasted);
    }

    fn zero_graph(&self) {
        self.input.zero_graph();
    }

    fn build_graph(&self) {
        self.input.build_graph();
    }
}

impl Tensor {
    pub fn sum(&self) -> Tensor {
        Sum::forward(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn sum_is_scalar_with_unit_gradient() {
        let a = Tensor::new(array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        let total = a.sum();
        assert!(total.shape().is_empty());
        assert_eq!(total.item(), 10.0);

        total.backward();
        assert_eq!(a.grad(), Some(array![[1.0, 1.0], [1.0, 1.0]].into_dyn()));
    }
}
