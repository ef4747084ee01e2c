use std::ops::Mul;
use std::rc::Rc;

use crate::ops::Operation;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct TensorMul {
    lhs: Tensor,
    rhs: Tensor,
}

impl TensorMul {
    pub fn forward(lhs: Tensor, rhs: Tensor) -> Tensor {
        assert_eq!(
            lhs.shape(),
            rhs.shape(),
            "elementwise mul requires matching shapes"
        );
        let result = &lhs.container.borrow().array * &rhs.container.borrow().array;
        let node = TensorMul { lhs, rhs };
        Tensor::new_with_prev(result, Rc::new(node))
    }
}

impl Operation for TensorMul {
    fn backward(&self, output: &Tensor) {
        let grad = output
            .grad()
            .unwrap_or_else(|| ndarray::ArrayD::ones(output.shape()));

        let grad_a = &grad * &self.rhs.data();
        let grad_b = &grad * &self.lhs.data();

        self.lhs.backward_internal(grad_a);
        self.rhs.backward_internal(grad_b);
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

impl Mul<Tensor> for Tensor {
    type Output = Tensor;

    fn mul(self, other: Tensor) -> Tensor {
        TensorMul::forward(self, other)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn mul_gradient_is_other_operand() {
        let a = Tensor::new(array![1.0, 2.0, 3.0].into_dyn());
        let b = Tensor::new(array![4.0, 5.0, 6.0].into_dyn());
        let c = a.clone() * b.clone();
        assert_eq!(c.data(), array![4.0, 10.0, 18.0].into_dyn());

        c.sum().backward();
        assert_eq!(a.grad(), Some(array![4.0, 5.0, 6.0].into_dyn()));
        assert_eq!(b.grad(), Some(array![1.0, 2.0, 3.0].into_dyn()));
    }
}
