use std::rc::Rc;

use ndarray::{Array2, ArrayD, Ix2};

use crate::ops::Operation;
use crate::tensor::Tensor;

fn as_matrix(array: ArrayD<f32>) -> Array2<f32> {
    array
        .into_dimensionality::<Ix2>()
        .expect("matmul operands must be 2-dimensional")
}

#[derive(Debug, Clone)]
pub struct TensorMatMul {
    pub lhs: Tensor,
    pub rhs: Tensor,
}

impl TensorMatMul {
    pub fn forward(lhs: Tensor, rhs: Tensor) -> Tensor {
        let lhs_data = as_matrix(lhs.data());
        let rhs_data = as_matrix(rhs.data());
        assert_eq!(
            lhs_data.ncols(),
            rhs_data.nrows(),
            "matmul inner dimensions differ"
        );
        let result = lhs_data.dot(&rhs_data).into_dyn();
        let node = TensorMatMul { lhs, rhs };
        Tensor::new_with_prev(result, Rc::new(node))
    }
}

impl Operation for TensorMatMul {
    fn backward(&self, output: &Tensor) {
        let grad = as_matrix(
            output
                .grad()
                .unwrap_or_else(|| ArrayD::zeros(output.shape())),
        );
        let input_lhs = as_matrix(self.lhs.data());
        let input_rhs = as_matrix(self.rhs.data());

        // C = A @ B  =>  dL/dA = dL/dC @ B^T,  dL/dB = A^T @ dL/dC
        let grad_lhs = grad.dot(&input_rhs.t());
        let grad_rhs = input_lhs.t().dot(&grad);

        self.lhs.backward_internal(grad_lhs.into_dyn());
        self.rhs.backward_internal(grad_rhs.into_dyn());
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

impl Tensor {
    pub fn matmul(&self, rhs: &Tensor) -> Tensor {
        TensorMatMul::forward(self.clone(), rhs.clone())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn matmul_forward_and_gradients() {
        let a = Tensor::new(array![[1.0, 2.0]].into_dyn());
        let b = Tensor::new(array![[3.0], [4.0]].into_dyn());
        let c = a.matmul(&b);
        assert_eq!(c.data(), array![[11.0]].into_dyn());

        c.backward();
        assert_eq!(a.grad(), Some(array![[3.0, 4.0]].into_dyn()));
        assert_eq!(b.grad(), Some(array![[1.0], [2.0]].into_dyn()));
    }

    #[test]
    fn matmul_batch_of_rows() {
        let x = Tensor::new(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]].into_dyn());
        let w = Tensor::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn());
        let y = x.matmul(&w);
        assert_eq!(y.shape(), vec![3, 3]);
        assert_eq!(
            y.data(),
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [5.0, 7.0, 9.0]].into_dyn()
        );

        y.sum().backward();
        // Each weight row collects the column sums of x.
        assert_eq!(
            w.grad(),
            Some(array![[2.0, 2.0, 2.0], [2.0, 2.0, 2.0]].into_dyn())
        );
    }
}
