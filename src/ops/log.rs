use std::rc::Rc;

use crate::ops::Operation;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct TensorLog {
    inp: Tensor,
}

impl TensorLog {
    fn forward(inp: Tensor) -> Tensor {
        let result = inp.container.borrow().array.mapv(f32::ln);
        let node = TensorLog { inp };
        Tensor::new_with_prev(result, Rc::new(node))
    }
}

impl Operation for TensorLog {
    fn backward(&self, output: &Tensor) {
        let grad = output
            .grad()
            .unwrap_or_else(|| ndarray::ArrayD::ones(output.shape()));
        // d/dx(ln(x)) = 1/x
        let grad_a = grad / &self.inp.data();
        self.inp.backward_internal(grad_a);
    }

    fn zero_graph(&self) {
        self.inp.zero_graph();
    }

    fn build_graph(&self) {
        self.inp.build_graph();
    }
}

impl Tensor {
    pub fn log(&self) -> Tensor {
        TensorLog::forward(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn test_log_forward() {
        let input = Tensor::new(array![1.0, std::f32::consts::E, 7.389056].into_dyn());
        let expected = [0.0, 1.0, 2.0];
        for (a, b) in input.log().data().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_log_backward() {
        let input = Tensor::new(array![1.0, 2.0, 4.0].into_dyn());
        input.log().sum().backward();
        let expected_grad = [1.0, 0.5, 0.25];
        let grad = input.grad().unwrap();
        for (a, b) in grad.iter().zip(expected_grad.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}
