use std::rc::Rc;

use crate::ops::Operation;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct TensorRelu {
    inp: Tensor,
}

impl TensorRelu {
    fn forward(inp: Tensor) -> Tensor {
        let result = inp.container.borrow().array.mapv(|x| x.max(0.0));
        let node = TensorRelu { inp };
        Tensor::new_with_prev(result, Rc::new(node))
    }
}

impl Operation for TensorRelu {
    fn backward(&self, output: &Tensor) {
        let grad = output
            .grad()
            .unwrap_or_else(|| ndarray::ArrayD::ones(output.shape()));
        let inp_val = self.inp.data();
        let grad_a = inp_val.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 }) * &grad;
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
    pub fn relu(&self) -> Tensor {
        TensorRelu::forward(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::tensor::Tensor;

    #[test]
    fn test_relu_forward_mixed_values() {
        let input = Tensor::new(array![-1.0, 0.0, 3.0].into_dyn());
        let result = input.relu();
        assert_eq!(result.data(), array![0.0, 0.0, 3.0].into_dyn());
    }

    #[test]
    fn test_relu_backward() {
        let input = Tensor::new(array![-1.0, 2.0, -3.0].into_dyn());
        let result = input.relu();
        result.backward();
        assert_eq!(input.grad(), Some(array![0.0, 1.0, 0.0].into_dyn()));
    }
}
