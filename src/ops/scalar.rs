use std::ops::{Add, Mul};
use std::rc::Rc;

use crate::ops::Operation;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct MulScalar {
    input: Tensor,
    scalar: f32,
}

impl MulScalar {
    pub fn forward(input: Tensor, scalar: f32) -> Tensor {
        let array = input.data() * scalar;
        let op = MulScalar { input, scalar };
        Tensor::new_with_prev(array, Rc::new(op))
    }
}

impl Operation for MulScalar {
    fn backward(&self, output: &Tensor) {
        if let Some(grad_out) = output.grad() {
            let grad_input = grad_out.mapv(|x| x * self.scalar);
            self.input.backward_internal(grad_input);
        }
    }

    fn zero_graph(&self) {
        self.input.zero_graph();
    }

    fn build_graph(&self) {
        self.input.build_graph();
    }
}

#[derive(Debug, Clone)]
pub struct AddScalar {
    input: Tensor,
}

impl AddScalar {
    pub fn forward(input: Tensor, scalar: f32) -> Tensor {
        let array = input.data() + scalar;
        let op = AddScalar { input };
        Tensor::new_with_prev(array, Rc::new(op))
    }
}

impl Operation for AddScalar {
    fn backward(&self, output: &Tensor) {
        if let Some(grad_out) = output.grad() {
            self.input.backward_internal(grad_out);
        }
    }

    fn zero_graph(&self) {
        self.input.zero_graph();
    }

    fn build_graph(&self) {
        self.input.build_graph();
    }
}

impl Tensor {
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        MulScalar::forward(self.clone(), scalar)
    }

    pub fn add_scalar(&self, scalar: f32) -> Tensor {
        AddScalar::forward(self.clone(), scalar)
    }
}

impl Mul<f32> for Tensor {
    type Output = Tensor;

    fn mul(self, rhs: f32) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Add<f32> for Tensor {
    type Output = Tensor;

    fn add(self, rhs: f32) -> Self::Output {
        self.add_scalar(rhs)
    }
}
