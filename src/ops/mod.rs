pub mod add;
pub mod broadcast;
pub mod log;
pub mod matmul;
pub mod mul;
pub mod negate;
pub mod relu;
pub mod scalar;
pub mod softmax;
pub mod sum;

pub use matmul::TensorMatMul;
pub use mul::TensorMul;
pub use negate::TensorNeg;
pub use scalar::{AddScalar, MulScalar};

pub use crate::tensor::Operation;
