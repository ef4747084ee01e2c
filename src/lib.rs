pub mod artifact;
pub mod config;
pub mod data;
pub mod error;
pub mod iris;
pub mod logging;
pub mod model;
pub mod nn;
pub mod ops;
pub mod optim;
pub mod pipeline;
pub mod scaler;
pub mod tensor;

pub use error::{Error, Result};
