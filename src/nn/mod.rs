pub mod linear;
pub mod loss;
pub mod mlp;

pub use linear::{Activation, LinearLayer};
pub use loss::{accuracy, categorical_cross_entropy, Loss, Metric};
pub use mlp::Mlp;
