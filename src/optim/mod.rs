pub mod adam;
pub mod optimizer;

pub use adam::{AdamOptimizer, AdamState};
pub use optimizer::Optimizer;
