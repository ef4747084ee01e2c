pub mod dataset;
pub mod labeled_dataset;
pub mod loader;
pub use dataset::Dataset;
pub use labeled_dataset::{LabeledBatch, LabeledDataLoader, LabeledSample};
pub use loader::{DataLoader, DataLoaderExt, DataLoaderIterator};
