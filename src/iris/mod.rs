//! Iris-style tabular data: CSV rows with four numeric measurements and a class label.

pub mod records;
pub mod vocabulary;

pub use records::{load_dataset, load_features, IrisRecord, IrisTable};
pub use vocabulary::LabelVocabulary;

/// The number of numeric features per row
pub const NUM_FEATURES: usize = 4;

/// Feature column names, in file order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = ["sepal_len", "sepal_width", "petal_len", "petal_width"];

/// Name of the trailing categorical column
pub const LABEL_COLUMN: &str = "label";

/// Number of columns in a labeled row
pub const NUM_COLUMNS: usize = NUM_FEATURES + 1;
