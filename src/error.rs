//! Error types for the scaler, dataset, artifact and training stages.

use std::path::PathBuf;

/// Failures while persisting, loading or fitting a feature scaler.
#[derive(Debug, thiserror::Error)]
pub enum ScalerError {
    #[error("Failed to access scaler config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid scaler config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported scaler format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Cannot fit a scaler on zero rows")]
    EmptyFit,
    #[error("Scaler expects {expected} features, got {found}")]
    FeatureCount { expected: usize, found: usize },
    #[error("Scaler must be fitted before it can center or scale")]
    NotFitted,
}

/// Failures while reading a dataset or label vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed row {row}: {source}")]
    Parse { row: usize, source: csv::Error },
    #[error("Row {row} has {found} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Dataset {path} contains no rows")]
    Empty { path: PathBuf },
    #[error("Row {row} has label {label:?} which is not in the vocabulary")]
    UnknownLabel { row: usize, label: String },
    #[error("Failed to access label vocabulary {path}: {source}")]
    VocabularyIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid label vocabulary {path}: {source}")]
    VocabularyJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Label vocabulary {path} is invalid: {reason}")]
    VocabularyInvalid { path: PathBuf, reason: String },
}

/// Failures while saving, loading or validating a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to access model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model artifact {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Model artifact is inconsistent: {0}")]
    Invalid(String),
}

/// Failures detected before or during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Dataset has {found} distinct labels, expected {expected}")]
    ClassCount { expected: usize, found: usize },
    #[error("Epoch count must be at least 1")]
    ZeroEpochs,
    #[error("Batch size must be at least 1")]
    BatchSize,
    #[error("Failed to create summary directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Crate-level error covering every pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Scaler(#[from] ScalerError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Train(#[from] TrainError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
