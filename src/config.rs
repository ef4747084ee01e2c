use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Training hyperparameters
pub const DEFAULT_EPOCHS: usize = 2;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const HIDDEN_UNITS: usize = 128;
pub const HIDDEN_LAYERS: usize = 2;
pub const LEARNING_RATE: f32 = 0.001;
pub const DEFAULT_EXPECTED_CLASSES: usize = 3;

/// Network shape and optimizer settings used by `define_model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub hidden_units: usize,
    pub hidden_layers: usize,
    pub learning_rate: f32,
    /// Seed for weight initialization and shuffling. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            hidden_units: HIDDEN_UNITS,
            hidden_layers: HIDDEN_LAYERS,
            learning_rate: LEARNING_RATE,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub model: ModelOptions,
    pub batch_size: usize,
    pub expected_classes: usize,
    /// Standalone label vocabulary, reused when it exists and written otherwise.
    pub vocabulary_path: Option<PathBuf>,
    /// TensorBoard summary directory.
    pub logdir: Option<PathBuf>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            model: ModelOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            expected_classes: DEFAULT_EXPECTED_CLASSES,
            vocabulary_path: None,
            logdir: None,
        }
    }
}
