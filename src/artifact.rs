//! On-disk model bundle.
//!
//! A model path is a directory holding `model.json`. The JSON record carries the
//! layer layout, weights, optimizer moments, class names, the fitted scaler and
//! the training history, so a reloaded model predicts exactly like the original.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::ArtifactError;
use crate::iris::{LabelVocabulary, FEATURE_NAMES};
use crate::model::{Classifier, EpochStats};
use crate::nn::{Activation, LinearLayer, Loss, Metric, Mlp};
use crate::optim::{AdamOptimizer, AdamState};
use crate::scaler::StandardScaler;

pub const MODEL_FORMAT_VERSION: u32 = 1;
pub const MODEL_FILE_NAME: &str = "model.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub units_in: usize,
    pub units_out: usize,
    pub activation: Activation,
}

/// Row-major `[units_in, units_out]` weight and `[units_out]` bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub architecture: Vec<LayerSpec>,
    pub weights: Vec<LayerWeights>,
    pub optimizer: AdamState,
    pub loss: Loss,
    pub metrics: Vec<Metric>,
    pub classes: LabelVocabulary,
    pub scaler: StandardScaler,
    #[serde(default)]
    pub history: Vec<EpochStats>,
}

/// Resolves `path` to the JSON file: a directory maps to its `model.json`.
fn model_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(MODEL_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

impl ModelArtifact {
    pub fn from_classifier(
        classifier: &Classifier,
        classes: LabelVocabulary,
        scaler: StandardScaler,
        history: Vec<EpochStats>,
    ) -> ModelArtifact {
        let layers = classifier.network().layers();
        ModelArtifact {
            format_version: MODEL_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            architecture: layers
                .iter()
                .map(|layer| LayerSpec {
                    units_in: layer.units_in(),
                    units_out: layer.units_out(),
                    activation: layer.activation(),
                })
                .collect(),
            weights: layers
                .iter()
                .map(|layer| LayerWeights {
                    weight: layer.weight_values(),
                    bias: layer.bias_values(),
                })
                .collect(),
            optimizer: classifier.optimizer().state(),
            loss: classifier.loss(),
            metrics: classifier.metrics().to_vec(),
            classes,
            scaler,
            history,
        }
    }

    /// Checks that every shape in the record agrees with the architecture.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: self.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        let invalid = |msg: String| Err(ArtifactError::Invalid(msg));

        let (Some(first), Some(last)) = (self.architecture.first(), self.architecture.last()) else {
            return invalid("architecture has no layers".to_string());
        };
        if first.units_in != self.feature_names.len() {
            return invalid(format!(
                "input width {} does not match {} feature names",
                first.units_in,
                self.feature_names.len()
            ));
        }
        if last.units_out != self.classes.len() {
            return invalid(format!(
                "output width {} does not match {} classes",
                last.units_out,
                self.classes.len()
            ));
        }
        for (idx, pair) in self.architecture.windows(2).enumerate() {
            if pair[0].units_out != pair[1].units_in {
                return invalid(format!("layer {} output does not feed layer {}", idx, idx + 1));
            }
        }
        if self.weights.len() != self.architecture.len() {
            return invalid(format!(
                "{} weight entries for {} layers",
                self.weights.len(),
                self.architecture.len()
            ));
        }
        for (idx, (spec, weights)) in self.architecture.iter().zip(&self.weights).enumerate() {
            if weights.weight.len() != spec.units_in * spec.units_out {
                return invalid(format!("layer {idx} weight length mismatch"));
            }
            if weights.bias.len() != spec.units_out {
                return invalid(format!("layer {idx} bias length mismatch"));
            }
        }
        let parameters = self.architecture.len() * 2;
        if self.optimizer.first_moments.len() != parameters
            || self.optimizer.second_moments.len() != parameters
        {
            return invalid("optimizer state does not match parameter count".to_string());
        }
        Ok(())
    }

    /// Rebuilds the compiled classifier, including optimizer moments.
    pub fn to_classifier(&self) -> Result<Classifier, ArtifactError> {
        self.validate()?;
        let layers = self
            .architecture
            .iter()
            .zip(&self.weights)
            .map(|(spec, weights)| {
                LinearLayer::from_parts(
                    spec.units_in,
                    spec.units_out,
                    weights.weight.clone(),
                    weights.bias.clone(),
                    spec.activation,
                )
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ArtifactError::Invalid(err.to_string()))?;
        let network = Mlp::from_layers(layers);
        let optimizer = AdamOptimizer::from_state(&self.optimizer, network.parameters())
            .map_err(|err| ArtifactError::Invalid(format!("optimizer state: {err}")))?;
        Ok(Classifier::new(
            network,
            optimizer,
            self.loss,
            self.metrics.clone(),
        ))
    }

    /// Writes `dir/model.json`, creating `dir` if needed. The file is written to a
    /// temporary sibling and renamed into place.
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ArtifactError::Io { path, source }
        };
        fs::create_dir_all(dir).map_err(io_err(dir))?;
        let target = dir.join(MODEL_FILE_NAME);

        let json = serde_json::to_vec_pretty(self).map_err(|source| ArtifactError::Json {
            path: target.clone(),
            source,
        })?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
        tmp.write_all(&json).map_err(io_err(tmp.path()))?;
        tmp.as_file().sync_all().map_err(io_err(&target))?;
        tmp.persist(&target)
            .map_err(|err| ArtifactError::Io {
                path: target.clone(),
                source: err.error,
            })?;

        tracing::debug!(path = %target.display(), bytes = json.len(), "Saved model artifact");
        Ok(())
    }

    /// Loads from an artifact directory or directly from a `model.json` file.
    pub fn load(path: &Path) -> Result<ModelArtifact, ArtifactError> {
        let file = model_file(path);
        let bytes = fs::read(&file).map_err(|source| ArtifactError::Io {
            path: file.clone(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
                path: file.clone(),
                source,
            })?;
        artifact.validate()?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::tempdir;

    use super::*;
    use crate::config::ModelOptions;
    use crate::model::{define_model, model_rng};

    fn small_artifact() -> (Classifier, ModelArtifact) {
        let options = ModelOptions {
            hidden_units: 8,
            seed: Some(12),
            ..ModelOptions::default()
        };
        let classifier = define_model(4, 3, &options, &mut model_rng(&options));
        let classes = LabelVocabulary::from_labels(["setosa", "versicolor", "virginica"]);
        let artifact = ModelArtifact::from_classifier(
            &classifier,
            classes,
            StandardScaler::new(false, false),
            Vec::new(),
        );
        (classifier, artifact)
    }

    #[test]
    fn save_then_load_gives_same_predictions() {
        let dir = tempdir().unwrap();
        let (classifier, artifact) = small_artifact();
        artifact.save(&dir.path().join("model")).unwrap();

        let loaded = ModelArtifact::load(&dir.path().join("model")).unwrap();
        assert_eq!(loaded, artifact);

        let x = array![[5.9f32, 3.0, 5.1, 1.8]];
        let restored = loaded.to_classifier().unwrap();
        let expected = classifier.predict(x.view());
        let actual = restored.predict(x.view());
        for (a, b) in actual.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn load_accepts_file_path() {
        let dir = tempdir().unwrap();
        let (_, artifact) = small_artifact();
        artifact.save(dir.path()).unwrap();
        assert!(ModelArtifact::load(&dir.path().join(MODEL_FILE_NAME)).is_ok());
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempdir().unwrap();
        let (_, artifact) = small_artifact();
        artifact.save(dir.path()).unwrap();
        artifact.save(dir.path()).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(MODEL_FILE_NAME)]);
    }

    #[test]
    fn validate_rejects_mismatched_weights() {
        let (_, mut artifact) = small_artifact();
        artifact.weights[1].bias.pop();
        assert!(matches!(artifact.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_class_count_mismatch() {
        let (_, mut artifact) = small_artifact();
        artifact.classes = LabelVocabulary::from_labels(["a", "b"]);
        assert!(matches!(artifact.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn load_rejects_unknown_version_and_missing_path() {
        let dir = tempdir().unwrap();
        let (_, mut artifact) = small_artifact();
        artifact.format_version = 7;
        let json = serde_json::to_vec(&artifact).unwrap();
        fs::write(dir.path().join(MODEL_FILE_NAME), json).unwrap();
        assert!(matches!(
            ModelArtifact::load(dir.path()),
            Err(ArtifactError::UnsupportedVersion { found: 7, .. })
        ));
        assert!(matches!(
            ModelArtifact::load(&dir.path().join("missing")),
            Err(ArtifactError::Io { .. })
        ));
    }
}
