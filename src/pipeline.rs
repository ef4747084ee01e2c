//! End-to-end operations: training, export, prediction and evaluation.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Axis;
use serde::Serialize;
use tensorboard_rs::summary_writer::SummaryWriter;

use crate::artifact::ModelArtifact;
use crate::config::TrainOptions;
use crate::data::LabeledDataLoader;
use crate::error::{ArtifactError, Result, TrainError};
use crate::iris::{load_dataset, load_features, LabelVocabulary, NUM_FEATURES};
use crate::model::{define_model, model_rng, EpochStats};
use crate::scaler::build_scaler;

#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub history: Vec<EpochStats>,
    pub classes: Vec<String>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class: String,
    pub probabilities: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalReport {
    pub loss: f32,
    pub accuracy: f32,
    pub samples: usize,
}

/// Loads the vocabulary at `path` when it exists, otherwise derives one from
/// `labels`. The flag is set when the vocabulary still has to be written.
fn resolve_vocabulary(
    labels: &[String],
    path: Option<&PathBuf>,
) -> Result<(LabelVocabulary, bool)> {
    match path {
        Some(path) if path.exists() => {
            tracing::info!(path = %path.display(), "Reusing label vocabulary");
            Ok((LabelVocabulary::load(path)?, false))
        }
        Some(_) => Ok((LabelVocabulary::from_labels(labels), true)),
        None => Ok((LabelVocabulary::from_labels(labels), false)),
    }
}

fn summary_writer(dir: &Path) -> Result<SummaryWriter> {
    fs::create_dir_all(dir).map_err(|source| TrainError::LogDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(SummaryWriter::new(dir))
}

/// Trains a fresh classifier on `dataset_path` and saves it to `out_path`.
///
/// # Arguments
/// * `dataset_path` - Headerless CSV with four features and a label
/// * `config_path` - Scaler config written by `configure`
/// * `out_path` - Artifact directory to create or overwrite
/// * `epochs` - Passes over the dataset, at least 1
/// * `options` - Batch size, model shape, seed and optional outputs
pub fn train_model(
    dataset_path: &Path,
    config_path: &Path,
    out_path: &Path,
    epochs: usize,
    options: &TrainOptions,
) -> Result<TrainReport> {
    if epochs == 0 {
        return Err(TrainError::ZeroEpochs.into());
    }
    if options.batch_size == 0 {
        return Err(TrainError::BatchSize.into());
    }

    let mut scaler = build_scaler(config_path)?;
    let table = load_dataset(dataset_path)?;

    let (vocabulary, unsaved) =
        resolve_vocabulary(&table.labels, options.vocabulary_path.as_ref())?;
    if vocabulary.len() != options.expected_classes {
        return Err(TrainError::ClassCount {
            expected: options.expected_classes,
            found: vocabulary.len(),
        }
        .into());
    }
    let mut writer = options.logdir.as_deref().map(summary_writer).transpose()?;
    if let Some(path) = options.vocabulary_path.as_ref().filter(|_| unsaved) {
        vocabulary.save(path)?;
        tracing::info!(path = %path.display(), "Wrote label vocabulary");
    }
    let codes = vocabulary.encode(&table.labels)?;
    let targets = vocabulary.one_hot(&codes);

    let features = scaler.fit_transform(table.features.view())?;
    let loader = LabeledDataLoader::from_arrays(&features, &targets, options.batch_size);

    let mut rng = model_rng(&options.model);
    let mut model = define_model(NUM_FEATURES, vocabulary.len(), &options.model, &mut rng);

    tracing::info!(
        samples = table.len(),
        classes = vocabulary.len(),
        epochs,
        batch_size = options.batch_size,
        "Training model"
    );
    let history = model.fit(&loader, epochs, &mut rng, writer.as_mut());

    let artifact =
        ModelArtifact::from_classifier(&model, vocabulary.clone(), scaler, history.clone());
    artifact.save(out_path)?;
    tracing::info!(path = %out_path.display(), "Saved model");

    Ok(TrainReport {
        history,
        classes: vocabulary.classes().to_vec(),
        samples: table.len(),
    })
}

/// Reloads the model at `model_path` and writes it unchanged to `out_path`.
pub fn export(model_path: &Path, out_path: &Path) -> Result<()> {
    let artifact = ModelArtifact::load(model_path)?;
    // weights and optimizer state must rebuild
    artifact.to_classifier()?;
    artifact.save(out_path)?;
    tracing::info!(
        from = %model_path.display(),
        to = %out_path.display(),
        "Exported model"
    );
    Ok(())
}

/// Predicts the class of every row in `input_path`.
pub fn predict(model_path: &Path, input_path: &Path) -> Result<Vec<Prediction>> {
    let artifact = ModelArtifact::load(model_path)?;
    let classifier = artifact.to_classifier()?;
    let features = artifact.scaler.transform(load_features(input_path)?.view())?;
    let probabilities = classifier.predict(features.view());

    probabilities
        .axis_iter(Axis(0))
        .map(|row| -> Result<Prediction> {
            let best = row
                .iter()
                .enumerate()
                .fold(0, |best, (idx, &p)| if p > row[best] { idx } else { best });
            let class = artifact
                .classes
                .name(best)
                .ok_or_else(|| ArtifactError::Invalid(format!("no class for output {best}")))?;
            Ok(Prediction {
                class: class.to_owned(),
                probabilities: row.to_vec(),
            })
        })
        .collect()
}

/// Loss and accuracy of the model at `model_path` on a labeled dataset.
pub fn evaluate(model_path: &Path, dataset_path: &Path) -> Result<EvalReport> {
    let artifact = ModelArtifact::load(model_path)?;
    let classifier = artifact.to_classifier()?;
    let table = load_dataset(dataset_path)?;
    let codes = artifact.classes.encode(&table.labels)?;
    let targets = artifact.classes.one_hot(&codes);
    let features = artifact.scaler.transform(table.features.view())?;

    let (loss, accuracy) = classifier.evaluate(features.view(), targets.view());
    tracing::info!(loss, accuracy, samples = table.len(), "Evaluated model");
    Ok(EvalReport {
        loss,
        accuracy,
        samples: table.len(),
    })
}
