//! irisgrad - train and export a small Iris classifier
//!
//! Subcommands mirror the pipeline stages: write a scaler config, check it
//! loads, train a model from a CSV dataset, and copy a trained model to a new
//! location. `predict` and `evaluate` run a saved model on new rows.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use irisgrad::config::{ModelOptions, TrainOptions, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_EXPECTED_CLASSES};
use irisgrad::{logging, pipeline, scaler};

#[derive(Parser, Debug)]
#[command(name = "irisgrad")]
#[command(about = "Train and export a feed-forward Iris classifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new unfitted scaler config
    Configure {
        outpath: PathBuf,
        /// Center features on their mean
        #[arg(long)]
        with_mean: bool,
        /// Scale features to unit variance
        #[arg(long)]
        with_std: bool,
    },

    /// Load a scaler config and report its settings
    #[command(name = "build_scaler", alias = "build-scaler")]
    BuildScaler { config_path: PathBuf },

    /// Train a model and save it as an artifact directory
    #[command(name = "train_model", alias = "train-model")]
    TrainModel {
        dataset_path: PathBuf,
        config_path: PathBuf,
        out_path: PathBuf,
        #[arg(default_value_t = DEFAULT_EPOCHS)]
        epochs: usize,
        /// Seed for weight initialization and shuffling
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Label vocabulary file, reused if present and written otherwise
        #[arg(long = "vocab")]
        vocabulary: Option<PathBuf>,
        /// TensorBoard summary directory
        #[arg(long)]
        logdir: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_EXPECTED_CLASSES)]
        expected_classes: usize,
    },

    /// Reload a saved model and write it to a new path
    Export { model_path: PathBuf, out_path: PathBuf },

    /// Print the predicted class and probabilities for each row
    Predict { model_path: PathBuf, input_path: PathBuf },

    /// Report loss and accuracy on a labeled dataset
    Evaluate {
        model_path: PathBuf,
        dataset_path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).context("Failed to initialize logging")?;

    match cli.command {
        Command::Configure {
            outpath,
            with_mean,
            with_std,
        } => {
            scaler::configure_with(&outpath, with_mean, with_std)
                .with_context(|| format!("Failed to configure scaler at {}", outpath.display()))?;
        }
        Command::BuildScaler { config_path } => {
            let scaler = scaler::build_scaler(&config_path)
                .with_context(|| format!("Failed to build scaler from {}", config_path.display()))?;
            println!(
                "with_mean={} with_std={} fitted={}",
                scaler.with_mean,
                scaler.with_std,
                scaler.is_fitted()
            );
        }
        Command::TrainModel {
            dataset_path,
            config_path,
            out_path,
            epochs,
            seed,
            batch_size,
            vocabulary,
            logdir,
            expected_classes,
        } => {
            let options = TrainOptions {
                model: ModelOptions {
                    seed,
                    ..ModelOptions::default()
                },
                batch_size,
                expected_classes,
                vocabulary_path: vocabulary,
                logdir,
            };
            let report = pipeline::train_model(&dataset_path, &config_path, &out_path, epochs, &options)
                .with_context(|| format!("Training on {} failed", dataset_path.display()))?;
            if let Some(last) = report.history.last() {
                println!(
                    "Trained on {} samples ({}): loss {:.4}, accuracy {:.2}%",
                    report.samples,
                    report.classes.join(", "),
                    last.loss,
                    last.accuracy * 100.0
                );
            }
        }
        Command::Export {
            model_path,
            out_path,
        } => {
            pipeline::export(&model_path, &out_path)
                .with_context(|| format!("Failed to export {}", model_path.display()))?;
        }
        Command::Predict {
            model_path,
            input_path,
        } => {
            let predictions = pipeline::predict(&model_path, &input_path)
                .with_context(|| format!("Prediction on {} failed", input_path.display()))?;
            for prediction in predictions {
                let probabilities: Vec<String> = prediction
                    .probabilities
                    .iter()
                    .map(|p| format!("{p:.4}"))
                    .collect();
                println!("{}\t[{}]", prediction.class, probabilities.join(", "));
            }
        }
        Command::Evaluate {
            model_path,
            dataset_path,
        } => {
            let report = pipeline::evaluate(&model_path, &dataset_path)
                .with_context(|| format!("Evaluation on {} failed", dataset_path.display()))?;
            println!(
                "samples {}, loss {:.4}, accuracy {:.2}%",
                report.samples,
                report.loss,
                report.accuracy * 100.0
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn train_model_epochs_default_to_two() {
        let cli = Cli::parse_from(["irisgrad", "train_model", "data.csv", "scaler.json", "model"]);
        match cli.command {
            Command::TrainModel {
                epochs, batch_size, ..
            } => {
                assert_eq!(epochs, 2);
                assert_eq!(batch_size, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn kebab_case_aliases_are_accepted() {
        let cli = Cli::parse_from(["irisgrad", "build-scaler", "scaler.json"]);
        assert!(matches!(cli.command, Command::BuildScaler { .. }));
        let cli = Cli::parse_from(["irisgrad", "-v", "train-model", "d.csv", "c.json", "m", "5", "--seed", "3"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::TrainModel {
                epochs: 5,
                seed: Some(3),
                ..
            }
        ));
    }
}
