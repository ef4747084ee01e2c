//! Classifier construction and the training loop.

use ndarray::{Array2, ArrayD, ArrayView2, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tensorboard_rs::summary_writer::SummaryWriter;

use crate::config::ModelOptions;
use crate::data::{DataLoaderExt, LabeledDataLoader};
use crate::nn::{accuracy, Activation, Loss, Metric, Mlp};
use crate::optim::{AdamOptimizer, Optimizer};
use crate::tensor::Tensor;

/// Loss and accuracy averaged over one pass of the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
}

/// A compiled network: layers plus the optimizer, loss and metrics used to train it.
pub struct Classifier {
    network: Mlp,
    optimizer: AdamOptimizer,
    loss: Loss,
    metrics: Vec<Metric>,
}

/// Returns the rng for weight initialization and shuffling.
pub fn model_rng(options: &ModelOptions) -> StdRng {
    match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Builds an untrained classifier: `hidden_layers` relu layers of `hidden_units`,
/// then a softmax output of `num_classes`, compiled with Adam, categorical
/// cross-entropy and accuracy.
///
/// # Arguments
/// * `num_features` - Width of each input row
/// * `num_classes` - Width of the output probability vector
/// * `options` - Layer sizes, learning rate and seed
/// * `rng` - Source for Glorot-uniform weight initialization
pub fn define_model<R: Rng + ?Sized>(
    num_features: usize,
    num_classes: usize,
    options: &ModelOptions,
    rng: &mut R,
) -> Classifier {
    let network = Mlp::new(
        num_features,
        options.hidden_units,
        options.hidden_layers,
        num_classes,
        Activation::Softmax,
        rng,
    );
    let optimizer = AdamOptimizer::new_with_defaults(options.learning_rate, network.parameters());
    tracing::debug!(
        num_features,
        num_classes,
        hidden_units = options.hidden_units,
        hidden_layers = options.hidden_layers,
        "Defined model"
    );
    Classifier::new(
        network,
        optimizer,
        Loss::CategoricalCrossEntropy,
        vec![Metric::Accuracy],
    )
}

fn as_matrix(array: ArrayD<f32>) -> Array2<f32> {
    array
        .into_dimensionality::<Ix2>()
        .expect("classifier outputs are [batch, classes]")
}

impl Classifier {
    pub fn new(
        network: Mlp,
        optimizer: AdamOptimizer,
        loss: Loss,
        metrics: Vec<Metric>,
    ) -> Classifier {
        Classifier {
            network,
            optimizer,
            loss,
            metrics,
        }
    }

    pub fn network(&self) -> &Mlp {
        &self.network
    }

    pub fn optimizer(&self) -> &AdamOptimizer {
        &self.optimizer
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn num_features(&self) -> usize {
        self.network.layers().first().map_or(0, |layer| layer.units_in())
    }

    pub fn num_classes(&self) -> usize {
        self.network.layers().last().map_or(0, |layer| layer.units_out())
    }

    /// One optimizer step on a batch. Returns the batch loss and accuracy.
    pub fn train_step(&mut self, input: &Tensor, targets: &Tensor) -> (f32, f32) {
        let predictions = self.network.forward(input);
        let loss = self.loss.compute(&predictions, targets);
        let loss_val = loss.item();
        let batch_accuracy = accuracy(
            as_matrix(predictions.data()).view(),
            as_matrix(targets.data()).view(),
        );

        self.optimizer.zero_grad();
        loss.backward();
        self.optimizer.step();
        (loss_val, batch_accuracy)
    }

    /// Trains for `epochs` passes, reshuffling the whole dataset each epoch.
    ///
    /// # Arguments
    /// * `loader` - Batches of scaled features and one-hot labels
    /// * `epochs` - Number of passes over the dataset
    /// * `rng` - Draws one shuffle seed per epoch
    /// * `writer` - Optional TensorBoard writer for per-step and per-epoch scalars
    ///
    /// # Returns
    /// Sample-weighted loss and accuracy of each epoch
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        loader: &LabeledDataLoader,
        epochs: usize,
        rng: &mut R,
        mut writer: Option<&mut SummaryWriter>,
    ) -> Vec<EpochStats> {
        let mut history = Vec::with_capacity(epochs);
        let mut total_steps = 0;

        for epoch in 0..epochs {
            let mut epoch_loss = 0.0;
            let mut epoch_accuracy = 0.0;
            let mut samples = 0;

            for batch in loader.iter_shuffled(rng.gen()) {
                let rows = batch.len();
                let (loss_val, batch_accuracy) = self.train_step(&batch.input, &batch.label);
                epoch_loss += loss_val * rows as f32;
                epoch_accuracy += batch_accuracy * rows as f32;
                samples += rows;

                if let Some(writer) = writer.as_deref_mut() {
                    writer.add_scalar("loss", loss_val, total_steps);
                }
                total_steps += 1;
            }

            let stats = EpochStats {
                epoch: epoch + 1,
                loss: epoch_loss / samples.max(1) as f32,
                accuracy: epoch_accuracy / samples.max(1) as f32,
            };
            if let Some(writer) = writer.as_deref_mut() {
                writer.add_scalar("epoch_loss", stats.loss, epoch);
                writer.add_scalar("epoch_accuracy", stats.accuracy, epoch);
            }
            tracing::info!(
                "Epoch {}/{}, Loss: {:.4}, Accuracy: {:.2}%",
                stats.epoch,
                epochs,
                stats.loss,
                stats.accuracy * 100.0
            );
            history.push(stats);
        }

        if let Some(writer) = writer {
            writer.flush();
        }
        history
    }

    /// Class probabilities `[rows, classes]` for already-scaled features.
    pub fn predict(&self, features: ArrayView2<f32>) -> Array2<f32> {
        let input = Tensor::new(features.to_owned().into_dyn());
        as_matrix(self.network.forward(&input).data())
    }

    /// Loss and accuracy on scaled features against one-hot targets.
    pub fn evaluate(&self, features: ArrayView2<f32>, targets: ArrayView2<f32>) -> (f32, f32) {
        let input = Tensor::new(features.to_owned().into_dyn());
        let target_tensor = Tensor::new(targets.to_owned().into_dyn());
        let predictions = self.network.forward(&input);
        let loss = self.loss.compute(&predictions, &target_tensor).item();
        let acc = accuracy(as_matrix(predictions.data()).view(), targets);
        (loss, acc)
    }
}
