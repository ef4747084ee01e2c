use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::{DataLoader, Dataset};
use crate::tensor::Tensor;

/// One feature row paired with its one-hot label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub input: Array1<f32>,
    pub label: Array1<f32>,
}

/// A collated batch: `input` is `[batch, features]`, `label` is `[batch, classes]`.
#[derive(Debug, Clone)]
pub struct LabeledBatch {
    pub input: Tensor,
    pub label: Tensor,
}

impl LabeledBatch {
    pub fn len(&self) -> usize {
        self.input.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Dataset<LabeledSample> for Vec<LabeledSample> {
    fn len(&self) -> usize {
        self.len()
    }

    fn get_sample(&self, index: usize) -> LabeledSample {
        self[index].clone()
    }
}

pub struct LabeledDataLoader {
    pub dataset: Vec<LabeledSample>,
    pub batch_size: usize,
}

impl LabeledDataLoader {
    /// Pairs feature rows with label rows. Both matrices must have the same number of rows.
    pub fn from_arrays(features: &Array2<f32>, labels: &Array2<f32>, batch_size: usize) -> Self {
        assert_eq!(
            features.nrows(),
            labels.nrows(),
            "features and labels must have the same number of rows"
        );
        let dataset = features
            .axis_iter(Axis(0))
            .zip(labels.axis_iter(Axis(0)))
            .map(|(input, label)| LabeledSample {
                input: input.to_owned(),
                label: label.to_owned(),
            })
            .collect();
        LabeledDataLoader {
            dataset,
            batch_size,
        }
    }
}

fn stack_rows(rows: &[ArrayView1<f32>]) -> Array2<f32> {
    let width = rows.first().map(|row| row.len()).unwrap_or(0);
    let mut out = Array2::zeros((rows.len(), width));
    for (mut target, row) in out.axis_iter_mut(Axis(0)).zip(rows) {
        target.assign(row);
    }
    out
}

impl DataLoader<Vec<LabeledSample>, LabeledSample, LabeledBatch> for LabeledDataLoader {
    fn get_dataset(&self) -> &Vec<LabeledSample> {
        &self.dataset
    }

    fn get_batch_size(&self) -> usize {
        self.batch_size
    }

    fn collate(&self, samples: Vec<LabeledSample>) -> LabeledBatch {
        let inputs: Vec<_> = samples.iter().map(|s| s.input.view()).collect();
        let labels: Vec<_> = samples.iter().map(|s| s.label.view()).collect();

        LabeledBatch {
            input: Tensor::new(stack_rows(&inputs).into_dyn()),
            label: Tensor::new(stack_rows(&labels).into_dyn()),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::data::DataLoaderExt;

    fn loader(rows: usize, batch_size: usize) -> LabeledDataLoader {
        let features = Array2::from_shape_fn((rows, 2), |(i, j)| (i * 2 + j) as f32);
        let labels = Array2::from_shape_fn((rows, 3), |(i, j)| if i % 3 == j { 1.0 } else { 0.0 });
        LabeledDataLoader::from_arrays(&features, &labels, batch_size)
    }

    #[test]
    fn keeps_final_partial_batch() {
        let loader = loader(12, 10);
        let sizes: Vec<usize> = loader.iter().map(|batch| batch.len()).collect();
        assert_eq!(sizes, vec![10, 2]);
        assert_eq!(loader.num_batches(), 2);
    }

    #[test]
    fn collate_stacks_rows_in_order() {
        let loader = loader(3, 2);
        let first = loader.iter().next().unwrap();
        assert_eq!(first.input.shape(), vec![2, 2]);
        assert_eq!(first.label.shape(), vec![2, 3]);
        assert_eq!(
            first.input.data(),
            array![[0.0f32, 1.0], [2.0, 3.0]].into_dyn()
        );
    }

    #[test]
    fn shuffled_iteration_visits_every_sample_once() {
        let loader = loader(25, 4);
        let mut seen: Vec<f32> = loader
            .iter_shuffled(7)
            .flat_map(|batch| {
                batch
                    .input
                    .data()
                    .index_axis(Axis(1), 0)
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
            })
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f32> = (0..25).map(|i| (i * 2) as f32).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let loader = loader(20, 5);
        let a: Vec<_> = loader.iter_shuffled(3).map(|b| b.input.data()).collect();
        let b: Vec<_> = loader.iter_shuffled(3).map(|b| b.input.data()).collect();
        assert_eq!(a, b);
    }
}
