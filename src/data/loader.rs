use crate::data::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

pub trait DataLoader<D, Sample, Batch>
where
    D: Dataset<Sample>,
{
    fn get_dataset(&self) -> &D;
    fn get_batch_size(&self) -> usize;
    fn collate(&self, samples: Vec<Sample>) -> Batch;
}

/// An iterator over batches from a DataLoader.
///
/// The last batch is shorter when the dataset length is not a multiple of the batch size.
pub struct DataLoaderIterator<'a, D, Sample, Batch>
where
    D: Dataset<Sample>,
{
    loader: &'a dyn DataLoader<D, Sample, Batch>,
    indices: Vec<usize>,
    current_index: usize,
}

impl<D, Sample, Batch> Iterator for DataLoaderIterator<'_, D, Sample, Batch>
where
    D: Dataset<Sample>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        let batch_size = self.loader.get_batch_size();
        if self.current_index >= self.indices.len() || batch_size == 0 {
            return None;
        }

        let end = (self.current_index + batch_size).min(self.indices.len());
        let batch: Vec<Sample> = self.indices[self.current_index..end]
            .iter()
            .map(|&idx| self.loader.get_dataset().get_sample(idx))
            .collect();

        self.current_index = end;

        Some(self.loader.collate(batch))
    }
}

pub trait DataLoaderExt<D, Sample, Batch>
where
    D: Dataset<Sample>,
{
    fn iter(&self) -> DataLoaderIterator<'_, D, Sample, Batch>;
    fn iter_shuffled(&self, seed: u64) -> DataLoaderIterator<'_, D, Sample, Batch>;
    fn num_batches(&self) -> usize;
}

impl<D, Sample, Batch, T: DataLoader<D, Sample, Batch>> DataLoaderExt<D, Sample, Batch> for T
where
    D: Dataset<Sample>,
{
    /// Creates an iterator over the dataset in sequential order
    fn iter(&self) -> DataLoaderIterator<'_, D, Sample, Batch> {
        DataLoaderIterator {
            loader: self,
            indices: (0..self.get_dataset().len()).collect(),
            current_index: 0,
        }
    }

    /// Creates an iterator over the dataset with every index shuffled
    fn iter_shuffled(&self, seed: u64) -> DataLoaderIterator<'_, D, Sample, Batch> {
        let mut shuffled_indices: Vec<usize> = (0..self.get_dataset().len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        shuffled_indices.shuffle(&mut rng);

        DataLoaderIterator {
            loader: self,
            indices: shuffled_indices,
            current_index: 0,
        }
    }

    fn num_batches(&self) -> usize {
        let batch_size = self.get_batch_size();
        if batch_size == 0 {
            return 0;
        }
        self.get_dataset().len().div_ceil(batch_size)
    }
}
