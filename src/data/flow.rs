use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::data::augment::Augment;
use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// An endless stream of (image, one-hot target) batches over a dataset.
///
/// Training flows reshuffle the sample order at every epoch boundary and
/// warp each image with the augmentation config; validation flows walk the
/// dataset in a fixed order with no augmentation so metrics are comparable
/// across epochs. Either way the stream restarts from the top when it runs
/// out, so callers drive it by `steps_per_epoch` rather than exhaustion.
#[derive(Debug)]
pub struct BatchFlow {
    dataset: Dataset,
    batch_size: usize,
    augment: Option<Augment>,
    shuffle: bool,
    order: Vec<usize>,
    cursor: usize,
}

impl BatchFlow {
    fn new(
        dataset: Dataset,
        batch_size: usize,
        augment: Option<Augment>,
        shuffle: bool,
    ) -> Result<BatchFlow> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset(dataset.root.clone()));
        }
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if shuffle {
            order.shuffle(&mut thread_rng());
        }
        Ok(BatchFlow {
            dataset,
            batch_size,
            augment,
            shuffle,
            order,
            cursor: 0,
        })
    }

    /// Shuffled, augmented flow for the training split.
    pub fn training(dataset: Dataset, batch_size: usize, augment: Augment) -> Result<BatchFlow> {
        BatchFlow::new(dataset, batch_size, Some(augment), true)
    }

    /// Deterministic, rescale-only flow for the validation split.
    pub fn validation(dataset: Dataset, batch_size: usize) -> Result<BatchFlow> {
        BatchFlow::new(dataset, batch_size, None, false)
    }

    pub fn samples(&self) -> usize {
        self.dataset.len()
    }

    /// Number of batches that covers the dataset roughly once, never zero.
    pub fn steps_per_epoch(&self) -> usize {
        (self.dataset.len() / self.batch_size).max(1)
    }

    /// Pulls the next `batch_size` samples, wrapping (and reshuffling, for
    /// training flows) at the end of the dataset.
    pub fn next_batch(&mut self) -> Result<(Vec<Tensor>, Vec<Vec<f64>>)> {
        let mut images = Vec::with_capacity(self.batch_size);
        let mut targets = Vec::with_capacity(self.batch_size);
        let mut rng = thread_rng();

        for _ in 0..self.batch_size {
            if self.cursor >= self.order.len() {
                self.cursor = 0;
                if self.shuffle {
                    self.order.shuffle(&mut rng);
                }
            }
            let index = self.order[self.cursor];
            self.cursor += 1;

            let mut tensor = self.dataset.load_tensor(index)?;
            if let Some(aug) = &self.augment {
                tensor = aug.apply(&tensor, &mut rng);
            }
            images.push(tensor);
            targets.push(self.dataset.samples[index].label.one_hot());
        }
        Ok((images, targets))
    }
}
