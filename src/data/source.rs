// ============================================================
// Layer 4 — Batch Source
// ============================================================
// The training loop pulls batches one at a time, in delivery
// order, from two splits:
//
//   train — shuffled, on the autodiff backend
//   eval  — unshuffled, on the inner (no-autodiff) backend
//
// LoaderSource builds both splits with Burn's DataLoaderBuilder,
// which owns any worker threads and the shuffle. The loop only
// ever sees a blocking iterator.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use std::sync::Arc;

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::{vision::MnistItem, Dataset},
    },
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::{MnistBatch, MnistBatcher};
use crate::domain::records::steps_per_epoch;

// ─── BatchSource ──────────────────────────────────────────────────────────────
pub trait BatchSource<B: AutodiffBackend> {
    /// Number of batches one pass over the train split yields.
    fn train_steps(&self) -> usize;

    /// Fresh pass over the train split.
    fn train_batches(&self) -> Box<dyn Iterator<Item = MnistBatch<B>> + '_>;

    /// Fresh pass over the eval split.
    fn eval_batches(&self) -> Box<dyn Iterator<Item = MnistBatch<B::InnerBackend>> + '_>;
}

// ─── LoaderSource ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    /// Items per batch for both splits; the last batch may be smaller
    pub batch_size:  usize,
    /// Shuffle seed, train split only
    pub seed:        u64,
    /// Worker threads per loader
    pub num_workers: usize,
}

pub struct LoaderSource<B: AutodiffBackend> {
    train:      Arc<dyn DataLoader<B, MnistBatch<B>>>,
    eval:       Arc<dyn DataLoader<B::InnerBackend, MnistBatch<B::InnerBackend>>>,
    batch_size: usize,
}

impl<B: AutodiffBackend> LoaderSource<B> {
    pub fn new<T, E>(train_dataset: T, eval_dataset: E, opts: LoaderOptions) -> Self
    where
        T: Dataset<MnistItem> + 'static,
        E: Dataset<MnistItem> + 'static,
    {
        tracing::debug!(
            "Building loaders: {} train / {} eval items, batch_size={}",
            train_dataset.len(),
            eval_dataset.len(),
            opts.batch_size,
        );

        let train: Arc<dyn DataLoader<B, MnistBatch<B>>> = DataLoaderBuilder::new(MnistBatcher)
            .batch_size(opts.batch_size)
            .shuffle(opts.seed)
            .num_workers(opts.num_workers)
            .build(train_dataset);

        let eval: Arc<dyn DataLoader<B::InnerBackend, MnistBatch<B::InnerBackend>>> =
            DataLoaderBuilder::new(MnistBatcher)
                .batch_size(opts.batch_size)
                .num_workers(opts.num_workers)
                .build(eval_dataset);

        Self { train, eval, batch_size: opts.batch_size }
    }

    pub fn eval_items(&self) -> usize {
        self.eval.num_items()
    }
}

impl<B: AutodiffBackend> BatchSource<B> for LoaderSource<B> {
    fn train_steps(&self) -> usize {
        steps_per_epoch(self.train.num_items(), self.batch_size)
    }

    fn train_batches(&self) -> Box<dyn Iterator<Item = MnistBatch<B>> + '_> {
        Box::new(self.train.iter())
    }

    fn eval_batches(&self) -> Box<dyn Iterator<Item = MnistBatch<B::InnerBackend>> + '_> {
        Box::new(self.eval.iter())
    }
}
