// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every flag is optional; the defaults reproduce the reference
// run (batch 32, 10 epochs, widths 32/128, lr 0.001, kernel 5).
//
// Flag names keep their underscores (`--batch_size`, not
// `--batch-size`) so existing sweep scripts keep working.

use clap::Args;
use crate::application::train_use_case::TrainConfig;

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Name of this model / run
    #[arg(short = 'm', long = "model_name", default_value = "cnn example")]
    pub model_name: String,

    /// Batch size
    #[arg(short = 'b', long = "batch_size", default_value_t = 32)]
    pub batch_size: usize,

    /// Number of training epochs
    #[arg(short = 'e', long = "epochs", default_value_t = 10)]
    pub epochs: usize,

    /// Channels of the first conv layer
    #[arg(long = "l1_size", default_value_t = 32)]
    pub l1_size: usize,

    /// Channels of the second conv layer
    #[arg(long = "l2_size", default_value_t = 128)]
    pub l2_size: usize,

    /// Adam learning rate
    #[arg(long = "learning_rate", visible_alias = "lr", default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Kernel size of both conv layers. Anything other than 5 changes
    /// the final feature map and is rejected before training starts
    #[arg(short = 'k', long = "conv_kernel_size", default_value_t = 5)]
    pub conv_kernel_size: usize,

    /// Tracker project the run is filed under
    #[arg(long = "project", default_value = "pytorch_intro")]
    pub project: String,

    /// Where runs, the checkpoint and its config are written
    #[arg(long = "artifact_dir", default_value = "artifacts")]
    pub artifact_dir: String,

    /// Seed for shuffling the train split
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Data loader worker threads
    #[arg(long = "num_workers", default_value_t = 1)]
    pub num_workers: usize,

    /// Print a progress line every N steps (0 disables)
    #[arg(long = "log_every_n_steps", default_value_t = 100)]
    pub log_every_n_steps: usize,

    /// Send weight and gradient statistics to the tracker every N steps (0 disables)
    #[arg(long = "watch_every_n_steps", default_value_t = 1000)]
    pub watch_every_n_steps: usize,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            model_name:          a.model_name,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            l1_size:             a.l1_size,
            l2_size:             a.l2_size,
            learning_rate:       a.learning_rate,
            conv_kernel_size:    a.conv_kernel_size,
            project:             a.project,
            artifact_dir:        a.artifact_dir,
            seed:                a.seed,
            num_workers:         a.num_workers,
            log_every_n_steps:   a.log_every_n_steps,
            watch_every_n_steps: a.watch_every_n_steps,
        }
    }
}
