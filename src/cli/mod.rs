// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands a TrainConfig to
// the application layer. There are no subcommands: running the
// binary runs one training job.
//
// Reference: Rust Book §12 (CLI programs)

pub mod args;

use anyhow::Result;
use clap::Parser;
use args::TrainArgs;

use crate::application::train_use_case::{TrainConfig, TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "mnist-convnet",
    version,
    about = "Train a two-block ConvNet on MNIST, track the run, save the weights."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config: TrainConfig = self.args.into();
        tracing::info!(
            "Starting run '{}': {} epochs, batch_size={}, lr={}",
            config.model_name, config.epochs, config.batch_size, config.learning_rate,
        );

        let report = TrainUseCase::new(config).execute()?;

        tracing::info!(
            "Done: {} steps, final accuracy {:?}, checkpoint '{}'",
            report.steps,
            report.epochs.last().map(|s| s.accuracy),
            report.checkpoint.display(),
        );
        Ok(())
    }
}
