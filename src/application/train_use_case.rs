// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Build the MNIST train / test loaders   (Layer 4 - data)
//   Step 2: Open a tracked run + config snapshot   (Layer 6 - infra)
//   Step 3: Build the classifier, watch it         (Layer 5 - ml)
//   Step 4: Save config next to the checkpoint     (Layer 6 - infra)
//   Step 5: Run the epoch loop, checkpoint at end  (Layer 5 - ml)
//   Step 6: Close the tracked run                  (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    data::dataset::vision::MnistDataset,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::source::{LoaderOptions, LoaderSource};
use crate::domain::traits::MetricSink;
use crate::infra::{
    checkpoint::CheckpointManager,
    console::StdoutConsole,
    tracker::RunTracker,
};
use crate::ml::{
    model::{ClassifierConfig, NUM_CLASSES},
    trainer::{run_training, LoopConfig, RunReport},
};

type TrainBackend = Autodiff<Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every setting for a run. Built once from the CLI and never
// changed afterwards. Serialisable so it can be snapshotted to
// the tracker and saved next to the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Run name shown by the tracker; also the run directory prefix
    pub model_name: String,

    /// Examples per optimiser step. 60 000 / 32 gives 1875 steps per epoch
    pub batch_size: usize,

    /// Full passes over the train split; 0 still writes a checkpoint
    pub epochs: usize,

    /// Output channels of the first feature block
    pub l1_size: usize,

    /// Output channels of the second feature block; the projection
    /// reads 7 * 7 * l2_size values
    pub l2_size: usize,

    /// Adam step size
    pub learning_rate: f64,

    /// Square kernel of both convolutions. Only 5 keeps the final
    /// map at 7x7; anything else is rejected when the model is built
    pub conv_kernel_size: usize,

    /// Tracker project the run is filed under
    pub project: String,

    /// Root for `runs/`, the checkpoint and train_config.json
    pub artifact_dir: String,

    /// Shuffle seed for the train split
    pub seed: u64,

    /// Data loader worker threads
    pub num_workers: usize,

    /// Console progress line every N steps; 0 disables
    pub log_every_n_steps: usize,

    /// Weight / gradient statistics to the tracker every N steps;
    /// 0 disables
    pub watch_every_n_steps: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model_name:          "cnn example".to_string(),
            batch_size:          32,
            epochs:              10,
            l1_size:             32,
            l2_size:             128,
            learning_rate:       0.001,
            conv_kernel_size:    5,
            project:             "pytorch_intro".to_string(),
            artifact_dir:        "artifacts".to_string(),
            seed:                42,
            num_workers:         1,
            log_every_n_steps:   100,
            watch_every_n_steps: 1000,
        }
    }
}

impl TrainConfig {
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.l1_size, self.l2_size)
            .with_kernel_size(self.conv_kernel_size)
            .with_num_classes(NUM_CLASSES)
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            epochs:              self.epochs,
            learning_rate:       self.learning_rate,
            log_every_n_steps:   self.log_every_n_steps,
            watch_every_n_steps: self.watch_every_n_steps,
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            batch_size:  self.batch_size,
            seed:        self.seed,
            num_workers: self.num_workers,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the default WGPU device.
    pub fn execute(&self) -> Result<RunReport> {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<TrainBackend>(&device)
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<RunReport> {
        let cfg = &self.config;

        // ── Step 1: MNIST loaders ─────────────────────────────────────────────
        // MnistDataset downloads and caches the files on first use
        let source = LoaderSource::<B>::new(
            MnistDataset::train(),
            MnistDataset::test(),
            cfg.loader_options(),
        );
        tracing::info!("Loaded MNIST: {} eval images", source.eval_items());

        // ── Step 2: Tracked run ───────────────────────────────────────────────
        // init_run has to come before anything else reaches the tracker
        let mut tracker = RunTracker::new(&cfg.artifact_dir);
        tracker.init_run(&cfg.project, &cfg.model_name)?;
        tracker.record_config(&serde_json::to_value(cfg)?)?;

        // ── Step 3: Model ─────────────────────────────────────────────────────
        // Fails here, before any training, if the kernel size does not
        // produce the feature map the projection expects
        let model = cfg.classifier_config().init::<B>(device)?;
        tracker.watch(&model.summary())?;
        tracing::info!(
            "Model ready: l1={}, l2={}, kernel={}, projection width={}",
            cfg.l1_size, cfg.l2_size, cfg.conv_kernel_size, model.projection_width,
        );

        // ── Step 4: Checkpoint directory ──────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.artifact_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 5: Epoch loop ────────────────────────────────────────────────
        let mut console = StdoutConsole;
        let (_, report) = run_training(
            &cfg.loop_config(),
            model,
            &source,
            &mut tracker,
            &mut console,
            &ckpt_manager,
        )?;

        // ── Step 6: Close the run ─────────────────────────────────────────────
        tracker.finish()?;
        if let Some(dir) = tracker.run_dir() {
            tracing::info!("Run artifacts in '{}'", dir.display());
        }

        Ok(report)
    }
}
