// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Writes the end-of-run artifacts with Burn's named MessagePack
// recorder at full precision, so the saved weights are exactly
// the trained ones.
//
// What gets saved:
//   1. Model weights (model.mpk) — every learnable parameter and
//      the normalisation running statistics
//   2. train_config.json         — the configuration the run used
//
// Both files live directly in the artifact directory under fixed
// names, so a later run overwrites them. This program never reads
// them back.
//
// File layout:
//   artifacts/
//     model.mpk          ← final weights
//     train_config.json  ← hyperparameters
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FileRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::ClassifierModel;

/// File stem of the final checkpoint; the recorder adds the extension.
pub const CHECKPOINT_NAME: &str = "model";

pub const CONFIG_FILE: &str = "train_config.json";

/// f32 weights as named MessagePack (`.mpk`).
pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Manages the checkpoint files inside one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory
    /// (and its parents) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save the model weights and return the path actually written.
    ///
    /// CheckpointRecorder:
    ///   1. Takes model.into_record() — all parameters and running state
    ///   2. Serialises to named MessagePack at full precision
    ///   3. Writes to {dir}/model.mpk
    pub fn save_model<B: Backend>(&self, model: &ClassifierModel<B>) -> Result<PathBuf> {
        // Path without extension, the recorder adds it
        let path = self.dir.join(CHECKPOINT_NAME);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let written = path.with_extension(<CheckpointRecorder as FileRecorder<B>>::file_extension());
        tracing::info!("Saved checkpoint: '{}'", written.display());
        Ok(written)
    }

    /// Save the training configuration to JSON next to the weights.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<PathBuf> {
        let path = self.dir.join(CONFIG_FILE);

        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ClassifierConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_save_model_writes_one_file() {
        let tmp   = tempfile::tempdir().unwrap();
        let dir   = tmp.path().join("nested/dir");
        let mgr   = CheckpointManager::new(&dir).unwrap();
        let model = ClassifierConfig::new(2, 2).init::<NdArray>(&Default::default()).unwrap();

        let path = mgr.save_model(&model).unwrap();

        assert!(path.exists());
        assert_eq!(path.file_stem().unwrap(), CHECKPOINT_NAME);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[test]
    fn test_saved_weights_reload_exactly() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mgr    = CheckpointManager::new(tmp.path()).unwrap();
        let config = ClassifierConfig::new(2, 2);
        let model  = config.init::<NdArray>(&device).unwrap();

        let path   = mgr.save_model(&model).unwrap();
        let record = CheckpointRecorder::new().load(path, &device).unwrap();
        let loaded = config.init::<NdArray>(&device).unwrap().load_record(record);

        let weights = |m: &ClassifierModel<NdArray>| {
            let mut all = m.projection.weight.val().into_data().to_vec::<f32>().unwrap();
            all.extend(m.block1.conv.weight.val().into_data().to_vec::<f32>().unwrap());
            all
        };
        assert_eq!(weights(&model), weights(&loaded));
    }

    #[test]
    fn test_save_config_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(tmp.path()).unwrap();
        let cfg = TrainConfig { epochs: 3, ..TrainConfig::default() };

        let path   = mgr.save_config(&cfg).unwrap();
        let loaded: TrainConfig = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.model_name, cfg.model_name);
    }
}
