// ============================================================
// Layer 6 — Metrics CSV Logger
// ============================================================
// Appends one row per epoch to metrics.csv inside the run
// directory, so learning curves can be plotted without parsing
// the event stream.
//
// Columns:
//   - epoch:     0-based epoch index
//   - steps:     optimiser steps taken in that epoch
//   - mean_loss: mean training loss over those steps
//   - accuracy:  eval accuracy in percent
//
// Example:
//   epoch,steps,mean_loss,accuracy
//   0,1875,0.132214,98.720000
//   1,1875,0.041977,98.950000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of the CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRow {
    /// 0-based, same index as the tracker's epoch events
    pub epoch: usize,

    /// Optimiser steps taken in this epoch, ceil(train items / batch size)
    pub steps: usize,

    /// Mean of the per-step cross-entropy losses. NaN when no step ran
    pub mean_loss: f64,

    /// Eval accuracy after this epoch, in percent [0, 100]
    pub accuracy: f64,
}

/// Running loss total for the epoch in progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossAccumulator {
    /// Sum of the step losses seen since the last finish()
    sum:   f64,
    /// Number of steps in that sum
    steps: usize,
}

impl LossAccumulator {
    pub fn add(&mut self, loss: f64) {
        self.sum   += loss;
        self.steps += 1;
    }

    /// Close the epoch: build its row and start over.
    pub fn finish(&mut self, epoch: usize, accuracy: f64) -> EpochRow {
        let mean_loss = if self.steps > 0 { self.sum / self.steps as f64 } else { f64::NAN };
        let row = EpochRow { epoch, steps: self.steps, mean_loss, accuracy };
        *self = Self::default();
        row
    }
}

/// Logs epoch rows to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the CSV with its header row. An existing file is replaced.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");

        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,steps,mean_loss,accuracy")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch row.
    pub fn log(&self, row: &EpochRow) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6}",
            row.epoch, row.steps, row.mean_loss, row.accuracy,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: mean_loss={:.4}, accuracy={:.2}",
            row.epoch, row.mean_loss, row.accuracy,
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_resets_per_epoch() {
        let mut acc = LossAccumulator::default();
        acc.add(1.0);
        acc.add(3.0);
        let row = acc.finish(0, 50.0);
        assert_eq!(row, EpochRow { epoch: 0, steps: 2, mean_loss: 2.0, accuracy: 50.0 });

        let row = acc.finish(1, 60.0);
        assert_eq!(row.steps, 0);
        assert!(row.mean_loss.is_nan());
    }

    #[test]
    fn test_csv_rows() {
        let tmp    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(tmp.path()).unwrap();
        logger.log(&EpochRow { epoch: 0, steps: 4, mean_loss: 0.5, accuracy: 90.0 }).unwrap();
        logger.log(&EpochRow { epoch: 1, steps: 4, mean_loss: 0.25, accuracy: 95.5 }).unwrap();

        let text = fs::read_to_string(tmp.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "epoch,steps,mean_loss,accuracy",
            "0,4,0.500000,90.000000",
            "1,4,0.250000,95.500000",
        ]);
    }
}
