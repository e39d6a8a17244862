// ============================================================
// Layer 3 — Metric Records
// ============================================================
// The values the training loop hands to the metric sink:
//
//   StepRecord   — one per optimiser step: (epoch, step, loss)
//   EpochSummary — one per epoch: (epoch, accuracy)
//   ParamReport  — every `watch_every_n_steps` steps: norm, mean
//                  and std of each parameter and of its gradient
//
// EvalTally accumulates correct / total counts across the
// whole evaluation split so accuracy is computed once, after
// the last batch.
//
// Epoch indices are 0-based in records and 1-based on the
// console. Step indices are 1-based everywhere.

use serde::{Deserialize, Serialize};

// ─── StepRecord ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 0-based epoch index
    pub epoch: usize,

    /// 1-based step inside the epoch
    pub step: usize,

    /// Mean cross-entropy of this step's batch
    pub loss: f64,
}

impl StepRecord {
    pub fn new(epoch: usize, step: usize, loss: f64) -> Self {
        Self { epoch, step, loss }
    }

    /// Console progress line, e.g. `Epoch [1/10], Step [100/1875], Loss: 0.1234`
    pub fn progress_line(&self, epochs: usize, total_steps: usize) -> String {
        format!(
            "Epoch [{}/{}], Step [{}/{}], Loss: {:.4}",
            self.epoch + 1, epochs, self.step, total_steps, self.loss,
        )
    }
}

// ─── EpochSummary ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch:    usize,
    /// Percentage in [0, 100]
    pub accuracy: f64,
}

impl EpochSummary {
    pub fn new(epoch: usize, accuracy: f64) -> Self {
        Self { epoch, accuracy }
    }
}

// ─── EvalTally ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalTally {
    /// Examples whose arg-max class matched the label
    pub correct: usize,
    /// Examples seen; equals the eval split size once drained
    pub total:   usize,
}

impl EvalTally {
    /// Add one batch worth of predictions.
    pub fn record(&mut self, correct: usize, batch_size: usize) {
        debug_assert!(correct <= batch_size);
        self.correct += correct;
        self.total   += batch_size;
    }

    /// `100 * correct / total`, or `None` when nothing was evaluated.
    pub fn accuracy(&self) -> Option<f64> {
        accuracy(self.correct, self.total)
    }
}

pub fn accuracy(correct: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(100.0 * correct as f64 / total as f64)
}

/// Console line printed after each eval pass, e.g.
/// `Test Accuracy of the model on the 10000 test images: 98.72 %`.
///
/// Whole percentages keep one decimal (`99.0 %`, not `99 %`).
pub fn accuracy_line(total: usize, accuracy: f64) -> String {
    if accuracy.fract() == 0.0 {
        format!("Test Accuracy of the model on the {total} test images: {accuracy:.1} %")
    } else {
        format!("Test Accuracy of the model on the {total} test images: {accuracy} %")
    }
}

// ─── Parameter reports ────────────────────────────────────────────────────────
/// Summary statistics of one tensor, flattened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensorStats {
    /// L2 norm over every element
    pub norm: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std:  f64,
}

/// One named parameter at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamStats {
    /// Dotted path inside the model, e.g. `block1.conv.weight`
    pub name:    String,
    pub weights: TensorStats,
    /// `None` when the parameter took no part in this step's loss
    pub grads:   Option<TensorStats>,
}

/// Parameter and gradient statistics taken just before an
/// optimiser step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamReport {
    pub epoch:  usize,
    pub step:   usize,
    pub params: Vec<ParamStats>,
}

// ─── Step arithmetic ──────────────────────────────────────────────────────────

/// Steps in one pass over `items` examples; the last batch may be partial.
pub fn steps_per_epoch(items: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    items.div_ceil(batch_size)
}

/// True on every 1-indexed step that is a multiple of `every`.
/// `every == 0` disables progress lines.
pub fn is_progress_step(step: usize, every: usize) -> bool {
    every != 0 && step != 0 && step % every == 0
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_format() {
        let r = StepRecord::new(0, 100, 0.123456);
        assert_eq!(
            r.progress_line(10, 1875),
            "Epoch [1/10], Step [100/1875], Loss: 0.1235"
        );
    }

    #[test]
    fn test_progress_only_on_multiples_of_100() {
        let hits: Vec<usize> = (1..=1875).filter(|&s| is_progress_step(s, 100)).collect();
        assert_eq!(hits.len(), 18);
        assert!(hits.iter().all(|s| s % 100 == 0));
        assert!(!is_progress_step(0, 100));
        assert!(!is_progress_step(99, 100));
        assert!(!is_progress_step(101, 100));
    }

    #[test]
    fn test_progress_disabled() {
        assert!((1..500).all(|s| !is_progress_step(s, 0)));
    }

    #[test]
    fn test_steps_per_epoch_rounds_up() {
        assert_eq!(steps_per_epoch(60_000, 32), 1875);
        assert_eq!(steps_per_epoch(10, 3), 4);
        assert_eq!(steps_per_epoch(9, 3), 3);
        assert_eq!(steps_per_epoch(0, 3), 0);
    }

    #[test]
    fn test_accuracy_bounds() {
        assert_eq!(accuracy(0, 0), None);
        assert_eq!(accuracy(0, 7), Some(0.0));
        assert_eq!(accuracy(7, 7), Some(100.0));
        let partial = accuracy(9_999, 10_000).unwrap();
        assert!(partial > 0.0 && partial < 100.0);
    }

    #[test]
    fn test_accuracy_line_keeps_one_decimal_on_whole_values() {
        assert_eq!(
            accuracy_line(10_000, 99.0),
            "Test Accuracy of the model on the 10000 test images: 99.0 %"
        );
        assert_eq!(
            accuracy_line(10_000, 98.72),
            "Test Accuracy of the model on the 10000 test images: 98.72 %"
        );
        assert!(accuracy_line(6, 100.0).ends_with(": 100.0 %"));
        assert!(accuracy_line(6, 0.0).ends_with(": 0.0 %"));
    }

    #[test]
    fn test_tally_accumulates_every_batch_once() {
        let mut tally = EvalTally::default();
        // 10 examples in batches of 3 → 3 + 3 + 3 + 1
        for (correct, size) in [(3, 3), (1, 3), (2, 3), (0, 1)] {
            tally.record(correct, size);
        }
        assert_eq!(tally.total, 10);
        assert_eq!(tally.correct, 6);
        assert_eq!(tally.accuracy(), Some(60.0));
    }
}
