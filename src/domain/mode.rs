// ============================================================
// Layer 3 — Operating Mode
// ============================================================
// The classifier behaves differently while training and while
// evaluating: channel normalisation uses the statistics of the
// current batch in Train mode and the running statistics in
// Eval mode.
//
// The mode is passed explicitly to every forward call instead
// of living as a flag inside the model.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Batch statistics, running statistics are updated
    Train,
    /// Running statistics, nothing is updated
    Eval,
}
