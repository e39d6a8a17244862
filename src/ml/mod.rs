// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds or runs the network:
//
//   norm.rs    — per-channel batch normalisation driven by an
//                explicit Train / Eval mode
//
//   model.rs   — the two-block ConvNet and its shape checks
//
//   watch.rs   — parameter / gradient statistics for the tracker
//
//   trainer.rs — the epoch loop: train phase, eval phase,
//                metric emission, final checkpoint
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Channel normalisation with an explicit mode
pub mod norm;

/// Two-block ConvNet classifier
pub mod model;

/// Per-parameter weight and gradient statistics
pub mod watch;

/// Training loop state machine
pub mod trainer;
