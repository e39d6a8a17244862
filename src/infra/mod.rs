// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem or stdout:
//
//   checkpoint.rs — Final model weights via Burn's full
//                   precision MessagePack recorder, plus a JSON copy of the
//                   TrainConfig next to them.
//
//   tracker.rs    — Local experiment tracker (MetricSink):
//                   one directory per run with the config
//                   snapshot, model summary and event stream.
//
//   metrics.rs    — Per-epoch CSV rows written by the tracker.
//
//   console.rs    — Console that prints to stdout.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving
pub mod checkpoint;

/// Run directory tracker implementing MetricSink
pub mod tracker;

/// Epoch metrics CSV logger
pub mod metrics;

/// Stdout implementation of Console
pub mod console;
