// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//
//   mode.rs    — Train / Eval operating mode of the classifier
//   records.rs — StepRecord, EpochSummary and the eval tally
//   traits.rs  — MetricSink and Console, the two outward seams
//                of the training loop
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Train / Eval switch threaded through every forward call
pub mod mode;

// Per-step and per-epoch metric records
pub mod records;

// Outward abstractions implemented by the infra layer
pub mod traits;
