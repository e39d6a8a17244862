// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Wires the other layers together for one training run.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1 and the Console)
//   - Only workflow coordination
//
// Reference: Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;
