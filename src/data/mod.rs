// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From dataset items to tensor batches:
//
//   MnistDataset (train / test)
//       │
//       ▼
//   MnistBatcher      → stacks items into [N,1,28,28] + [N]
//       │
//       ▼
//   DataLoader        → shuffles (train), batches, prefetches
//       │
//       ▼
//   BatchSource       → what the training loop pulls from
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Implements Burn's Batcher trait for MNIST items
pub mod batcher;

/// Train / eval batch source over Burn data loaders
pub mod source;
