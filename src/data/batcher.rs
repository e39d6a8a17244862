// ============================================================
// Layer 4 — MNIST Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<MnistItem>
// into one image tensor and one label tensor.
//
//   Input:  N items, each a 28x28 array of pixel values 0..=255
//   Output: images  [N, 1, 28, 28] scaled to [0, 1]
//           targets [N] class indices
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::{dataloader::batcher::Batcher, dataset::vision::MnistItem},
    prelude::*,
};

/// A batch of labelled images ready for the forward pass.
#[derive(Debug, Clone)]
pub struct MnistBatch<B: Backend> {
    /// [batch_size, 1, 28, 28]
    pub images: Tensor<B, 4>,

    /// [batch_size] — digit class per image
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug, Default)]
pub struct MnistBatcher;

impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let images = items
            .iter()
            .map(|item| TensorData::from(item.image).convert::<B::FloatElem>())
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .map(|tensor| tensor.reshape([1, 1, 28, 28]))
            // Same scaling as a plain to-tensor transform: no mean/std shift
            .map(|tensor| tensor / 255)
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    [(item.label as i64).elem::<B::IntElem>()],
                    device,
                )
            })
            .collect();

        MnistBatch {
            images:  Tensor::cat(images, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_scaling() {
        let items = vec![
            MnistItem { image: [[255.0; 28]; 28], label: 3 },
            MnistItem { image: [[0.0; 28]; 28],   label: 7 },
        ];

        let batch: MnistBatch<TestBackend> =
            Batcher::<TestBackend, _, _>::batch(&MnistBatcher, items, &Default::default());

        assert_eq!(batch.images.dims(), [2, 1, 28, 28]);
        assert_eq!(batch.targets.dims(), [2]);

        let max: f32 = batch.images.clone().max().into_scalar().elem();
        let min: f32 = batch.images.min().into_scalar().elem();
        assert!((max - 1.0).abs() < 1e-6);
        assert_eq!(min, 0.0);

        let labels: Vec<i64> = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(labels, vec![3, 7]);
    }
}
