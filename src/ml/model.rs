// ============================================================
// Layer 5 — Classifier Model
// ============================================================
// Two feature blocks and a linear projection:
//
//   [N, 1, 28, 28]
//     → block1: conv(1 → l1, k, s=1, p=2) → norm → ReLU → maxpool 2x2
//     → block2: conv(l1 → l2, k, s=1, p=2) → norm → ReLU → maxpool 2x2
//     → flatten → linear(7*7*l2 → num_classes)
//   [N, num_classes]
//
// The projection width depends on the input side, kernel,
// padding, stride and pooling factor. The constructor works the
// width out from those numbers and refuses to build a model
// whose feature map would not match PROJECTION_SIDE.
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};
use thiserror::Error;

use crate::domain::{
    mode::Mode,
    traits::{LayerSummary, ModelSummary},
};
use crate::ml::norm::{ChannelNorm, ChannelNormConfig};

/// Side of the final feature map for a 28x28 input with kernel 5,
/// stride 1, padding 2 and 2x2 pooling in both blocks. Changing any
/// of those means this number changes too.
pub const PROJECTION_SIDE: usize = 7;

pub const NUM_CLASSES: usize = 10;

// ─── Shape errors ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("{name} must be positive")]
    ZeroDimension { name: &'static str },

    #[error("kernel {kernel} does not fit a {side}x{side} input padded by {padding}")]
    KernelTooLarge { kernel: usize, side: usize, padding: usize },

    #[error(
        "feature map {side}x{side}x{channels} flattens to {actual} values \
         but the projection expects {expected}"
    )]
    ProjectionMismatch { side: usize, channels: usize, actual: usize, expected: usize },
}

// ─── Feature block ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct FeatureBlockConfig {
    pub in_channels:  usize,
    pub out_channels: usize,
    pub kernel_size:  usize,
    #[config(default = 1)]
    pub stride:       usize,
    #[config(default = 2)]
    pub padding:      usize,
    #[config(default = 2)]
    pub pool:         usize,
}

#[derive(Module, Debug)]
pub struct FeatureBlock<B: Backend> {
    pub conv:       Conv2d<B>,
    pub norm:       ChannelNorm<B>,
    pub activation: Relu,
    pub pool:       MaxPool2d,
}

impl FeatureBlockConfig {
    /// Side of the square map this block produces from a `side`x`side` input.
    pub fn output_side(&self, side: usize) -> Result<usize, ShapeError> {
        if self.kernel_size == 0 {
            return Err(ShapeError::ZeroDimension { name: "conv_kernel_size" });
        }
        if self.stride == 0 {
            return Err(ShapeError::ZeroDimension { name: "stride" });
        }
        if self.pool == 0 {
            return Err(ShapeError::ZeroDimension { name: "pool" });
        }

        let padded = side + 2 * self.padding;
        if padded < self.kernel_size {
            return Err(ShapeError::KernelTooLarge {
                kernel:  self.kernel_size,
                side,
                padding: self.padding,
            });
        }

        let conv_side = (padded - self.kernel_size) / self.stride + 1;
        // Non-overlapping pooling drops any remainder row/column
        Ok(conv_side / self.pool)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureBlock<B> {
        let conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([self.stride, self.stride])
        .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
        .init(device);

        let pool = MaxPool2dConfig::new([self.pool, self.pool])
            .with_strides([self.pool, self.pool])
            .init();

        FeatureBlock {
            conv,
            norm: ChannelNormConfig::new(self.out_channels).init(device),
            activation: Relu::new(),
            pool,
        }
    }
}

impl<B: Backend> FeatureBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x, mode);
        let x = self.activation.forward(x);
        self.pool.forward(x)
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub layer1_width: usize,
    pub layer2_width: usize,
    #[config(default = 5)]
    pub kernel_size:  usize,
    #[config(default = 10)]
    pub num_classes:  usize,
    #[config(default = 28)]
    pub input_side:   usize,
}

#[derive(Module, Debug)]
pub struct ClassifierModel<B: Backend> {
    pub block1:           FeatureBlock<B>,
    pub block2:           FeatureBlock<B>,
    pub projection:       Linear<B>,
    pub projection_width: usize,
}

impl ClassifierConfig {
    fn block1(&self) -> FeatureBlockConfig {
        FeatureBlockConfig::new(1, self.layer1_width, self.kernel_size)
    }

    fn block2(&self) -> FeatureBlockConfig {
        FeatureBlockConfig::new(self.layer1_width, self.layer2_width, self.kernel_size)
    }

    /// Flattened size of block2's output, checked against
    /// `PROJECTION_SIDE * PROJECTION_SIDE * layer2_width`.
    pub fn projection_width(&self) -> Result<usize, ShapeError> {
        for (name, value) in [
            ("l1_size", self.layer1_width),
            ("l2_size", self.layer2_width),
            ("num_classes", self.num_classes),
            ("input_side", self.input_side),
        ] {
            if value == 0 {
                return Err(ShapeError::ZeroDimension { name });
            }
        }

        let side = self.block1().output_side(self.input_side)?;
        let side = self.block2().output_side(side)?;

        let actual   = side * side * self.layer2_width;
        let expected = PROJECTION_SIDE * PROJECTION_SIDE * self.layer2_width;
        if actual != expected {
            return Err(ShapeError::ProjectionMismatch {
                side,
                channels: self.layer2_width,
                actual,
                expected,
            });
        }

        Ok(actual)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ClassifierModel<B>, ShapeError> {
        let projection_width = self.projection_width()?;

        Ok(ClassifierModel {
            block1:     self.block1().init(device),
            block2:     self.block2().init(device),
            projection: LinearConfig::new(projection_width, self.num_classes).init(device),
            projection_width,
        })
    }
}

impl<B: Backend> ClassifierModel<B> {
    /// images: [batch, 1, side, side] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>, mode: Mode) -> Tensor<B, 2> {
        let x = self.block1.forward(images, mode);
        let x = self.block2.forward(x, mode);
        let x: Tensor<B, 2> = x.flatten(1, 3);
        self.projection.forward(x)
    }

    /// Learnable parameter count, running-state count and layer layout,
    /// for the tracker's `watch`.
    pub fn summary(&self) -> ModelSummary {
        let conv = |block: &FeatureBlock<B>| {
            let [out_channels, in_channels, k, _] = block.conv.weight.dims();
            format!("conv {in_channels}->{out_channels} k{k} + norm + relu + maxpool")
        };
        let [in_width, out_width] = self.projection.weight.dims();

        // num_params() also counts the norm running mean/var
        let num_buffers = [&self.block1, &self.block2]
            .iter()
            .map(|block| 2 * block.norm.gamma.dims()[0])
            .sum::<usize>();

        ModelSummary {
            num_params: self.num_params() - num_buffers,
            num_buffers,
            layers: vec![
                LayerSummary::new("block1", conv(&self.block1)),
                LayerSummary::new("block2", conv(&self.block2)),
                LayerSummary::new("projection", format!("linear {in_width}->{out_width}")),
            ],
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
    fn test_projection_width_default_kernel() {
        for l2 in [1, 4, 16, 128, 300] {
            let cfg = ClassifierConfig::new(32, l2);
            assert_eq!(cfg.projection_width(), Ok(7 * 7 * l2));
        }
    }

    #[test]
    fn test_other_kernels_fail_fast() {
        // k=3 with padding 2: 28 → 30 → 15 → 17 → 8, so 8x8 not 7x7
        let err = ClassifierConfig::new(32, 128)
            .with_kernel_size(3)
            .projection_width()
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::ProjectionMismatch { side: 8, channels: 128, actual: 8192, expected: 6272 }
        );

        let err = ClassifierConfig::new(32, 128)
            .with_kernel_size(7)
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(matches!(err, ShapeError::ProjectionMismatch { .. }));
    }

    #[test]
    fn test_kernel_too_large() {
        // Block1: 32 padded → 2 → pooled 1; block2: 1 + 4 < 31
        let err = ClassifierConfig::new(4, 4).with_kernel_size(31).projection_width().unwrap_err();
        assert_eq!(err, ShapeError::KernelTooLarge { kernel: 31, side: 1, padding: 2 });
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert_eq!(
            ClassifierConfig::new(0, 4).projection_width(),
            Err(ShapeError::ZeroDimension { name: "l1_size" })
        );
        assert_eq!(
            ClassifierConfig::new(4, 4).with_kernel_size(0).projection_width(),
            Err(ShapeError::ZeroDimension { name: "conv_kernel_size" })
        );
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model  = ClassifierConfig::new(2, 3).init::<TestBackend>(&device).unwrap();
        assert_eq!(model.projection_width, 7 * 7 * 3);

        let images = Tensor::<TestBackend, 4>::ones([5, 1, 28, 28], &device);
        assert_eq!(model.forward(images.clone(), Mode::Train).dims(), [5, NUM_CLASSES]);
        assert_eq!(model.forward(images, Mode::Eval).dims(), [5, NUM_CLASSES]);
    }

    #[test]
    fn test_summary_counts_parameters() {
        let model = ClassifierConfig::new(2, 3).init::<TestBackend>(&Default::default()).unwrap();
        let summary = model.summary();

        // conv1 2*1*5*5 + 2, norm1 2+2, conv2 3*2*5*5 + 3, norm2 3+3, fc 147*10 + 10
        let expected = (50 + 2) + 4 + (150 + 3) + 6 + (1470 + 10);
        assert_eq!(summary.num_params, expected);
        // Running mean + var of both norms
        assert_eq!(summary.num_buffers, 2 * 2 + 2 * 3);
        assert_eq!(summary.num_params + summary.num_buffers, model.num_params());
        assert_eq!(summary.layers.len(), 3);
        assert_eq!(summary.layers[2].detail, "linear 147->10");
    }
}
