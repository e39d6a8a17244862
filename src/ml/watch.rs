// ============================================================
// Layer 5 — Parameter Watch
// ============================================================
// Walks every learnable parameter of the classifier and reduces
// it, and its gradient from the current backward pass, to a few
// numbers (L2 norm, mean, std).
//
// Taken after backward() and before the optimiser step, so the
// gradient belongs to the weights it is reported next to.
//
// Parameter names:
//   block{1,2}.conv.weight   block{1,2}.conv.bias
//   block{1,2}.norm.gamma    block{1,2}.norm.beta
//   projection.weight        projection.bias
//
// Running statistics are not parameters and are not reported.

use burn::{
    module::Param,
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::records::{ParamStats, TensorStats};
use crate::ml::model::{ClassifierModel, FeatureBlock};

/// Norm, mean and population std of all elements of `tensor`.
pub fn tensor_stats<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> TensorStats {
    let count = tensor.shape().num_elements();
    let flat: Tensor<B, 1> = tensor.reshape([count]);

    let sum_sq = flat.clone().powf_scalar(2.0).sum().into_scalar().elem::<f64>();
    let mean   = flat.mean().into_scalar().elem::<f64>();

    // E[x^2] - E[x]^2, clamped against rounding below zero
    let var = (sum_sq / count as f64 - mean * mean).max(0.0);

    TensorStats { norm: sum_sq.sqrt(), mean, std: var.sqrt() }
}

struct ParamCollector<'a> {
    grads: &'a GradientsParams,
    stats: Vec<ParamStats>,
}

impl ParamCollector<'_> {
    fn add<B: AutodiffBackend, const D: usize>(&mut self, name: String, param: &Param<Tensor<B, D>>) {
        let grads = self
            .grads
            .get::<B::InnerBackend, D>(param.id)
            .map(tensor_stats);

        self.stats.push(ParamStats {
            name,
            weights: tensor_stats(param.val().inner()),
            grads,
        });
    }

    fn add_block<B: AutodiffBackend>(&mut self, prefix: &str, block: &FeatureBlock<B>) {
        self.add(format!("{prefix}.conv.weight"), &block.conv.weight);
        if let Some(bias) = &block.conv.bias {
            self.add(format!("{prefix}.conv.bias"), bias);
        }
        self.add(format!("{prefix}.norm.gamma"), &block.norm.gamma);
        self.add(format!("{prefix}.norm.beta"), &block.norm.beta);
    }
}

/// Statistics for every learnable parameter of `model`, in layer order.
pub fn param_stats<B: AutodiffBackend>(
    model: &ClassifierModel<B>,
    grads: &GradientsParams,
) -> Vec<ParamStats> {
    let mut collector = ParamCollector { grads, stats: Vec::new() };

    collector.add_block("block1", &model.block1);
    collector.add_block("block2", &model.block2);
    collector.add("projection.weight".to_string(), &model.projection.weight);
    if let Some(bias) = &model.projection.bias {
        collector.add("projection.bias".to_string(), bias);
    }

    collector.stats
}
