// ============================================================
// Layer 5 — Channel Normalisation
// ============================================================
// Per-channel batch normalisation over [batch, channels, h, w]:
//
//   y = (x - mean) / sqrt(var + eps) * gamma + beta
//
// Mode::Train → mean/var of the current batch, and the running
//               statistics move towards them with `momentum`
// Mode::Eval  → the running statistics, nothing is updated
//
// Burn's own BatchNorm picks its behaviour from the backend
// (autodiff or not). This module takes the mode as an argument
// instead, so callers always say which behaviour they want.
//
// Reference: Ioffe & Szegedy (2015) Batch Normalization

use burn::{
    module::{Param, RunningState},
    nn::Initializer,
    prelude::*,
};

use crate::domain::mode::Mode;

#[derive(Config, Debug)]
pub struct ChannelNormConfig {
    pub num_channels: usize,
    #[config(default = 1e-5)]
    pub epsilon: f64,
    #[config(default = 0.1)]
    pub momentum: f64,
}

#[derive(Module, Debug)]
pub struct ChannelNorm<B: Backend> {
    pub gamma:        Param<Tensor<B, 1>>,
    pub beta:         Param<Tensor<B, 1>>,
    pub running_mean: RunningState<Tensor<B, 1>>,
    pub running_var:  RunningState<Tensor<B, 1>>,
    momentum:         f64,
    epsilon:          f64,
}

impl ChannelNormConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ChannelNorm<B> {
        let gamma = Initializer::Ones.init([self.num_channels], device);
        let beta  = Initializer::Zeros.init([self.num_channels], device);

        ChannelNorm {
            gamma,
            beta,
            running_mean: RunningState::new(Tensor::zeros([self.num_channels], device)),
            running_var:  RunningState::new(Tensor::ones([self.num_channels], device)),
            momentum:     self.momentum,
            epsilon:      self.epsilon,
        }
    }
}

impl<B: Backend> ChannelNorm<B> {
    /// input / output: [batch_size, channels, height, width]
    pub fn forward(&self, input: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        match mode {
            Mode::Train => self.forward_train(input),
            Mode::Eval  => self.forward_eval(input),
        }
    }

    fn forward_eval(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let device   = input.device();
        let channels = input.dims()[1];
        let mean = self.running_mean.value_sync().to_device(&device).reshape([1, channels, 1, 1]);
        let var  = self.running_var.value_sync().to_device(&device).reshape([1, channels, 1, 1]);

        self.normalise(input, mean, var)
    }

    fn forward_train(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = input.device();
        let [batch_size, channels, height, width] = input.dims();
        let flat = batch_size * height * width;

        // Statistics over everything except the channel axis
        let mean = input
            .clone()
            .swap_dims(0, 1)
            .reshape([channels, flat])
            .mean_dim(1)
            .reshape([1, channels, 1, 1]);

        let var = input
            .clone()
            .sub(mean.clone())
            .powf_scalar(2.0)
            .swap_dims(0, 1)
            .reshape([channels, flat])
            .mean_dim(1)
            .reshape([1, channels, 1, 1]);

        let running_mean = self.running_mean.value_sync().to_device(&device);
        let running_var  = self.running_var.value_sync().to_device(&device);

        let running_mean = running_mean.mul_scalar(1.0 - self.momentum).add(
            mean.clone().detach().mul_scalar(self.momentum).reshape([channels]),
        );
        let running_var = running_var.mul_scalar(1.0 - self.momentum).add(
            var.clone().detach().mul_scalar(self.momentum).reshape([channels]),
        );

        self.running_mean.update(running_mean.detach());
        self.running_var.update(running_var.detach());

        self.normalise(input, mean, var)
    }

    fn normalise(&self, x: Tensor<B, 4>, mean: Tensor<B, 4>, var: Tensor<B, 4>) -> Tensor<B, 4> {
        let channels = x.dims()[1];
        let std = var.add_scalar(self.epsilon).sqrt();

        x.sub(mean)
            .div(std)
            .mul(self.gamma.val().reshape([1, channels, 1, 1]))
            .add(self.beta.val().reshape([1, channels, 1, 1]))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn input(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 4> {
        // 2 examples, 2 channels, 1x2 spatial
        Tensor::from_floats(
            [
                [[[1.0, 3.0]], [[10.0, 10.0]]],
                [[[5.0, 7.0]], [[20.0, 20.0]]],
            ],
            device,
        )
    }

    #[test]
    fn test_train_mode_normalises_each_channel() {
        let device = Default::default();
        let norm   = ChannelNormConfig::new(2).init::<TestBackend>(&device);

        let out = norm.forward(input(&device), Mode::Train);
        // Channel 0 values 1,3,5,7 → mean 4; channel means are ~0 after norm
        let channel_means: Vec<f32> = out
            .swap_dims(0, 1)
            .reshape([2, 4])
            .mean_dim(1)
            .into_data()
            .to_vec()
            .unwrap();
        assert!(channel_means.iter().all(|m| m.abs() < 1e-4));
    }

    #[test]
    fn test_train_mode_moves_running_mean() {
        let device = Default::default();
        let norm   = ChannelNormConfig::new(2).init::<TestBackend>(&device);

        let _ = norm.forward(input(&device), Mode::Train);
        let running: Vec<f32> = norm.running_mean.value_sync().into_data().to_vec().unwrap();
        // 0.9 * 0 + 0.1 * batch mean
        assert!((running[0] - 0.4).abs() < 1e-5);
        assert!((running[1] - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_eval_after_train_uses_updated_stats() {
        let device = Default::default();
        let norm   = ChannelNormConfig::new(2).init::<TestBackend>(&device);
        let _ = norm.forward(input(&device), Mode::Train);

        // Channel 0 running stats are now mean 0.4, var 0.9 * 1 + 0.1 * 5
        let out: Vec<f32> = norm.forward(input(&device), Mode::Eval).into_data().to_vec().unwrap();
        let expected = (1.0 - 0.4) / (1.4f32 + 1e-5).sqrt();
        assert!((out[0] - expected).abs() < 1e-4, "got {}", out[0]);
    }

    #[test]
    fn test_eval_mode_leaves_running_stats_alone() {
        let device = Default::default();
        let norm   = ChannelNormConfig::new(2).init::<TestBackend>(&device);

        let before: Vec<f32> = norm.running_mean.value_sync().into_data().to_vec().unwrap();
        let out = norm.forward(input(&device), Mode::Eval);
        let after: Vec<f32> = norm.running_mean.value_sync().into_data().to_vec().unwrap();
        assert_eq!(before, after);

        // Fresh running stats are mean 0 / var 1, so eval is ~identity
        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-3);
    }
}
