// ============================================================
// Layer 5 — Training Loop
// ============================================================
// The run is a small state machine:
//
//   Idle → Train(0) → Eval(0) → … → Train(E-1) → Eval(E-1) → Done
//
// With epochs = 0 it goes straight from Idle to Done.
//
// Train(e): for every batch, in delivery order
//   forward (Mode::Train) → mean cross-entropy → backward →
//   Adam step → StepRecord to the sink → progress line every
//   `log_every_n_steps` steps. Every `watch_every_n_steps` steps
//   the weights and gradients are summarised (before the Adam
//   step) and sent to the sink as a ParamReport.
//
// Eval(e): model.valid() gives a copy on the inner backend, so
//   no gradients are tracked and nothing can be updated. Forward
//   (Mode::Eval) every eval batch, count arg-max hits, then one
//   EpochSummary and one accuracy line.
//
// Done: write the checkpoint once.
//
// Errors from the source, the model, the sink or the recorder
// end the run immediately.
//
// Reference: Burn Book §5 (Training), Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::PathBuf;

use crate::data::source::BatchSource;
use crate::domain::{
    mode::Mode,
    records::{accuracy_line, is_progress_step, EpochSummary, EvalTally, ParamReport, StepRecord},
    traits::{Console, MetricSink},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::ClassifierModel, watch::param_stats};

/// Loop bounds and optimiser settings taken from the TrainConfig.
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    pub epochs:              usize,
    pub learning_rate:       f64,
    /// Console progress cadence; 0 disables
    pub log_every_n_steps:   usize,
    /// ParamReport cadence; 0 disables
    pub watch_every_n_steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Train { epoch: usize },
    Eval { epoch: usize },
    Done,
}

impl Phase {
    pub fn next(self, epochs: usize) -> Phase {
        match self {
            Phase::Idle if epochs == 0 => Phase::Done,
            Phase::Idle => Phase::Train { epoch: 0 },
            Phase::Train { epoch } => Phase::Eval { epoch },
            Phase::Eval { epoch } if epoch + 1 < epochs => Phase::Train { epoch: epoch + 1 },
            Phase::Eval { .. } | Phase::Done => Phase::Done,
        }
    }
}

/// What a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Optimiser steps over all epochs
    pub steps:      usize,
    /// One summary per finished eval phase, in epoch order
    pub epochs:     Vec<EpochSummary>,
    /// File the final weights were written to
    pub checkpoint: PathBuf,
}

pub fn run_training<B, S>(
    cfg:         &LoopConfig,
    model:       ClassifierModel<B>,
    source:      &S,
    sink:        &mut dyn MetricSink,
    console:     &mut dyn Console,
    checkpoints: &CheckpointManager,
) -> Result<(ClassifierModel<B>, RunReport)>
where
    B: AutodiffBackend,
    S: BatchSource<B>,
{
    // Adam with the usual β1=0.9, β2=0.999; moments live until the run ends
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, ClassifierModel<B>>();

    let mut model  = model;
    let mut steps  = 0usize;
    let mut epochs = Vec::with_capacity(cfg.epochs);
    let mut phase  = Phase::Idle;

    loop {
        phase = phase.next(cfg.epochs);
        match phase {
            Phase::Train { epoch } => {
                tracing::info!("Epoch {}/{}: training", epoch + 1, cfg.epochs);
                let (trained, n) = train_phase(cfg, epoch, model, &mut optim, source, sink, console)?;
                model  = trained;
                steps += n;
            }
            Phase::Eval { epoch } => {
                tracing::info!("Epoch {}/{}: evaluating", epoch + 1, cfg.epochs);
                epochs.push(eval_phase(epoch, &model, source, sink, console)?);
            }
            Phase::Idle | Phase::Done => break,
        }
    }

    let checkpoint = checkpoints.save_model(&model)?;
    tracing::info!("Training complete: {} steps over {} epochs", steps, epochs.len());

    Ok((model, RunReport { steps, epochs, checkpoint }))
}

fn train_phase<B, S, O>(
    cfg:     &LoopConfig,
    epoch:   usize,
    model:   ClassifierModel<B>,
    optim:   &mut O,
    source:  &S,
    sink:    &mut dyn MetricSink,
    console: &mut dyn Console,
) -> Result<(ClassifierModel<B>, usize)>
where
    B: AutodiffBackend,
    S: BatchSource<B>,
    O: Optimizer<ClassifierModel<B>, B>,
{
    let total_steps = source.train_steps();
    let mut model   = model;
    let mut steps   = 0usize;

    for (index, batch) in source.train_batches().enumerate() {
        let step = index + 1;

        let scores = model.forward(batch.images, Mode::Train);
        let loss   = CrossEntropyLossConfig::new()
            .init(&scores.device())
            .forward(scores, batch.targets);
        let loss_value = loss.clone().into_scalar().elem::<f64>();

        // backward() builds a fresh gradient set every step, so there
        // is nothing left over from the previous step to zero
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let watched = is_progress_step(step, cfg.watch_every_n_steps)
            .then(|| ParamReport { epoch, step, params: param_stats(&model, &grads) });
        model = optim.step(cfg.learning_rate, model, grads);

        let record = StepRecord::new(epoch, step, loss_value);
        sink.log_step(&record)?;
        if let Some(report) = watched {
            sink.log_params(&report)?;
        }
        if is_progress_step(step, cfg.log_every_n_steps) {
            console.line(&record.progress_line(cfg.epochs, total_steps));
        }
        steps += 1;
    }

    tracing::debug!("Epoch {} ran {} steps", epoch + 1, steps);
    Ok((model, steps))
}

fn eval_phase<B, S>(
    epoch:   usize,
    model:   &ClassifierModel<B>,
    source:  &S,
    sink:    &mut dyn MetricSink,
    console: &mut dyn Console,
) -> Result<EpochSummary>
where
    B: AutodiffBackend,
    S: BatchSource<B>,
{
    // Inner backend: no autodiff graph, and Mode::Eval leaves the
    // running statistics untouched
    let model_valid = model.valid();
    let mut tally   = EvalTally::default();

    for batch in source.eval_batches() {
        let batch_size = batch.targets.dims()[0];
        let scores     = model_valid.forward(batch.images, Mode::Eval);

        // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
        let predicted = scores.argmax(1).flatten::<1>(0, 1);
        let correct   = predicted
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        tally.record(correct as usize, batch_size);
    }

    let accuracy = tally
        .accuracy()
        .context("Eval split is empty: accuracy is undefined")?;

    let summary = EpochSummary::new(epoch, accuracy);
    sink.log_epoch(&summary)?;
    console.line(&accuracy_line(tally.total, accuracy));

    Ok(summary)
}
