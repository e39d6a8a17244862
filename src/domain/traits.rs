// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop talks to the outside world through two
// traits, so the loop itself never touches files or stdout:
//
//   MetricSink — experiment tracker: run setup, config
//                snapshot, model summary, scalar events,
//                periodic parameter/gradient statistics
//   Console    — human-readable progress lines
//
// Implementations:
//   - infra::tracker::RunTracker  → local run directory
//   - infra::console::StdoutConsole → println!
//   - test recorders in ml::trainer

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::records::{EpochSummary, ParamReport, StepRecord};

// ─── ModelSummary ─────────────────────────────────────────────────────────────
/// What the tracker gets from `watch`: parameter counts and one
/// line per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Learnable values only (conv, norm scale/shift, projection)
    pub num_params:  usize,

    /// Running statistics of the norm layers; saved in the
    /// checkpoint but never touched by the optimiser
    pub num_buffers: usize,

    pub layers:      Vec<LayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub name:   String,
    pub detail: String,
}

impl LayerSummary {
    pub fn new(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), detail: detail.into() }
    }
}

// ─── MetricSink ───────────────────────────────────────────────────────────────
/// An experiment tracker.
///
/// `init_run` must be called exactly once before any other method;
/// implementations reject calls made out of order.
pub trait MetricSink {
    /// Open a named run inside a named project.
    fn init_run(&mut self, project: &str, run_name: &str) -> Result<()>;

    /// Snapshot the run configuration so runs can be compared later.
    fn record_config(&mut self, config: &serde_json::Value) -> Result<()>;

    /// Register the model for introspection. Best effort.
    fn watch(&mut self, summary: &ModelSummary) -> Result<()>;

    /// One event per optimiser step.
    fn log_step(&mut self, record: &StepRecord) -> Result<()>;

    /// Parameter and gradient statistics, every `watch_every_n_steps`
    /// optimiser steps.
    fn log_params(&mut self, report: &ParamReport) -> Result<()>;

    /// One event per epoch, after the eval split is drained.
    fn log_epoch(&mut self, summary: &EpochSummary) -> Result<()>;

    /// Close the run. Default: nothing to flush.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ─── Console ──────────────────────────────────────────────────────────────────
/// Receives the few human-readable lines printed during a run.
pub trait Console {
    fn line(&mut self, text: &str);
}
