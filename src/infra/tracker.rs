// ============================================================
// Layer 6 — Run Tracker
// ============================================================
// A local experiment tracker implementing MetricSink. Each run
// gets its own directory:
//
//   artifacts/runs/<project>/<run-name>-<timestamp>/
//     run.json       ← project, name, start time
//     config.json    ← configuration snapshot
//     model.json     ← parameter count + layer layout (watch)
//     events.jsonl   ← one JSON object per logged event
//     metrics.csv    ← one row per epoch
//     summary.json   ← written by finish()
//
// Every event line carries a monotonically increasing `_step`
// and a `_timestamp`, followed by its key/value pairs:
//
//   {"_step":0,"_timestamp":"...","epoch":0,"step":1,"loss":2.3}
//   {"_step":1875,"_timestamp":"...","epoch":0,"acc":98.7}
//
// Parameter reports become one event each, with a key per
// statistic:
//
//   {"_step":..,"epoch":0,"step":1000,
//    "parameters/block1.conv.weight/norm":1.93,
//    "gradients/block1.conv.weight/norm":0.04, ...}
//
// init_run must come first; anything else before it fails.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::{
    fs::{self, File, OpenOptions},
    io::{LineWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::{
    records::{EpochSummary, ParamReport, StepRecord, TensorStats},
    traits::{MetricSink, ModelSummary},
};
use crate::infra::metrics::{LossAccumulator, MetricsLogger};

#[derive(Debug, Serialize)]
struct RunInfo<'a> {
    project:    &'a str,
    name:       &'a str,
    run_id:     &'a str,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    events:        u64,
    param_reports: usize,
    epochs:        usize,
    last_loss:     Option<f64>,
    last_accuracy: Option<f64>,
    finished_at:   DateTime<Utc>,
}

/// State of a run after init_run.
struct OpenRun {
    dir:           PathBuf,
    events:        LineWriter<File>,
    metrics:       MetricsLogger,
    losses:        LossAccumulator,
    next_step:     u64,
    param_reports: usize,
    epochs:        usize,
    last_loss:     Option<f64>,
    last_accuracy: Option<f64>,
}

impl OpenRun {
    fn emit(&mut self, fields: Value) -> Result<()> {
        let mut event = json!({
            "_step":      self.next_step,
            "_timestamp": Utc::now().to_rfc3339(),
        });
        if let (Some(event), Value::Object(fields)) = (event.as_object_mut(), fields) {
            event.extend(fields);
        }

        serde_json::to_writer(&mut self.events, &event)?;
        self.events.write_all(b"\n")?;
        self.next_step += 1;
        Ok(())
    }
}

pub struct RunTracker {
    root: PathBuf,
    run:  Option<OpenRun>,
}

impl RunTracker {
    /// Runs are created under `{root}/runs/`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), run: None }
    }

    /// Directory of the open run, if any.
    pub fn run_dir(&self) -> Option<&Path> {
        self.run.as_ref().map(|r| r.dir.as_path())
    }

    fn open_run(&mut self) -> Result<&mut OpenRun> {
        match self.run.as_mut() {
            Some(run) => Ok(run),
            None => bail!("Run not initialised: call init_run before logging"),
        }
    }

    fn write_json(dir: &Path, file: &str, value: &impl Serialize) -> Result<()> {
        let path = dir.join(file);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }
}

/// Lowercase, with anything outside [a-z0-9_-] replaced by '-'.
fn slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c.to_ascii_lowercase() } else { '-' })
        .collect();
    if slug.is_empty() { "run".to_string() } else { slug }
}

fn insert_stats(fields: &mut Map<String, Value>, kind: &str, name: &str, stats: &TensorStats) {
    fields.insert(format!("{kind}/{name}/norm"), json!(stats.norm));
    fields.insert(format!("{kind}/{name}/mean"), json!(stats.mean));
    fields.insert(format!("{kind}/{name}/std"), json!(stats.std));
}

impl MetricSink for RunTracker {
    fn init_run(&mut self, project: &str, run_name: &str) -> Result<()> {
        if self.run.is_some() {
            bail!("Run already initialised");
        }

        let started_at = Utc::now();
        let project_dir = self.root.join("runs").join(slug(project));
        let base = format!("{}-{}", slug(run_name), started_at.format("%Y%m%d-%H%M%S"));

        // Two runs started in the same second get a numeric suffix
        let mut run_id = base.clone();
        let mut n = 1;
        while project_dir.join(&run_id).exists() {
            run_id = format!("{base}-{n}");
            n += 1;
        }

        let dir = project_dir.join(&run_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run dir '{}'", dir.display()))?;

        Self::write_json(&dir, "run.json", &RunInfo { project, name: run_name, run_id: &run_id, started_at })?;

        let events_path = dir.join("events.jsonl");
        let events = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)
            .with_context(|| format!("Cannot open '{}'", events_path.display()))?;

        let metrics = MetricsLogger::create(&dir)?;

        tracing::info!("Tracking run '{}' in '{}'", run_name, dir.display());
        self.run = Some(OpenRun {
            dir,
            events: LineWriter::new(events),
            metrics,
            losses: LossAccumulator::default(),
            next_step: 0,
            param_reports: 0,
            epochs: 0,
            last_loss: None,
            last_accuracy: None,
        });
        Ok(())
    }

    fn record_config(&mut self, config: &Value) -> Result<()> {
        let run = self.open_run()?;
        Self::write_json(&run.dir, "config.json", config)
    }

    fn watch(&mut self, summary: &ModelSummary) -> Result<()> {
        let run = self.open_run()?;
        tracing::info!(
            "Watching model: {} parameters, {} running-state values",
            summary.num_params, summary.num_buffers,
        );
        Self::write_json(&run.dir, "model.json", summary)
    }

    fn log_step(&mut self, record: &StepRecord) -> Result<()> {
        let run = self.open_run()?;
        run.losses.add(record.loss);
        run.last_loss = Some(record.loss);
        run.emit(json!({ "epoch": record.epoch, "step": record.step, "loss": record.loss }))
    }

    fn log_params(&mut self, report: &ParamReport) -> Result<()> {
        let run = self.open_run()?;

        let mut fields = Map::new();
        fields.insert("epoch".into(), json!(report.epoch));
        fields.insert("step".into(), json!(report.step));
        for param in &report.params {
            insert_stats(&mut fields, "parameters", &param.name, &param.weights);
            if let Some(grads) = &param.grads {
                insert_stats(&mut fields, "gradients", &param.name, grads);
            }
        }

        run.param_reports += 1;
        run.emit(Value::Object(fields))
    }

    fn log_epoch(&mut self, summary: &EpochSummary) -> Result<()> {
        let run = self.open_run()?;
        run.emit(json!({ "epoch": summary.epoch, "acc": summary.accuracy }))?;

        let row = run.losses.finish(summary.epoch, summary.accuracy);
        run.metrics.log(&row)?;
        run.epochs += 1;
        run.last_accuracy = Some(summary.accuracy);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let run = self.open_run()?;
        run.events.flush()?;

        let summary = RunSummary {
            events:        run.next_step,
            param_reports: run.param_reports,
            epochs:        run.epochs,
            last_loss:     run.last_loss,
            last_accuracy: run.last_accuracy,
            finished_at:   Utc::now(),
        };
        Self::write_json(&run.dir, "summary.json", &summary)?;
        tracing::info!("Run finished: {} events over {} epochs", summary.events, summary.epochs);
        Ok(())
    }
}
