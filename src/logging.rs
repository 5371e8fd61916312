// src/logging.rs
//
// Telemetry sinks for episode rollouts.
// - EpisodeSink: trait used by rollout harnesses
// - NoopSink:    discards all events
// - FileSink:    writes one JSON line per step for offline analysis

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::env::StepInfo;

/// Abstract sink for per-step telemetry.
pub trait EpisodeSink {
    fn log_step(&mut self, episode: usize, tick: usize, reward: f64, info: &StepInfo);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EpisodeSink for NoopSink {
    fn log_step(&mut self, _episode: usize, _tick: usize, _reward: f64, _info: &StepInfo) {
        // intentionally no-op
    }
}

#[derive(Serialize)]
struct StepLine {
    episode: usize,
    tick: usize,
    reward: f64,
    balance: f64,
    equity: f64,
    margin: f64,
    free_margin: f64,
    num_closed: usize,
    errors: Vec<String>,
}

/// JSONL file sink; one flat record per step.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl EpisodeSink for FileSink {
    fn log_step(&mut self, episode: usize, tick: usize, reward: f64, info: &StepInfo) {
        let errors = info
            .order_intents
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| e.to_string()))
            .collect();
        let line = StepLine {
            episode,
            tick,
            reward,
            balance: info.balance,
            equity: info.equity,
            margin: info.margin,
            free_margin: info.free_margin,
            num_closed: info.closed_orders.iter().map(Vec::len).sum(),
            errors,
        };
        // Logging must never take down a rollout, so I/O errors are
        // deliberately ignored.
        if let Ok(json) = serde_json::to_vec(&line) {
            let _ = self.writer.write_all(&json);
            let _ = self.writer.write_all(b"\n");
            let _ = self.writer.flush();
        }
    }
}
