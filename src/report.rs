//! Aggregated outcome of a batch.
//!
//! One [`JobResult`] is recorded per finished job. The report keeps them in
//! completion order and derives totals from them on demand. Rendering is
//! limited to JSON via serde.

use serde::Serialize;
use std::path::PathBuf;

use chdforge_core::{Job, JobId, JobStatus};

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub id: JobId,
    pub ok: bool,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed_ms: u64,
    pub input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub status: JobStatus,
    pub log: String,
}

impl JobResult {
    /// Build a result from a finished job record and the measured sizes.
    pub fn from_job(job: &Job, ok: bool, input_bytes: u64, output_bytes: u64, elapsed_ms: u64) -> Self {
        Self {
            id: job.id,
            ok,
            input_bytes,
            output_bytes,
            elapsed_ms,
            input: job.input.clone(),
            output: job.output.clone(),
            status: job.status,
            log: job.log.clone(),
        }
    }
}

/// Totals derived from every recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub saved_pct: f64,
}

/// Collection of job results for one batch.
#[derive(Debug, Default)]
pub struct Report {
    items: Vec<JobResult>,
}

/// JSON shape written by [`Report::to_json`].
#[derive(Serialize)]
struct ReportJson<'a> {
    summary: ReportSummary,
    items: &'a [JobResult],
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn add(&mut self, result: JobResult) {
        self.items.push(result);
    }

    pub fn items(&self) -> &[JobResult] {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn ok(&self) -> usize {
        self.items.iter().filter(|i| i.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.ok()
    }

    pub fn input_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.input_bytes).sum()
    }

    pub fn output_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.output_bytes).sum()
    }

    /// Share of input bytes saved by compression, in percent.
    ///
    /// Zero when nothing was read or when the outputs outgrew the inputs.
    pub fn saved_pct(&self) -> f64 {
        let input = self.input_bytes();
        if input == 0 {
            return 0.0;
        }
        let saved = input.saturating_sub(self.output_bytes());
        100.0 * saved as f64 / input as f64
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.total(),
            ok: self.ok(),
            failed: self.failed(),
            input_bytes: self.input_bytes(),
            output_bytes: self.output_bytes(),
            saved_pct: self.saved_pct(),
        }
    }

    /// Serialize the summary and every item as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ReportJson {
            summary: self.summary(),
            items: &self.items,
        })
    }
}
