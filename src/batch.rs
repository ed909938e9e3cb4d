//! Batch driver: feeds a job list to a supervisor and turns its event stream
//! into a [`Report`].

use anyhow::Result;
use std::collections::HashMap;
use std::time::Instant;

use chdforge_core::config::BatchConfig;
use chdforge_core::{Job, JobEvent, JobId};
use chdforge_runner::{EventStream, Supervisor};
use tokio_util::sync::CancellationToken;

use crate::directory::JobDirectory;
use crate::report::{JobResult, Report};
use crate::sizes::{estimate_input_bytes, output_bytes};

/// Per-job measurements taken when the job starts.
struct StartMark {
    at: Instant,
    input_bytes: u64,
}

/// Run `jobs` to completion and collect a report.
///
/// See [`run_batch_observed`].
pub async fn run_batch(
    supervisor: &Supervisor,
    events: &mut EventStream,
    jobs: Vec<Job>,
    config: &BatchConfig,
    cancel: CancellationToken,
) -> Result<Report> {
    run_batch_observed(supervisor, events, jobs, config, cancel, |_, _| {}).await
}

/// Run `jobs` to completion, calling `observe` with every event and the
/// updated job record.
///
/// Jobs that fail [`Job::validate`] or repeat an id are skipped with a
/// warning. The returned report holds one entry per finished job. When
/// `cancel` fires, the supervisor is shut down: queued jobs are dropped and
/// do not appear in the report, running jobs are killed and reported as
/// failed.
pub async fn run_batch_observed(
    supervisor: &Supervisor,
    events: &mut EventStream,
    jobs: Vec<Job>,
    config: &BatchConfig,
    cancel: CancellationToken,
    mut observe: impl FnMut(&JobEvent, &Job),
) -> Result<Report> {
    let mut directory = JobDirectory::new();
    let mut marks: HashMap<JobId, StartMark> = HashMap::new();
    let mut report = Report::new();

    for job in jobs {
        if let Err(e) = job.validate() {
            tracing::warn!("Skipping job: {}", e);
            continue;
        }
        if !directory.add(job.clone()) {
            tracing::warn!(job_id = %job.id, "Skipping job with duplicate id");
            continue;
        }
        supervisor.enqueue(job)?;
    }

    tracing::info!(jobs = directory.len(), "Batch started");

    while directory.unfinished() > 0 {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!(remaining = directory.unfinished(), "Batch cancelled; shutting down supervisor");
                supervisor.shutdown().await?;
                while let Ok(event) = events.try_recv() {
                    handle_event(&event, &mut directory, &mut marks, &mut report, config, &mut observe).await;
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::warn!("Event stream closed with {} job(s) outstanding", directory.unfinished());
                    break;
                };
                handle_event(&event, &mut directory, &mut marks, &mut report, config, &mut observe).await;
            }
        }
    }

    let summary = report.summary();
    tracing::info!(
        total = summary.total,
        ok = summary.ok,
        failed = summary.failed,
        "Batch finished"
    );
    Ok(report)
}

/// Fold one event into the batch state.
async fn handle_event(
    event: &JobEvent,
    directory: &mut JobDirectory,
    marks: &mut HashMap<JobId, StartMark>,
    report: &mut Report,
    config: &BatchConfig,
    observe: &mut impl FnMut(&JobEvent, &Job),
) {
    let Some(job) = directory.apply(event) else {
        return;
    };
    observe(event, job);

    match *event {
        JobEvent::Started { id } => {
            marks.insert(
                id,
                StartMark {
                    at: Instant::now(),
                    input_bytes: estimate_input_bytes(job),
                },
            );
        }
        JobEvent::Log { ref line, .. } => {
            tracing::debug!(job_id = %job.id, "{}", line);
        }
        JobEvent::Progress { .. } => {}
        JobEvent::Finished { id, ok } => {
            let (elapsed_ms, input_bytes) = marks
                .remove(&id)
                .map(|m| (m.at.elapsed().as_millis() as u64, m.input_bytes))
                .unwrap_or((0, 0));
            // Failed runs can leave a partial output behind; it is counted too.
            let out_bytes = output_bytes(job);
            report.add(JobResult::from_job(job, ok, input_bytes, out_bytes, elapsed_ms));

            if ok && job.delete_source_after && config.delete_sources {
                delete_source(job).await;
            }
        }
    }
}

async fn delete_source(job: &Job) {
    match tokio::fs::remove_file(&job.input).await {
        Ok(()) => tracing::info!(job_id = %job.id, "Deleted source {}", job.input.display()),
        Err(e) => tracing::warn!(
            job_id = %job.id,
            "Failed to delete source {}: {}",
            job.input.display(),
            e
        ),
    }
}
