//! Shared helpers for supervisor integration tests.
//!
//! [`FakeTool`] writes a small shell script that stands in for chdman. It
//! reads the input path (third argument, after `<subcommand> -i`) and picks a
//! behaviour from its name:
//!
//! | input contains | behaviour |
//! |----------------|-----------|
//! | `hang`  | `exec sleep 30` (only ends when killed) |
//! | `fail`  | writes to stderr, exits 2 |
//! | `slow`  | prints progress around a 0.4 s pause, exits 0 |
//! | other   | prints progress around a 0.05 s pause, exits 0 |

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use chdforge_core::{config::RunnerConfig, Job, JobEvent, JobId, MediaKind, TaskKind};
use chdforge_runner::EventStream;
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
input="$3"
case "$input" in
  *hang*) exec sleep 30 ;;
  *fail*) echo "error: cannot open $input" >&2; exit 2 ;;
  *slow*) delay=0.4 ;;
  *) delay=0.05 ;;
esac
echo "chdman - fake"
echo "Compressing, 25% complete"
sleep $delay
echo "Compressing, 75% complete"
echo "Compression complete"
exit 0
"#;

pub struct FakeTool {
    _dir: TempDir,
    pub path: PathBuf,
}

impl FakeTool {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chdman");
        std::fs::write(&path, SCRIPT).expect("write fake tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake tool");
        Self { _dir: dir, path }
    }

    pub fn config(&self, concurrency: usize) -> RunnerConfig {
        RunnerConfig {
            tool_path: Some(self.path.clone()),
            concurrency,
            ..Default::default()
        }
    }
}

pub fn job(input: &str) -> Job {
    Job::new(TaskKind::Create, MediaKind::Cd, input).with_output(format!("{input}.chd"))
}

/// Wait for the next event, panicking after `secs`.
pub async fn next_event(events: &mut EventStream, secs: u64) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(secs), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Collect events until `n` `Finished` events have been seen.
pub async fn collect_until_finished(events: &mut EventStream, n: usize) -> Vec<JobEvent> {
    let mut out = Vec::new();
    let mut finished = 0;
    while finished < n {
        let ev = next_event(events, 20).await;
        if ev.is_terminal() {
            finished += 1;
        }
        out.push(ev);
    }
    out
}

/// Wait until a `Started` event for `id` arrives, returning everything seen.
pub async fn wait_started(events: &mut EventStream, id: JobId) -> Vec<JobEvent> {
    let mut out = Vec::new();
    loop {
        let ev = next_event(events, 10).await;
        let hit = matches!(ev, JobEvent::Started { id: got } if got == id);
        out.push(ev);
        if hit {
            return out;
        }
    }
}

/// Assert that no event arrives within `millis`.
pub async fn assert_quiet(events: &mut EventStream, millis: u64) {
    if let Ok(Some(ev)) =
        tokio::time::timeout(Duration::from_millis(millis), events.recv()).await
    {
        panic!("unexpected event: {ev:?}");
    }
}

/// Events belonging to `id`, in stream order.
pub fn events_for(events: &[JobEvent], id: JobId) -> Vec<&JobEvent> {
    events.iter().filter(|e| e.id() == id).collect()
}

/// Largest number of jobs between `Started` and `Finished` at any point.
pub fn max_in_flight(events: &[JobEvent]) -> usize {
    let mut current = 0usize;
    let mut max = 0usize;
    for ev in events {
        match ev {
            JobEvent::Started { .. } => {
                current += 1;
                max = max.max(current);
            }
            JobEvent::Finished { .. } => current -= 1,
            _ => {}
        }
    }
    max
}
