//! One running chdman process: spawn, stream its output as events, and
//! report how it ended.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chdforge_core::{JobEvent, JobId, OutputStream};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::lines::OutputLineCodec;
use crate::progress::parse_progress;

/// How long to keep draining output after the process has exited. Grandchildren
/// that inherited the pipes can otherwise hold them open indefinitely.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to run one job's process.
pub(crate) struct ProcessSpec {
    pub id: JobId,
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Run the process to completion and return whether it succeeded.
///
/// Output lines are sent to `events` as they arrive. Success means the
/// process exited normally with status 0 and was not killed through
/// `cancel`. A spawn failure is reported as `false`, like any other failure.
pub(crate) async fn run_process(
    spec: ProcessSpec,
    events: mpsc::UnboundedSender<JobEvent>,
    cancel: CancellationToken,
) -> bool {
    let ProcessSpec { id, program, args } = spec;

    tracing::debug!(job_id = %id, "exec: {} {}", program.display(), args.join(" "));

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(job_id = %id, "failed to spawn {}: {e}", program.display());
            return false;
        }
    };

    let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(pump_lines(
            id,
            stdout,
            OutputStream::Stdout,
            events.clone(),
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(pump_lines(
            id,
            stderr,
            OutputStream::Stderr,
            events.clone(),
        )));
    }

    let mut killed = false;
    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            killed = true;
            tracing::info!(job_id = %id, "killing process");
            if let Err(e) = child.start_kill() {
                tracing::warn!(job_id = %id, "kill failed: {e}");
            }
            child.wait().await
        }
    };

    for mut reader in readers {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
            tracing::debug!(job_id = %id, "output still open {DRAIN_TIMEOUT:?} after exit; detaching");
            reader.abort();
        }
    }

    match status {
        Ok(status) => {
            tracing::debug!(job_id = %id, killed, "process exited with {status}");
            !killed && status.success()
        }
        Err(e) => {
            tracing::warn!(job_id = %id, "I/O error waiting for process: {e}");
            false
        }
    }
}

/// Forward every line of `reader` as a log event. Stdout lines are also
/// scanned for a percentage; values lower than the last one sent are dropped
/// so progress never goes backwards.
async fn pump_lines<R>(
    id: JobId,
    reader: R,
    stream: OutputStream,
    events: mpsc::UnboundedSender<JobEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, OutputLineCodec::new());
    let mut last_percent: Option<u8> = None;

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(job_id = %id, ?stream, "read error: {e}");
                break;
            }
        };

        let percent = match stream {
            OutputStream::Stdout => parse_progress(&line),
            OutputStream::Stderr => None,
        };

        let _ = events.send(JobEvent::Log { id, stream, line });

        if let Some(p) = percent {
            if last_percent.map_or(true, |last| p >= last) {
                last_percent = Some(p);
                let _ = events.send(JobEvent::Progress { id, percent: p });
            }
        }
    }
}
