//! Job lifecycle events emitted by the supervisor.
//!
//! For any one job the sequence is always `Started`, then any number of
//! `Progress`/`Log` events, then exactly one `Finished`. Events from different
//! jobs may interleave arbitrarily.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Which process stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A single lifecycle notification for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The job left the queue and its process is being spawned.
    Started { id: JobId },
    /// A progress percentage (0..=100) parsed from the tool's stdout.
    Progress { id: JobId, percent: u8 },
    /// One line of process output, verbatim.
    Log {
        id: JobId,
        stream: OutputStream,
        line: String,
    },
    /// The process is gone. `ok` is true only for a normal exit with code 0.
    Finished { id: JobId, ok: bool },
}

impl JobEvent {
    /// The job this event belongs to.
    pub fn id(&self) -> JobId {
        match self {
            JobEvent::Started { id }
            | JobEvent::Progress { id, .. }
            | JobEvent::Log { id, .. }
            | JobEvent::Finished { id, .. } => *id,
        }
    }

    /// Whether this is the final event for its job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Finished { .. })
    }
}
