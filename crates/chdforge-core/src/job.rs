//! The job record: an immutable task description plus the runtime state that
//! the caller folds in from the supervisor's event stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::events::JobEvent;
use crate::ids::JobId;

/// What the tool should do with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Compress a disc image into a CHD.
    Create,
    /// Check a CHD's integrity.
    Verify,
    /// Print CHD metadata.
    Info,
    /// Expand a CHD back into a disc image.
    Extract,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Create => "create",
            TaskKind::Verify => "verify",
            TaskKind::Info => "info",
            TaskKind::Extract => "extract",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(TaskKind::Create),
            "verify" => Ok(TaskKind::Verify),
            "info" => Ok(TaskKind::Info),
            "extract" => Ok(TaskKind::Extract),
            other => Err(Error::validation(format!("unknown task kind '{other}'"))),
        }
    }
}

/// Disc family, selecting the CD or DVD flavour of create/extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Cd,
    Dvd,
}

/// Lifecycle status as seen by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Done => "Done",
            JobStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A single tool invocation and its observed state.
///
/// The supervisor only reads the description fields (`task`, `media`, paths,
/// `extra_args`). The runtime fields are written by [`Job::apply`] on the
/// caller's side and are never read back by the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Generated when absent from a deserialized job list.
    #[serde(default)]
    pub id: JobId,
    pub task: TaskKind,
    #[serde(default)]
    pub media: MediaKind,
    pub input: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Appended verbatim after the built-in arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub delete_source_after: bool,
    #[serde(default = "default_true")]
    pub preserve_structure: bool,

    // Runtime state
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub log: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Job {
    /// Create a queued job with a fresh identifier.
    pub fn new(task: TaskKind, media: MediaKind, input: impl Into<PathBuf>) -> Self {
        Self {
            id: JobId::new(),
            task,
            media,
            input: input.into(),
            output: None,
            extra_args: Vec::new(),
            delete_source_after: false,
            preserve_structure: true,
            progress: 0,
            status: JobStatus::Queued,
            log: String::new(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn delete_source_after(mut self, yes: bool) -> Self {
        self.delete_source_after = yes;
        self
    }

    pub fn preserve_structure(mut self, yes: bool) -> Self {
        self.preserve_structure = yes;
        self
    }

    /// Whether a successful run leaves a file at `output`.
    pub fn produces_output(&self) -> bool {
        matches!(self.task, TaskKind::Create | TaskKind::Extract)
    }

    /// Check that the description can produce a sensible invocation.
    ///
    /// The supervisor never calls this; a malformed job simply runs and fails.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::validation(format!("job {}: input path is empty", self.id)));
        }
        if self.produces_output() {
            match &self.output {
                Some(out) if !out.as_os_str().is_empty() => {}
                _ => {
                    return Err(Error::validation(format!(
                        "job {}: {} requires an output path",
                        self.id, self.task
                    )))
                }
            }
        }
        Ok(())
    }

    /// Fold one supervisor event into the runtime state.
    ///
    /// Events addressed to other jobs are ignored. Progress never moves
    /// backwards, and a finished event always leaves progress at 100.
    pub fn apply(&mut self, event: &JobEvent) {
        if event.id() != self.id {
            return;
        }

        match event {
            JobEvent::Started { .. } => {
                self.status = JobStatus::Running;
                self.progress = 0;
                self.started_at = Some(Utc::now());
                self.ended_at = None;
            }
            JobEvent::Progress { percent, .. } => {
                self.progress = self.progress.max((*percent).min(100));
            }
            JobEvent::Log { line, .. } => {
                self.log.push_str(line);
                self.log.push('\n');
            }
            JobEvent::Finished { ok, .. } => {
                self.progress = 100;
                self.status = if *ok { JobStatus::Done } else { JobStatus::Failed };
                self.ended_at = Some(Utc::now());
            }
        }
    }
}
