//! chdforge-core: the job record, typed IDs, lifecycle events, errors, and
//! configuration shared by the runner and the CLI.
//!
//! This crate has no async or process dependencies; everything here is a
//! plain data type that the supervisor produces or the caller consumes.
//!
//! ```
//! use chdforge_core::{Job, JobEvent, JobStatus, MediaKind, TaskKind};
//!
//! let mut job = Job::new(TaskKind::Create, MediaKind::Cd, "game.cue").with_output("game.chd");
//! let id = job.id;
//!
//! job.apply(&JobEvent::Started { id });
//! job.apply(&JobEvent::Finished { id, ok: true });
//! assert_eq!(job.status, JobStatus::Done);
//! assert_eq!(job.progress, 100);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod job;

pub use error::{Error, Result};
pub use events::{JobEvent, OutputStream};
pub use ids::JobId;
pub use job::{Job, JobStatus, MediaKind, TaskKind};
