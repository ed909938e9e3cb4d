//! # chdforge-runner
//!
//! Runs chdman jobs with bounded concurrency and turns their output into a
//! stream of [`chdforge_core::JobEvent`]s.
//!
//! This crate provides:
//!
//! - **Supervisor** ([`Supervisor`]) -- actor owning the FIFO queue and the
//!   running set; enqueue, cancel, resize, probe, shut down.
//! - **Argument building** ([`build_args`]) -- job description to chdman
//!   command line.
//! - **Progress parsing** ([`parse_progress`]) -- `NN%` extraction from an
//!   output line.
//! - **Line framing** ([`OutputLineCodec`]) -- `\r`/`\n` aware decoder for
//!   process output.
//! - **Tool lookup** ([`resolve_tool`], [`probe_tool`]) -- find chdman and
//!   check that it answers.

pub mod args;
pub mod lines;
mod process;
pub mod progress;
pub mod supervisor;
pub mod tool;

// ---- Re-exports for convenience ----

pub use args::build_args;
pub use lines::OutputLineCodec;
pub use progress::parse_progress;
pub use supervisor::{EventStream, QueueStats, Supervisor};
pub use tool::{probe_tool, resolve_tool, ToolProbe};
