//! Bounded-concurrency job supervisor.
//!
//! A single actor task owns the pending queue and the running set; every
//! mutation arrives through its mailbox, either as a command from a
//! [`Supervisor`] handle or as an exit notice from a process task. Process
//! tasks never touch the queue. They only send output events and, last of
//! all, their exit notice. Because the actor emits `Finished` only after it
//! receives that notice, a job's output events are always ahead of its
//! `Finished` in the event stream.
//!
//! ```no_run
//! use chdforge_core::{config::RunnerConfig, Job, JobEvent, MediaKind, TaskKind};
//! use chdforge_runner::Supervisor;
//!
//! # async fn example() -> chdforge_core::Result<()> {
//! let (supervisor, mut events) = Supervisor::new(&RunnerConfig::default());
//! let job = Job::new(TaskKind::Create, MediaKind::Cd, "game.cue").with_output("game.chd");
//! supervisor.enqueue(job)?;
//!
//! while let Some(event) = events.recv().await {
//!     if let JobEvent::Finished { id, ok } = event {
//!         println!("{id}: {}", if ok { "done" } else { "failed" });
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chdforge_core::config::{clamp_concurrency, RunnerConfig};
use chdforge_core::{Error, Job, JobEvent, JobId, Result};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::args::build_args;
use crate::process::{run_process, ProcessSpec};
use crate::tool::{probe_tool, resolve_tool, ToolProbe};

/// Receiving end of the supervisor's event stream.
pub type EventStream = mpsc::UnboundedReceiver<JobEvent>;

/// Point-in-time view of the supervisor's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub concurrency: usize,
}

impl QueueStats {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.running == 0
    }
}

enum Command {
    Enqueue(Job),
    Cancel(JobId),
    SetConcurrency(usize),
    SetToolPath(PathBuf),
    ToolPath(oneshot::Sender<PathBuf>),
    Stats(oneshot::Sender<QueueStats>),
    Shutdown(oneshot::Sender<()>),
}

struct Exit {
    id: JobId,
    ok: bool,
}

/// Cloneable handle to the supervisor actor.
///
/// The actor keeps running until [`Supervisor::shutdown`] has completed and
/// every handle is dropped, or until every handle is dropped and the queue
/// has drained.
#[derive(Clone)]
pub struct Supervisor {
    commands: mpsc::UnboundedSender<Command>,
    probe_timeout: Duration,
    /// Set by `shutdown`, shared by every clone of the handle.
    stopped: Arc<AtomicBool>,
}

impl Supervisor {
    /// Start the actor on the current tokio runtime.
    ///
    /// Returns the handle and the single consumer end of the event stream.
    /// Dropping the stream is allowed; events are then discarded.
    pub fn new(config: &RunnerConfig) -> (Self, EventStream) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();

        let concurrency = clamp_concurrency(config.concurrency);
        let actor = SupervisorActor {
            pending: VecDeque::new(),
            running: HashMap::new(),
            concurrency,
            program: resolve_tool(config.tool_path.as_deref()),
            events: event_tx,
            exits: exit_tx,
            stopping: false,
            shutdown_waiters: Vec::new(),
        };

        tracing::debug!(concurrency, program = %actor.program.display(), "supervisor started");
        tokio::spawn(actor.run(cmd_rx, exit_rx));

        let handle = Self {
            commands: cmd_tx,
            probe_timeout: config.probe_timeout(),
            stopped: Arc::new(AtomicBool::new(false)),
        };
        (handle, event_rx)
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.commands.send(cmd).map_err(|_| Error::EngineStopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Append a job to the tail of the queue and start it if a slot is free.
    ///
    /// A job whose id is already pending or running is dropped with a
    /// warning and produces no events. Fails with [`Error::EngineStopped`]
    /// once [`Supervisor::shutdown`] has been called on any clone.
    pub fn enqueue(&self, job: Job) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            tracing::warn!(job_id = %job.id, "enqueue after shutdown refused");
            return Err(Error::EngineStopped);
        }
        self.send(Command::Enqueue(job))
    }

    /// Cancel a job.
    ///
    /// A running job is killed and still ends with `Finished { ok: false }`,
    /// which arrives later. A pending job is removed without any event.
    /// Unknown ids are ignored.
    pub fn cancel(&self, id: JobId) -> Result<()> {
        self.send(Command::Cancel(id))
    }

    /// Change the concurrency limit (clamped to 1..=16).
    ///
    /// Raising it starts queued jobs immediately. Lowering it never kills
    /// running jobs; it only holds back new admissions until enough finish.
    pub fn set_concurrency(&self, n: usize) -> Result<()> {
        self.send(Command::SetConcurrency(n))
    }

    /// Change the chdman executable for jobs started from now on. An empty
    /// path restores the default `PATH` search, which runs here on the
    /// caller's thread rather than inside the actor.
    pub fn set_tool_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path: PathBuf = path.into();
        self.send(Command::SetToolPath(resolve_tool(Some(&path))))
    }

    /// The program new jobs will be started with.
    pub async fn tool_path(&self) -> Result<PathBuf> {
        self.request(Command::ToolPath).await
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        self.request(Command::Stats).await
    }

    /// Check that the configured tool can be invoked. Does not touch the
    /// queue.
    pub async fn probe(&self) -> Result<bool> {
        Ok(self.probe_details().await?.available)
    }

    /// Like [`Supervisor::probe`], also returning the tool's banner line.
    pub async fn probe_details(&self) -> Result<ToolProbe> {
        let program = self.tool_path().await?;
        Ok(probe_tool(&program, self.probe_timeout).await)
    }

    /// Drop every pending job, kill every running one, and wait until all
    /// running jobs have emitted `Finished`. Later enqueues fail with
    /// [`Error::EngineStopped`].
    pub async fn shutdown(&self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.request(Command::Shutdown).await
    }
}

struct RunningEntry {
    job: Job,
    cancel: CancellationToken,
    started: Instant,
}

struct SupervisorActor {
    pending: VecDeque<Job>,
    running: HashMap<JobId, RunningEntry>,
    concurrency: usize,
    program: PathBuf,
    events: mpsc::UnboundedSender<JobEvent>,
    exits: mpsc::UnboundedSender<Exit>,
    stopping: bool,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl SupervisorActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut exits: mpsc::UnboundedReceiver<Exit>,
    ) {
        let mut commands_open = true;

        loop {
            if !commands_open && self.running.is_empty() {
                break;
            }

            tokio::select! {
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => {
                        tracing::debug!("all supervisor handles dropped; draining");
                        commands_open = false;
                    }
                },
                Some(exit) = exits.recv() => self.complete(exit),
            }
        }

        tracing::debug!("supervisor stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Enqueue(job) => self.enqueue(job),
            Command::Cancel(id) => self.cancel(id),
            Command::SetConcurrency(n) => self.set_concurrency(n),
            Command::SetToolPath(program) => {
                self.program = program;
                tracing::info!(program = %self.program.display(), "tool path changed");
            }
            Command::ToolPath(reply) => {
                let _ = reply.send(self.program.clone());
            }
            Command::Stats(reply) => {
                let _ = reply.send(QueueStats {
                    pending: self.pending.len(),
                    running: self.running.len(),
                    concurrency: self.concurrency,
                });
            }
            Command::Shutdown(reply) => self.shutdown(reply),
        }
    }

    fn enqueue(&mut self, job: Job) {
        if self.stopping {
            tracing::warn!(job_id = %job.id, "supervisor is shutting down; job dropped");
            return;
        }
        if self.running.contains_key(&job.id) || self.pending.iter().any(|j| j.id == job.id) {
            tracing::warn!(job_id = %job.id, "duplicate job id; job dropped");
            return;
        }

        tracing::debug!(job_id = %job.id, task = %job.task, input = %job.input.display(), "job queued");
        self.pending.push_back(job);
        self.admit();
    }

    fn cancel(&mut self, id: JobId) {
        if let Some(entry) = self.running.get(&id) {
            tracing::info!(job_id = %id, "cancelling running job");
            entry.cancel.cancel();
            return;
        }

        let before = self.pending.len();
        self.pending.retain(|j| j.id != id);
        if self.pending.len() != before {
            tracing::info!(job_id = %id, "removed queued job");
        } else {
            tracing::debug!(job_id = %id, "cancel for unknown job ignored");
        }
    }

    fn set_concurrency(&mut self, n: usize) {
        let n = clamp_concurrency(n);
        if n == self.concurrency {
            return;
        }
        tracing::info!(from = self.concurrency, to = n, "concurrency changed");
        self.concurrency = n;
        self.admit();
    }

    fn shutdown(&mut self, reply: oneshot::Sender<()>) {
        self.stopping = true;

        let dropped = self.pending.len();
        self.pending.clear();
        for (id, entry) in &self.running {
            tracing::debug!(job_id = %id, "killing for shutdown");
            entry.cancel.cancel();
        }
        tracing::info!(dropped, running = self.running.len(), "supervisor shutting down");

        if self.running.is_empty() {
            let _ = reply.send(());
        } else {
            self.shutdown_waiters.push(reply);
        }
    }

    /// Start queued jobs while there is room under the limit.
    fn admit(&mut self) {
        while !self.stopping && self.running.len() < self.concurrency {
            let Some(job) = self.pending.pop_front() else {
                break;
            };
            self.start(job);
        }
    }

    fn start(&mut self, job: Job) {
        let id = job.id;
        let spec = ProcessSpec {
            id,
            program: self.program.clone(),
            args: build_args(&job),
        };
        let cancel = CancellationToken::new();

        tracing::info!(job_id = %id, task = %job.task, input = %job.input.display(), "starting job");
        let _ = self.events.send(JobEvent::Started { id });

        let events = self.events.clone();
        let exits = self.exits.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            let ok = run_process(spec, events, token).await;
            let _ = exits.send(Exit { id, ok });
        });

        self.running.insert(
            id,
            RunningEntry {
                job,
                cancel,
                started: Instant::now(),
            },
        );
    }

    fn complete(&mut self, exit: Exit) {
        let Some(entry) = self.running.remove(&exit.id) else {
            return;
        };

        tracing::info!(
            job_id = %exit.id,
            task = %entry.job.task,
            ok = exit.ok,
            elapsed_ms = entry.started.elapsed().as_millis() as u64,
            "job finished"
        );
        let _ = self.events.send(JobEvent::Progress {
            id: exit.id,
            percent: 100,
        });
        let _ = self.events.send(JobEvent::Finished {
            id: exit.id,
            ok: exit.ok,
        });

        if self.stopping && self.running.is_empty() {
            for waiter in self.shutdown_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }

        self.admit();
    }
}
