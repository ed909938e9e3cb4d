//! In-memory directory of the jobs in a batch.
//!
//! The directory is the caller-side mirror of the supervisor: it keeps every
//! job record in insertion order and folds supervisor events into them.

use chdforge_core::{Job, JobEvent, JobId, JobStatus};
use serde::Serialize;

/// Number of jobs in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
}

/// Ordered store of job records keyed by id.
#[derive(Debug, Default)]
pub struct JobDirectory {
    jobs: Vec<Job>,
}

impl JobDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job. Returns false, leaving the directory unchanged, when a job
    /// with the same id is already present.
    pub fn add(&mut self, job: Job) -> bool {
        if self.index_of(job.id).is_some() {
            return false;
        }
        self.jobs.push(job);
        true
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.index_of(id).map(|i| &self.jobs[i])
    }

    /// Apply a supervisor event to the matching job and return the updated
    /// record. Events for unknown ids are ignored.
    pub fn apply(&mut self, event: &JobEvent) -> Option<&Job> {
        let i = self.index_of(event.id())?;
        let job = &mut self.jobs[i];
        job.apply(event);
        Some(&*job)
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        self.index_of(id).map(|i| self.jobs.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs that have not reached `Done` or `Failed`.
    pub fn unfinished(&self) -> usize {
        self.jobs.iter().filter(|j| !j.status.is_terminal()).count()
    }

    pub fn counts(&self) -> StatusCounts {
        self.jobs
            .iter()
            .fold(StatusCounts::default(), |mut acc, job| {
                match job.status {
                    JobStatus::Queued => acc.queued += 1,
                    JobStatus::Running => acc.running += 1,
                    JobStatus::Done => acc.done += 1,
                    JobStatus::Failed => acc.failed += 1,
                }
                acc
            })
    }

    fn index_of(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }
}
