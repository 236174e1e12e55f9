//! Dispatching partition jobs to workers.
//!
//! A [`Scheduler`] receives the full list of jobs for one recording and
//! blocks until all of them have finished, successfully or not. Jobs are
//! independent; the orchestrator never relies on the scheduler's own error
//! reporting and instead checks each job's output file.
use rayon::prelude::*;

use crate::error::{CleanError, Result};
use crate::job::{JobRunner, PartitionJob};

/// What happened to one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub index: usize,
    pub result: Result<()>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub trait Scheduler: Send + Sync {
    /// Run every job and wait for completion. `Err` means the scheduling
    /// layer itself failed; individual job failures are in the outcomes.
    fn dispatch(
        &self,
        jobs: &[PartitionJob],
        runner: &dyn JobRunner,
        queue: &str,
    ) -> Result<Vec<JobOutcome>>;
}

/// Runs jobs on a dedicated rayon pool sized by `workers` (0 = rayon default).
#[derive(Debug, Clone, Default)]
pub struct ThreadPoolScheduler {
    pub workers: usize,
}

impl ThreadPoolScheduler {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn dispatch(
        &self,
        jobs: &[PartitionJob],
        runner: &dyn JobRunner,
        queue: &str,
    ) -> Result<Vec<JobOutcome>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("lcf-worker-{i}"))
            .build()
            .map_err(|e| CleanError::Orchestration(e.to_string()))?;

        log::info!(
            "dispatching {} partition jobs on queue '{queue}' ({} threads)",
            jobs.len(),
            pool.current_num_threads()
        );

        let outcomes = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let result = runner.run(job);
                    if let Err(e) = &result {
                        log::warn!("partition {} of {} failed: {e}", job.index, job.basename);
                    }
                    JobOutcome { index: job.index, result }
                })
                .collect()
        });
        Ok(outcomes)
    }
}
