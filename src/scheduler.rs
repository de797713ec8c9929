//! Task execution, sequential or on a bounded worker pool

use crate::output::EpisodeRecord;
use crate::slug::EpisodeTask;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use thiserror::Error;

/// Errors that abort a whole batch
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The run was cancelled; collected results are discarded
    #[error("Operation cancelled by user")]
    Cancelled,

    /// The worker pool could not be started
    #[error("Failed to start worker pool: {0}")]
    PoolStartFailed(#[from] rayon::ThreadPoolBuildError),
}

/// How tasks are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Pool { workers: usize },
}

/// Result of a single task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(EpisodeRecord),
    /// The episode could not be scraped or had no links
    Dropped { season: u32, episode: u32 },
}

impl TaskOutcome {
    pub fn season_episode(&self) -> (u32, u32) {
        match self {
            TaskOutcome::Completed(record) => (record.season, record.episode),
            TaskOutcome::Dropped { season, episode } => (*season, *episode),
        }
    }
}

/// Runs `work` once per task and collects the completed records
///
/// `on_outcome` is called on the calling thread for every outcome, in
/// completion order. Tasks not yet started when `cancel` is raised are
/// skipped and the run ends with [`SchedulerError::Cancelled`].
pub fn run_tasks<W, P>(
    tasks: &[EpisodeTask],
    mode: ExecutionMode,
    cancel: &AtomicBool,
    work: W,
    mut on_outcome: P,
) -> Result<Vec<EpisodeRecord>, SchedulerError>
where
    W: Fn(&EpisodeTask) -> TaskOutcome + Sync,
    P: FnMut(&TaskOutcome),
{
    let mut records = Vec::new();
    let mut collect = |outcome: TaskOutcome| {
        on_outcome(&outcome);
        if let TaskOutcome::Completed(record) = outcome {
            records.push(record);
        }
    };

    match mode {
        ExecutionMode::Sequential => {
            for task in tasks {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                collect(work(task));
            }
        }
        ExecutionMode::Pool { workers } => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers.max(1))
                .thread_name(|index| format!("linkhound-worker-{}", index))
                .build()?;
            let (sender, receiver) = mpsc::channel();
            let work = &work;

            thread::scope(|scope| {
                scope.spawn(move || {
                    pool.install(|| {
                        tasks.par_iter().for_each_with(sender, |sender, task| {
                            if cancel.load(Ordering::SeqCst) {
                                return;
                            }
                            // The receiver only goes away once every sender is gone
                            let _ = sender.send(work(task));
                        });
                    });
                });

                for outcome in receiver {
                    collect(outcome);
                }
            });
        }
    }

    if cancel.load(Ordering::SeqCst) {
        return Err(SchedulerError::Cancelled);
    }

    Ok(records)
}
