use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};

use crate::{
    config::PoolConfig,
    error::{JobError, PipelineError},
    job::{CompletedJob, Job},
};

/// Result of one job as reported by the pool.
pub type JobOutcome = Result<CompletedJob, JobError>;

/// Counters of one worker thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Jobs filtered successfully.
    pub completed: usize,
    /// Jobs that failed while filtering.
    pub failed: usize,
}

/// Sending half of the pool: feeds jobs to the workers.
///
/// Dropping the queue closes it. The workers drain the remaining jobs and exit.
pub struct JobQueue {
    jobs: Sender<Job>,
    outcomes: Sender<JobOutcome>,
}

impl JobQueue {
    /// Enqueue a job, blocking while every worker is busy and the queue is full.
    pub fn submit(&self, job: Job) -> Result<(), PipelineError> {
        self.jobs
            .send(job)
            .map_err(|_| PipelineError::Disconnected("job"))
    }

    /// Report a job that failed before reaching the workers.
    ///
    /// The error is delivered on the results queue next to the finished jobs.
    pub fn reject(&self, err: JobError) -> Result<(), PipelineError> {
        self.outcomes
            .send(Err(err))
            .map_err(|_| PipelineError::Disconnected("result"))
    }
}

/// Fixed set of named worker threads, each filtering one whole job at a time.
///
/// The chunk tasks of every worker run on one shared rayon pool, so the number of
/// threads touching pixels is bounded by `chunk_threads` whatever the worker count.
pub struct WorkerPool {
    workers: Vec<JoinHandle<WorkerStats>>,
    outcomes: Receiver<JobOutcome>,
}

impl WorkerPool {
    /// Start the workers.
    ///
    /// # Arguments
    ///
    /// * `config` - The pool settings.
    ///
    /// # Returns
    ///
    /// The pool, to drain results from and join, and the queue to submit jobs to.
    pub fn spawn(config: &PoolConfig) -> Result<(Self, JobQueue), PipelineError> {
        config.validate()?;

        let chunk_pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.chunk_threads)
                .thread_name(|i| format!("pixmill-chunk-{i}"))
                .build()?,
        );

        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(config.num_workers);
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<JobOutcome>();

        let mut workers = Vec::with_capacity(config.num_workers);
        for worker_idx in 0..config.num_workers {
            let jobs = job_rx.clone();
            let outcomes = outcome_tx.clone();
            let chunk_pool = Arc::clone(&chunk_pool);
            let chunk_config = config.chunk;

            let handle = thread::Builder::new()
                .name(format!("pixmill-worker-{worker_idx}"))
                .spawn(move || {
                    run_worker(worker_idx, &jobs, &outcomes, &chunk_pool, |job| {
                        job.process_chunked(&chunk_config)
                    })
                })
                .map_err(|e| PipelineError::Internal(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }

        info!(
            "started {} workers, {} chunk threads, {} chunks per job",
            config.num_workers, config.chunk_threads, config.chunk.num_chunks
        );

        let queue = JobQueue {
            jobs: job_tx,
            outcomes: outcome_tx,
        };
        Ok((
            Self {
                workers,
                outcomes: outcome_rx,
            },
            queue,
        ))
    }

    /// The results queue.
    ///
    /// Iterating it blocks while jobs are in flight and ends once the [`JobQueue`] was
    /// dropped and every worker exited.
    pub fn results(&self) -> &Receiver<JobOutcome> {
        &self.outcomes
    }

    /// Wait for every worker to exit.
    ///
    /// The [`JobQueue`] must be dropped first, otherwise the workers keep waiting for
    /// jobs.
    pub fn join(self) -> Result<Vec<WorkerStats>, PipelineError> {
        self.workers
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| PipelineError::Internal("worker thread panicked".to_string()))
            })
            .collect()
    }
}

// Runs `process` on the chunk pool for every job until the job queue is closed.
fn run_worker<F>(
    worker_idx: usize,
    jobs: &Receiver<Job>,
    outcomes: &Sender<JobOutcome>,
    chunk_pool: &rayon::ThreadPool,
    process: F,
) -> WorkerStats
where
    F: Fn(Job) -> JobOutcome + Sync,
{
    let mut stats = WorkerStats::default();

    for job in jobs.iter() {
        let id = job.id;
        debug!("worker {worker_idx} picked job {id}");

        let on_panic = job.error(PipelineError::Internal(format!(
            "worker {worker_idx} panicked while filtering"
        )));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            chunk_pool.install(|| process(job))
        }))
        .unwrap_or(Err(on_panic));

        match &outcome {
            Ok(done) => {
                stats.completed += 1;
                debug!("worker {worker_idx} finished job {id} in {:?}", done.elapsed);
            }
            Err(err) => {
                stats.failed += 1;
                error!("{err}");
            }
        }

        if outcomes.send(outcome).is_err() {
            break;
        }
    }

    stats
}
