use std::{
    io::BufRead,
    thread,
    time::{Duration, Instant},
};

use log::{error, info, warn};
use pixmill_imgproc::padding::BorderMode;

use crate::{
    config::{ExecutionMode, PoolConfig},
    descriptor::{DescriptorLines, JobDescriptor},
    error::{JobError, PipelineError},
    job::{CompletedJob, Job},
    pool::{JobOutcome, JobQueue, WorkerPool},
    sink::ResultSink,
    source::ImageSource,
};

/// Summary of a batch.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Number of jobs written to the sink.
    pub completed: usize,
    /// Every failed job, ordered by id.
    pub failures: Vec<JobError>,
    /// Wall time of the batch.
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether every job was written.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of jobs seen, successful or not.
    pub fn total(&self) -> usize {
        self.completed + self.failures.len()
    }

    fn record<K: ResultSink>(&mut self, outcome: JobOutcome, sink: &mut K) {
        let res = outcome.and_then(|done| write_completed(&done, sink));
        match res {
            Ok(()) => self.completed += 1,
            Err(err) => {
                error!("{err}");
                self.failures.push(err);
            }
        }
    }
}

fn write_completed<K: ResultSink>(done: &CompletedJob, sink: &mut K) -> Result<(), JobError> {
    sink.write(done).map_err(|err| {
        JobError::with_paths(
            done.id,
            &done.descriptor.in_path,
            &done.descriptor.out_path,
            err,
        )
    })
}

fn load_job<S: ImageSource>(
    id: usize,
    descriptor: Result<JobDescriptor, PipelineError>,
    source: &S,
) -> Result<Job, JobError> {
    let descriptor = descriptor.map_err(|err| JobError::without_paths(id, err))?;
    match source.load(&descriptor) {
        Ok((image, layout)) => Ok(Job::new(id, descriptor, image).with_layout(layout)),
        Err(err) => Err(JobError::with_paths(
            id,
            &descriptor.in_path,
            &descriptor.out_path,
            err,
        )),
    }
}

/// Run every job of a descriptor stream and hand the results to `sink`.
///
/// Failing jobs are reported in the returned [`RunReport`] and never stop the batch.
///
/// # Arguments
///
/// * `input` - One JSON job descriptor per line.
/// * `source` - Loads the input images.
/// * `sink` - Receives the filtered images, on the calling thread.
/// * `mode` - Sequential, or parallel over a worker pool.
///
/// # Errors
///
/// Only a pool that cannot be started or a broken queue fails the whole batch.
pub fn run_batch<R, S, K>(
    input: R,
    source: &S,
    sink: &mut K,
    mode: &ExecutionMode,
) -> Result<RunReport, PipelineError>
where
    R: BufRead + Send,
    S: ImageSource + Sync,
    K: ResultSink,
{
    let start = Instant::now();
    let mut report = match mode {
        ExecutionMode::Sequential { border } => run_sequential(input, source, sink, *border),
        ExecutionMode::Parallel(config) => run_parallel(input, source, sink, config)?,
    };
    report.failures.sort_by_key(|err| err.id);
    report.elapsed = start.elapsed();

    info!(
        "{} of {} jobs completed in {:?}",
        report.completed,
        report.total(),
        report.elapsed
    );
    Ok(report)
}

fn run_sequential<R, S, K>(input: R, source: &S, sink: &mut K, border: BorderMode) -> RunReport
where
    R: BufRead,
    S: ImageSource,
    K: ResultSink,
{
    let mut report = RunReport::default();
    for (id, descriptor) in DescriptorLines::new(input) {
        let outcome =
            load_job(id, descriptor, source).and_then(|job| job.process_sequential(border));
        report.record(outcome, sink);
    }
    report
}

fn run_parallel<R, S, K>(
    input: R,
    source: &S,
    sink: &mut K,
    config: &PoolConfig,
) -> Result<RunReport, PipelineError>
where
    R: BufRead + Send,
    S: ImageSource + Sync,
    K: ResultSink,
{
    let (pool, queue) = WorkerPool::spawn(config)?;
    let mut report = RunReport::default();

    thread::scope(|s| -> Result<(), PipelineError> {
        let feeder = thread::Builder::new()
            .name("pixmill-feeder".to_string())
            .spawn_scoped(s, move || feed(input, source, queue))
            .map_err(|e| PipelineError::Internal(format!("failed to spawn feeder: {e}")))?;

        for outcome in pool.results().iter() {
            report.record(outcome, sink);
        }

        feeder
            .join()
            .map_err(|_| PipelineError::Internal("feeder thread panicked".to_string()))?
    })?;

    let stats = pool.join()?;
    info!("worker stats: {stats:?}");
    Ok(report)
}

// Loads every job and hands it to the pool; dropping the queue on return closes it.
fn feed<R, S>(input: R, source: &S, queue: JobQueue) -> Result<(), PipelineError>
where
    R: BufRead,
    S: ImageSource,
{
    for (id, descriptor) in DescriptorLines::new(input) {
        match load_job(id, descriptor, source) {
            Ok(job) => queue.submit(job)?,
            Err(err) => {
                warn!("job {id} could not be loaded");
                queue.reject(err)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmill_image::Rgba16Image;
    use pixmill_io::png::PngLayout;
    use std::collections::HashMap;

    struct FlatSource;

    impl ImageSource for FlatSource {
        fn load(
            &self,
            descriptor: &JobDescriptor,
        ) -> Result<(Rgba16Image, PngLayout), PipelineError> {
            if descriptor.in_path.ends_with("missing.png") {
                return Err(PipelineError::Internal("no such image".to_string()));
            }
            let image = Rgba16Image::from_size_pixel([4, 6].into(), [100, 200, 300, 65535])
                .map_err(pixmill_io::IoError::from)?;
            Ok((image, PngLayout::RGBA16))
        }
    }

    #[derive(Default)]
    struct CollectSink(HashMap<usize, Rgba16Image>);

    impl ResultSink for CollectSink {
        fn write(&mut self, job: &CompletedJob) -> Result<(), PipelineError> {
            self.0.insert(job.id, job.image.clone());
            Ok(())
        }
    }

    const INPUT: &str = concat!(
        r#"{"inPath": "a.png", "outPath": "a_out.png", "effects": ["G"]}"#,
        "\n",
        r#"{"inPath": "missing.png", "outPath": "b_out.png", "effects": ["G"]}"#,
        "\n",
        "{ broken\n",
        r#"{"inPath": "c.png", "outPath": "c_out.png", "effects": []}"#,
        "\n",
    );

    #[test]
    fn test_sequential_batch_isolates_failures() -> Result<(), PipelineError> {
        let mut sink = CollectSink::default();
        let report = run_batch(
            INPUT.as_bytes(),
            &FlatSource,
            &mut sink,
            &ExecutionMode::default(),
        )?;

        assert_eq!(report.completed, 2);
        assert_eq!(
            report.failures.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(!report.is_success());
        assert_eq!(report.total(), 4);
        assert_eq!(sink.0[&0].as_slice()[..4], [200, 200, 200, 65535]);
        Ok(())
    }

    #[test]
    fn test_parallel_batch_isolates_failures() -> Result<(), PipelineError> {
        let mut sink = CollectSink::default();
        let mode = ExecutionMode::Parallel(PoolConfig::new(3));
        let report = run_batch(INPUT.as_bytes(), &FlatSource, &mut sink, &mode)?;

        assert_eq!(report.completed, 2);
        assert_eq!(
            report.failures.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(sink.0.contains_key(&0));
        assert!(sink.0.contains_key(&3));
        Ok(())
    }
}
