use argh::FromArgs;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
};

use pixmill::imgproc::padding::BorderMode;
use pixmill::pipeline::{
    config::{ExecutionMode, PoolConfig},
    runner::{run_batch, RunReport},
    sink::PngFileSink,
    source::PngFileSource,
};

#[derive(FromArgs)]
/// Apply chained image filters to the jobs read from stdin, one JSON descriptor per line
struct Args {
    /// run in parallel with this many workers
    #[argh(option, short = 'p')]
    threads: Option<usize>,

    /// number of row chunks per image, defaults to the worker count
    #[argh(option)]
    chunks: Option<usize>,

    /// number of threads running chunk tasks, defaults to the worker count
    #[argh(option)]
    chunk_threads: Option<usize>,

    /// minimum number of overlap rows between chunks
    #[argh(option)]
    overlap: Option<usize>,

    /// how convolutions read past the image border: zero, replicate or reflect101
    #[argh(option, default = "BorderMode::Zero")]
    border: BorderMode,

    /// read the job descriptors from this file instead of stdin
    #[argh(option, short = 'i')]
    input: Option<PathBuf>,

    /// directory relative input and output paths are resolved against
    #[argh(option)]
    base_dir: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> ExecutionMode {
        let Some(threads) = self.threads else {
            return ExecutionMode::Sequential {
                border: self.border,
            };
        };

        let mut config = PoolConfig::new(threads).with_border(self.border);
        if let Some(chunks) = self.chunks {
            config = config.with_chunks(chunks);
        }
        if let Some(chunk_threads) = self.chunk_threads {
            config = config.with_chunk_threads(chunk_threads);
        }
        if let Some(overlap) = self.overlap {
            config = config.with_overlap(overlap);
        }
        ExecutionMode::Parallel(config)
    }
}

fn print_summary(report: &RunReport) {
    println!(
        "{} of {} jobs completed in {:.3?}",
        report.completed,
        report.total(),
        report.elapsed
    );
    for failure in &report.failures {
        println!("  {failure}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();
    let mode = args.mode();
    log::debug!("execution mode: {mode:?}");

    let (source, mut sink) = match &args.base_dir {
        Some(dir) => (
            PngFileSource::with_base_dir(dir),
            PngFileSink::with_base_dir(dir),
        ),
        None => (PngFileSource::new(), PngFileSink::new()),
    };

    let input: Box<dyn BufRead + Send> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let report = run_batch(input, &source, &mut sink, &mode)?;
    print_summary(&report);

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
