//! Command line front end for the column sort pipeline.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use column_file_sort::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "colsort", version)]
#[command(about = "Sort huge delimited text files by a single column")]
struct Cli {
    /// Text file to sort; generated with synthetic data when absent
    file: PathBuf,

    /// Column separator string
    #[arg(long, default_value = ",")]
    column_separator: String,

    /// Zero based index of the column to sort by
    #[arg(long, default_value_t = 0)]
    column_index: usize,

    /// Lines longer than this many characters are truncated
    #[arg(long, default_value_t = 1000)]
    max_line_length: usize,

    /// Lines buffered in memory before being flushed as one sorted run
    #[arg(long, default_value_t = 100_000)]
    run_capacity: usize,

    /// Lines to generate when the source file does not exist
    #[arg(long, default_value_t = 3_000_000)]
    fill_line_count: u64,

    /// Directory for intermediate run files; defaults to the system temp dir
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Sort chunks on a dedicated thread while the scan keeps reading
    #[arg(long)]
    concurrent_sort: bool,

    /// Keep run files after the merge instead of removing them
    #[arg(long)]
    keep_runs: bool,

    /// Report wall clock timings per pipeline phase
    #[arg(long)]
    profile: bool,

    /// Increase verbosity; -v for debug, -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(log_level(&cli))
        .init()
        .unwrap();
    if let Err(error) = run(&cli) {
        log::error!("Sort failed: {:#}", error);
        process::exit(1);
    }
}

fn log_level(cli: &Cli) -> LevelFilter {
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // profiling reports at debug, so --profile alone must not hide them
    if cli.profile && level < LevelFilter::Debug {
        LevelFilter::Debug
    } else {
        level
    }
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    let mut pipeline = Pipeline::new(cli.file.clone());
    pipeline.with_column_separator(cli.column_separator.clone());
    pipeline.with_column_index(cli.column_index);
    pipeline.with_max_line_length(cli.max_line_length);
    pipeline.with_run_capacity(cli.run_capacity);
    pipeline.with_fill_line_count(cli.fill_line_count);
    pipeline.with_concurrent_sort(cli.concurrent_sort);
    pipeline.with_keep_runs(cli.keep_runs);
    pipeline.with_profiling(cli.profile);
    if let Some(work_dir) = &cli.work_dir {
        pipeline.with_work_dir(work_dir.clone());
    }
    let summary = pipeline.run()?;
    log::info!(
        "Sorted {} lines from {} runs into {}, {} unsorted lines in {}",
        summary.sorted_lines(),
        summary.runs(),
        summary.output().to_string_lossy(),
        summary.unsorted_lines(),
        summary.unsorted_sink().to_string_lossy()
    );
    Ok(())
}
