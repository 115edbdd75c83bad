use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Error};
use benchmark_rs::benchmarks::Benchmarks;
use benchmark_rs::stopwatch::StopWatch;
use simple_logger::SimpleLogger;

use column_file_sort::generator;
use column_file_sort::pipeline::Pipeline;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Clone)]
pub struct BenchmarkConfig {
    files: BTreeMap<usize, PathBuf>,
    bench_tmp_dir: PathBuf,
    run_capacity: usize,
    concurrent_sort: bool,
    description: String,
}

impl BenchmarkConfig {
    pub fn new(
        files: BTreeMap<usize, PathBuf>,
        bench_tmp_dir: PathBuf,
        run_capacity: usize,
        concurrent_sort: bool,
        description: &str,
    ) -> BenchmarkConfig {
        BenchmarkConfig {
            files,
            bench_tmp_dir,
            run_capacity,
            concurrent_sort,
            description: description.to_string(),
        }
    }

    pub fn get_input_path(&self, key: usize) -> PathBuf {
        self.files.get(&key).unwrap().clone()
    }

    pub fn bench_tmp_dir(&self) -> &PathBuf {
        &self.bench_tmp_dir
    }

    pub fn run_capacity(&self) -> usize {
        self.run_capacity
    }

    pub fn concurrent_sort(&self) -> bool {
        self.concurrent_sort
    }
}

impl Display for BenchmarkConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "run capacity: {}, concurrent sort: {}, description: {}",
            self.run_capacity, self.concurrent_sort, self.description,
        )
    }
}

fn cleanup(bench_results_dir: &PathBuf) -> Result<(), anyhow::Error> {
    if bench_results_dir.exists() {
        fs::remove_dir_all(bench_results_dir.clone())
            .with_context(|| anyhow!("{}", bench_results_dir.to_string_lossy()))?;
    }
    Ok(())
}

fn setup(
    bench_input_dir: &PathBuf,
    bench_results_dir: &PathBuf,
    bench_tmp_dir: &PathBuf,
) -> Result<(), anyhow::Error> {
    cleanup(bench_results_dir)?;

    if !bench_input_dir.exists() {
        fs::create_dir_all(bench_input_dir.clone())?;
    }

    if !bench_results_dir.exists() {
        fs::create_dir_all(bench_results_dir.clone())
            .with_context(|| anyhow!("{}", bench_results_dir.to_string_lossy()))?;
    }

    if !bench_tmp_dir.exists() {
        fs::create_dir_all(bench_tmp_dir.clone())
            .with_context(|| anyhow!("{}", bench_tmp_dir.to_string_lossy()))?;
    }

    Ok(())
}

fn create_input_files(
    line_counts: &[usize],
    base_path: &PathBuf,
) -> Result<BTreeMap<usize, PathBuf>, anyhow::Error> {
    let mut files: BTreeMap<usize, PathBuf> = BTreeMap::new();
    for line_count in line_counts {
        let path = base_path.join(PathBuf::from(line_count.to_string()));
        if !path.exists() {
            generator::generate(&path, *line_count as u64, 0)?;
        }
        files.insert(*line_count, path);
    }
    Ok(files)
}

fn sort(
    stop_watch: &mut StopWatch,
    config: BenchmarkConfig,
    work: usize,
) -> Result<(), anyhow::Error> {
    stop_watch.pause();
    let input_path = config.get_input_path(work);
    log::info!("Start sorting {}", input_path.to_string_lossy());
    stop_watch.resume();
    let mut pipeline = Pipeline::new(input_path.clone());
    pipeline.with_work_dir(config.bench_tmp_dir().clone());
    pipeline.with_run_capacity(config.run_capacity());
    pipeline.with_concurrent_sort(config.concurrent_sort());
    let summary = pipeline.run()?;
    stop_watch.pause();
    log::info!("Finish sorting {}", input_path.to_string_lossy());
    fs::remove_file(summary.output())
        .with_context(|| anyhow!("{}", summary.output().to_string_lossy()))?;
    fs::remove_file(summary.unsorted_sink())
        .with_context(|| anyhow!("{}", summary.unsorted_sink().to_string_lossy()))?;
    Ok(())
}

#[test]
fn column_file_sort_bench() -> Result<(), Error> {
    SimpleLogger::new().init().unwrap();
    log::info!("Started column_file_sort_bench.");

    let bench_input_dir = PathBuf::from("./target/benchmarks/input");
    let bench_results_dir = PathBuf::from("./target/benchmarks/results");
    let bench_tmp_dir = PathBuf::from("./target/benchmarks/results/tmp");
    setup(&bench_input_dir, &bench_results_dir, &bench_tmp_dir)?;

    let line_counts = [10_000, 30_000];
    let files = create_input_files(&line_counts, &bench_input_dir)?;

    let mut benchmarks = Benchmarks::new("column-file-sort");

    benchmarks.add(
        "sequential-large-runs",
        sort,
        BenchmarkConfig::new(
            files.clone(),
            bench_tmp_dir.clone(),
            10_000,
            false,
            "sequential split, capacity 10000",
        ),
        files.keys().cloned().collect(),
        2,
        0,
    )?;

    benchmarks.add(
        "sequential-small-runs",
        sort,
        BenchmarkConfig::new(
            files.clone(),
            bench_tmp_dir.clone(),
            2_000,
            false,
            "sequential split, capacity 2000",
        ),
        files.keys().cloned().collect(),
        2,
        0,
    )?;

    benchmarks.add(
        "concurrent-large-runs",
        sort,
        BenchmarkConfig::new(
            files.clone(),
            bench_tmp_dir.clone(),
            10_000,
            true,
            "concurrent split, capacity 10000",
        ),
        files.keys().cloned().collect(),
        2,
        0,
    )?;

    benchmarks.add(
        "concurrent-small-runs",
        sort,
        BenchmarkConfig::new(
            files.clone(),
            bench_tmp_dir.clone(),
            2_000,
            true,
            "concurrent split, capacity 2000",
        ),
        files.keys().cloned().collect(),
        2,
        0,
    )?;

    benchmarks.run()?;
    benchmarks.save_to_csv(PathBuf::from("./target/benchmarks/"), true, true)?;
    benchmarks.save_to_json(PathBuf::from("./target/benchmarks/"))?;

    log::info!("Finished column_file_sort_bench.");
    Ok(())
}
