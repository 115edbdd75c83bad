use std::cmp::{max, min};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use rlimit::{getrlimit, setrlimit, Resource};

use crate::config::{Config, DEFAULT_COLUMN_SEPARATOR};
use crate::generator;
use crate::keyed_line::KeyedLine;
use crate::manifest::RunManifest;
use crate::profiler::ProfileScope;
use crate::run_builder::RunBuilder;
use crate::run_merger;

const RLIMIT_HEADROOM: usize = 256;

/// Sort a delimited text file by a single column
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use column_file_sort::pipeline::Pipeline;
///
/// // sort a tab separated file by its second column
/// fn sort_by_second_column(source: PathBuf) -> Result<(), anyhow::Error> {
///     let mut pipeline = Pipeline::new(source);
///     pipeline.with_column_separator("\t".to_string());
///     pipeline.with_column_index(1);
///     // set the directory for intermediate runs. The default is the system
///     // temp dir - std::env::temp_dir(), however, for large files it is
///     // recommended to provide a dedicated directory on the same file
///     // system as the source.
///     pipeline.with_work_dir(PathBuf::from("./work"));
///     let summary = pipeline.run()?;
///     println!(
///         "sorted {} lines into {}",
///         summary.sorted_lines(),
///         summary.output().to_string_lossy()
///     );
///     Ok(())
/// }
/// ```
pub struct Pipeline {
    source: PathBuf,
    work_dir: PathBuf,
    column_separator: String,
    column_index: usize,
    max_line_length: usize,
    run_capacity: usize,
    fill_line_count: u64,
    concurrent_sort: bool,
    keep_runs: bool,
    profile: bool,
}

impl Pipeline {
    /// Create a default Pipeline definition for `source`.
    ///
    /// A default Pipeline will use the system temporary directory as defined
    /// by std::env::temp_dir() for intermediate runs.
    /// * The default column separator is a comma
    /// * The default sort column is the first column
    /// * lines longer than 1000 characters are truncated
    /// * runs hold at most 100000 lines
    /// * a missing source is generated with 3000000 synthetic lines
    /// * chunks are sorted on the reader thread
    /// * run files are removed as they are merged
    /// * per phase profiling is off
    ///
    /// The merge phase will increase the file descriptor rlimit to
    /// accommodate one open file per run.
    pub fn new(source: PathBuf) -> Pipeline {
        Pipeline {
            source,
            work_dir: std::env::temp_dir(),
            column_separator: DEFAULT_COLUMN_SEPARATOR.to_string(),
            column_index: 0,
            max_line_length: 1000,
            run_capacity: 100_000,
            fill_line_count: 3_000_000,
            concurrent_sort: false,
            keep_runs: false,
            profile: false,
        }
    }

    /// Set directory for intermediate run files. By default use
    /// std::env::temp_dir()
    pub fn with_work_dir(&mut self, work_dir: PathBuf) {
        self.work_dir = work_dir;
    }

    /// Set the column separator. The default is a comma
    pub fn with_column_separator(&mut self, column_separator: String) {
        self.column_separator = column_separator
    }

    /// Set the zero based index of the sort column. The default is 0
    pub fn with_column_index(&mut self, column_index: usize) {
        self.column_index = column_index
    }

    /// Lines longer than `max_line_length` characters are truncated before
    /// sorting. The default is 1000
    pub fn with_max_line_length(&mut self, max_line_length: usize) {
        self.max_line_length = max_line_length;
    }

    /// Set the number of lines buffered in memory before being flushed as
    /// one sorted run. The default is 100000
    pub fn with_run_capacity(&mut self, run_capacity: usize) {
        self.run_capacity = run_capacity;
    }

    /// Set the number of synthetic lines generated when the source file does
    /// not exist. The default is 3000000
    pub fn with_fill_line_count(&mut self, fill_line_count: u64) {
        self.fill_line_count = fill_line_count;
    }

    /// Sort and persist chunks on a dedicated thread while the source scan
    /// keeps reading. The default is false
    pub fn with_concurrent_sort(&mut self, concurrent_sort: bool) {
        self.concurrent_sort = concurrent_sort
    }

    /// Keep run files after the merge instead of removing them. The default
    /// is false
    pub fn with_keep_runs(&mut self, keep_runs: bool) {
        self.keep_runs = keep_runs
    }

    /// Report wall clock timings per pipeline phase at debug level. The
    /// default is false
    pub fn with_profiling(&mut self, profile: bool) {
        self.profile = profile
    }

    /// Run the complete pipeline: split the source into sorted runs, then
    /// merge the runs into the sorted output.
    ///
    /// A missing source file is first generated with synthetic data. The
    /// sorted output and the unsorted sink are created next to the source,
    /// named `sorted_<source>` and `unsorted_<source>`.
    pub fn run(&self) -> Result<PipelineSummary, anyhow::Error> {
        let config = self.create_config()?;
        let _pipeline_scope = ProfileScope::enter("pipeline", config.profile());
        log::info!(
            "Start sorting {} by column {}",
            config.source().to_string_lossy(),
            config.column_index()
        );
        self.ensure_source(&config)?;
        let manifest = self.split_with(&config)?;
        let runs = manifest.runs().len();
        let unsorted_lines = manifest.unsorted_lines();
        let (output, sorted_lines) = self.merge_with(manifest, &config)?;
        log::info!(
            "Finish sorting {} into {}",
            config.source().to_string_lossy(),
            output.to_string_lossy()
        );
        Ok(PipelineSummary {
            output,
            unsorted_sink: config.unsorted_sink().clone(),
            runs,
            sorted_lines,
            unsorted_lines,
        })
    }

    /// Run only the split phase and return the manifest of sorted runs.
    ///
    /// The source file must exist.
    pub fn split(&self) -> Result<RunManifest, anyhow::Error> {
        let config = self.create_config()?;
        self.split_with(&config)
    }

    /// Merge a manifest of sorted runs into the sorted output and return its
    /// path.
    pub fn merge(&self, manifest: RunManifest) -> Result<PathBuf, anyhow::Error> {
        let config = self.create_config()?;
        let (output, _merged_lines) = self.merge_with(manifest, &config)?;
        Ok(output)
    }

    /// Verify that the source file is sorted by the configured column.
    ///
    /// Returns false when a line is out of order or has no sort column.
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let config = self.create_config()?;
        let file = File::open(config.source())
            .with_context(|| format!("open source file: {}", config.source().to_string_lossy()))?;
        let mut reader = BufReader::new(file);
        let mut previous: Option<KeyedLine> = None;
        let mut line = String::new();
        while reader
            .read_line(&mut line)
            .with_context(|| format!("read source file: {}", config.source().to_string_lossy()))?
            != 0
        {
            if line.ends_with('\n') {
                line.pop();
            }
            let current = match KeyedLine::new(
                mem::take(&mut line),
                config.column_separator(),
                config.column_index(),
            ) {
                Ok(keyed) => keyed,
                Err(_) => return Ok(false),
            };
            match previous {
                None => previous = Some(current),
                Some(previous_keyed) => {
                    if previous_keyed <= current {
                        previous = Some(current);
                    } else {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    fn ensure_source(&self, config: &Config) -> Result<(), anyhow::Error> {
        if config.source().exists() {
            return Ok(());
        }
        log::info!(
            "Source {} does not exist, generating synthetic data",
            config.source().to_string_lossy()
        );
        generator::generate(
            config.source(),
            config.fill_line_count(),
            config.column_index(),
        )
    }

    fn split_with(&self, config: &Config) -> Result<RunManifest, anyhow::Error> {
        let _scope = ProfileScope::enter("split", config.profile());
        RunBuilder::new(config).split()
    }

    fn merge_with(
        &self,
        manifest: RunManifest,
        config: &Config,
    ) -> Result<(PathBuf, usize), anyhow::Error> {
        let _scope = ProfileScope::enter("merge", config.profile());
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!(
            "Current rlimit NOFILE, soft: {}, hard: {}",
            current_soft,
            current_hard
        );
        let needed = (manifest.runs().len() + RLIMIT_HEADROOM) as u64;
        let new_soft = min(max(needed, current_soft), current_hard);
        log::info!(
            "Set new rlimit NOFILE, soft: {}, hard: {}",
            new_soft,
            current_hard
        );
        Self::set_rlimits(new_soft, current_hard)?;
        let result = self.finish_merge(manifest, config);
        log::info!(
            "Restore rlimit NOFILE, soft: {}, hard: {}",
            current_soft,
            current_hard
        );
        let restored = Self::set_rlimits(current_soft, current_hard);
        let merged = result?;
        restored?;
        Ok(merged)
    }

    fn finish_merge(
        &self,
        manifest: RunManifest,
        config: &Config,
    ) -> Result<(PathBuf, usize), anyhow::Error> {
        let (staging_path, merged_lines) = run_merger::merge_runs(&manifest, config)?;
        std::fs::rename(staging_path.clone(), config.sorted_output()).with_context(|| {
            anyhow!(
                "Rename {} to {}",
                staging_path.to_string_lossy(),
                config.sorted_output().to_string_lossy()
            )
        })?;
        if config.keep_runs() {
            log::info!(
                "Keeping {} run files in {}",
                manifest.runs().len(),
                manifest.run_dir().to_string_lossy()
            );
        } else {
            std::fs::remove_dir_all(manifest.run_dir()).with_context(|| {
                format!(
                    "remove run directory: {}",
                    manifest.run_dir().to_string_lossy()
                )
            })?;
        }
        Ok((config.sorted_output().clone(), merged_lines))
    }

    fn create_config(&self) -> Result<Config, anyhow::Error> {
        if self.column_separator.is_empty() {
            bail!("column separator must not be empty");
        }
        if self.run_capacity == 0 {
            bail!("run capacity must be at least one line");
        }
        if self.source.file_name().is_none() {
            bail!(
                "source path {} has no file name",
                self.source.to_string_lossy()
            );
        }
        Ok(Config::new(
            self.source.clone(),
            self.work_dir.clone(),
            self.column_separator.clone(),
            self.column_index,
            self.max_line_length,
            self.run_capacity,
            self.fill_line_count,
            self.concurrent_sort,
            self.keep_runs,
            self.profile,
        ))
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }
}

/// What a completed pipeline produced.
#[derive(Clone, Debug)]
pub struct PipelineSummary {
    output: PathBuf,
    unsorted_sink: PathBuf,
    runs: usize,
    sorted_lines: usize,
    unsorted_lines: usize,
}

impl PipelineSummary {
    /// Path of the sorted output file.
    pub fn output(&self) -> &PathBuf {
        &self.output
    }

    /// Path of the unsorted sink holding lines without the sort column.
    pub fn unsorted_sink(&self) -> &PathBuf {
        &self.unsorted_sink
    }

    /// Number of sorted runs the source was split into.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of lines that reached the sorted output.
    pub fn sorted_lines(&self) -> usize {
        self.sorted_lines
    }

    /// Number of lines diverted to the unsorted sink.
    pub fn unsorted_lines(&self) -> usize {
        self.unsorted_lines
    }
}
