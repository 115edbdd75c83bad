use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_COLUMN_SEPARATOR: &str = ",";
pub(crate) const RUN_DIR_PREFIX: &str = "colsort-runs-";
pub(crate) const RUN_FILE_PREFIX: &str = "run-";
pub(crate) const RUN_FILE_EXTENSION: &str = "dat";
pub(crate) const SORTED_OUTPUT_PREFIX: &str = "sorted_";
pub(crate) const UNSORTED_OUTPUT_PREFIX: &str = "unsorted_";

#[derive(Clone)]
pub(crate) struct Config {
    source: PathBuf,
    work_dir: PathBuf,
    sorted_output: PathBuf,
    unsorted_sink: PathBuf,
    column_separator: String,
    column_index: usize,
    max_line_length: usize,
    run_capacity: usize,
    fill_line_count: u64,
    concurrent_sort: bool,
    keep_runs: bool,
    profile: bool,
}

impl Config {
    pub(crate) fn new(
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
    ) -> Config {
        let sorted_output = prefixed_sibling(&source, SORTED_OUTPUT_PREFIX);
        let unsorted_sink = prefixed_sibling(&source, UNSORTED_OUTPUT_PREFIX);
        Config {
            source,
            work_dir,
            sorted_output,
            unsorted_sink,
            column_separator,
            column_index,
            max_line_length,
            run_capacity,
            fill_line_count,
            concurrent_sort,
            keep_runs,
            profile,
        }
    }

    pub(crate) fn source(&self) -> &PathBuf {
        &self.source
    }

    pub(crate) fn work_dir(&self) -> &PathBuf {
        &self.work_dir
    }

    pub(crate) fn sorted_output(&self) -> &PathBuf {
        &self.sorted_output
    }

    pub(crate) fn unsorted_sink(&self) -> &PathBuf {
        &self.unsorted_sink
    }

    pub(crate) fn column_separator(&self) -> &str {
        &self.column_separator
    }

    pub(crate) fn column_index(&self) -> usize {
        self.column_index
    }

    pub(crate) fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    pub(crate) fn run_capacity(&self) -> usize {
        self.run_capacity
    }

    pub(crate) fn fill_line_count(&self) -> u64 {
        self.fill_line_count
    }

    pub(crate) fn concurrent_sort(&self) -> bool {
        self.concurrent_sort
    }

    pub(crate) fn keep_runs(&self) -> bool {
        self.keep_runs
    }

    pub(crate) fn profile(&self) -> bool {
        self.profile
    }
}

fn prefixed_sibling(source: &Path, prefix: &str) -> PathBuf {
    let mut name = OsString::from(prefix);
    name.push(source.file_name().unwrap_or_default());
    source.with_file_name(name)
}
