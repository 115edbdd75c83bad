//! Record of what the split phase produced, handed to the merge phase.

use std::path::{Path, PathBuf};

use crate::config::{RUN_FILE_EXTENSION, RUN_FILE_PREFIX};

/// One sorted run persisted by the split phase.
#[derive(Clone, Debug)]
pub struct RunFile {
    index: usize,
    path: PathBuf,
    lines: usize,
}

impl RunFile {
    pub fn new(index: usize, path: PathBuf, lines: usize) -> RunFile {
        RunFile { index, path, lines }
    }

    /// Position of the run in source encounter order, starting at one.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Number of lines in the run file.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

/// Everything the merge phase needs to know about the split phase output.
///
/// The manifest names every run explicitly. The merge phase never rescans the
/// run directory, so unrelated files there cannot leak into the output.
#[derive(Clone, Debug)]
pub struct RunManifest {
    run_dir: PathBuf,
    runs: Vec<RunFile>,
    unsorted_path: PathBuf,
    unsorted_lines: usize,
}

impl RunManifest {
    pub fn new(
        run_dir: PathBuf,
        runs: Vec<RunFile>,
        unsorted_path: PathBuf,
        unsorted_lines: usize,
    ) -> RunManifest {
        RunManifest {
            run_dir,
            runs,
            unsorted_path,
            unsorted_lines,
        }
    }

    pub fn run_dir(&self) -> &PathBuf {
        &self.run_dir
    }

    /// Runs ordered by index, lowest first.
    pub fn runs(&self) -> &Vec<RunFile> {
        &self.runs
    }

    pub fn unsorted_path(&self) -> &PathBuf {
        &self.unsorted_path
    }

    /// Number of lines diverted to the unsorted sink.
    pub fn unsorted_lines(&self) -> usize {
        self.unsorted_lines
    }

    /// Total number of lines across all runs.
    pub fn sorted_lines(&self) -> usize {
        self.runs.iter().map(|run| run.lines()).sum()
    }
}

pub(crate) fn run_file_path(run_dir: &Path, index: usize) -> PathBuf {
    run_dir.join(format!("{}{}.{}", RUN_FILE_PREFIX, index, RUN_FILE_EXTENSION))
}
