use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use tempfile::{Builder, NamedTempFile};

use crate::config::Config;
use crate::manifest::{RunFile, RunManifest};
use crate::run_cursor::RunCursor;

const STAGING_PREFIX: &str = "merged-";
const STAGING_SUFFIX: &str = ".staging";

/// Merge the manifest runs into one sorted staging file.
///
/// The staging file lives in the work directory and is renamed to the final
/// output by the caller, so a failed merge never leaves a sorted output
/// behind. Returns the staging path and the number of merged lines.
pub(crate) fn merge_runs(
    manifest: &RunManifest,
    config: &Config,
) -> Result<(PathBuf, usize), anyhow::Error> {
    log::info!("Start merging {} sorted runs", manifest.runs().len());
    let staging = create_staging_file(config)?;
    let (staging_file, staging_path) = staging
        .keep()
        .context("persist merge staging file")?;
    let mut writer = BufWriter::new(staging_file);

    let merged_lines = if manifest.runs().is_empty() {
        // no runs, but the sorted output still has to exist
        0
    } else if manifest.runs().len() == 1 {
        copy_single_run(&manifest.runs()[0], config, &mut writer)?
    } else {
        merge_heap(manifest, config, &mut writer)?
    };

    writer.flush().context("flush merge staging file")?;
    log::info!("Finish merging: {} lines", merged_lines);
    Ok((staging_path, merged_lines))
}

fn create_staging_file(config: &Config) -> Result<NamedTempFile, anyhow::Error> {
    Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(config.work_dir())
        .with_context(|| {
            format!(
                "create staging file in {}",
                config.work_dir().to_string_lossy()
            )
        })
}

/// A single run is already sorted, so it streams straight through.
fn copy_single_run(
    run: &RunFile,
    config: &Config,
    writer: &mut BufWriter<File>,
) -> Result<usize, anyhow::Error> {
    let file = File::open(run.path())
        .with_context(|| format!("open run file: {}", run.path().to_string_lossy()))?;
    let mut reader = BufReader::new(file);
    let mut merged_lines = 0;
    let mut line = String::new();
    while reader
        .read_line(&mut line)
        .with_context(|| format!("read run file: {}", run.path().to_string_lossy()))?
        != 0
    {
        if line.ends_with('\n') {
            line.pop();
        }
        writeln!(writer, "{}", line)?;
        merged_lines += 1;
        line.clear();
    }
    remove_merged_run(run.path(), config)?;
    Ok(merged_lines)
}

fn merge_heap(
    manifest: &RunManifest,
    config: &Config,
    writer: &mut BufWriter<File>,
) -> Result<usize, anyhow::Error> {
    let mut cursors: BinaryHeap<RunCursor> = BinaryHeap::with_capacity(manifest.runs().len());
    for run in manifest.runs() {
        cursors.push(RunCursor::open(
            run.index(),
            run.path().clone(),
            config.column_separator(),
            config.column_index(),
        )?);
    }

    let mut merged_lines = 0;
    while cursors.len() > 1 {
        let mut current_min = cursors.pop().unwrap();
        let unmerged_min = cursors.peek().unwrap();

        let mut current_min_done = false;
        // comparison operators are flipped to work with BinaryHeap (max heap)
        while &current_min >= unmerged_min {
            match current_min.next_line()? {
                Some(keyed) => {
                    writeln!(writer, "{}", keyed.line())?;
                    merged_lines += 1;
                }
                None => {
                    current_min_done = true;
                    log::debug!("Run {} exhausted", current_min.index());
                    remove_merged_run(current_min.path(), config)?;
                    break;
                }
            }
        }
        if !current_min_done {
            cursors.push(current_min)
        }
    }

    if let Some(mut last) = cursors.pop() {
        while let Some(keyed) = last.next_line()? {
            writeln!(writer, "{}", keyed.line())?;
            merged_lines += 1;
        }
        log::debug!("Run {} exhausted", last.index());
        remove_merged_run(last.path(), config)?;
    }
    Ok(merged_lines)
}

fn remove_merged_run(path: &PathBuf, config: &Config) -> Result<(), anyhow::Error> {
    if config.keep_runs() {
        return Ok(());
    }
    std::fs::remove_file(path)
        .with_context(|| format!("remove merged run file: {}", path.to_string_lossy()))
}
