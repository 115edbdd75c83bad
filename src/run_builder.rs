use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool_builder::ThreadPoolBuilder;
use tempfile::Builder;

use crate::config::{Config, RUN_DIR_PREFIX};
use crate::keyed_line::KeyedLine;
use crate::manifest::{run_file_path, RunFile, RunManifest};
use crate::sort_command::SortChunkCommand;

/// Splits the source file into sorted runs bounded by the run capacity.
pub(crate) struct RunBuilder<'a> {
    config: &'a Config,
}

impl<'a> RunBuilder<'a> {
    pub(crate) fn new(config: &'a Config) -> RunBuilder<'a> {
        RunBuilder { config }
    }

    /// Scan the source once, producing sorted run files and the unsorted sink.
    pub(crate) fn split(&self) -> Result<RunManifest, anyhow::Error> {
        log::info!(
            "Start splitting {} into sorted runs",
            self.config.source().to_string_lossy()
        );
        let run_dir = self.create_run_dir()?;
        let (runs, unsorted_lines, truncated_lines) = if self.config.concurrent_sort() {
            self.split_concurrent(&run_dir)?
        } else {
            self.split_sequential(&run_dir)?
        };
        log::info!(
            "Finish splitting: {} runs, {} unsorted lines, {} truncated lines",
            runs.len(),
            unsorted_lines,
            truncated_lines
        );
        Ok(RunManifest::new(
            run_dir,
            runs,
            self.config.unsorted_sink().clone(),
            unsorted_lines,
        ))
    }

    fn create_run_dir(&self) -> Result<PathBuf, anyhow::Error> {
        let run_dir = Builder::new()
            .prefix(RUN_DIR_PREFIX)
            .tempdir_in(self.config.work_dir())
            .with_context(|| {
                format!(
                    "create run directory in {}",
                    self.config.work_dir().to_string_lossy()
                )
            })?;
        Ok(run_dir.into_path())
    }

    fn split_sequential(
        &self,
        run_dir: &Path,
    ) -> Result<(Vec<RunFile>, usize, usize), anyhow::Error> {
        let mut runs: Vec<RunFile> = Vec::new();
        let (unsorted_lines, truncated_lines) = self.scan_source(run_dir, |run, chunk| {
            write_run(&run, chunk)?;
            runs.push(run);
            Ok(())
        })?;
        Ok((runs, unsorted_lines, truncated_lines))
    }

    /// Like `split_sequential`, but chunks are sorted and persisted on a
    /// dedicated worker while the scan keeps reading.
    ///
    /// The queue holds one pending chunk, so at most three chunks are alive
    /// at a time and memory stays bounded.
    fn split_concurrent(
        &self,
        run_dir: &Path,
    ) -> Result<(Vec<RunFile>, usize, usize), anyhow::Error> {
        let completed: Arc<Mutex<Vec<RunFile>>> = Arc::new(Mutex::new(Vec::new()));
        let failure: Arc<Mutex<Option<anyhow::Error>>> = Arc::new(Mutex::new(None));
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut sorting_pool = thread_pool_builder
            .with_name("sorting".to_string())
            .with_tasks(1)
            .with_queue_size(1)
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()
            .unwrap();

        let scanned = self.scan_source(run_dir, |run, chunk| {
            if let Some(error) = failure.lock().unwrap().take() {
                return Err(error.context("sorting worker failed"));
            }
            sorting_pool.submit(Box::new(SortChunkCommand::new(
                run,
                chunk,
                completed.clone(),
                failure.clone(),
            )));
            Ok(())
        });

        log::info!("Shutting down sorting pool");
        sorting_pool.shutdown();
        sorting_pool.join()?;

        let (unsorted_lines, truncated_lines) = scanned?;
        if let Some(error) = failure.lock().unwrap().take() {
            return Err(error.context("sorting worker failed"));
        }
        let mut runs = mem::take(&mut *completed.lock().unwrap());
        runs.sort_by_key(|run| run.index());
        Ok((runs, unsorted_lines, truncated_lines))
    }

    /// Read the source line by line, buffering keyed lines into chunks and
    /// handing each full chunk to `flush` together with its run file.
    fn scan_source<F>(&self, run_dir: &Path, mut flush: F) -> Result<(usize, usize), anyhow::Error>
    where
        F: FnMut(RunFile, Vec<KeyedLine>) -> Result<(), anyhow::Error>,
    {
        let config = self.config;
        let source = File::open(config.source())
            .with_context(|| format!("open source file: {}", config.source().to_string_lossy()))?;
        let mut reader = BufReader::new(source);
        let sink = File::create(config.unsorted_sink()).with_context(|| {
            format!(
                "create unsorted sink: {}",
                config.unsorted_sink().to_string_lossy()
            )
        })?;
        let mut sink_writer = BufWriter::new(sink);

        let mut chunk: Vec<KeyedLine> = Vec::with_capacity(config.run_capacity());
        let mut next_run = 1;
        let mut line_number: u64 = 0;
        let mut unsorted_lines = 0;
        let mut truncated_lines = 0;
        let mut line = String::new();

        while reader
            .read_line(&mut line)
            .with_context(|| format!("read source file: {}", config.source().to_string_lossy()))?
            != 0
        {
            line_number += 1;
            if line.ends_with('\n') {
                line.pop();
            }
            if truncate_chars(&mut line, config.max_line_length()) {
                truncated_lines += 1;
                log::warn!(
                    "Line {} truncated to {} characters",
                    line_number,
                    config.max_line_length()
                );
            }
            match KeyedLine::new(
                mem::take(&mut line),
                config.column_separator(),
                config.column_index(),
            ) {
                Ok(keyed) => {
                    chunk.push(keyed);
                    if chunk.len() == config.run_capacity() {
                        let run =
                            RunFile::new(next_run, run_file_path(run_dir, next_run), chunk.len());
                        next_run += 1;
                        flush(
                            run,
                            mem::replace(&mut chunk, Vec::with_capacity(config.run_capacity())),
                        )?;
                    }
                }
                Err(unsorted) => {
                    unsorted_lines += 1;
                    log::error!(
                        "Line {} has no column {}, diverting to the unsorted sink",
                        line_number,
                        config.column_index()
                    );
                    writeln!(sink_writer, "{}", unsorted).with_context(|| {
                        format!(
                            "write unsorted sink: {}",
                            config.unsorted_sink().to_string_lossy()
                        )
                    })?;
                    // reclaim the allocation for the next read
                    line = unsorted;
                    line.clear();
                }
            }
        }

        if !chunk.is_empty() {
            // the trailing partial chunk becomes the final, smaller run
            let run = RunFile::new(next_run, run_file_path(run_dir, next_run), chunk.len());
            flush(run, chunk)?;
        }
        sink_writer.flush().with_context(|| {
            format!(
                "flush unsorted sink: {}",
                config.unsorted_sink().to_string_lossy()
            )
        })?;
        Ok((unsorted_lines, truncated_lines))
    }
}

/// Sort one chunk ascending by key and persist it as a run file.
///
/// The sort is stable, so lines with equal keys keep their source order
/// within the run.
pub(crate) fn write_run(run: &RunFile, mut chunk: Vec<KeyedLine>) -> Result<(), anyhow::Error> {
    chunk.sort();
    let file = File::create(run.path())
        .with_context(|| format!("create run file: {}", run.path().to_string_lossy()))?;
    let mut writer = BufWriter::new(file);
    for keyed in &chunk {
        writeln!(writer, "{}", keyed.line())
            .with_context(|| format!("write run file: {}", run.path().to_string_lossy()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush run file: {}", run.path().to_string_lossy()))?;
    log::info!(
        "Run {} complete: {} lines, path: {}",
        run.index(),
        run.lines(),
        run.path().to_string_lossy()
    );
    Ok(())
}

/// Cap `line` at `max_chars` characters, returning true when it was cut.
pub(crate) fn truncate_chars(line: &mut String, max_chars: usize) -> bool {
    // a line of n bytes has at most n characters, so short lines skip the walk
    if line.len() <= max_chars {
        return false;
    }
    match line.char_indices().nth(max_chars) {
        Some((offset, _)) => {
            line.truncate(offset);
            true
        }
        None => false,
    }
}
