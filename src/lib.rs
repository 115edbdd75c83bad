//! This crate sorts huge delimited text files by a single column with bounded
//! memory. For example CSV or TSV.
//!
//! A data file composed of delimited lines, that is lines split into columns
//! by a separator string, is sorted lexicographically by one column using an
//! external merge sort: the source is scanned once and split into sorted run
//! files of a configured capacity, and the runs are then merged in a single
//! pass into the sorted output. Lines that do not have the sort column are
//! diverted to an unsorted sink next to the output, so no input line is ever
//! dropped. Memory usage is bounded by the run capacity rather than the size
//! of the source file.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use column_file_sort::pipeline::Pipeline;
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! // sort a CSV file by its first column
//! fn sort_events(source: PathBuf, work_dir: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut pipeline = Pipeline::new(source);
//!
//!     // raise the run capacity for fewer, larger runs. Every
//!     // `run_capacity` lines are sorted in memory and flushed as one run,
//!     // so this bounds memory usage.
//!     pipeline.with_run_capacity(1_000_000);
//!
//!     // set the directory for intermediate runs. The default is the system
//!     // temp dir - std::env::temp_dir(), however, for large files it is
//!     // recommended to provide a dedicated directory on the same file
//!     // system as the source.
//!     pipeline.with_work_dir(work_dir);
//!
//!     let summary = pipeline.run()?;
//!     println!(
//!         "{} sorted lines, {} unsorted lines",
//!         summary.sorted_lines(),
//!         summary.unsorted_lines()
//!     );
//!     Ok(())
//! }
//! ```
//!

pub(crate) mod config;
pub(crate) mod keyed_line;
pub(crate) mod profiler;
pub(crate) mod run_builder;
pub(crate) mod run_cursor;
pub(crate) mod run_merger;
pub(crate) mod sort_command;

pub mod generator;
pub mod manifest;
pub mod pipeline;
