use std::path::{Path, PathBuf};
use anyhow::Error;
use column_file_sort::generator;
use column_file_sort::pipeline::Pipeline;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn sort_by_first_column(source: &Path) -> Result<(), Error> {
    // the comma separator and the first column are the defaults
    let mut pipeline = Pipeline::new(source.to_path_buf());
    pipeline.with_work_dir(PathBuf::from("./target"));
    let summary = pipeline.run()?;
    println!(
        "sorted by first column: {} lines in {}",
        summary.sorted_lines(),
        summary.output().to_string_lossy()
    );
    Ok(())
}

fn sort_by_second_column(source: &Path) -> Result<(), Error> {
    let mut pipeline = Pipeline::new(source.to_path_buf());
    pipeline.with_work_dir(PathBuf::from("./target"));
    pipeline.with_column_index(1);
    let summary = pipeline.run()?;
    println!(
        "sorted by second column: {} lines, {} without that column in {}",
        summary.sorted_lines(),
        summary.unsorted_lines(),
        summary.unsorted_sink().to_string_lossy()
    );
    Ok(())
}

fn sort_concurrently(source: &Path) -> Result<(), Error> {
    let mut pipeline = Pipeline::new(source.to_path_buf());
    pipeline.with_work_dir(PathBuf::from("./target"));
    pipeline.with_run_capacity(2_000);
    pipeline.with_concurrent_sort(true);
    let summary = pipeline.run()?;
    println!(
        "concurrent sort: {} runs merged into {}",
        summary.runs(),
        summary.output().to_string_lossy()
    );
    Ok(())
}

fn split_then_merge(source: &Path) -> Result<(), Error> {
    // the two phases can be driven separately, with the manifest carrying
    // the sorted runs between them
    let mut pipeline = Pipeline::new(source.to_path_buf());
    pipeline.with_work_dir(PathBuf::from("./target"));
    pipeline.with_run_capacity(2_000);
    let manifest = pipeline.split()?;
    println!("split produced {} runs", manifest.runs().len());
    let output = pipeline.merge(manifest)?;
    println!("merged into {}", output.to_string_lossy());
    Ok(())
}

// cargo run -r --example sort_by_column
pub fn main() -> Result<(), Error> {
    let source = PathBuf::from("./target/demo-events.csv");
    generator::generate(&source, 10_000, 1)?;

    sort_by_first_column(&source)?;
    sort_by_second_column(&source)?;
    sort_concurrently(&source)?;
    split_then_merge(&source)?;

    Ok(())
}
