//! Synthetic source files for exercising the pipeline.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::DEFAULT_COLUMN_SEPARATOR;

const COLUMN_VALUE_LENGTH: usize = 10;

/// Fill `path` with `line_count` random comma separated lines.
///
/// Column counts vary uniformly between one and `column_hint + 2`, so a file
/// generated for sorting by `column_hint` contains both keyed lines and lines
/// that the split phase will divert to the unsorted sink.
pub fn generate(path: &Path, line_count: u64, column_hint: usize) -> Result<(), anyhow::Error> {
    log::info!(
        "Start filling {} with {} synthetic lines",
        path.to_string_lossy(),
        line_count
    );
    let file = File::create(path)
        .with_context(|| format!("create source file: {}", path.to_string_lossy()))?;
    let mut writer = BufWriter::new(file);
    let mut rng = rand::thread_rng();
    for _ in 0..line_count {
        let columns = rng.gen_range(1..=column_hint + 2);
        let line = (0..columns)
            .map(|_| random_column_value(&mut rng))
            .collect::<Vec<String>>()
            .join(DEFAULT_COLUMN_SEPARATOR);
        writeln!(writer, "{}", line)
            .with_context(|| format!("write source file: {}", path.to_string_lossy()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush source file: {}", path.to_string_lossy()))?;
    log::info!("Finish filling {}", path.to_string_lossy());
    Ok(())
}

fn random_column_value(rng: &mut impl Rng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(COLUMN_VALUE_LENGTH)
        .map(char::from)
        .collect()
}
