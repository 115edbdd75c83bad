use std::sync::{Arc, Mutex};

use command_executor::command::Command;

use crate::keyed_line::KeyedLine;
use crate::manifest::RunFile;
use crate::run_builder::write_run;

/// Sorts and persists one buffered chunk on the sorting pool.
///
/// Completed runs and the first failure travel through shared slots, so the
/// builder can assemble the manifest after the pool has drained.
pub(crate) struct SortChunkCommand {
    run: RunFile,
    chunk: Mutex<Option<Vec<KeyedLine>>>,
    completed: Arc<Mutex<Vec<RunFile>>>,
    failure: Arc<Mutex<Option<anyhow::Error>>>,
}

impl SortChunkCommand {
    pub(crate) fn new(
        run: RunFile,
        chunk: Vec<KeyedLine>,
        completed: Arc<Mutex<Vec<RunFile>>>,
        failure: Arc<Mutex<Option<anyhow::Error>>>,
    ) -> SortChunkCommand {
        SortChunkCommand {
            run,
            chunk: Mutex::new(Some(chunk)),
            completed,
            failure,
        }
    }
}

impl Command for SortChunkCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        let chunk = match self.chunk.lock().unwrap().take() {
            Some(chunk) => chunk,
            None => return Ok(()),
        };
        match write_run(&self.run, chunk) {
            Ok(()) => self.completed.lock().unwrap().push(self.run.clone()),
            Err(error) => *self.failure.lock().unwrap() = Some(error),
        }
        Ok(())
    }
}
