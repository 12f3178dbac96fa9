// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{task::Task, task_pool::TaskPool};
use std::path::{Path, PathBuf};

/// Filter build configuration, the entry point of the crate.
///
/// ```
/// use node_bloom::Config;
/// # use std::io::Write;
/// #
/// # let folder = tempfile::tempdir()?;
/// # let log = folder.path().join("input.dat");
/// # std::fs::write(&log, [3; 64])?;
/// #
/// Config::new(&log).folder(folder.path()).run()?;
/// #
/// # Ok::<(), node_bloom::Error>(())
/// ```
pub struct Config {
    input_log: PathBuf,
    folder: Option<PathBuf>,
    workers: usize,
}

impl Config {
    /// Starts a config for building filters from the given record log.
    #[must_use]
    pub fn new<P: AsRef<Path>>(input_log: P) -> Self {
        Self {
            input_log: input_log.as_ref().into(),
            folder: None,
            workers: std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get),
        }
    }

    /// Sets the folder scratch partitions and filters are created in.
    ///
    /// Defaults to the input log's parent directory.
    #[must_use]
    pub fn folder<P: AsRef<Path>>(mut self, folder: P) -> Self {
        self.folder = Some(folder.as_ref().into());
        self
    }

    /// Sets the number of worker threads.
    ///
    /// Defaults to the available hardware parallelism. The root split
    /// also reads the input log with this many strands.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Builds one filter per node from the input log.
    ///
    /// Blocks until every filter is written. The input log itself is left
    /// intact; all scratch partitions are consumed along the way.
    ///
    /// # Errors
    ///
    /// Returns an error if the log is malformed or any file operation
    /// fails. The run is aborted and scratch partitions may be left
    /// behind; re-running from the input log is the remedy.
    pub fn run(self) -> crate::Result<()> {
        let folder = self.folder.unwrap_or_else(|| {
            self.input_log
                .parent()
                .map_or_else(|| PathBuf::from("."), Into::into)
        });

        let pool = TaskPool::new(folder, self.workers);
        pool.enqueue(Task::Split {
            prefix: Vec::new(),
            file: self.input_log,
        });

        pool.run()
    }
}
