// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{bloom, split, task_pool::TaskPool};
use std::path::PathBuf;

/// A deferred unit of work on one partition file.
///
/// Tasks carry no shared state beyond the filesystem and the task list
/// itself; each partition file is owned by exactly one task at a time.
#[derive(Debug)]
pub enum Task {
    /// Scatter a multi-node partition into children keyed by the next
    /// radix byte.
    Split {
        /// Node identifier prefix shared by the partition's records.
        prefix: Vec<u8>,

        /// The partition (or root input log) to consume.
        file: PathBuf,
    },

    /// Emit the filter of a single-node partition.
    Bloom {
        /// Node identifier prefix naming the partition.
        prefix: Vec<u8>,
    },
}

impl Task {
    /// Runs the task to completion on the current worker.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the run.
    pub fn run(self, pool: &TaskPool) -> crate::Result<()> {
        match self {
            Self::Split { prefix, file } => {
                // Only the root consumes its input with parallel strands;
                // everything below it is parallelised by the pool.
                let strands = if prefix.is_empty() {
                    pool.worker_count()
                } else {
                    1
                };

                split::split(pool, &prefix, &file, strands)
            }
            Self::Bloom { prefix } => bloom::bloom(pool.folder(), &prefix),
        }
    }
}
