// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    log_reader::{record_count, LogReader},
    path::partition_file_name,
    record::{ID_LEN, RECORD_LEN},
    shard::{Shard, ShardOutcome},
    task::Task,
    task_pool::TaskPool,
};
use std::path::Path;

/// Number of child buckets of a split, one per radix byte.
pub const FANOUT: usize = 256;

/// Scatters the records of a partition into child partitions keyed by the
/// next node identifier byte.
///
/// Every record is routed by `node_id[depth]` where `depth` is the prefix
/// length. Once the input is consumed, each non-empty child either becomes
/// a filter task (all of its records share one node identifier) or is
/// split again. Only the root invocation reads with multiple strands over
/// disjoint record ranges; recursion gets its parallelism from the task
/// pool instead.
///
/// The consumed partition is unlinked as soon as the strands are done with
/// it, before the children are flushed and closed, which keeps the scratch
/// footprint bounded. The root input log is left intact.
///
/// # Errors
///
/// Any read or write failure is fatal to the run; the partition cannot be
/// completed and the tree is not restart-safe.
pub fn split(pool: &TaskPool, prefix: &[u8], file: &Path, strands: usize) -> crate::Result<()> {
    log::info!("Working on {}", file.display());

    let total = record_count(file)?;
    let depth = prefix.len();
    debug_assert!(depth < ID_LEN, "a full-length prefix cannot be multi-node");

    let shards: Vec<Shard> = (0..FANOUT).map(|_| Shard::default()).collect();

    let scatter = |start: u64, end: u64| -> crate::Result<()> {
        let mut reader = LogReader::with_range(file, start, end)?;

        while let Some(batch) = reader.next_batch()? {
            for record in batch.chunks_exact(RECORD_LEN) {
                let radix = usize::from(record[depth]);

                // The child prefix is the first depth + 1 bytes of the
                // record's own node identifier.
                shards[radix].append(pool.folder(), &record[..=depth], record)?;
            }
        }

        Ok(())
    };

    if strands <= 1 || total == 0 {
        scatter(0, total)?;
    } else {
        let strands = strands as u64;

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..strands)
                .map(|idx| {
                    let scatter = &scatter;
                    scope.spawn(move || scatter(total * idx / strands, total * (idx + 1) / strands))
                })
                .collect();

            for handle in handles {
                #[allow(clippy::expect_used)]
                handle.join().expect("strand panicked")?;
            }

            Ok::<_, crate::Error>(())
        })?;
    }

    if !prefix.is_empty() {
        std::fs::remove_file(file)?;
    }

    let mut outcomes = Vec::new();
    for (radix, shard) in shards.into_iter().enumerate() {
        if let Some(outcome) = shard.finish()? {
            outcomes.push((radix, outcome));
        }
    }

    for (radix, outcome) in outcomes {
        let mut child_prefix = Vec::with_capacity(depth + 1);
        child_prefix.extend_from_slice(prefix);

        #[allow(clippy::cast_possible_truncation)]
        child_prefix.push(radix as u8);

        match outcome {
            ShardOutcome::ManyNodes => {
                let file = pool.folder().join(partition_file_name(&child_prefix));
                pool.enqueue(Task::Split {
                    prefix: child_prefix,
                    file,
                });
            }
            ShardOutcome::SingleNode => pool.enqueue(Task::Bloom {
                prefix: child_prefix,
            }),
        }
    }

    Ok(())
}
