// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    log_reader::BATCH_LEN,
    path::partition_file_name,
    record::{Id, Record, ID_LEN, RECORD_LEN},
};
use std::{fs::File, io::Write, path::Path, sync::Mutex};

/// Follow-up owed for a shard once its parent partition is consumed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShardOutcome {
    /// All routed records share one node identifier.
    SingleNode,

    /// At least two distinct node identifiers were routed.
    ManyNodes,
}

/// One of the 256 child buckets of a split.
///
/// Appenders stage records in memory and spill to the shard file whenever a
/// full batch has accumulated. The file is created lazily by the first
/// record routed here, which also pins `first_node_id`, the witness used to
/// detect single-node partitions: the flag latches on the first mismatch
/// and is never unset.
///
/// All appenders serialise on the shard's own mutex; only the root split
/// has more than one appender.
#[derive(Default)]
pub struct Shard {
    inner: Mutex<Option<ShardWriter>>,
}

struct ShardWriter {
    file: File,
    staged: Vec<u8>,
    first_node_id: Id,
    many_nodes: bool,
}

impl Shard {
    /// Appends one record, creating the shard file on first use.
    ///
    /// `child_prefix` is the partition prefix of this shard, i.e. the
    /// parent prefix extended by the shard's radix byte; the routed
    /// record's node identifier starts with it by construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the shard file cannot be created or written.
    pub fn append(&self, folder: &Path, child_prefix: &[u8], record: &[u8]) -> crate::Result<()> {
        debug_assert_eq!(RECORD_LEN, record.len());

        #[allow(clippy::expect_used)]
        let mut guard = self.inner.lock().expect("lock is poisoned");

        if guard.is_none() {
            let file = File::create(folder.join(partition_file_name(child_prefix)))?;

            *guard = Some(ShardWriter {
                file,
                staged: Vec::with_capacity(BATCH_LEN * RECORD_LEN),
                first_node_id: Record::from_slice(record).node_id,
                many_nodes: false,
            });
        }

        #[allow(clippy::expect_used)]
        let writer = guard.as_mut().expect("was just initialised");

        writer.staged.extend_from_slice(record);
        if writer.staged.len() == BATCH_LEN * RECORD_LEN {
            writer.file.write_all(&writer.staged)?;
            writer.staged.clear();
        }

        if record[..ID_LEN] != *writer.first_node_id.as_bytes() {
            writer.many_nodes = true;
        }

        Ok(())
    }

    /// Flushes residual staged records and closes the shard file.
    ///
    /// Returns `None` if no record was ever routed here.
    ///
    /// # Errors
    ///
    /// Returns an error if the residual flush fails.
    pub fn finish(self) -> crate::Result<Option<ShardOutcome>> {
        #[allow(clippy::expect_used)]
        let inner = self.inner.into_inner().expect("lock is poisoned");

        let Some(mut writer) = inner else {
            return Ok(None);
        };

        if !writer.staged.is_empty() {
            writer.file.write_all(&writer.staged)?;
        }

        Ok(Some(if writer.many_nodes {
            ShardOutcome::ManyNodes
        } else {
            ShardOutcome::SingleNode
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn record_bytes(node_fill: u8, piece_fill: u8) -> [u8; RECORD_LEN] {
        Record {
            node_id: Id::from_bytes([node_fill; ID_LEN]),
            piece_id: Id::from_bytes([piece_fill; ID_LEN]),
        }
        .to_bytes()
    }

    #[test]
    fn untouched_shard_has_no_outcome() -> crate::Result<()> {
        let shard = Shard::default();
        assert_eq!(None, shard.finish()?);
        Ok(())
    }

    #[test]
    fn single_node_shard() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let shard = Shard::default();

        for piece in 0..3 {
            shard.append(dir.path(), &[0xaa], &record_bytes(0xaa, piece))?;
        }

        assert_eq!(Some(ShardOutcome::SingleNode), shard.finish()?);

        let written = std::fs::read(dir.path().join("aa.dat"))?;
        assert_eq!(3 * RECORD_LEN, written.len());
        Ok(())
    }

    #[test]
    fn many_nodes_flag_latches() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let shard = Shard::default();

        // A, B, A: the flag is set on B and must survive the return of A.
        shard.append(dir.path(), &[0x0a], &record_bytes(0x0a, 1))?;

        let mut other = [0x0a; ID_LEN];
        other[1] = 0xbb;
        let record = Record {
            node_id: Id::from_bytes(other),
            piece_id: Id::from_bytes([2; ID_LEN]),
        };
        shard.append(dir.path(), &[0x0a], &record.to_bytes())?;

        shard.append(dir.path(), &[0x0a], &record_bytes(0x0a, 3))?;

        assert_eq!(Some(ShardOutcome::ManyNodes), shard.finish()?);
        Ok(())
    }

    #[test]
    fn staged_records_flush_on_finish() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let shard = Shard::default();

        shard.append(dir.path(), &[0x01], &record_bytes(0x01, 9))?;

        // Nothing on disk yet; one record is far below the batch size.
        assert_eq!(0, std::fs::metadata(dir.path().join("01.dat"))?.len());

        shard.finish()?;
        assert_eq!(
            RECORD_LEN as u64,
            std::fs::metadata(dir.path().join("01.dat"))?.len()
        );
        Ok(())
    }
}
