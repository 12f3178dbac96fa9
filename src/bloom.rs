// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    filter::BloomFilter,
    log_reader::LogReader,
    path::{filter_file_name, partition_file_name},
    record::{Record, RECORD_LEN},
    Error,
};
use std::{io::Write, path::Path};

/// Builds and emits the filter of a single-node partition.
///
/// The partition's record count fixes the filter size; every record's
/// piece identifier is hashed into the filter, and the bitmap is written
/// next to the partition under the node identifier's name. The partition
/// file is unlinked once the filter has been persisted.
///
/// All records are expected to share one node identifier, which the
/// producing split has already established.
///
/// # Errors
///
/// Returns [`Error::EmptyPartition`] for a partition with no records. Any
/// I/O failure is fatal to the run.
pub fn bloom(folder: &Path, prefix: &[u8]) -> crate::Result<()> {
    let file_name = partition_file_name(prefix);
    log::info!("Blooming {file_name}");

    let path = folder.join(&file_name);
    let mut reader = LogReader::open(&path)?;

    let total = reader.remaining();
    if total == 0 {
        return Err(Error::EmptyPartition(path));
    }

    let mut filter = BloomFilter::with_piece_count(total);
    let mut node_id = None;

    while let Some(batch) = reader.next_batch()? {
        for bytes in batch.chunks_exact(RECORD_LEN) {
            let record = Record::from_slice(bytes);
            filter.set(&record.piece_id);
            node_id.get_or_insert(record.node_id);
        }
    }

    drop(reader);

    #[allow(clippy::expect_used)]
    let node_id = node_id.expect("partition has at least one record");

    write_atomic(&folder.join(filter_file_name(&node_id)), filter.bytes())?;
    std::fs::remove_file(&path)?;

    Ok(())
}

/// Writes the bitmap under a temporary name, then persists it atomically,
/// so a crash mid-write cannot leave a truncated filter under the final
/// name. The content is synced before the rename and the directory entry
/// after it; the rename alone is atomic but not durable.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    #[allow(clippy::expect_used)]
    let folder = path.parent().expect("should have a parent directory");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file_mut().sync_all()?;
    temp_file.persist(path)?;

    #[cfg(not(target_os = "windows"))]
    {
        let file = std::fs::File::open(path)?;
        file.sync_all()?;

        fsync_directory(folder)?;
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn fsync_directory(path: &Path) -> std::io::Result<()> {
    let file = std::fs::File::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}
