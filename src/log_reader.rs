// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{record::RECORD_LEN, Error};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

/// Records per read, amortising syscall overhead.
pub const BATCH_LEN: usize = 10_240;

/// Batched reader over a record log or partition file.
///
/// Reads fixed-size record batches through a private file handle. A reader
/// covers either the whole file or one contiguous record range of it, which
/// is how the root split shares its input between strands. A batch never
/// extends past the end of the reader's range.
pub struct LogReader {
    file: File,
    buf: Vec<u8>,
    remaining: u64,
}

impl LogReader {
    /// Opens a reader over all records of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedLog`] if the file size is not a multiple
    /// of the record size.
    pub fn open(path: &Path) -> crate::Result<Self> {
        let count = record_count(path)?;
        Self::with_range(path, 0, count)
    }

    /// Opens a reader over records `start..end` of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or seeked.
    pub fn with_range(path: &Path, start: u64, end: u64) -> crate::Result<Self> {
        debug_assert!(start <= end, "record range is inverted");

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(start * RECORD_LEN as u64))?;

        Ok(Self {
            file,
            buf: Vec::new(),
            remaining: end - start,
        })
    }

    /// Number of records the reader has left to return.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Reads the next batch of records.
    ///
    /// Returns `None` once the range is exhausted. A batch holds at most
    /// [`BATCH_LEN`] records and its length is always a multiple of the
    /// record size.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails or hits EOF early.
    pub fn next_batch(&mut self) -> crate::Result<Option<&[u8]>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        #[allow(clippy::cast_possible_truncation)]
        let take = self.remaining.min(BATCH_LEN as u64) as usize;
        let len = take * RECORD_LEN;

        self.buf.resize(len, 0);
        self.file.read_exact(&mut self.buf[..len])?;
        self.remaining -= take as u64;

        Ok(Some(&self.buf[..len]))
    }
}

/// Returns the number of records in the file at `path`.
///
/// # Errors
///
/// Returns [`Error::TruncatedLog`] if the file size is not a multiple of
/// the record size.
pub fn record_count(path: &Path) -> crate::Result<u64> {
    let len = std::fs::metadata(path)?.len();

    if len % RECORD_LEN as u64 != 0 {
        return Err(Error::TruncatedLog {
            path: path.into(),
            len,
        });
    }

    Ok(len / RECORD_LEN as u64)
}
