// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Builds per-node Bloom filters from flat record logs.
//!
//! ##### About
//!
//! The input is a flat log of 64-byte records, each a 32-byte node identifier
//! followed by a 32-byte piece identifier. For every distinct node identifier
//! in the log, one raw Bloom filter bitmap is emitted that summarises the
//! pieces recorded against that node, sized for a 10% false positive rate.
//! Operators of a distributed object store use these filters for offline
//! garbage-collection bookkeeping: one filter per storage node, describing
//! which pieces that node is expected to hold.
//!
//! Logs too large for memory are handled by recursively partitioning the
//! records into scratch files keyed by node identifier prefix. A partition
//! whose records all share one node identifier becomes a filter; every other
//! partition is split again by its next prefix byte. The partition tree is
//! executed as a dynamically growing task list drained by a fixed worker
//! pool, with the root split additionally reading the input with parallel
//! strands.
//!
//! Scratch partitions are transient: each one is consumed (and unlinked) by
//! exactly one downstream task, and a successful run leaves only the input
//! log and the emitted filter files behind.
//!
//! # Example usage
//!
//! ```
//! use node_bloom::Config;
//! # use std::io::Write;
//! #
//! # let folder = tempfile::tempdir()?;
//! # let log = folder.path().join("input.dat");
//! # let mut file = std::fs::File::create(&log)?;
//! # file.write_all(&[7; 64])?;
//! # file.sync_all()?;
//! # drop(file);
//! #
//! Config::new(&log).folder(folder.path()).workers(2).run()?;
//! #
//! # Ok::<(), node_bloom::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]

mod bloom;
mod config;
mod error;
mod filter;
mod log_reader;
mod path;
mod record;
mod shard;
mod split;
mod task;
mod task_pool;

pub use {
    config::Config,
    error::{Error, Result},
    filter::BloomFilter,
    path::{filter_file_name, partition_file_name},
    record::{Id, Record, ID_LEN, RECORD_LEN},
};
