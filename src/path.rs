// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::record::Id;
use std::fmt::Write;

/// File extension shared by record logs, scratch partitions and filters.
const EXTENSION: &str = ".dat";

fn hex_name(bytes: &[u8]) -> String {
    let mut name = String::with_capacity(2 * bytes.len() + EXTENSION.len());

    for byte in bytes {
        // NOTE: Writing into a string cannot fail
        #[allow(clippy::expect_used)]
        write!(name, "{byte:02x}").expect("cannot fail");
    }

    name.push_str(EXTENSION);
    name
}

/// Returns the scratch file name of the partition with the given prefix.
///
/// The root partition (empty prefix) maps to `.dat`, which is also the
/// canonical name of an input log.
#[must_use]
pub fn partition_file_name(prefix: &[u8]) -> String {
    hex_name(prefix)
}

/// Returns the file name of the emitted filter for the given node.
#[must_use]
pub fn filter_file_name(node_id: &Id) -> String {
    hex_name(node_id.as_bytes())
}
