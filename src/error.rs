// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::path::PathBuf;

/// Represents errors that can occur during a filter build
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// A record log or partition file size is not a multiple of the record size
    TruncatedLog {
        /// The offending file
        path: PathBuf,

        /// Its actual size in bytes
        len: u64,
    },

    /// A partition with no records was handed to the filter builder
    EmptyPartition(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeBloomError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Build result
pub type Result<T> = std::result::Result<T, Error>;
