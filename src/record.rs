// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Number of bytes in a node or piece identifier.
pub const ID_LEN: usize = 32;

/// Number of bytes in an encoded record.
pub const RECORD_LEN: usize = 2 * ID_LEN;

/// An opaque 32-byte identifier.
///
/// Identifies either a storage node or a stored piece. No ordering is
/// defined beyond byte equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id([u8; ID_LEN]);

impl Id {
    /// Wraps raw identifier bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ID_LEN]> for Id {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

/// A single log record, a node identifier followed by a piece identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// The storage node this record was observed on.
    pub node_id: Id,

    /// The piece recorded against that node.
    pub piece_id: Id,
}

impl Record {
    /// Decodes a record from its 64-byte wire form.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly [`RECORD_LEN`] bytes long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        assert_eq!(RECORD_LEN, bytes.len(), "records are 64 bytes");

        let mut node_id = [0; ID_LEN];
        node_id.copy_from_slice(&bytes[..ID_LEN]);

        let mut piece_id = [0; ID_LEN];
        piece_id.copy_from_slice(&bytes[ID_LEN..]);

        Self {
            node_id: Id(node_id),
            piece_id: Id(piece_id),
        }
    }

    /// Encodes the record into its 64-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0; RECORD_LEN];
        bytes[..ID_LEN].copy_from_slice(&self.node_id.0);
        bytes[ID_LEN..].copy_from_slice(&self.piece_id.0);
        bytes
    }
}
