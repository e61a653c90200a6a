/// Identifier types for indexed files
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense, monotonically assigned identifier of a file in the index
///
/// File ids double as positions in the index's file table, so they are
/// assigned contiguously starting at zero and never reused until `clear()`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    /// Create a file id from a raw index
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position of this file in the index's file table
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw numeric value
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One posting in the inverted hash index: where a 16-bit hash occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// File the hash was observed in
    pub file_id: FileId,
    /// Word position of the occurrence within that file's fingerprint
    pub position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_ordering_follows_raw_value() {
        assert!(FileId::new(1) < FileId::new(2));
        assert_eq!(FileId::new(7).index(), 7);
        assert_eq!(FileId::new(7).to_string(), "7");
    }

    #[test]
    fn file_id_serializes_transparently() {
        let id = FileId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }
}
