use serde::{Deserialize, Serialize};

/// A FASTA index entry.
///
/// This struct represents a single line of a `.fai` index.
/// It contains the name of the sequence, its length in bases,
/// the byte offset of its first base in the FASTA file, and the
/// number of bases and bytes (including the terminator) per line.
///
/// Field order matches the column order of the index file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub length: u64,
    pub offset: u64,
    pub line_bases: u64,
    pub line_bytes: u64,
}
