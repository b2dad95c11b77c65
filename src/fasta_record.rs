use crate::{sequence_type::gc_content, Error, Result, SequenceType};

/// A single FASTA record.
///
/// Produced by [`FastaReader`](crate::FastaReader) or reconstructed by
/// [`IndexedFasta::fetch`](crate::IndexedFasta::fetch). The sequence holds the
/// concatenated data lines with line terminators removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub description: Option<String>,
    pub seq: Vec<u8>,
    pub seq_type: SequenceType,
}
impl FastaRecord {
    /// Build a record and infer its sequence type.
    pub fn new(id: impl Into<String>, description: Option<String>, seq: Vec<u8>) -> Self {
        let seq_type = SequenceType::infer(&seq);
        Self {
            id: id.into(),
            description,
            seq,
            seq_type,
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Validate the sequence against the alphabet of its inferred type.
    pub fn validate(&self) -> bool {
        self.seq_type.validate(&self.seq)
    }

    pub fn gc_content(&self) -> f64 {
        gc_content(&self.seq)
    }

    /// Slice the sequence with 1-based inclusive coordinates.
    ///
    /// `slice(3, 7)` returns bases 3 through 7, i.e. `seq[2..7]`.
    ///
    /// # Errors
    ///
    /// - `Error::Boundary` if `start < 1`, `end > len` or `start > end`.
    pub fn slice(&self, start: u64, end: u64) -> Result<&[u8]> {
        let length = self.seq.len() as u64;
        if start < 1 || end > length || start > end {
            return Err(Error::Boundary {
                name: self.id.clone(),
                start,
                end,
                length,
            });
        }
        Ok(&self.seq[(start - 1) as usize..end as usize])
    }
}
