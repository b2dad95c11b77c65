use crate::{fasta_reader::trim_end, sequence_type::gc_content, Error, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Offset of the Phred+33 quality encoding.
pub const PHRED_OFFSET: u8 = 33;

/// A single FASTQ record.
///
/// The sequence and quality strings always have equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub id: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}
impl FastqRecord {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Mean Phred score of the read, `0.0` for an empty read.
    pub fn mean_quality(&self) -> f64 {
        if self.qual.is_empty() {
            return 0.0;
        }
        let total: i64 = self
            .qual
            .iter()
            .map(|&q| q as i64 - PHRED_OFFSET as i64)
            .sum();
        total as f64 / self.qual.len() as f64
    }

    /// Fraction of `G`/`C` bases, `0.0` for an empty read.
    pub fn gc_content(&self) -> f64 {
        gc_content(&self.seq)
    }
}

/// A streaming FASTQ reader.
///
/// Every record spans exactly four lines: `@id`, sequence, `+` separator and
/// quality. Blank lines between records are skipped.
///
/// ```
/// use seqdex::FastqReader;
///
/// let data = b"@read1\nGGCC\n+\nIIII\n";
/// let mut reader = FastqReader::new(&data[..]);
/// let rec = reader.next_record().unwrap().unwrap();
/// assert_eq!(rec.id, "read1");
/// assert_eq!(rec.mean_quality(), 40.0);
/// assert_eq!(rec.gc_content(), 1.0);
/// assert!(reader.next_record().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct FastqReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    line_number: usize,
    finished: bool,
}

impl FastqReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(256),
            line_number: 0,
            finished: false,
        }
    }

    /// Read one line with its terminator stripped, `None` at EOF.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(trim_end(&self.line).to_vec()))
    }

    /// Read a line that must exist because a record is in progress.
    fn expect_line(&mut self, after: &str) -> Result<Vec<u8>> {
        match self.read_line()? {
            Some(line) => Ok(line),
            None => {
                self.finished = true;
                Err(Error::at_line(
                    self.line_number,
                    format!("unexpected end of input after {} line", after),
                ))
            }
        }
    }

    /// Read the next record, or `None` once the stream is exhausted.
    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.finished {
            return Ok(None);
        }
        let header = loop {
            match self.read_line()? {
                None => {
                    self.finished = true;
                    return Ok(None);
                }
                Some(line) if line.is_empty() => continue,
                Some(line) => break line,
            }
        };
        let header_line = self.line_number;
        let seq = self.expect_line("identifier")?;
        let sep = self.expect_line("sequence")?;
        let qual = self.expect_line("separator")?;

        if header[0] != b'@' {
            return Err(Error::at_line(
                header_line,
                format!(
                    "expected identifier line to start with '@', got '{}'",
                    String::from_utf8_lossy(&header)
                ),
            ));
        }
        if sep.first() != Some(&b'+') {
            return Err(Error::at_line(
                header_line + 2,
                format!(
                    "expected separator line to start with '+', got '{}'",
                    String::from_utf8_lossy(&sep)
                ),
            ));
        }
        if seq.len() != qual.len() {
            return Err(Error::at_line(
                header_line + 3,
                format!(
                    "sequence and quality length mismatch ({} vs {})",
                    seq.len(),
                    qual.len()
                ),
            ));
        }

        Ok(Some(FastqRecord {
            id: String::from_utf8_lossy(&header[1..]).into_owned(),
            seq,
            qual,
        }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;

    #[test]
    fn two_records() -> Result<()> {
        let data = b"@r1 extra\nACGT\n+\nIIII\n@r2\nGG\n+r2\n!!\n";
        let records = FastqReader::new(&data[..]).collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "r1 extra");
        assert_eq!(records[0].seq, b"ACGT");
        assert_eq!(records[1].qual, b"!!");
        assert_eq!(records[1].mean_quality(), 0.0);
        Ok(())
    }

    #[test]
    fn quality_mismatch() {
        let data = b"@r1\nACGT\n+\nIII\n";
        let mut reader = FastqReader::new(&data[..]);
        match reader.next_record() {
            Err(Error::Format { msg, .. }) => assert!(msg.contains("mismatch")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn missing_at_sign() {
        let mut reader = FastqReader::new(&b"r1\nACGT\n+\nIIII\n"[..]);
        assert!(matches!(reader.next_record(), Err(Error::Format { .. })));
    }

    #[test]
    fn missing_plus() {
        let mut reader = FastqReader::new(&b"@r1\nACGT\n-\nIIII\n"[..]);
        match reader.next_record() {
            Err(Error::Format { context, .. }) => assert_eq!(context, "line 3"),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_record_is_an_error() -> Result<()> {
        let mut reader = FastqReader::new(&b"@r1\nACGT\n+\nIIII\n@r2\nAC\n"[..]);
        assert!(reader.next_record()?.is_some());
        assert!(matches!(reader.next_record(), Err(Error::Format { .. })));
        assert!(reader.next_record()?.is_none());
        Ok(())
    }

    #[test]
    fn empty_input_is_end_of_stream() -> Result<()> {
        let mut reader = FastqReader::new(&b""[..]);
        assert!(reader.next_record()?.is_none());
        assert!(reader.next_record()?.is_none());
        Ok(())
    }

    #[test]
    fn gc_and_quality() {
        let rec = FastqRecord {
            id: "r".into(),
            seq: b"AATT".to_vec(),
            qual: b"++55".to_vec(),
        };
        assert_eq!(rec.gc_content(), 0.0);
        assert_eq!(rec.mean_quality(), 15.0);
        let empty = FastqRecord {
            id: "e".into(),
            seq: Vec::new(),
            qual: Vec::new(),
        };
        assert_eq!(empty.gc_content(), 0.0);
        assert_eq!(empty.mean_quality(), 0.0);
    }
}
