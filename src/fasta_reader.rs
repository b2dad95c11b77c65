use crate::{Error, FastaRecord, Result, SequenceType};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// FASTA header marker.
pub(crate) const HEADER_MARKER: u8 = b'>';

/// Strip trailing ASCII whitespace, including `\r\n` terminators.
pub(crate) fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

fn trim_start(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    &line[start..]
}

pub(crate) fn is_header(line: &[u8]) -> bool {
    line.first() == Some(&HEADER_MARKER)
}

/// Split a header line into identifier and optional description.
///
/// The marker byte is dropped and the text is split on its first run of
/// whitespace.
pub(crate) fn parse_header(line: &[u8]) -> (&[u8], Option<&[u8]>) {
    let text = trim_start(trim_end(&line[1..]));
    match text.iter().position(|b| b.is_ascii_whitespace()) {
        Some(i) => {
            let desc = trim_start(&text[i..]);
            (&text[..i], (!desc.is_empty()).then_some(desc))
        }
        None => (text, None),
    }
}

/// Parser state, advanced one record per call.
#[derive(Debug)]
enum State {
    /// No header has been read for the next record yet.
    AwaitingHeader,
    /// The header of the next record was read while finishing the last one.
    HaveHeader(Vec<u8>),
    /// The stream is exhausted.
    End,
}

/// A streaming FASTA reader.
///
/// Records are yielded in file order. Lines before the first header are
/// skipped. Sequence lines are concatenated without separators after their
/// trailing whitespace is removed.
///
/// ```
/// use seqdex::{FastaReader, SequenceType};
///
/// let data = b">seq1 first\nACGT\nAC\n>seq2\nMEF\n";
/// let mut reader = FastaReader::new(&data[..]);
///
/// let rec = reader.next_record().unwrap().unwrap();
/// assert_eq!(rec.id, "seq1");
/// assert_eq!(rec.description.as_deref(), Some("first"));
/// assert_eq!(rec.seq, b"ACGTAC");
///
/// let rec = reader.next_record().unwrap().unwrap();
/// assert_eq!(rec.seq_type, SequenceType::Protein);
/// assert!(reader.next_record().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    state: State,
    strict: bool,
}

impl FastaReader<BufReader<File>> {
    /// Open a FASTA file for sequential reading.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(256),
            state: State::AwaitingHeader,
            strict: false,
        }
    }

    /// Reject records containing characters outside their inferred alphabet.
    ///
    /// Off by default: FASTA files routinely carry characters outside any
    /// single strict alphabet.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Read the next physical line into `self.line`. Returns `false` at EOF.
    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        Ok(self.reader.read_until(b'\n', &mut self.line)? > 0)
    }

    /// Read the next record, or `None` once the stream is exhausted.
    ///
    /// After the first `None` every further call returns `None` as well.
    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        let header = match std::mem::replace(&mut self.state, State::AwaitingHeader) {
            State::End => {
                self.state = State::End;
                return Ok(None);
            }
            State::HaveHeader(header) => header,
            State::AwaitingHeader => loop {
                if !self.read_line()? {
                    self.state = State::End;
                    return Ok(None);
                }
                if is_header(&self.line) {
                    break trim_end(&self.line).to_vec();
                }
            },
        };

        let mut seq = Vec::new();
        loop {
            if !self.read_line()? {
                self.state = State::End;
                break;
            }
            if is_header(&self.line) {
                self.state = State::HaveHeader(trim_end(&self.line).to_vec());
                break;
            }
            seq.extend_from_slice(trim_end(&self.line));
        }

        let (id, description) = parse_header(&header);
        let record = FastaRecord::new(
            String::from_utf8_lossy(id),
            description.map(|d| String::from_utf8_lossy(d).into_owned()),
            seq,
        );
        if self.strict {
            check_alphabet(&record)?;
        }
        Ok(Some(record))
    }
}

fn check_alphabet(record: &FastaRecord) -> Result<()> {
    if record.seq_type == SequenceType::Unknown {
        return Err(Error::in_sequence(
            &record.id,
            "sequence mixes T and U, no alphabet to validate against",
        ));
    }
    match record.seq_type.first_invalid(&record.seq) {
        Some(pos) => Err(Error::in_sequence(
            &record.id,
            format!(
                "invalid character '{}' at position {} for {} sequence",
                (record.seq[pos] as char).escape_default(),
                pos + 1,
                record.seq_type
            ),
        )),
        None => Ok(()),
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;

    fn read_all(data: &[u8]) -> Result<Vec<FastaRecord>> {
        Ok(FastaReader::new(data).collect::<crate::Result<Vec<_>>>()?)
    }

    #[test]
    fn multiline_records() -> Result<()> {
        let records = read_all(b">seq1\nACGTAC\nGTAC\n>seq2\nGGGCC\n")?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].seq, b"ACGTACGTAC");
        assert_eq!(records[1].id, "seq2");
        assert_eq!(records[1].seq, b"GGGCC");
        Ok(())
    }

    #[test]
    fn header_description() -> Result<()> {
        let records = read_all(b">chr1   human chromosome 1 \nAC\n>chr2\t\nGT\n")?;
        assert_eq!(records[0].id, "chr1");
        assert_eq!(
            records[0].description.as_deref(),
            Some("human chromosome 1")
        );
        assert_eq!(records[1].id, "chr2");
        assert_eq!(records[1].description, None);
        Ok(())
    }

    #[test]
    fn crlf_and_missing_final_newline() -> Result<()> {
        let records = read_all(b">a\r\nACG\r\nTT")?;
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].seq, b"ACGTT");
        Ok(())
    }

    #[test]
    fn leading_junk_is_skipped() -> Result<()> {
        let records = read_all(b"junk\n\n>a\nAC\n")?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seq, b"AC");
        Ok(())
    }

    #[test]
    fn empty_sequence_record() -> Result<()> {
        let records = read_all(b">a\n>b\nAC\n")?;
        assert_eq!(records.len(), 2);
        assert!(records[0].seq.is_empty());
        assert_eq!(records[1].seq, b"AC");
        Ok(())
    }

    #[test]
    fn end_of_stream_is_sticky() -> Result<()> {
        let mut reader = FastaReader::new(&b">a\nAC\n"[..]);
        assert!(reader.next_record()?.is_some());
        assert!(reader.next_record()?.is_none());
        assert!(reader.next_record()?.is_none());

        let mut empty = FastaReader::new(&b""[..]);
        assert!(empty.next_record()?.is_none());
        assert!(empty.next_record()?.is_none());
        Ok(())
    }

    #[test]
    fn permissive_by_default() -> Result<()> {
        let records = read_all(b">odd\nACGJ\n")?;
        assert_eq!(records[0].seq, b"ACGJ");
        Ok(())
    }

    #[test]
    fn strict_names_offending_record() {
        let data = b">good\nACGT\n>bad\nACGJ\n";
        let mut reader = FastaReader::new(&data[..]).strict(true);
        assert!(reader.next_record().is_ok());
        match reader.next_record() {
            Err(Error::Format { context, .. }) => assert!(context.contains("bad")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn strict_rejects_mixed_t_and_u() {
        let mut reader = FastaReader::new(&b">tu\nACGTU\n"[..]).strict(true);
        assert!(matches!(reader.next_record(), Err(Error::Format { .. })));
    }

    #[test]
    fn parse_header_split() {
        assert_eq!(parse_header(b">id desc here"), (&b"id"[..], Some(&b"desc here"[..])));
        assert_eq!(parse_header(b">id"), (&b"id"[..], None));
        assert_eq!(parse_header(b">"), (&b""[..], None));
    }
}
