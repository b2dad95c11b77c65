use crate::{
    fasta_reader::{is_header, parse_header, trim_end},
    Error, IndexEntry, Result,
};
use hashbrown::HashMap;
use log::{debug, warn};
use memchr::memchr;
use memmap2::Mmap;
use std::{
    ffi::OsString,
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// A FASTA index.
///
/// This struct maps FASTA sequence names to their corresponding
/// `IndexEntry` structs and remembers the order in which the sequences
/// appear in the FASTA file.
///
/// An index is either built by scanning a FASTA file once with
/// [`FastaIndex::build`] or loaded from a `.fai` file with
/// [`FastaIndex::from_filepath`]. It is never modified after that, so a
/// loaded index can be shared between readers behind an `Arc`.
#[derive(Debug, Default, Clone)]
pub struct FastaIndex {
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}
impl FastaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. A repeated name replaces the earlier entry in place.
    pub fn insert(&mut self, entry: IndexEntry) {
        match self.positions.get(&entry.name) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// The conventional index location for a FASTA file: `<path>.fai`.
    pub fn index_path<P: AsRef<Path>>(fasta_path: P) -> PathBuf {
        let mut path = OsString::from(fasta_path.as_ref().as_os_str());
        path.push(".fai");
        PathBuf::from(path)
    }

    /// Parse a `.fai` table.
    ///
    /// The index is treated as a rebuildable cache: lines that do not have
    /// exactly five tab-separated fields, or whose numeric fields are not
    /// unsigned integers, are skipped. Only I/O errors fail the load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        let mut index = Self::new();
        let mut record = csv::ByteRecord::new();
        let mut skipped = 0usize;
        loop {
            match csv_reader.read_byte_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) if e.is_io_error() => return Err(io::Error::from(e).into()),
                Err(e) => {
                    warn!("skipping unreadable index line: {}", e);
                    skipped += 1;
                    continue;
                }
            }
            if record.len() != 5 {
                skipped += 1;
                continue;
            }
            match record.deserialize::<IndexEntry>(None) {
                Ok(entry) => index.insert(entry),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("skipped {} malformed index line(s)", skipped);
        }
        debug!("loaded index with {} sequences", index.len());
        Ok(index)
    }

    pub fn from_filepath<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Build an index by scanning a FASTA file once.
    ///
    /// # Errors
    ///
    /// - `Error::Format` naming the sequence if its line widths are
    ///   inconsistent, if data follows a short line, or if its name repeats.
    /// - `Error::Io` if the file cannot be opened or mapped.
    pub fn build<P: AsRef<Path>>(fasta_path: P) -> Result<Self> {
        let file = File::open(fasta_path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::new());
        }
        let map = unsafe { Mmap::map(&file)? };
        let index = Self::from_bytes(&map)?;
        debug!(
            "indexed {} sequences in {}",
            index.len(),
            fasta_path.as_ref().display()
        );
        Ok(index)
    }

    /// Build an index from the raw bytes of a FASTA file.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut index = Self::new();
        let mut current: Option<OpenSequence> = None;
        let mut offset = 0u64;
        for (line_number, line) in Lines(data).enumerate() {
            let line_number = line_number + 1;
            let width = line.len() as u64;
            if is_header(line) {
                if let Some(seq) = current.take() {
                    index.push_built(seq.finish())?;
                }
                let (name, _) = parse_header(line);
                if name.is_empty() {
                    return Err(Error::at_line(line_number, "header without a sequence name"));
                }
                current = Some(OpenSequence::new(
                    String::from_utf8_lossy(name).into_owned(),
                    offset + width,
                ));
            } else if let Some(seq) = current.as_mut() {
                seq.push_line(line, line_number)?;
            }
            offset += width;
        }
        if let Some(seq) = current.take() {
            index.push_built(seq.finish())?;
        }
        Ok(index)
    }

    fn push_built(&mut self, entry: IndexEntry) -> Result<()> {
        if self.positions.contains_key(&entry.name) {
            return Err(Error::in_sequence(&entry.name, "duplicate sequence name"));
        }
        self.insert(entry);
        Ok(())
    }

    /// Write the index as a `.fai` table in file order.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        for entry in &self.entries {
            csv_writer.serialize(entry).map_err(io::Error::from)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the index to `path`.
    ///
    /// The table is written to a temporary file next to `path` and renamed
    /// into place, so readers never observe a partially written index.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = temp_file_in(dir)?;
        self.to_writer(tmp.as_file_mut())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Build the index of a FASTA file and publish it at `<path>.fai`.
    ///
    /// Returns the path of the written index.
    pub fn build_file<P: AsRef<Path>>(fasta_path: P) -> Result<PathBuf> {
        let index = Self::build(&fasta_path)?;
        let index_path = Self::index_path(&fasta_path);
        index.write(&index_path)?;
        Ok(index_path)
    }

    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.positions.get(name).map(|&pos| &self.entries[pos])
    }

    /// Iterate over the entries in FASTA file order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A temporary file that is published with the usual `0666 & !umask` mode.
#[cfg(unix)]
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    use std::{fs::Permissions, os::unix::fs::PermissionsExt};
    tempfile::Builder::new()
        .permissions(Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

/// Physical lines of a buffer, each including its `\n` terminator if present.
struct Lines<'a>(&'a [u8]);
impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            return None;
        }
        let end = memchr(b'\n', self.0).map_or(self.0.len(), |i| i + 1);
        let (line, rest) = self.0.split_at(end);
        self.0 = rest;
        Some(line)
    }
}

/// A sequence whose data lines are still being scanned.
struct OpenSequence {
    name: String,
    offset: u64,
    length: u64,
    /// `(bases, bytes)` of the first data line.
    geometry: Option<(u64, u64)>,
    /// Set once a line shorter than the established width was seen.
    short_line: bool,
}
impl OpenSequence {
    fn new(name: String, offset: u64) -> Self {
        Self {
            name,
            offset,
            length: 0,
            geometry: None,
            short_line: false,
        }
    }

    fn push_line(&mut self, line: &[u8], line_number: usize) -> Result<()> {
        let bases = trim_end(line).len() as u64;
        let bytes = line.len() as u64;

        // blank lines carry no data but end the region that can be addressed
        if bases == 0 {
            self.short_line = true;
            return Ok(());
        }
        if self.short_line {
            return Err(Error::in_sequence(
                &self.name,
                format!("line {} follows a shorter line", line_number),
            ));
        }
        match self.geometry {
            None => self.geometry = Some((bases, bytes)),
            Some((line_bases, line_bytes)) => {
                if bases > line_bases {
                    return Err(Error::in_sequence(
                        &self.name,
                        format!(
                            "line {} has {} bases, more than the line width of {}",
                            line_number, bases, line_bases
                        ),
                    ));
                }
                if bases == line_bases && bytes > line_bytes {
                    return Err(Error::in_sequence(
                        &self.name,
                        format!(
                            "line {} is {} bytes long, expected {}",
                            line_number, bytes, line_bytes
                        ),
                    ));
                }
                if bases < line_bases || bytes < line_bytes {
                    self.short_line = true;
                }
            }
        }
        self.length += bases;
        Ok(())
    }

    fn finish(self) -> IndexEntry {
        let (line_bases, line_bytes) = self.geometry.unwrap_or((0, 0));
        IndexEntry {
            name: self.name,
            length: self.length,
            offset: self.offset,
            line_bases,
            line_bytes,
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;
    use std::fs;

    const TWO_RECORDS: &[u8] = b">seq1\nACGTAC\nGTAC\n>seq2\nGGGCC\n";

    fn entry(name: &str, length: u64, offset: u64, line_bases: u64, line_bytes: u64) -> IndexEntry {
        IndexEntry {
            name: name.to_string(),
            length,
            offset,
            line_bases,
            line_bytes,
        }
    }

    fn to_string(index: &FastaIndex) -> Result<String> {
        let mut out = Vec::new();
        index.to_writer(&mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn build_two_records() -> Result<()> {
        let index = FastaIndex::from_bytes(TWO_RECORDS)?;
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("seq1"), Some(&entry("seq1", 10, 6, 6, 7)));
        assert_eq!(index.get("seq2"), Some(&entry("seq2", 5, 24, 5, 6)));
        Ok(())
    }

    #[test]
    fn write_in_file_order() -> Result<()> {
        let index = FastaIndex::from_bytes(TWO_RECORDS)?;
        assert_eq!(to_string(&index)?, "seq1\t10\t6\t6\t7\nseq2\t5\t24\t5\t6\n");
        Ok(())
    }

    #[test]
    fn name_is_first_header_token() -> Result<()> {
        let index = FastaIndex::from_bytes(b">chr1 some description\nACGT\n")?;
        assert_eq!(index.get("chr1"), Some(&entry("chr1", 4, 23, 4, 5)));
        Ok(())
    }

    #[test]
    fn crlf_geometry() -> Result<()> {
        let index = FastaIndex::from_bytes(b">a\r\nACGT\r\nAC\r\n")?;
        assert_eq!(index.get("a"), Some(&entry("a", 6, 4, 4, 6)));
        Ok(())
    }

    #[test]
    fn last_line_without_newline() -> Result<()> {
        let index = FastaIndex::from_bytes(b">a\nACGT\nACGT")?;
        assert_eq!(index.get("a"), Some(&entry("a", 8, 3, 4, 5)));
        Ok(())
    }

    #[test]
    fn empty_sequence() -> Result<()> {
        let index = FastaIndex::from_bytes(b">a\n>b\nAC\n")?;
        assert_eq!(index.get("a"), Some(&entry("a", 0, 3, 0, 0)));
        assert_eq!(index.get("b"), Some(&entry("b", 2, 6, 2, 3)));
        Ok(())
    }

    #[test]
    fn empty_input() -> Result<()> {
        assert!(FastaIndex::from_bytes(b"")?.is_empty());
        Ok(())
    }

    #[test]
    fn longer_line_fails() {
        let data = b">ok\nAC\n>wide\nACGT\nACGTA\n";
        match FastaIndex::from_bytes(data) {
            Err(Error::Format { context, .. }) => assert!(context.contains("wide")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn content_after_short_line_fails() {
        let data = b">ragged\nACGT\nAC\nACGT\n";
        match FastaIndex::from_bytes(data) {
            Err(Error::Format { context, msg }) => {
                assert!(context.contains("ragged"));
                assert!(msg.contains("line 4"));
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn content_after_blank_line_fails() {
        let data = b">gap\nACGT\n\nACGT\n";
        assert!(matches!(
            FastaIndex::from_bytes(data),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn trailing_blank_lines_are_fine() -> Result<()> {
        let index = FastaIndex::from_bytes(b">a\nACGT\nAC\n\n\n>b\nA\n")?;
        assert_eq!(index.get("a"), Some(&entry("a", 6, 3, 4, 5)));
        assert_eq!(index.get("b"), Some(&entry("b", 1, 16, 1, 2)));
        Ok(())
    }

    #[test]
    fn mixed_terminators_fail() {
        let data = b">a\nACGT\nACGT\r\nAC\n";
        assert!(matches!(
            FastaIndex::from_bytes(data),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn duplicate_names_fail() {
        let data = b">a\nAC\n>a\nGT\n";
        assert!(matches!(
            FastaIndex::from_bytes(data),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn parse_skips_malformed_lines() -> Result<()> {
        let table = "seq1\t10\t6\t6\t7\n\
                     too\tfew\tfields\n\
                     bad\tx\t1\t2\t3\n\
                     neg\t-1\t1\t2\t3\n\
                     extra\t1\t2\t3\t4\t5\n\
                     \n\
                     seq2\t5\t24\t5\t6\n";
        let index = FastaIndex::from_reader(table.as_bytes())?;
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("seq1"), Some(&entry("seq1", 10, 6, 6, 7)));
        assert_eq!(index.get("seq2"), Some(&entry("seq2", 5, 24, 5, 6)));
        assert!(index.get("bad").is_none());
        Ok(())
    }

    #[test]
    fn parse_last_write_wins() -> Result<()> {
        let table = "a\t1\t3\t1\t2\nb\t2\t9\t2\t3\na\t4\t3\t4\t5\n";
        let index = FastaIndex::from_reader(table.as_bytes())?;
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a"), Some(&entry("a", 4, 3, 4, 5)));
        let names: Vec<_> = index.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        Ok(())
    }

    #[test]
    fn parse_keeps_quotes_verbatim() -> Result<()> {
        let index = FastaIndex::from_reader("\"odd\t1\t3\t1\t2\n".as_bytes())?;
        assert!(index.get("\"odd").is_some());
        Ok(())
    }

    #[test]
    fn index_path_appends_suffix() {
        assert_eq!(
            FastaIndex::index_path("data/genome.fa"),
            PathBuf::from("data/genome.fa.fai")
        );
    }

    #[test]
    fn build_file_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fasta = dir.path().join("two.fa");
        fs::write(&fasta, TWO_RECORDS)?;

        let index_path = FastaIndex::build_file(&fasta)?;
        assert_eq!(index_path, dir.path().join("two.fa.fai"));
        let first = fs::read(&index_path)?;
        FastaIndex::build_file(&fasta)?;
        let second = fs::read(&index_path)?;
        assert_eq!(first, second);
        assert_eq!(first, b"seq1\t10\t6\t6\t7\nseq2\t5\t24\t5\t6\n");

        let loaded = FastaIndex::from_filepath(&index_path)?;
        assert_eq!(loaded.get("seq2"), Some(&entry("seq2", 5, 24, 5, 6)));
        Ok(())
    }

    #[test]
    fn failed_build_leaves_no_index() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fasta = dir.path().join("bad.fa");
        fs::write(&fasta, b">bad\nAC\nACGT\n")?;
        assert!(FastaIndex::build_file(&fasta).is_err());
        assert!(!FastaIndex::index_path(&fasta).exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn published_index_uses_default_mode() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let fasta = dir.path().join("two.fa");
        fs::write(&fasta, TWO_RECORDS)?;
        let index_path = FastaIndex::build_file(&fasta)?;

        // a plainly created file gets 0666 & !umask
        let index_mode = fs::metadata(&index_path)?.permissions().mode() & 0o777;
        let fasta_mode = fs::metadata(&fasta)?.permissions().mode() & 0o777;
        assert_eq!(index_mode, fasta_mode);
        Ok(())
    }

    #[test]
    fn build_empty_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fasta = dir.path().join("empty.fa");
        fs::write(&fasta, b"")?;
        assert!(FastaIndex::build(&fasta)?.is_empty());
        Ok(())
    }
}
