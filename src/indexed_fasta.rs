use crate::{Error, FastaIndex, FastaRecord, OpenSpec, Result};
use log::{info, warn};
use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

/// An indexed FASTA file.
///
/// This struct is used to fetch sequences from a FASTA file by name.
/// It seeks straight to the first base of a sequence using its
/// `IndexEntry` and reads the sequence line by line, dropping the
/// line terminators.
///
/// Fetching moves the file cursor and therefore takes `&mut self`.
/// Callers that fetch concurrently must either serialize access to one
/// `IndexedFasta` (for example behind a `Mutex`) or open one reader per
/// caller; readers over the same file can share one index with
/// [`IndexedFasta::new`] and [`IndexedFasta::shared_index`].
///
/// # Examples
///
/// ```
/// use seqdex::IndexedFasta;
///
/// let mut faidx = IndexedFasta::open("example_data/example.fa")
///     .expect("Could not open FASTA file");
///
/// // Bases 1 through 10 of chr1
/// let seq = faidx.fetch_region("chr1", 1, 10).unwrap();
/// assert_eq!(seq, b"ACCTACGATC");
/// ```
#[derive(Debug)]
pub struct IndexedFasta {
    index: Arc<FastaIndex>,
    path: PathBuf,
    file: Option<BufReader<File>>,
    buffer: Vec<u8>,
}
impl IndexedFasta {
    /// Create a new `IndexedFasta` from a loaded index and a FASTA path.
    pub fn new<P: AsRef<Path>>(index: impl Into<Arc<FastaIndex>>, path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            index: index.into(),
            path: path.as_ref().to_path_buf(),
            file: Some(BufReader::new(file)),
            buffer: Vec::new(),
        })
    }

    /// Open a FASTA file using the index at `<path>.fai`.
    ///
    /// A missing index is built and written first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_spec(&OpenSpec::new(path))
    }

    /// Open a FASTA file, honouring an explicit index path if one is given.
    pub fn open_spec(spec: &OpenSpec) -> Result<Self> {
        let index_path = spec
            .index
            .clone()
            .unwrap_or_else(|| FastaIndex::index_path(&spec.path));
        if !index_path.try_exists()? {
            info!(
                "FASTA index not found, building {}",
                index_path.display()
            );
            FastaIndex::build(&spec.path)?.write(&index_path)?;
        }
        let index = FastaIndex::from_filepath(&index_path)?;
        Self::new(index, &spec.path)
    }

    pub fn index(&self) -> &FastaIndex {
        &self.index
    }

    /// A handle to the index that can be given to another reader.
    pub fn shared_index(&self) -> Arc<FastaIndex> {
        Arc::clone(&self.index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch a whole sequence by name.
    ///
    /// The returned record has no description (the index does not keep
    /// one) and its type is inferred from the fetched bases.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if `name` is not in the index.
    /// - `Error::Format` if the index entry has impossible line geometry.
    /// - `Error::Io` if seeking or reading fails, or the reader is closed.
    pub fn fetch(&mut self, name: &str) -> Result<FastaRecord> {
        let entry = self
            .index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if entry.length > 0 && (entry.line_bases == 0 || entry.line_bytes < entry.line_bases) {
            return Err(Error::in_sequence(
                name,
                format!(
                    "index entry has {} bases in {} bytes per line",
                    entry.line_bases, entry.line_bytes
                ),
            ));
        }
        let file = self.file.as_mut().ok_or_else(closed)?;
        file.seek(SeekFrom::Start(entry.offset))?;

        // lengths come from an unchecked index file
        let mut seq = Vec::with_capacity(entry.length.min(MAX_PREALLOC) as usize);
        let mut remaining = entry.length;
        while remaining > 0 {
            let chunk = remaining.min(entry.line_bases) as usize;
            self.buffer.clear();
            let read = file
                .by_ref()
                .take(entry.line_bytes)
                .read_to_end(&mut self.buffer)?;
            let bases = chunk.min(read);
            seq.extend_from_slice(&self.buffer[..bases]);
            remaining -= bases as u64;
            if (read as u64) < entry.line_bytes {
                // end of file inside the final line
                break;
            }
        }
        if remaining > 0 {
            warn!(
                "{}: file ended {} bases short of the indexed length",
                name, remaining
            );
        }
        Ok(FastaRecord::new(entry.name.clone(), None, seq))
    }

    /// Fetch bases `start` through `end` (1-based, inclusive) of a sequence.
    ///
    /// Coordinates are checked against the index before any I/O happens.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if `name` is not in the index.
    /// - `Error::Boundary` if `start < 1`, `end` exceeds the sequence length
    ///   or `start > end`.
    pub fn fetch_region(&mut self, name: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        check_region(name, start, end, entry.length)?;
        let record = self.fetch(name)?;
        Ok(record.slice(start, end)?.to_vec())
    }

    /// Release the file handle. Calling this more than once is harmless.
    pub fn close(&mut self) {
        self.file = None;
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

/// Upper bound on the bases reserved before reading a sequence.
const MAX_PREALLOC: u64 = 1 << 20;

/// Validate 1-based inclusive region coordinates against a sequence length.
pub(crate) fn check_region(name: &str, start: u64, end: u64, length: u64) -> Result<()> {
    if start < 1 || end > length || start > end {
        return Err(Error::Boundary {
            name: name.to_string(),
            start,
            end,
            length,
        });
    }
    Ok(())
}

fn closed() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "FASTA reader is closed",
    ))
}
