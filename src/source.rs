//! The read-only surface offered to presentation layers.
//!
//! Each supported file format is one variant of [`Source`] and reports a
//! static [`Capabilities`] mask describing which operations it answers.

use crate::{Error, FastqReader, IndexedFasta, Result};
use std::{
    fs::File,
    io::BufReader,
    ops::BitOr,
    path::{Path, PathBuf},
};

/// Bitmask of the operations a [`Source`] supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);
impl Capabilities {
    /// Region-limited sequence queries.
    pub const REGIONS: Self = Self(1);
    /// Streaming every record in order.
    pub const ITER_ROWS: Self = Self(1 << 1);
    /// Per-base coverage tracks.
    pub const COVERAGE: Self = Self(1 << 2);
    /// Pileup tracks.
    pub const PILEUP: Self = Self(1 << 3);
    /// Lookup of sequences by name.
    pub const SYMBOLS: Self = Self(1 << 4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A named sequence and its length in bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub length: u64,
}

/// An interval on a named sequence, 1-based with both ends included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub reference: String,
    pub start: u64,
    pub end: u64,
}
impl Region {
    pub fn new(reference: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            reference: reference.into(),
            start,
            end,
        }
    }
}

/// Everything needed to open a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSpec {
    pub path: PathBuf,
    /// Explicit index location, `<path>.fai` when absent.
    pub index: Option<PathBuf>,
}
impl OpenSpec {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            index: None,
        }
    }

    pub fn with_index<P: AsRef<Path>>(mut self, index: P) -> Self {
        self.index = Some(index.as_ref().to_path_buf());
        self
    }
}

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Fasta,
    Fastq,
}
impl Format {
    /// Guess the format from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "fa" | "fasta" | "fna" | "faa" | "ffn" => Some(Format::Fasta),
            "fq" | "fastq" => Some(Format::Fastq),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Fasta => "FASTA",
            Format::Fastq => "FASTQ",
        }
    }
}

/// Indexed FASTA: symbol lookup and region queries, no row iteration.
#[derive(Debug)]
pub struct FastaSource {
    reader: IndexedFasta,
}
impl FastaSource {
    pub const CAPABILITIES: Capabilities = Capabilities::SYMBOLS.union(Capabilities::REGIONS);

    pub fn open(spec: &OpenSpec) -> Result<Self> {
        Ok(Self {
            reader: IndexedFasta::open_spec(spec)?,
        })
    }

    /// All indexed sequences in file order.
    pub fn list_symbols(&self) -> Vec<Symbol> {
        self.reader
            .index()
            .iter()
            .map(|entry| Symbol {
                name: entry.name.clone(),
                length: entry.length,
            })
            .collect()
    }

    /// The full extent `[1, length]` of a sequence.
    ///
    /// An empty sequence has no such extent and yields `Error::Boundary`.
    pub fn lookup_symbol(&self, name: &str) -> Result<Region> {
        let entry = self
            .reader
            .index()
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if entry.length == 0 {
            return Err(Error::Boundary {
                name: name.to_string(),
                start: 1,
                end: 0,
                length: 0,
            });
        }
        Ok(Region::new(name, 1, entry.length))
    }

    pub fn fetch_region(&mut self, region: &Region) -> Result<Vec<u8>> {
        self.reader
            .fetch_region(&region.reference, region.start, region.end)
    }

    pub fn reader(&mut self) -> &mut IndexedFasta {
        &mut self.reader
    }

    pub fn close(&mut self) {
        self.reader.close();
    }
}

/// FASTQ: sequential row iteration only.
#[derive(Debug)]
pub struct FastqSource {
    path: PathBuf,
}
impl FastqSource {
    pub const CAPABILITIES: Capabilities = Capabilities::ITER_ROWS;

    pub fn open(spec: &OpenSpec) -> Result<Self> {
        File::open(&spec.path)?;
        Ok(Self {
            path: spec.path.clone(),
        })
    }

    /// A fresh reader over every record of the file.
    pub fn rows(&self) -> Result<FastqReader<BufReader<File>>> {
        FastqReader::from_path(&self.path)
    }
}

/// A file opened for the presentation layer.
///
/// ```
/// use seqdex::{Capabilities, Format, OpenSpec, Region, Source};
///
/// let mut source = Source::open(Format::Fasta, &OpenSpec::new("example_data/example.fa"))
///     .expect("Could not open FASTA file");
/// assert!(source.capabilities().contains(Capabilities::SYMBOLS));
/// assert!(!source.capabilities().contains(Capabilities::ITER_ROWS));
///
/// let region = source.lookup_symbol("chr1").unwrap();
/// assert_eq!(region, Region::new("chr1", 1, 112));
/// let seq = source.fetch_region(&Region::new("chr1", 1, 4)).unwrap();
/// assert_eq!(seq, b"ACCT");
/// ```
#[derive(Debug)]
pub enum Source {
    Fasta(FastaSource),
    Fastq(FastqSource),
}
impl Source {
    pub fn open(format: Format, spec: &OpenSpec) -> Result<Self> {
        Ok(match format {
            Format::Fasta => Source::Fasta(FastaSource::open(spec)?),
            Format::Fastq => Source::Fastq(FastqSource::open(spec)?),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            Source::Fasta(_) => Format::Fasta,
            Source::Fastq(_) => Format::Fastq,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Source::Fasta(_) => FastaSource::CAPABILITIES,
            Source::Fastq(_) => FastqSource::CAPABILITIES,
        }
    }

    pub fn list_symbols(&self) -> Result<Vec<Symbol>> {
        match self {
            Source::Fasta(fasta) => Ok(fasta.list_symbols()),
            Source::Fastq(_) => Err(unsupported(Format::Fastq, "symbol listing")),
        }
    }

    pub fn lookup_symbol(&self, name: &str) -> Result<Region> {
        match self {
            Source::Fasta(fasta) => fasta.lookup_symbol(name),
            Source::Fastq(_) => Err(unsupported(Format::Fastq, "symbol lookup")),
        }
    }

    pub fn fetch_region(&mut self, region: &Region) -> Result<Vec<u8>> {
        match self {
            Source::Fasta(fasta) => fasta.fetch_region(region),
            Source::Fastq(_) => Err(unsupported(Format::Fastq, "region query")),
        }
    }

    pub fn rows(&self) -> Result<FastqReader<BufReader<File>>> {
        match self {
            Source::Fastq(fastq) => fastq.rows(),
            Source::Fasta(_) => Err(unsupported(Format::Fasta, "row iteration")),
        }
    }

    pub fn close(&mut self) {
        if let Source::Fasta(fasta) = self {
            fasta.close();
        }
    }
}

fn unsupported(format: Format, operation: &'static str) -> Error {
    Error::Unsupported {
        format: format.name(),
        operation,
    }
}
