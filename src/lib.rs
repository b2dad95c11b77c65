//! # seqdex
//!
//! `seqdex` reads FASTA and FASTQ files sequentially and gives random access
//! to FASTA sequences by name through a `.fai` index.
//!
//! The index records, for every sequence, its length, the byte offset of its
//! first base and its line geometry. With it, [`IndexedFasta`] seeks straight
//! to a sequence and rebuilds it line by line without scanning the file.
//! A missing index is built on first use and written next to the FASTA file.
//!
//! ## Example
//!
//! Here is an example fasta file:
//!
//! ### example.fa
//!
//! ```text
//! >chr1
//! ACCTACGATCGACTGATCGTAGCTAGCT
//! CATCGATCGTACGGACGATCGATCGGTT
//! CACACCGGGCATGACTGATCGGGGGCCC
//! ACGTGTGTGCAGCGCGCGGCGCGCGCGG
//! >chr2
//! TTTTGATCGATCGGCGGGCGCGCGCGGC
//! CAGATTCGGGCGCGATTATATATTAGCT
//! CGACGGCGACTCGAGCTACACGTCGGGC
//! GCGAGCGGGACGCGCGGCGCGCGCGGCC
//! AAAAAAATTTTTATATATTATTACGCGC
//! CGACTCAGTCGACTGGGGGCGCGCGCGC
//! AAACCACA
//! ```
//!
//! and its corresponding index file, one tab-separated line per sequence
//! with the columns `name, length, offset, line bases, line bytes`:
//!
//! ### example.fa.fai
//!
//! ```text
//! chr1	112	6	28	29
//! chr2	176	128	28	29
//! ```
//!
//! ### Fetching sequences
//!
//! ```rust
//! use seqdex::{IndexedFasta, SequenceType};
//!
//! let mut faidx = IndexedFasta::open("example_data/example.fa")
//!     .expect("Could not open FASTA file");
//!
//! // Fetch a whole sequence
//! let rec = faidx.fetch("chr2").unwrap();
//! assert_eq!(rec.len(), 176);
//! assert_eq!(rec.seq_type, SequenceType::Dna);
//!
//! // Regions are 1-based and include both ends
//! let seq = faidx.fetch_region("chr1", 21, 30).unwrap();
//! assert_eq!(seq, b"AGCTAGCTCA");
//!
//! // The resulting sequence has no newlines
//! assert!(!seq.contains(&b'\n'));
//! ```
//!
//! ### Streaming records
//!
//! ```rust
//! use seqdex::FastaReader;
//!
//! let reader = FastaReader::from_path("example_data/example.fa").unwrap();
//! let ids: Vec<String> = reader.map(|rec| rec.unwrap().id).collect();
//! assert_eq!(ids, ["chr1", "chr2"]);
//! ```
//!
//! ## Concurrency
//!
//! Everything is synchronous. An [`IndexedFasta`] owns one file cursor, so
//! fetching takes `&mut self`; give each thread its own reader (they can
//! share one `Arc<FastaIndex>`) or wrap a reader in a lock.

mod error;
mod fasta_index;
mod fasta_reader;
mod fasta_record;
mod fastq;
mod index_entry;
mod indexed_fasta;
mod sequence_type;
pub mod source;

pub use error::{Error, Result};

/// The `FastaIndex` struct represents a FAI index file.
pub use fasta_index::FastaIndex;

/// The `IndexEntry` struct represents a single entry in a FAI index file.
pub use index_entry::IndexEntry;

/// The `IndexedFasta` struct represents a FASTA file that has been indexed
/// using the FAI format.
pub use indexed_fasta::IndexedFasta;

pub use fasta_reader::FastaReader;
pub use fasta_record::FastaRecord;
pub use fastq::{FastqReader, FastqRecord, PHRED_OFFSET};
pub use sequence_type::{gc_content, SequenceType};
pub use source::{Capabilities, Format, OpenSpec, Region, Source, Symbol};
