use std::fmt;

/// The biological alphabet a sequence most likely belongs to.
///
/// Inference is a best-effort heuristic over the characters present, not a
/// guarantee of biological correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceType {
    #[default]
    Unknown,
    Dna,
    Rna,
    Protein,
}

impl SequenceType {
    /// Infer the alphabet of `seq` in a single case-insensitive scan.
    ///
    /// Decision order:
    /// 1. any amino-acid-only character (`E F I L P Q Z X *`) gives `Protein`
    /// 2. both `T` and `U` give `Unknown`
    /// 3. `U` without `T` gives `Rna`
    /// 4. everything else, including all-gap or all-`N` input, gives `Dna`
    ///
    /// ```
    /// use seqdex::SequenceType;
    ///
    /// assert_eq!(SequenceType::infer(b"ACGT"), SequenceType::Dna);
    /// assert_eq!(SequenceType::infer(b"ACGU"), SequenceType::Rna);
    /// assert_eq!(SequenceType::infer(b"ACGTU"), SequenceType::Unknown);
    /// assert_eq!(SequenceType::infer(b"MEF"), SequenceType::Protein);
    /// ```
    pub fn infer(seq: &[u8]) -> Self {
        let mut has_t = false;
        let mut has_u = false;
        let mut has_protein = false;
        for &b in seq {
            match b.to_ascii_uppercase() {
                b'T' => has_t = true,
                b'U' => has_u = true,
                b'E' | b'F' | b'I' | b'L' | b'P' | b'Q' | b'Z' | b'X' | b'*' => has_protein = true,
                _ => {}
            }
        }
        if has_protein {
            SequenceType::Protein
        } else if has_t && has_u {
            SequenceType::Unknown
        } else if has_u {
            SequenceType::Rna
        } else {
            SequenceType::Dna
        }
    }

    /// Check every byte of `seq` against this alphabet.
    ///
    /// `Unknown` has no alphabet and never validates.
    pub fn validate(self, seq: &[u8]) -> bool {
        let valid: fn(u8) -> bool = match self {
            SequenceType::Dna => is_dna,
            SequenceType::Rna => is_rna,
            SequenceType::Protein => is_protein,
            SequenceType::Unknown => return false,
        };
        seq.iter().all(|&b| valid(b))
    }

    /// Position of the first byte outside this alphabet, if any.
    pub fn first_invalid(self, seq: &[u8]) -> Option<usize> {
        match self {
            SequenceType::Unknown => (!seq.is_empty()).then_some(0),
            _ => seq.iter().position(|b| !self.validate(std::slice::from_ref(b))),
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceType::Unknown => "Unknown",
            SequenceType::Dna => "DNA",
            SequenceType::Rna => "RNA",
            SequenceType::Protein => "Protein",
        };
        f.write_str(name)
    }
}

/// IUPAC nucleotide ambiguity codes shared by DNA and RNA.
fn is_ambiguity(b: u8) -> bool {
    matches!(
        b,
        b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'D' | b'H' | b'V' | b'N'
    )
}

fn is_dna(b: u8) -> bool {
    // U is tolerated in DNA
    let b = b.to_ascii_uppercase();
    matches!(b, b'A' | b'C' | b'G' | b'T' | b'U' | b'-') || is_ambiguity(b)
}

fn is_rna(b: u8) -> bool {
    let b = b.to_ascii_uppercase();
    matches!(b, b'A' | b'C' | b'G' | b'U' | b'-') || is_ambiguity(b)
}

fn is_protein(b: u8) -> bool {
    match b {
        b'*' | b'-' => true,
        _ => matches!(
            b.to_ascii_uppercase(),
            b'A' | b'C'
                | b'D'
                | b'E'
                | b'F'
                | b'G'
                | b'H'
                | b'I'
                | b'K'
                | b'L'
                | b'M'
                | b'N'
                | b'P'
                | b'Q'
                | b'R'
                | b'S'
                | b'T'
                | b'V'
                | b'W'
                | b'Y'
                | b'B'
                | b'Z'
                | b'X'
        ),
    }
}

/// Fraction of `G`/`C` bases (case-insensitive) in `seq`, `0.0` when empty.
pub fn gc_content(seq: &[u8]) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let gc = seq
        .iter()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C'))
        .count();
    gc as f64 / seq.len() as f64
}
