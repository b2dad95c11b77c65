use thiserror::Error;

/// Result type alias for `seqdex` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing, indexing or querying sequence files.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is malformed. `context` names the offending sequence or line.
    #[error("invalid format ({context}): {msg}")]
    Format { context: String, msg: String },

    /// The requested sequence name is not part of the index.
    #[error("sequence '{0}' not found in index")]
    NotFound(String),

    /// Open, seek or read failure, passed through untouched.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Region coordinates outside `1..=length` or inverted.
    #[error("invalid region {start}-{end} for '{name}' of length {length}")]
    Boundary {
        name: String,
        start: u64,
        end: u64,
        length: u64,
    },

    /// The file format does not support the requested operation.
    #[error("{operation} is not supported for {format} files")]
    Unsupported {
        format: &'static str,
        operation: &'static str,
    },
}

impl Error {
    pub(crate) fn in_sequence(name: &str, msg: impl Into<String>) -> Self {
        Error::Format {
            context: format!("sequence '{}'", name),
            msg: msg.into(),
        }
    }

    pub(crate) fn at_line(line: usize, msg: impl Into<String>) -> Self {
        Error::Format {
            context: format!("line {}", line),
            msg: msg.into(),
        }
    }
}
