//! Errors raised while reading, patching or sorting a dictionary file.
use std::path::PathBuf;

/// Errors that can occur when updating a dictionary file.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DictionaryError {
    /// The first line does not hold a decimal entry count
    #[error("Invalid entry count {found:?} in header of '{path}'")]
    Format {
        /// The dictionary file
        path: PathBuf,
        /// The first line as found
        found: String,
    },

    /// Opening, reading, writing or renaming a file failed
    #[error("I/O error on '{path}'")]
    Io {
        /// The file being accessed
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// A new entry is blank or spans more than one line
    #[error("Invalid dictionary entry {0:?}")]
    InvalidEntry(String),

    /// The configured encoding label is not known
    #[error("Unknown character encoding '{0}'")]
    UnknownEncoding(String),

    /// The collation locale cannot be resolved
    #[error("Unsupported collation locale '{locale}': {reason}")]
    UnsupportedLocale {
        /// The configured tag
        locale: String,
        /// Why it was refused
        reason: String,
    },

    /// A word cannot be represented in the dictionary encoding
    #[error("'{word}' cannot be encoded as {encoding}")]
    Unencodable {
        /// The offending word
        word: String,
        /// Name of the dictionary encoding
        encoding: &'static str,
    },

    /// A line of the file is not valid in the dictionary encoding
    #[error("Line {line} of '{path}' is not valid {encoding}")]
    Undecodable {
        /// The file being read
        path: PathBuf,
        /// One-based line number, counting the header
        line: u64,
        /// Name of the dictionary encoding
        encoding: &'static str,
    },
}

impl DictionaryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> DictionaryError {
        let path = path.into();
        move |source| DictionaryError::Io { path, source }
    }

    /// Unwrap into an i/o error.
    pub fn into_io_error(self) -> std::io::Error {
        match self {
            DictionaryError::Io { source, .. } => source,
            e => std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        }
    }
}
