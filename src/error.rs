//! Error types for training, persistence, and game-state validation.

use thiserror::Error;

/// Errors surfaced by the trainer, the evaluator, and the on-disk formats.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Filesystem error while reading or writing a checkpoint, blueprint,
    /// or bucket table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file existed but did not parse as the expected format.
    #[error("corrupt file {path}: {source}")]
    Corrupt {
        /// Path of the offending file.
        path: String,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// A file parsed but carries an unsupported format version.
    #[error("{path}: unsupported format version {found} (expected {expected})")]
    FormatVersion {
        /// Path of the offending file.
        path: String,
        /// Version found in the file header.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// A bucket table file has the wrong shape (entry count, street count,
    /// or bucket count does not match its own header).
    #[error("bucket table {path} is malformed: {reason}")]
    BucketTable {
        /// Path of the offending file.
        path: String,
        /// What did not line up.
        reason: String,
    },

    /// An action outside the legal mask was applied. Always a bug in the
    /// abstraction or legality filter, never recoverable.
    #[error("illegal action {action} applied at {context}")]
    IllegalAction {
        /// Abstract action id that was attempted.
        action: u8,
        /// Short description of where it happened.
        context: String,
    },

    /// A game-state invariant (chip conservation, negative stack, ...) was
    /// violated. Fail fast; the state dump is in the message.
    #[error("game invariant violated: {0}")]
    Invariant(String),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Serialize a value to a JSON file, mapping failures to [`SolverError`].
pub(crate) fn write_json<T: serde::Serialize>(path: &str, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer(writer, value).map_err(|e| SolverError::Corrupt {
        path: path.to_string(),
        source: e,
    })
}

/// Deserialize a value from a JSON file, mapping failures to [`SolverError`].
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| SolverError::Corrupt {
        path: path.to_string(),
        source: e,
    })
}
