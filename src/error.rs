//! Error types for recode-merge.

use thiserror::Error;

/// The main error type for building and running merge statements.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Failed to parse a compact table notation string.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// A joiner or plan was given an empty table list.
    #[error("No tables given: the first table is required as the master")]
    NoTables,

    /// One side of a pairwise join declares no join columns.
    #[error("Cannot join '{input}' onto '{output}': both tables need at least one join column")]
    NoJoinKeys { output: String, input: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MergeError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a missing join key error for the given pair of tables.
    pub fn no_join_keys(output: impl Into<String>, input: impl Into<String>) -> Self {
        Self::NoJoinKeys {
            output: output.into(),
            input: input.into(),
        }
    }
}

impl From<toml::de::Error> for MergeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for recode-merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
