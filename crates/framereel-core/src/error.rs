//! Unified error type for framereel.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the CLI to pick a process exit code via [`Error::exit_code`].

use std::fmt;

/// Unified error type covering all failure modes in framereel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The item source produced no work descriptors.
    #[error("no items found in {location}")]
    EmptySource {
        /// Where the source looked (e.g. a directory path).
        location: String,
    },

    /// A single item could not be loaded.
    #[error("failed to load item {index}: {cause}")]
    Load {
        /// Canonical index of the item.
        index: usize,
        /// Human-readable cause.
        cause: String,
    },

    /// The sink could not be opened.
    #[error("sink open failed: {0}")]
    SinkOpen(String),

    /// The sink rejected an item.
    #[error("sink append failed at item {index}: {message}")]
    SinkAppend {
        /// Index of the item being written.
        index: usize,
        /// Human-readable error description.
        message: String,
    },

    /// The sink failed to finalize.
    #[error("sink close failed: {0}")]
    SinkClose(String),

    /// An item arrived for an index that was already released or buffered.
    #[error("ordering anomaly: index {index} arrived while expecting {next_expected}")]
    OrderingAnomaly {
        /// The offending index.
        index: usize,
        /// The next index the reassembler was waiting for.
        next_expected: usize,
    },

    /// The run was cancelled before completion.
    #[error("cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) is missing or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration or argument validation failed.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) => 2,
            Error::EmptySource { .. } => 3,
            Error::Tool { .. } => 4,
            Error::Cancelled => 130,
            _ => 1,
        }
    }

    /// Convenience constructor for [`Error::EmptySource`].
    pub fn empty_source(location: impl fmt::Display) -> Self {
        Error::EmptySource {
            location: location.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Load`].
    pub fn load(index: usize, cause: impl fmt::Display) -> Self {
        Error::Load {
            index,
            cause: cause.to_string(),
        }
    }

    /// Convenience constructor for [`Error::SinkAppend`].
    pub fn sink_append(index: usize, message: impl Into<String>) -> Self {
        Error::SinkAppend {
            index,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error stops the whole pipeline rather than one item.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Load { .. } | Error::OrderingAnomaly { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
