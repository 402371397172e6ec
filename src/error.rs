use std::fmt;

use thiserror::Error;

/// Failure category of a sorting run.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings failed validation before any work started.
    Config,
    /// The video could not be opened.
    SourceUnavailable,
    /// The detector could not be constructed (missing or invalid model).
    DetectorLoad,
    /// The decoder failed while reading frames.
    Decode,
    /// The detector failed on a frame or returned unusable scores.
    Detection,
    /// Resizing or JPEG encoding failed.
    Encode,
    /// A bucket directory or frame file could not be written.
    Filesystem,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::SourceUnavailable => "source unavailable",
            ErrorKind::DetectorLoad => "detector load",
            ErrorKind::Decode => "decode",
            ErrorKind::Detection => "detection",
            ErrorKind::Encode => "encode",
            ErrorKind::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned from a sorting run.
///
/// Collaborator failures arrive as `anyhow::Error`; the full context chain is
/// flattened into `message` so the kind stays matchable by callers.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct SortError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SortError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wrap a collaborator error, keeping its context chain.
    pub fn from_anyhow(kind: ErrorKind, err: anyhow::Error) -> Self {
        Self::new(kind, format!("{:#}", err))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub type SortResult<T> = std::result::Result<T, SortError>;
