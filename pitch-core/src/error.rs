//! # Error Types
//!
//! Failures that the analysis pipeline surfaces to its caller. Degenerate
//! signals and malformed note names are not errors: they travel as
//! `PitchEstimate::NoFundamental` or `None`. What remains here are setup
//! failures and API misuse.

use std::path::PathBuf;

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A numeric setting is out of its valid range.
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("frame size must be a power of two of at least 4, got {0}")]
    FrameSize(usize),

    #[error("target note {0:?} is not a valid note name")]
    TargetNote(String),
}

/// Errors from the frame source feeding a session.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The producing side hung up; no more frames will arrive.
    #[error("frame source disconnected")]
    Disconnected,

    #[error("frame has {actual} samples, expected {expected}")]
    FrameLength { expected: usize, actual: usize },

    #[error("invalid sample rate {0} Hz")]
    SampleRate(u32),
}

/// Misuse of the session API.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is not running")]
    NotRunning,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors raised while handing a recording to a sink.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("recording is empty, nothing to export")]
    EmptyRecording,

    #[error("recording is still active; stop it before exporting")]
    RecordingActive,

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export encoding failed: {0}")]
    Encode(String),
}
