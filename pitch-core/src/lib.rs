// pitch-core/src/lib.rs

//! The core logic for the monophonic pitch tracker.
//! This crate is responsible for pitch estimation, note mapping, hold
//! smoothing, note recording and training feedback. It is completely
//! headless and contains no device or GUI code.

pub mod config;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod recording;
pub mod session;
pub mod source;
pub mod tracker;
pub mod training;
pub mod tuning;

pub use config::TunerConfig;
pub use error::{ConfigError, ExportError, SessionError, SourceError};
pub use pitch::{AutocorrelationMethod, PitchEstimate, PitchEstimator};
pub use recording::{RecordedNote, Recording, RecordingSink};
pub use session::{Session, TickReport};
pub use source::{FrameSource, SampleFrame};
pub use tracker::{DisplayState, SignalTracker, TrackedState};
pub use training::{TrainingEvaluator, TrainingResult};
