//! Transcription session orchestration
//!
//! This module turns one audio buffer (or file) into a `TranscriptionResult`:
//! - Input validation (missing files are reported, not raised)
//! - Primary recognition attempt
//! - Degenerate-output detection (empty / generic filler text)
//! - Escalating fallback: stronger prompt, then an alternate model
//! - Optional structured progress reporting for streaming consumers

mod progress;
mod session;

pub use progress::{ProgressEvent, ProgressReporter};
pub use session::TranscriptionSession;
