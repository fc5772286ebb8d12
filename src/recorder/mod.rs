//! Live meeting recording
//!
//! This module provides the recorder loop that cycles through the configured
//! capture sources and the append-only transcript notepad it persists to.

mod notepad;
mod recorder;

pub use notepad::{LogEntry, TranscriptNotepad};
pub use recorder::{MeetingRecorder, RecorderStats};
