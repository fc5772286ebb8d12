use serde::Serialize;
use std::io::Write;
use tracing::warn;

/// A self-contained progress record emitted while a session runs.
///
/// Serialized as one JSON object per line so a consumer can stream progress
/// before the terminal result arrives.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A model is being loaded (fallback models load on demand)
    Loading { model: String },
    /// A recognition attempt is starting
    Transcribing { attempt: &'static str },
    /// The last attempt produced empty or generic filler text
    DegenerateOutput { text: String },
    /// The session finished
    Completed { success: bool },
}

/// Writes progress records as JSON lines, flushing after each one.
pub struct ProgressReporter {
    out: Box<dyn Write + Send>,
}

impl ProgressReporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Emit one record. Reporting is best-effort; a write failure is logged
    /// and never interrupts the session.
    pub fn emit(&mut self, event: &ProgressEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                if writeln!(self.out, "{}", line).and_then(|_| self.out.flush()).is_err() {
                    warn!("Failed to write progress record");
                }
            }
            Err(e) => warn!("Failed to serialize progress record: {}", e),
        }
    }
}
