use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// One transcript entry appended to the notepad. Entries are append-only;
/// nothing in this system mutates or deletes them.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Human-readable completion timestamp
    pub timestamp: String,
    /// Which capture source produced the audio
    pub source_label: String,
    pub text: String,
}

impl LogEntry {
    pub fn now(source_label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source_label: source_label.into(),
            text: text.into(),
        }
    }
}

/// Append-only transcript log.
///
/// A header block (title, start timestamp, model identifier) is written once
/// when the file is created; after that each entry is a
/// `[timestamp] label: text` block separated by blank lines. The file is
/// opened, appended, and closed per write, so no handle is held across
/// recorder cycles.
pub struct TranscriptNotepad {
    path: PathBuf,
    model_id: String,
}

impl TranscriptNotepad {
    pub fn new(path: impl Into<PathBuf>, model_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            model_id: model_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file (and its header) if needed.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }

        if !self.path.exists() {
            self.write_header()?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open notepad file: {:?}", self.path))?;

        writeln!(
            file,
            "[{}] {}: {}\n",
            entry.timestamp, entry.source_label, entry.text
        )
        .context("Failed to append transcript entry")?;

        info!("Transcription saved to {}", self.path.display());
        Ok(())
    }

    fn write_header(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to create notepad file: {:?}", self.path))?;

        writeln!(
            file,
            "=== MEETING TRANSCRIPTIONS ===\nStarted on: {}\nModel: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.model_id
        )
        .context("Failed to write notepad header")?;

        Ok(())
    }
}
