use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::notepad::{LogEntry, TranscriptNotepad};
use crate::audio::{AudioFile, CaptureSource, SignalConditioner};
use crate::config::RecorderConfig;
use crate::session::TranscriptionSession;

/// Peak amplitude captures are normalized to before conditioning
const NORMALIZE_PEAK: f32 = 0.9;

/// Statistics about a completed recorder run
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStats {
    /// When the recorder started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Capture cycles attempted across all sources
    pub cycles: usize,

    /// Transcript entries appended to the notepad
    pub entries_appended: usize,

    /// Cycles skipped because capture yielded no data or failed
    pub dropped_cycles: usize,
}

/// Drives repeated capture → condition → transcribe → append cycles across
/// the configured sources until the stop flag is set.
///
/// Everything runs sequentially: one source's cycle completes before the
/// next begins. The stop flag is observed between cycles and between
/// pipeline stages, so an in-flight capture or transcription always
/// completes before the loop winds down. Per-cycle failures never terminate
/// the loop; only the stop flag does.
pub struct MeetingRecorder {
    sources: Vec<Box<dyn CaptureSource>>,
    conditioner: SignalConditioner,
    session: TranscriptionSession,
    notepad: TranscriptNotepad,
    config: RecorderConfig,
    stop: Arc<AtomicBool>,
}

impl MeetingRecorder {
    pub fn new(
        sources: Vec<Box<dyn CaptureSource>>,
        conditioner: SignalConditioner,
        session: TranscriptionSession,
        notepad: TranscriptNotepad,
        config: RecorderConfig,
    ) -> Result<Self> {
        anyhow::ensure!(!sources.is_empty(), "No capture sources configured");

        std::fs::create_dir_all(&config.output_dir)
            .context("Failed to create output directory")?;

        Ok(Self {
            sources,
            conditioner,
            session,
            notepad,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the loop; typically set from a ctrl-c handler.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run capture cycles until the stop flag is set.
    pub async fn run(&mut self) -> Result<RecorderStats> {
        let started_at = Utc::now();
        let window = Duration::from_secs(self.config.record_secs);

        info!(
            "Meeting recording started: {} sources, {}s windows, notepad at {}",
            self.sources.len(),
            self.config.record_secs,
            self.notepad.path().display()
        );

        let mut cycles = 0usize;
        let mut entries_appended = 0usize;
        let mut dropped_cycles = 0usize;

        'recording: while !self.stopped() {
            for index in 0..self.sources.len() {
                if self.stopped() {
                    break 'recording;
                }

                cycles += 1;
                let label = self.sources[index].label().to_string();
                info!("Recording from {}...", label);

                let captured = match self.sources[index].capture(window).await {
                    Ok(buffer) => buffer,
                    Err(e) => {
                        warn!("Capture from {} failed: {:#}", label, e);
                        dropped_cycles += 1;
                        continue;
                    }
                };

                // A dropped cycle is not an error
                if captured.is_empty() {
                    info!("No audio captured from {}, skipping cycle", label);
                    dropped_cycles += 1;
                    continue;
                }

                if self.stopped() {
                    break 'recording;
                }

                let mut buffer = captured;
                buffer.normalize_to(NORMALIZE_PEAK);

                if self.config.save_clips {
                    if let Err(e) = AudioFile::save(self.clip_path(&label), &buffer) {
                        warn!("Failed to save clip from {}: {:#}", label, e);
                    }
                }

                let conditioned = self.conditioner.condition(buffer);

                if self.stopped() {
                    break 'recording;
                }

                let result = self.session.transcribe_buffer(&conditioned, false);

                if result.success && !result.text.trim().is_empty() {
                    let entry = LogEntry::now(label.clone(), result.text.trim());
                    match self.notepad.append(&entry) {
                        Ok(()) => entries_appended += 1,
                        Err(e) => {
                            // Persistence failures are reported, never fatal
                            error!("Failed to append transcript, continuing: {:#}", e);
                        }
                    }
                } else if let Some(err) = &result.error {
                    warn!("Transcription from {} failed: {}", label, err);
                } else {
                    info!("Empty transcript from {}, nothing to append", label);
                }
            }
        }

        let stats = RecorderStats {
            started_at,
            duration_secs: Utc::now()
                .signed_duration_since(started_at)
                .num_milliseconds() as f64
                / 1000.0,
            cycles,
            entries_appended,
            dropped_cycles,
        };

        info!(
            "Meeting recording stopped: {} cycles, {} entries, {} dropped",
            stats.cycles, stats.entries_appended, stats.dropped_cycles
        );

        Ok(stats)
    }

    fn clip_path(&self, label: &str) -> PathBuf {
        let filename = format!(
            "{}-{}-{}.wav",
            label,
            Local::now().format("%Y%m%d_%H%M%S"),
            &uuid::Uuid::new_v4().to_string()[..8]
        );
        PathBuf::from(&self.config.output_dir).join(filename)
    }
}
