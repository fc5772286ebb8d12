use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

use super::buffer::AudioBuffer;
use super::file::AudioFile;

/// Audio capture source trait
///
/// Implementations:
/// - Microphone: default input device via cpal (all platforms)
/// - File: replay a WAV file (batch processing and tests)
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Capture a fixed-duration window of audio.
    ///
    /// Blocks for the configured duration. An empty buffer means the source
    /// had no data for this window, which callers treat as a dropped cycle
    /// rather than an error.
    async fn capture(&mut self, duration: Duration) -> Result<AudioBuffer>;

    /// Source label used in log entries
    fn label(&self) -> &str;
}

/// Capture source described in configuration
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// Default microphone input
    Microphone,
    /// WAV file replayed as a capture source
    File(String),
}

impl SourceSpec {
    /// Parse a config string like "microphone" or "file:path/to.wav"
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.eq_ignore_ascii_case("microphone") || spec.eq_ignore_ascii_case("mic") {
            return Ok(SourceSpec::Microphone);
        }
        if let Some(path) = spec.strip_prefix("file:") {
            return Ok(SourceSpec::File(path.to_string()));
        }
        anyhow::bail!("Unknown capture source: {}", spec)
    }
}

/// Capture source factory
pub struct CaptureSourceFactory;

impl CaptureSourceFactory {
    pub fn create(spec: &SourceSpec, target_rate: u32) -> Result<Box<dyn CaptureSource>> {
        match spec {
            SourceSpec::Microphone => Ok(Box::new(MicrophoneSource::new(target_rate))),
            SourceSpec::File(path) => {
                let source = FileSource::open(path, target_rate)?;
                Ok(Box::new(source))
            }
        }
    }
}

/// Captures from the default input device and converts to mono at the
/// target rate.
pub struct MicrophoneSource {
    target_rate: u32,
    label: String,
}

impl MicrophoneSource {
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            label: "microphone".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for MicrophoneSource {
    async fn capture(&mut self, duration: Duration) -> Result<AudioBuffer> {
        // The cpal stream lives entirely inside the blocking task; it never
        // crosses an await point.
        let (samples, device_rate, channels) =
            tokio::task::spawn_blocking(move || record_from_default_input(duration))
                .await
                .context("Capture task panicked")??;

        if samples.is_empty() {
            warn!("Empty recording detected");
            return Ok(AudioBuffer::new(Vec::new(), self.target_rate));
        }

        let mono = AudioBuffer::from_interleaved(&samples, device_rate, channels);
        let buffer = mono.downsample_to(self.target_rate)?;

        if buffer.peak() < 0.01 {
            warn!("Audio is very quiet; check that the microphone is not muted");
        }

        Ok(buffer)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Open the default input device and record for `duration`.
///
/// Returns interleaved samples plus the device sample rate and channel count.
fn record_from_default_input(duration: Duration) -> Result<(Vec<f32>, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default input device found")?;

    let config: cpal::StreamConfig = device
        .default_input_config()
        .context("Failed to get default input config")?
        .into();
    let device_rate = config.sample_rate;
    let channels = config.channels;

    info!(
        "Recording {:.1}s from input device at {}Hz, {} channels",
        duration.as_secs_f64(),
        device_rate,
        channels
    );

    let samples = Arc::new(Mutex::new(Vec::<f32>::new()));
    // Signals the audio callback to stop writing before the stream drops
    let shutdown = Arc::new(AtomicBool::new(false));

    let samples_writer = Arc::clone(&samples);
    let shutdown_flag = Arc::clone(&shutdown);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if shutdown_flag.load(Ordering::Acquire) {
                    return;
                }
                let mut buf = samples_writer.lock().unwrap_or_else(|e| {
                    error!("Sample buffer lock poisoned, recovering: {}", e);
                    e.into_inner()
                });
                buf.extend_from_slice(data);
            },
            |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;
    std::thread::sleep(duration);

    shutdown.store(true, Ordering::Release);
    drop(stream);

    let captured = samples.lock().unwrap_or_else(|e| e.into_inner()).clone();
    Ok((captured, device_rate, channels))
}

/// Replays a WAV file as a sequence of capture windows.
///
/// Each call yields the next window of the file; once the file is exhausted
/// every further capture returns an empty buffer.
pub struct FileSource {
    buffer: AudioBuffer,
    cursor: usize,
    label: String,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>, target_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        let file = AudioFile::open(path)?;
        let buffer = file.to_buffer(target_rate)?;

        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            buffer,
            cursor: 0,
            label,
        })
    }
}

#[async_trait::async_trait]
impl CaptureSource for FileSource {
    async fn capture(&mut self, duration: Duration) -> Result<AudioBuffer> {
        let window = (duration.as_secs_f64() * self.buffer.sample_rate as f64) as usize;
        let start = self.cursor.min(self.buffer.len());
        let end = (start + window).min(self.buffer.len());
        self.cursor = end;

        Ok(AudioBuffer::new(
            self.buffer.samples[start..end].to_vec(),
            self.buffer.sample_rate,
        ))
    }

    fn label(&self) -> &str {
        &self.label
    }
}
