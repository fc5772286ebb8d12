use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use tracing::info;

use super::buffer::AudioBuffer;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Convert to a mono buffer at `target_rate`, averaging channels and
    /// decimating as needed.
    pub fn to_buffer(&self, target_rate: u32) -> Result<AudioBuffer> {
        let mono = AudioBuffer::from_interleaved(&self.samples, self.sample_rate, self.channels);
        mono.downsample_to(target_rate)
    }

    /// Save a buffer as a 16-bit PCM WAV file.
    pub fn save(path: impl AsRef<Path>, buffer: &AudioBuffer) -> Result<()> {
        let path = path.as_ref();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for &sample in &buffer.samples {
            let clamped = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32);
            writer.write_sample(clamped as i16)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize()
            .context("Failed to finalize WAV file")?;

        info!("Audio saved to {}", path.display());
        Ok(())
    }
}
