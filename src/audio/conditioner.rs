// Audio conditioning ahead of recognition
//
// Two stages: a high-pass noise reduction pass and an energy-based silence
// trim. Both are deliberately conservative and fail open: whenever a
// heuristic does not apply, or a stage risks destroying signal, the original
// buffer is passed through untouched. Losing real speech is worse than
// feeding the recognizer slightly noisy audio.

use thiserror::Error;
use tracing::{debug, warn};

use super::buffer::AudioBuffer;
use super::filter::{butterworth_highpass, filtfilt};
use crate::config::ConditioningConfig;

/// Seconds of leading audio assumed to be background noise
const NOISE_SAMPLE_SECS: f64 = 0.5;

/// Noise power band in which filtering applies. Louder "noise" is treated
/// as actual speech and left alone.
const NOISE_POWER_MAX: f32 = 0.001;

/// High-pass cutoff in Hz
const HIGHPASS_CUTOFF_HZ: f64 = 80.0;

/// Filter order for the noise-reduction high-pass
const HIGHPASS_ORDER: usize = 4;

/// Peak amplitude below which a filtered buffer is considered destroyed
const MIN_FILTERED_PEAK: f32 = 0.01;

/// Samples per short-time energy window
const ENERGY_HOP: usize = 512;

/// Seconds of padding re-added around the detected speech range
const SILENCE_PADDING_SECS: f64 = 0.1;

#[derive(Debug, Error)]
pub enum ConditioningError {
    #[error("buffer has no sample rate")]
    InvalidSampleRate,

    #[error("high-pass filter produced non-finite samples")]
    UnstableFilter,
}

/// Conditions captured audio before it is handed to a recognizer.
pub struct SignalConditioner {
    config: ConditioningConfig,
}

impl SignalConditioner {
    pub fn new(config: ConditioningConfig) -> Self {
        Self { config }
    }

    /// Run the enabled conditioning stages over `buffer`.
    ///
    /// This is the orchestration boundary: any internal stage failure is
    /// logged and collapsed to "use the original buffer".
    pub fn condition(&self, buffer: AudioBuffer) -> AudioBuffer {
        let mut current = buffer;

        if self.config.noise_reduction {
            match self.reduce_noise(&current) {
                Ok(filtered) => current = filtered,
                Err(e) => warn!("Noise reduction failed, using original audio: {}", e),
            }
        }

        if self.config.silence_removal {
            match self.remove_silence(&current) {
                Ok(trimmed) => current = trimmed,
                Err(e) => warn!("Silence removal failed, using original audio: {}", e),
            }
        }

        current
    }

    /// High-pass filter the buffer when its leading 0.5s looks like quiet
    /// background noise.
    ///
    /// Returns the input unchanged when the buffer is shorter than the noise
    /// window, when the estimated noise power falls outside `(0, 0.001)`, or
    /// when filtering would leave almost no signal behind.
    pub fn reduce_noise(&self, buffer: &AudioBuffer) -> Result<AudioBuffer, ConditioningError> {
        if buffer.sample_rate == 0 {
            return Err(ConditioningError::InvalidSampleRate);
        }

        let noise_len = (buffer.sample_rate as f64 * NOISE_SAMPLE_SECS) as usize;
        if buffer.len() <= noise_len {
            debug!("Audio too short for noise analysis, skipping");
            return Ok(buffer.clone());
        }

        let noise_power = buffer.samples[..noise_len]
            .iter()
            .map(|&s| s * s)
            .sum::<f32>()
            / noise_len as f32;
        debug!("Estimated noise power: {:.8}", noise_power);

        if !(noise_power > 0.0 && noise_power < NOISE_POWER_MAX) {
            debug!("Noise level not suitable for reduction");
            return Ok(buffer.clone());
        }

        let sections = butterworth_highpass(
            HIGHPASS_ORDER,
            HIGHPASS_CUTOFF_HZ,
            buffer.sample_rate as f64,
        );
        let filtered = filtfilt(&sections, &buffer.samples);

        if filtered.iter().any(|s| !s.is_finite()) {
            return Err(ConditioningError::UnstableFilter);
        }

        let filtered = AudioBuffer::new(filtered, buffer.sample_rate);
        if filtered.peak() < MIN_FILTERED_PEAK {
            debug!("Filtered signal too weak, keeping original audio");
            return Ok(buffer.clone());
        }

        Ok(filtered)
    }

    /// Trim leading and trailing silence using short-time RMS energy.
    ///
    /// Frames above `0.5 * mean + 0.1 * max` of the energy profile are
    /// treated as active. The selected range keeps one window of margin on
    /// each side plus 100ms of padding, clamped to the buffer. A buffer with
    /// no active frames is returned unchanged.
    pub fn remove_silence(&self, buffer: &AudioBuffer) -> Result<AudioBuffer, ConditioningError> {
        if buffer.sample_rate == 0 {
            return Err(ConditioningError::InvalidSampleRate);
        }
        if buffer.is_empty() {
            return Ok(buffer.clone());
        }

        let energy: Vec<f32> = buffer
            .samples
            .chunks(ENERGY_HOP)
            .map(|window| {
                (window.iter().map(|&s| s * s).sum::<f32>() / window.len() as f32).sqrt()
            })
            .collect();

        let mean = energy.iter().sum::<f32>() / energy.len() as f32;
        let max = energy.iter().fold(0.0f32, |acc, &e| acc.max(e));
        let threshold = 0.5 * mean + 0.1 * max;
        debug!("Silence threshold: {:.8}", threshold);

        let first_frame = match energy.iter().position(|&e| e > threshold) {
            Some(frame) => frame,
            None => {
                debug!("No active frames found, keeping original audio");
                return Ok(buffer.clone());
            }
        };
        // position() found a frame, so rposition() will too
        let last_frame = energy
            .iter()
            .rposition(|&e| e > threshold)
            .unwrap_or(first_frame);

        // Frame indices back to samples, one window of margin each side
        let first_sample = (first_frame * ENERGY_HOP).saturating_sub(ENERGY_HOP);
        let last_sample = buffer.len().min((last_frame + 1) * ENERGY_HOP + ENERGY_HOP);

        // Re-expand by the configured padding, clamped to the buffer
        let padding = (buffer.sample_rate as f64 * SILENCE_PADDING_SECS) as usize;
        let padded_start = first_sample.saturating_sub(padding);
        let padded_end = buffer.len().min(last_sample + padding);

        debug!(
            "Trimmed audio from {} to {} samples",
            buffer.len(),
            padded_end - padded_start
        );

        Ok(AudioBuffer::new(
            buffer.samples[padded_start..padded_end].to_vec(),
            buffer.sample_rate,
        ))
    }
}
