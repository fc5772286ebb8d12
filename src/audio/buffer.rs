use anyhow::Result;

/// A mono audio buffer at a fixed sample rate.
///
/// Every stage of the pipeline exchanges these by value; there is no shared
/// mutable audio state anywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    /// Audio samples in the range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Peak absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// Scale samples so the peak amplitude equals `target_peak`.
    ///
    /// Protects against clipping on loud captures and amplifies very quiet
    /// ones. A silent buffer is left untouched.
    pub fn normalize_to(&mut self, target_peak: f32) {
        let peak = self.peak();
        if peak <= 0.0 {
            return;
        }
        let gain = target_peak / peak;
        for sample in &mut self.samples {
            *sample *= gain;
        }
    }

    /// Build a mono buffer from interleaved samples by averaging channels.
    pub fn from_interleaved(samples: &[f32], sample_rate: u32, channels: u16) -> Self {
        if channels <= 1 {
            return Self::new(samples.to_vec(), sample_rate);
        }

        let channels = channels as usize;
        let mut mono = Vec::with_capacity(samples.len() / channels);
        for frame in samples.chunks(channels) {
            let sum: f32 = frame.iter().sum();
            mono.push(sum / frame.len() as f32);
        }
        Self::new(mono, sample_rate)
    }

    /// Downsample to `target_rate` by decimation (picks the nearest source
    /// sample for each output sample). Upsampling is not supported.
    pub fn downsample_to(&self, target_rate: u32) -> Result<AudioBuffer> {
        if self.sample_rate == target_rate {
            return Ok(self.clone());
        }
        if self.sample_rate < target_rate {
            anyhow::bail!(
                "Cannot upsample from {}Hz to {}Hz",
                self.sample_rate,
                target_rate
            );
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = (self.samples.len() as f64 / ratio) as usize;
        let mut downsampled = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let src = (i as f64 * ratio) as usize;
            downsampled.push(self.samples[src.min(self.samples.len() - 1)]);
        }

        Ok(AudioBuffer::new(downsampled, target_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_to_target_peak() {
        let mut buffer = AudioBuffer::new(vec![0.1, -0.3, 0.2], 16000);
        buffer.normalize_to(0.9);

        let peak = buffer.peak();
        assert!((peak - 0.9).abs() < 1e-6, "peak should be 0.9, got {}", peak);
    }

    #[test]
    fn test_normalize_silent_buffer_is_noop() {
        let mut buffer = AudioBuffer::new(vec![0.0; 100], 16000);
        buffer.normalize_to(0.9);

        assert!(buffer.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_from_interleaved_averages_channels() {
        let interleaved = [0.2, 0.4, -0.2, -0.4];
        let mono = AudioBuffer::from_interleaved(&interleaved, 16000, 2);

        assert_eq!(mono.samples.len(), 2);
        assert!((mono.samples[0] - 0.3).abs() < 1e-6);
        assert!((mono.samples[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_downsample_halves_length() {
        let buffer = AudioBuffer::new(vec![0.5; 32000], 32000);
        let downsampled = buffer.downsample_to(16000).unwrap();

        assert_eq!(downsampled.sample_rate, 16000);
        assert_eq!(downsampled.samples.len(), 16000);
    }

    #[test]
    fn test_downsample_rejects_upsampling() {
        let buffer = AudioBuffer::new(vec![0.0; 8000], 8000);
        assert!(buffer.downsample_to(16000).is_err());
    }

    #[test]
    fn test_duration_seconds() {
        let buffer = AudioBuffer::new(vec![0.0; 16000], 16000);
        assert!((buffer.duration_seconds() - 1.0).abs() < 1e-9);
    }
}
