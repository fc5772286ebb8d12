use anyhow::Result;
use serde::Deserialize;

/// Top-level configuration, merged from built-in defaults, an optional TOML
/// file, and `MEETING_SCRIBE_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub model: ModelConfig,
    pub session: SessionConfig,
    pub conditioning: ConditioningConfig,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate for the whole pipeline (Whisper expects 16kHz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the primary Whisper model (GGML format)
    pub primary: String,
    /// Optional smaller model to retry with when output looks degenerate
    pub fallback: Option<String>,
    /// Transcription language hint
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Filler phrases the model is known to emit on silence or noise.
    /// Compared case-insensitively with trailing punctuation stripped.
    pub generic_phrases: Vec<String>,
    /// Instructive prompt used for the first retry attempt
    pub retry_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    pub noise_reduction: bool,
    pub silence_removal: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory for saved clips and the notepad file
    pub output_dir: String,
    /// Notepad file that transcripts are appended to
    pub notepad_file: String,
    /// Duration of each capture window in seconds
    pub record_secs: u64,
    /// Save each captured clip as a WAV file before transcription
    pub save_clips: bool,
    /// Capture sources, e.g. "microphone" or "file:tests/fixtures/sample.wav"
    pub sources: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            model: ModelConfig::default(),
            session: SessionConfig::default(),
            conditioning: ConditioningConfig::default(),
            recorder: RecorderConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Whisper expects 16kHz
            channels: 1,        // Mono
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            primary: "models/ggml-base.en.bin".to_string(),
            fallback: Some("models/ggml-tiny.en.bin".to_string()),
            language: "en".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generic_phrases: vec!["thank you".to_string(), "thanks".to_string()],
            retry_prompt: "Please transcribe the following audio accurately:".to_string(),
        }
    }
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            noise_reduction: true,
            silence_removal: true,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: "recordings".to_string(),
            notepad_file: "recordings/transcriptions.txt".to_string(),
            record_secs: 5,
            save_clips: true,
            sources: vec!["microphone".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from an optional file path, falling back to
    /// `config/meeting-scribe` and built-in defaults. Environment variables
    /// prefixed with `MEETING_SCRIBE_` override file values, e.g.
    /// `MEETING_SCRIBE_RECORDER__RECORD_SECS=10`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = config::File::with_name(path.unwrap_or("config/meeting-scribe"))
            .required(path.is_some());

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("MEETING_SCRIBE").separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
