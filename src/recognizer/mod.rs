pub mod whisper;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioBuffer;

pub use whisper::{WhisperProvider, WhisperRecognizer};

/// Timing and confidence for a single recognized word
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    /// Start offset in seconds
    pub start: f32,
    /// End offset in seconds
    pub end: f32,
    /// Mean token probability, 0.0 to 1.0
    pub confidence: f32,
}

/// One recognized segment. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start offset in seconds
    pub start: f32,
    /// End offset in seconds
    pub end: f32,
    /// Word-level timings, present when requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTiming>,
}

/// Terminal output of a transcription session. Written once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub success: bool,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptionResult {
    /// A failed result. Failures never carry segments.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            segments: Vec::new(),
            language: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Options for a single recognition attempt
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    /// Language hint, e.g. "en"
    pub language: String,
    /// Optional instructive prompt prepended to decoding
    pub prompt: Option<String>,
    /// Request word-level timestamps
    pub word_timestamps: bool,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            prompt: None,
            word_timestamps: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("transcription failed: {0}")]
    Inference(String),
}

/// Speech-to-text engine boundary.
///
/// Implementations normalize whatever the underlying engine produces into a
/// canonical [`TranscriptionResult`]; callers never branch on engine shapes.
/// Calls block until the engine returns. Returning a near-empty or generic
/// transcript for silent/noisy audio is legitimate engine behavior that the
/// session layer detects and mitigates.
pub trait Recognizer: Send {
    fn transcribe(
        &mut self,
        audio: &AudioBuffer,
        options: &RecognizeOptions,
    ) -> Result<TranscriptionResult, RecognizerError>;
}

/// Loads recognizers by model identifier.
///
/// The session layer uses this to load its fallback model on demand; tests
/// substitute scripted providers.
pub trait RecognizerProvider: Send {
    fn load(&self, model_id: &str) -> Result<Box<dyn Recognizer>, RecognizerError>;
}
