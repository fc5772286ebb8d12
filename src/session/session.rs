use std::path::Path;
use tracing::{info, warn};

use super::progress::{ProgressEvent, ProgressReporter};
use crate::audio::{AudioBuffer, AudioFile};
use crate::config::{ModelConfig, SessionConfig};
use crate::recognizer::{
    RecognizeOptions, Recognizer, RecognizerError, RecognizerProvider, TranscriptionResult,
};

/// Whisper expects 16kHz mono input
const TARGET_SAMPLE_RATE: u32 = 16000;

/// Orchestrates one audio buffer (or file) through recognition with a
/// degenerate-output mitigation policy.
///
/// The primary model loads at construction; construction fails if it cannot
/// be loaded, since no work is possible without it. The fallback model loads
/// lazily on first use and is then held for the life of the session.
pub struct TranscriptionSession {
    primary: Box<dyn Recognizer>,
    fallback: Option<Box<dyn Recognizer>>,
    provider: Box<dyn RecognizerProvider>,
    model: ModelConfig,
    policy: SessionConfig,
    reporter: Option<ProgressReporter>,
}

impl TranscriptionSession {
    pub fn new(
        provider: Box<dyn RecognizerProvider>,
        model: ModelConfig,
        policy: SessionConfig,
    ) -> Result<Self, RecognizerError> {
        let primary = provider.load(&model.primary)?;

        Ok(Self {
            primary,
            fallback: None,
            provider,
            model,
            policy,
            reporter: None,
        })
    }

    /// Attach a progress reporter; records are emitted for each attempt.
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    fn report(&mut self, event: ProgressEvent) {
        if let Some(reporter) = &mut self.reporter {
            reporter.emit(&event);
        }
    }

    /// Transcribe an audio file.
    ///
    /// A missing or unreadable file is reported through the result's `error`
    /// field without any recognizer call; it never panics or raises.
    pub fn transcribe_file(
        &mut self,
        path: impl AsRef<Path>,
        word_timestamps: bool,
    ) -> TranscriptionResult {
        let path = path.as_ref();

        if !path.exists() {
            return TranscriptionResult::failure(format!(
                "Audio file not found: {}",
                path.display()
            ));
        }

        let file = match AudioFile::open(path) {
            Ok(file) => file,
            Err(e) => {
                return TranscriptionResult::failure(format!(
                    "Failed to read audio file {}: {:#}",
                    path.display(),
                    e
                ))
            }
        };

        let buffer = match file.to_buffer(TARGET_SAMPLE_RATE) {
            Ok(buffer) => buffer,
            Err(e) => {
                return TranscriptionResult::failure(format!(
                    "Failed to convert audio file {}: {:#}",
                    path.display(),
                    e
                ))
            }
        };

        if buffer.is_empty() {
            return TranscriptionResult::failure(format!(
                "Audio file contains no samples: {}",
                path.display()
            ));
        }

        self.transcribe_buffer(&buffer, word_timestamps)
    }

    /// Transcribe a buffer with the escalating fallback policy.
    ///
    /// Degenerate (empty or generic) output triggers, in order: a retry with
    /// a stronger instructive prompt, then a retry with the fallback model.
    /// If every attempt stays degenerate the last transcript is returned
    /// anyway; only when no attempt succeeds at all does the result carry an
    /// error.
    pub fn transcribe_buffer(
        &mut self,
        audio: &AudioBuffer,
        word_timestamps: bool,
    ) -> TranscriptionResult {
        let mut options = RecognizeOptions {
            language: self.model.language.clone(),
            prompt: None,
            word_timestamps,
        };

        let mut last_result: Option<TranscriptionResult> = None;
        let mut last_error: Option<RecognizerError> = None;

        // Primary attempt
        self.report(ProgressEvent::Transcribing { attempt: "primary" });
        match self.primary.transcribe(audio, &options) {
            Ok(result) if !self.is_degenerate(&result.text) => {
                self.report(ProgressEvent::Completed { success: true });
                return result;
            }
            Ok(result) => {
                warn!("Model returned generic response: '{}'", result.text);
                self.report(ProgressEvent::DegenerateOutput {
                    text: result.text.clone(),
                });
                last_result = Some(result);
            }
            Err(e) => {
                warn!("Primary transcription attempt failed: {}", e);
                last_error = Some(e);
            }
        }

        // Retry with a stronger instructive prompt
        options.prompt = Some(self.policy.retry_prompt.clone());
        self.report(ProgressEvent::Transcribing {
            attempt: "retry_prompt",
        });
        match self.primary.transcribe(audio, &options) {
            Ok(result) if !self.is_degenerate(&result.text) => {
                info!("Stronger prompt produced a usable transcript");
                self.report(ProgressEvent::Completed { success: true });
                return result;
            }
            Ok(result) => {
                self.report(ProgressEvent::DegenerateOutput {
                    text: result.text.clone(),
                });
                last_result = Some(result);
            }
            Err(e) => {
                warn!("Prompt retry failed: {}", e);
                last_error = Some(e);
            }
        }

        // Retry with the fallback model, loaded on demand
        if let Some(model_id) = self.model.fallback.clone() {
            options.prompt = None;

            if self.fallback.is_none() {
                self.report(ProgressEvent::Loading {
                    model: model_id.clone(),
                });
                match self.provider.load(&model_id) {
                    Ok(recognizer) => self.fallback = Some(recognizer),
                    Err(e) => {
                        warn!("Failed to load fallback model {}: {}", model_id, e);
                        last_error = Some(e);
                    }
                }
            }

            if self.fallback.is_some() {
                self.report(ProgressEvent::Transcribing {
                    attempt: "fallback_model",
                });
            }
            if let Some(fallback) = self.fallback.as_mut() {
                let attempt = fallback.transcribe(audio, &options);
                match attempt {
                    Ok(result) if !self.is_degenerate(&result.text) => {
                        info!("Fallback model produced a usable transcript");
                        self.report(ProgressEvent::Completed { success: true });
                        return result;
                    }
                    Ok(result) => {
                        self.report(ProgressEvent::DegenerateOutput {
                            text: result.text.clone(),
                        });
                        last_result = Some(result);
                    }
                    Err(e) => {
                        warn!("Fallback model attempt failed: {}", e);
                        last_error = Some(e);
                    }
                }
            }
        }

        // Exhausted: a generic transcript is still worth returning
        if let Some(result) = last_result {
            info!("All fallbacks exhausted, returning last transcript as-is");
            self.report(ProgressEvent::Completed { success: true });
            return result;
        }

        self.report(ProgressEvent::Completed { success: false });
        let error = match last_error {
            Some(e) => e.to_string(),
            None => "no transcription attempt succeeded".to_string(),
        };
        TranscriptionResult::failure(error)
    }

    /// Empty text, or a known filler phrase compared case-insensitively
    /// with trailing punctuation ignored ("Thank you." matches "thank you").
    fn is_degenerate(&self, text: &str) -> bool {
        let normalized = text
            .trim()
            .trim_end_matches(['.', '!', ','])
            .to_lowercase();

        if normalized.is_empty() {
            return true;
        }

        self.policy
            .generic_phrases
            .iter()
            .any(|phrase| phrase.trim().to_lowercase() == normalized)
    }
}
