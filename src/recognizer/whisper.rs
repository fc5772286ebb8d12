use std::path::Path;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{
    RecognizeOptions, Recognizer, RecognizerError, RecognizerProvider, TranscriptSegment,
    TranscriptionResult, WordTiming,
};
use crate::audio::AudioBuffer;

/// Whisper-backed recognizer.
///
/// Wraps a whisper.cpp context and normalizes its segment/token output into
/// the canonical [`TranscriptionResult`]. The context is loaded once and
/// reused for every call.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
}

impl WhisperRecognizer {
    pub fn load(model_path: &str) -> Result<Self, RecognizerError> {
        let path = Path::new(model_path);
        if !path.exists() {
            return Err(RecognizerError::ModelLoad {
                model: model_path.to_string(),
                reason: "model file not found".to_string(),
            });
        }

        info!("Loading Whisper model '{}'. This may take a moment...", model_path);

        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| RecognizerError::ModelLoad {
                model: model_path.to_string(),
                reason: e.to_string(),
            })?;

        info!("Model loaded successfully");

        Ok(Self { ctx })
    }
}

impl Recognizer for WhisperRecognizer {
    fn transcribe(
        &mut self,
        audio: &AudioBuffer,
        options: &RecognizeOptions,
    ) -> Result<TranscriptionResult, RecognizerError> {
        if audio.is_empty() {
            return Err(RecognizerError::Inference(
                "no audio samples provided".to_string(),
            ));
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&options.language));
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_token_timestamps(options.word_timestamps);
        if let Some(prompt) = &options.prompt {
            params.set_initial_prompt(prompt);
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| RecognizerError::Inference(e.to_string()))?;

        state
            .full(params, &audio.samples)
            .map_err(|e| RecognizerError::Inference(e.to_string()))?;

        let num_segments = state.full_n_segments();
        let mut segments = Vec::with_capacity(num_segments as usize);
        let mut text = String::new();

        for i in 0..num_segments {
            let segment = state.get_segment(i).ok_or_else(|| {
                RecognizerError::Inference(format!("failed to get segment {}", i))
            })?;

            let segment_text = segment.to_string().trim().to_string();
            if segment_text.is_empty() {
                continue;
            }

            let words = if options.word_timestamps {
                let mut tokens = Vec::new();
                for j in 0..segment.n_tokens() {
                    let Some(token) = segment.get_token(j) else {
                        continue;
                    };
                    let Ok(token_text) = token.to_str() else {
                        continue;
                    };
                    let data = token.token_data();
                    tokens.push(TokenTiming {
                        text: token_text.to_string(),
                        start: data.t0 as f32 / 100.0,
                        end: data.t1 as f32 / 100.0,
                        probability: data.p,
                    });
                }
                group_words(&tokens)
            } else {
                Vec::new()
            };

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&segment_text);

            segments.push(TranscriptSegment {
                text: segment_text,
                start: segment.start_timestamp() as f32 / 100.0,
                end: segment.end_timestamp() as f32 / 100.0,
                words,
            });
        }

        debug!(
            "Transcription produced {} segments, {} chars",
            segments.len(),
            text.len()
        );

        Ok(TranscriptionResult {
            success: true,
            text,
            segments,
            language: options.language.clone(),
            error: None,
        })
    }
}

/// Loads [`WhisperRecognizer`] instances by model path.
pub struct WhisperProvider;

impl RecognizerProvider for WhisperProvider {
    fn load(&self, model_id: &str) -> Result<Box<dyn Recognizer>, RecognizerError> {
        Ok(Box::new(WhisperRecognizer::load(model_id)?))
    }
}

/// A decoded token with timing, before word grouping
#[derive(Debug, Clone)]
struct TokenTiming {
    text: String,
    start: f32,
    end: f32,
    probability: f32,
}

impl TokenTiming {
    /// Whisper emits markers like `[_BEG_]` and `<|endoftext|>` alongside
    /// text tokens; they carry no speech.
    fn is_special(&self) -> bool {
        self.text.starts_with("[_") || self.text.starts_with("<|")
    }
}

/// Merge subword tokens into words.
///
/// Whisper marks a word boundary with a leading space on the first token of
/// each word. A word's confidence is the mean probability of its tokens.
fn group_words(tokens: &[TokenTiming]) -> Vec<WordTiming> {
    let mut words: Vec<WordTiming> = Vec::new();
    let mut probabilities: Vec<Vec<f32>> = Vec::new();

    for token in tokens {
        if token.is_special() || token.text.trim().is_empty() {
            continue;
        }

        let starts_word = token.text.starts_with(' ') || words.is_empty();
        if starts_word {
            words.push(WordTiming {
                word: token.text.trim_start().to_string(),
                start: token.start,
                end: token.end,
                confidence: 0.0,
            });
            probabilities.push(vec![token.probability]);
        } else if let (Some(word), Some(probs)) = (words.last_mut(), probabilities.last_mut()) {
            word.word.push_str(&token.text);
            word.end = token.end;
            probs.push(token.probability);
        }
    }

    for (word, probs) in words.iter_mut().zip(&probabilities) {
        word.confidence = probs.iter().sum::<f32>() / probs.len() as f32;
    }

    words
}
