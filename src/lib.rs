pub mod audio;
pub mod config;
pub mod recognizer;
pub mod recorder;
pub mod session;

pub use audio::{
    AudioBuffer, AudioFile, CaptureSource, CaptureSourceFactory, FileSource, MicrophoneSource,
    SignalConditioner, SourceSpec,
};
pub use config::Config;
pub use recognizer::{
    RecognizeOptions, Recognizer, RecognizerError, RecognizerProvider, TranscriptSegment,
    TranscriptionResult, WhisperProvider, WhisperRecognizer, WordTiming,
};
pub use recorder::{LogEntry, MeetingRecorder, RecorderStats, TranscriptNotepad};
pub use session::{ProgressEvent, ProgressReporter, TranscriptionSession};
