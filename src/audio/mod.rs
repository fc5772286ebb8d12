pub mod buffer;
pub mod capture;
pub mod conditioner;
pub mod file;
pub mod filter;

pub use buffer::AudioBuffer;
pub use capture::{CaptureSource, CaptureSourceFactory, FileSource, MicrophoneSource, SourceSpec};
pub use conditioner::{ConditioningError, SignalConditioner};
pub use file::AudioFile;
