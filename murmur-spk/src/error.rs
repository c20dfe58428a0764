//! Error types for murmur-spk

use murmur_core::Error as CoreError;
use thiserror::Error;

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Synthesizer error: {0}")]
    Synthesizer(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Segmentation error: {0}")]
    Segmentation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<murmur_core::ConfigError> for SpeechError {
    fn from(err: murmur_core::ConfigError) -> Self {
        SpeechError::Config(err.to_string())
    }
}

impl From<SpeechError> for CoreError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Core(inner) => inner,
            SpeechError::Io(inner) => CoreError::Io(inner),
            SpeechError::Config(msg) => CoreError::Configuration(msg),
            other => CoreError::Audio(format!("Speech error: {}", other)),
        }
    }
}
