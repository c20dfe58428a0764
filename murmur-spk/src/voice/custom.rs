//! Closure-backed voice
//! Allows users to provide their own synthesis function

use crate::error::SpeechError;
use crate::voice::Voice;
use murmur_core::AudioBuffer;
use std::fmt;
use std::sync::Arc;

type SynthesizeFn = dyn Fn(&str) -> Result<AudioBuffer, SpeechError> + Send + Sync;

/// Voice wrapping a user-supplied synthesis function
#[derive(Clone)]
pub struct FnVoice {
    name: String,
    sample_rate: u32,
    synthesize_fn: Arc<SynthesizeFn>,
}

impl FnVoice {
    /// Create a new closure-backed voice
    pub fn new<F>(name: impl Into<String>, sample_rate: u32, synthesize_fn: F) -> Self
    where
        F: Fn(&str) -> Result<AudioBuffer, SpeechError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sample_rate,
            synthesize_fn: Arc::new(synthesize_fn),
        }
    }
}

impl fmt::Debug for FnVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnVoice")
            .field("name", &self.name)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl Voice for FnVoice {
    fn synthesize(&self, text: &str) -> Result<AudioBuffer, SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Voice("Text cannot be empty".to_string()));
        }

        (self.synthesize_fn)(text)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        &self.name
    }
}
