//! Voice backends

pub mod custom;
pub mod espeak;
pub mod registry;

pub use custom::FnVoice;
pub use espeak::EspeakVoice;
pub use registry::VoiceRegistry;

use crate::error::SpeechError;
use murmur_core::AudioBuffer;

/// A backend plus configuration that turns short text into PCM audio
///
/// `synthesize` is a blocking call; the chunker invokes it from worker
/// threads, never from the caller's thread.
pub trait Voice: Send + Sync {
    /// Synthesize text to speech audio
    fn synthesize(&self, text: &str) -> Result<AudioBuffer, SpeechError>;

    /// Sample rate of the audio this voice produces
    fn sample_rate(&self) -> u32;

    /// Get voice name
    fn name(&self) -> &str;

    /// Name of the backend providing this voice
    fn backend(&self) -> &str {
        "custom"
    }

    /// Check if the voice can synthesize right now
    fn is_available(&self) -> bool {
        true
    }
}
