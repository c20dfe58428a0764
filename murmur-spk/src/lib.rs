//! murmur-spk: chunked text-to-speech for large blocks of text
//!
//! Splits text into sentences, groups them into chunks that grow from a
//! tiny first chunk toward a steady-state size, synthesizes the chunks on a
//! pool of worker threads and hands the audio back in text order:
//! - streaming reads (`get_new_audio`) while synthesis is still running
//! - whole-job reads (`get_all_audio`)
//! - cooperative cancellation and timeout-bounded waits
//! - pluggable voices and sentence segmenters

pub mod error;
pub mod segmenter;
pub mod voice;
pub mod chunker;
pub mod wav;

pub use error::SpeechError;
pub use chunker::{AudioChunk, AudioStream, ChunkSizing, JobProgress, JobState, TtsChunker};
pub use segmenter::{Segmenter, SentenceSegmenter};
pub use voice::{EspeakVoice, FnVoice, Voice, VoiceRegistry};
pub use murmur_core::{AudioBuffer, ChunkerConfig, VoiceConfig};
