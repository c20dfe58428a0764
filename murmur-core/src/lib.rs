//! murmur-core: shared building blocks for the murmur speech pipeline
//!
//! Holds the pieces every other crate agrees on:
//! - the core error type
//! - layered configuration (file, string, environment)
//! - the in-memory PCM audio buffer

pub mod audio;
pub mod config;
pub mod error;

pub use audio::AudioBuffer;
pub use config::{ChunkerConfig, ConfigError, LoggingConfig, MurmurConfig, VoiceConfig};
pub use error::{Error, Result};
