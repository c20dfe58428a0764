// Layered configuration for murmur: file (JSON, TOML or YAML), environment, defaults

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on the worker pool size
pub const MAX_JOBS: usize = 64;

/// Largest steady-state chunk target accepted
pub const MAX_CHUNK_WORDS: usize = 100_000;

/// Upper bound for `first_audio_timeout_secs` (one day)
pub const MAX_FIRST_AUDIO_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Chunking and worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Number of concurrent synthesis workers
    pub jobs: usize,

    /// Steady-state target size of a chunk, in words
    pub chunk_words: usize,

    /// Start with tiny chunks and grow toward `chunk_words` so the first
    /// audio fragment is ready sooner
    pub grow_chunks: bool,

    /// Word target of the very first chunk when growing
    pub initial_chunk_words: usize,

    /// Multiplier applied to the word target after every dispatch when growing
    pub growth_factor: usize,

    /// Largest input text accepted by the segmenter, in bytes
    pub max_text_bytes: usize,

    /// How long interactive callers wait for the first audio fragment
    pub first_audio_timeout_secs: u64,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            chunk_words: 256,
            grow_chunks: true,
            initial_chunk_words: 1,
            growth_factor: 5,
            max_text_bytes: 10 * 1024 * 1024,
            first_audio_timeout_secs: 240,
        }
    }
}

impl ChunkerConfig {
    /// Validate chunker configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::ValidationError(
                "chunker.jobs must be > 0".to_string(),
            ));
        }
        if self.jobs > MAX_JOBS {
            return Err(ConfigError::ValidationError(format!(
                "chunker.jobs too large (max {})",
                MAX_JOBS
            )));
        }
        if self.chunk_words == 0 {
            return Err(ConfigError::ValidationError(
                "chunker.chunk_words must be > 0".to_string(),
            ));
        }
        if self.chunk_words > MAX_CHUNK_WORDS {
            return Err(ConfigError::ValidationError(format!(
                "chunker.chunk_words too large (max {})",
                MAX_CHUNK_WORDS
            )));
        }
        if self.grow_chunks {
            if self.initial_chunk_words == 0 || self.initial_chunk_words > self.chunk_words {
                return Err(ConfigError::ValidationError(
                    "chunker.initial_chunk_words must be between 1 and chunk_words".to_string(),
                ));
            }
            if self.growth_factor < 2 {
                return Err(ConfigError::ValidationError(
                    "chunker.growth_factor must be >= 2 when grow_chunks is enabled".to_string(),
                ));
            }
        }
        if self.max_text_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "chunker.max_text_bytes must be > 0".to_string(),
            ));
        }
        if self.first_audio_timeout_secs > MAX_FIRST_AUDIO_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "chunker.first_audio_timeout_secs too large (max {})",
                MAX_FIRST_AUDIO_TIMEOUT_SECS
            )));
        }
        Ok(())
    }
}

/// Voice settings handed to a backend. The chunker never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier
    pub name: Option<String>,

    /// Language code (e.g., "en-US", "es-ES")
    pub language: String,

    /// Speech rate (words per minute, 0-500, default 150)
    pub rate: u32,

    /// Pitch adjustment (-1.0 to 1.0, default 0.0)
    pub pitch: f32,

    /// Volume (0.0-1.0, default 0.8)
    pub volume: f32,

    /// Speaking style, for backends that have one
    pub style: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en-US".to_string(),
            rate: 150,
            pitch: 0.0,
            volume: 0.8,
            style: None,
        }
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language.is_empty() {
            return Err(ConfigError::ValidationError("Language code cannot be empty".to_string()));
        }

        if self.language.len() > 32 {
            return Err(ConfigError::ValidationError(
                "Language code too long (max 32 chars)".to_string(),
            ));
        }

        // Should look like "en-US" or "en"
        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ConfigError::ValidationError(
                "Language code contains invalid characters (only alphanumeric and '-' allowed)"
                    .to_string(),
            ));
        }

        for (field, value) in [("Voice name", &self.name), ("Voice style", &self.style)] {
            if let Some(value) = value {
                if value.is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "{} cannot be empty if provided",
                        field
                    )));
                }
                if value.len() > 256 {
                    return Err(ConfigError::ValidationError(format!(
                        "{} too long (max 256 chars)",
                        field
                    )));
                }
                if value.chars().any(|c| c == '\0' || c.is_control()) {
                    return Err(ConfigError::ValidationError(format!(
                        "{} contains invalid characters",
                        field
                    )));
                }
            }
        }

        if self.rate > 500 {
            return Err(ConfigError::ValidationError(
                "Speech rate must be between 0 and 500 WPM".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::ValidationError(
                "Volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(-1.0..=1.0).contains(&self.pitch) {
            return Err(ConfigError::ValidationError(
                "Pitch must be between -1.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter (error, warn, info, debug, trace)
    pub level: String,

    /// Emit JSON log lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level murmur configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    pub chunker: ChunkerConfig,
    pub voice: VoiceConfig,
    pub logging: LoggingConfig,
}

impl MurmurConfig {
    /// Load configuration from file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        if path.contains("..") {
            return Err(ConfigError::IoError(format!(
                "Path traversal detected: '{}'",
                path
            )));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path, e)))?;
        content.parse()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from `MURMUR_*` variables. Values that do not parse are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(jobs) = lookup("MURMUR_JOBS").and_then(|v| v.parse().ok()) {
            self.chunker.jobs = jobs;
        }

        if let Some(words) = lookup("MURMUR_CHUNK_WORDS").and_then(|v| v.parse().ok()) {
            self.chunker.chunk_words = words;
        }

        if let Some(grow) = lookup("MURMUR_GROW_CHUNKS").and_then(|v| v.parse().ok()) {
            self.chunker.grow_chunks = grow;
        }

        if let Some(voice) = lookup("MURMUR_VOICE") {
            self.voice.name = Some(voice);
        }

        if let Some(language) = lookup("MURMUR_LANGUAGE") {
            self.voice.language = language;
        }

        if let Some(level) = lookup("MURMUR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(&mut self, other: MurmurConfig) {
        self.chunker = other.chunker;
        self.voice = other.voice;
        self.logging = other.logging;
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker.validate()?;
        self.voice.validate()?;

        match self.logging.level.to_ascii_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown log level '{}'",
                other
            ))),
        }
    }
}

impl FromStr for MurmurConfig {
    type Err = ConfigError;

    /// Parse configuration from a string in any supported format
    fn from_str(content: &str) -> Result<Self, ConfigError> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<MurmurConfig>(content) {
            return Ok(config);
        }

        // Try TOML
        if let Ok(config) = toml::from_str::<MurmurConfig>(content) {
            return Ok(config);
        }

        // Try YAML
        if let Ok(config) = serde_yaml::from_str::<MurmurConfig>(content) {
            return Ok(config);
        }

        Err(ConfigError::ParseError("Unknown format".to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Configuration(err.to_string())
    }
}
