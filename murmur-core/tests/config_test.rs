//! Tests for murmur configuration loading and validation

use murmur_core::config::{
    ChunkerConfig, ConfigError, MurmurConfig, VoiceConfig, MAX_FIRST_AUDIO_TIMEOUT_SECS,
};
use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;

#[test]
fn test_chunker_config_default() {
    let config = ChunkerConfig::default();
    assert_eq!(config.jobs, 4);
    assert_eq!(config.chunk_words, 256);
    assert!(config.grow_chunks);
    assert_eq!(config.initial_chunk_words, 1);
    assert_eq!(config.growth_factor, 5);
    assert_eq!(config.first_audio_timeout_secs, 240);
    assert!(config.validate().is_ok());
}

#[test]
fn test_chunker_config_validation_jobs() {
    let mut config = ChunkerConfig::default();
    config.jobs = 0;
    assert!(config.validate().is_err());

    config.jobs = 65;
    assert!(config.validate().is_err());

    config.jobs = 1;
    assert!(config.validate().is_ok());
}

#[test]
fn test_chunker_config_validation_growth() {
    let mut config = ChunkerConfig::default();
    config.growth_factor = 1;
    assert!(config.validate().is_err());

    // Growth settings are irrelevant for fixed-size chunks
    config.grow_chunks = false;
    assert!(config.validate().is_ok());

    config.grow_chunks = true;
    config.growth_factor = 2;
    config.initial_chunk_words = 300;
    assert!(config.validate().is_err());

    config.initial_chunk_words = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_chunker_config_validation_words() {
    let mut config = ChunkerConfig::default();
    config.chunk_words = 0;
    assert!(config.validate().is_err());

    config.chunk_words = 1;
    config.initial_chunk_words = 1;
    assert!(config.validate().is_ok());
}

#[test]
fn test_voice_config_default() {
    let voice = VoiceConfig::default();
    assert_eq!(voice.language, "en-US");
    assert!(voice.name.is_none());
    assert!(voice.style.is_none());
    assert_eq!(voice.rate, 150);
    assert!(voice.validate().is_ok());
}

#[test]
fn test_voice_config_validation() {
    let mut voice = VoiceConfig::default();
    voice.language = "en_US;rm".to_string();
    assert!(voice.validate().is_err());

    let mut voice = VoiceConfig::default();
    voice.name = Some(String::new());
    assert!(voice.validate().is_err());

    let mut voice = VoiceConfig::default();
    voice.style = Some("cheerful\u{0}".to_string());
    assert!(voice.validate().is_err());

    let mut voice = VoiceConfig::default();
    voice.rate = 600;
    assert!(voice.validate().is_err());

    let mut voice = VoiceConfig::default();
    voice.volume = 1.5;
    assert!(voice.validate().is_err());

    let mut voice = VoiceConfig::default();
    voice.pitch = -1.5;
    assert!(voice.validate().is_err());
}

#[test]
fn test_from_str_json() {
    let config =
        MurmurConfig::from_str(r#"{"chunker": {"jobs": 2, "grow_chunks": false}}"#).unwrap();
    assert_eq!(config.chunker.jobs, 2);
    assert!(!config.chunker.grow_chunks);
    // Unspecified fields keep their defaults
    assert_eq!(config.chunker.chunk_words, 256);
    assert_eq!(config.voice, VoiceConfig::default());
}

#[test]
fn test_from_str_toml() {
    let content = r#"
[chunker]
jobs = 3
chunk_words = 64

[voice]
name = "en-us+f3"
rate = 180
"#;
    let config = MurmurConfig::from_str(content).unwrap();
    assert_eq!(config.chunker.jobs, 3);
    assert_eq!(config.chunker.chunk_words, 64);
    assert_eq!(config.voice.name.as_deref(), Some("en-us+f3"));
    assert_eq!(config.voice.rate, 180);
}

#[test]
fn test_from_str_yaml() {
    let content = "chunker:\n  jobs: 6\nlogging:\n  level: debug\n  json: true\n";
    let config = MurmurConfig::from_str(content).unwrap();
    assert_eq!(config.chunker.jobs, 6);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn test_from_str_unknown_format() {
    let result = MurmurConfig::from_str("chunker: [unterminated");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_first_audio_timeout_bounded() {
    let config =
        MurmurConfig::from_str("[chunker]\nfirst_audio_timeout_secs = 9223372036854775807").unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(msg)) if msg.contains("first_audio_timeout_secs")
    ));

    let mut chunker = ChunkerConfig::default();
    chunker.first_audio_timeout_secs = MAX_FIRST_AUDIO_TIMEOUT_SECS;
    assert!(chunker.validate().is_ok());
}

#[test]
fn test_parse_via_str() {
    let config: MurmurConfig = "chunker:\n  jobs: 5\n".parse().unwrap();
    assert_eq!(config.chunker.jobs, 5);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[chunker]\njobs = 8").unwrap();

    let config = MurmurConfig::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.chunker.jobs, 8);
}

#[test]
fn test_from_file_rejects_traversal() {
    let result = MurmurConfig::from_file("../../etc/passwd");
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_from_file_missing() {
    let result = MurmurConfig::from_file("/nonexistent/murmur.toml");
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_apply_env() {
    let vars: HashMap<&str, &str> = [
        ("MURMUR_JOBS", "2"),
        ("MURMUR_CHUNK_WORDS", "not-a-number"),
        ("MURMUR_GROW_CHUNKS", "false"),
        ("MURMUR_VOICE", "en-gb"),
        ("MURMUR_LOG_LEVEL", "warn"),
    ]
    .into_iter()
    .collect();

    let mut config = MurmurConfig::default();
    config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.chunker.jobs, 2);
    assert_eq!(config.chunker.chunk_words, 256);
    assert!(!config.chunker.grow_chunks);
    assert_eq!(config.voice.name.as_deref(), Some("en-gb"));
    assert_eq!(config.voice.language, "en-US");
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_merge_and_validate() {
    let mut base = MurmurConfig::default();
    let mut other = MurmurConfig::default();
    other.chunker.jobs = 12;
    other.logging.level = "verbose".to_string();

    base.merge(other);
    assert_eq!(base.chunker.jobs, 12);
    assert!(base.validate().is_err());

    base.logging.level = "TRACE".to_string();
    assert!(base.validate().is_ok());
}

#[test]
fn test_config_error_into_core_error() {
    let err: murmur_core::Error = ConfigError::ValidationError("bad".to_string()).into();
    assert!(err.to_string().contains("bad"));
}
