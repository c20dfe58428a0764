//! Chunker behavior against a mocked voice

use mockall::mock;
use murmur_spk::{AudioBuffer, ChunkerConfig, SpeechError, TtsChunker, Voice};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub TestVoice {}

    impl Voice for TestVoice {
        fn synthesize(&self, text: &str) -> Result<AudioBuffer, SpeechError>;
        fn sample_rate(&self) -> u32;
        fn name(&self) -> &str;
        fn is_available(&self) -> bool;
    }
}

fn config(jobs: usize, chunk_words: usize) -> ChunkerConfig {
    ChunkerConfig {
        jobs,
        chunk_words,
        grow_chunks: false,
        ..ChunkerConfig::default()
    }
}

fn mock_voice(sample_rate: u32) -> MockTestVoice {
    let mut voice = MockTestVoice::new();
    voice.expect_sample_rate().return_const(sample_rate);
    voice.expect_name().return_const("mock".to_string());
    voice.expect_is_available().return_const(true);
    voice
}

#[test]
fn test_each_chunk_synthesized_once() {
    let mut voice = mock_voice(16_000);
    voice
        .expect_synthesize()
        .times(3)
        .returning(|text| Ok(AudioBuffer::new(16_000, vec![1; text.len()])));

    let chunker = TtsChunker::new(config(2, 1)).unwrap();
    chunker
        .start_synthesis("First. Second. Third.", Arc::new(voice))
        .unwrap();
    assert!(chunker.wait_for_audio_complete(Some(Duration::from_secs(10))));

    let all = chunker.get_all_audio();
    assert_eq!(all.sample_rate, 16_000);
    assert_eq!(all.len(), "First.".len() + "Second.".len() + "Third.".len());
}

#[test]
fn test_chunk_text_joins_sentences() {
    let mut voice = mock_voice(8_000);
    voice
        .expect_synthesize()
        .withf(|text| text.starts_with("One. Two. Three."))
        .times(1)
        .returning(|_| Ok(AudioBuffer::new(8_000, vec![7; 3])));

    let chunker = TtsChunker::new(config(1, 3)).unwrap();
    chunker
        .start_synthesis("One.  Two.\nThree.", Arc::new(voice))
        .unwrap();
    assert!(chunker.wait_for_audio_complete(Some(Duration::from_secs(10))));
    assert_eq!(chunker.chunks()[0].source_text, "One. Two. Three.");
}

#[test]
fn test_unavailable_voice_rejected() {
    let mut voice = MockTestVoice::new();
    voice.expect_sample_rate().return_const(8_000u32);
    voice.expect_name().return_const("offline".to_string());
    voice.expect_is_available().return_const(false);
    voice.expect_synthesize().never();

    let chunker = TtsChunker::new(ChunkerConfig::default()).unwrap();
    let result = chunker.start_synthesis("Hello there.", Arc::new(voice));
    assert!(matches!(result, Err(SpeechError::Voice(_))));
    assert!(result.unwrap_err().to_string().contains("not available"));
    assert!(chunker.job_id().is_nil());
}

#[test]
fn test_errors_become_failed_chunks() {
    let mut voice = mock_voice(8_000);
    voice
        .expect_synthesize()
        .returning(|_| Err(SpeechError::Synthesizer("engine offline".to_string())));

    let chunker = TtsChunker::new(config(2, 1)).unwrap();
    chunker.start_synthesis("A one. A two.", Arc::new(voice)).unwrap();
    assert!(chunker.wait_for_audio_complete(Some(Duration::from_secs(10))));

    let progress = chunker.progress();
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.failed, 2);
    assert!(chunker.get_all_audio().is_empty());
    assert_eq!(chunker.get_all_audio().sample_rate, 8_000);
}
