//! Property tests for chunk ordering and completeness

use murmur_spk::chunker::{ChunkAssigner, ChunkSizing};
use murmur_spk::{AudioBuffer, ChunkerConfig, FnVoice, TtsChunker, Voice};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn echo_voice() -> Arc<dyn Voice> {
    Arc::new(FnVoice::new("echo", 8_000, |text: &str| {
        // Uneven latency so workers finish out of order
        thread::sleep(Duration::from_micros((text.len() as u64 * 37) % 900));
        Ok(AudioBuffer::new(8_000, text.bytes().map(i16::from).collect()))
    }))
}

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Z][a-z]{1,7}", 1..4).prop_map(|words| format!("{}.", words.join(" ")))
}

fn sizing() -> impl Strategy<Value = ChunkSizing> {
    prop_oneof![
        (1usize..8).prop_map(|words| ChunkSizing::Fixed { words }),
        (1usize..4, 2usize..6, 1usize..20).prop_map(|(initial, factor, target)| {
            ChunkSizing::Ramp {
                initial,
                factor,
                target,
            }
        }),
    ]
}

proptest! {
    #[test]
    fn prop_assigner_preserves_order(sentences in prop::collection::vec(sentence(), 0..60), sizing in sizing()) {
        let assigner = ChunkAssigner::new(sentences.clone(), sizing);
        let units: Vec<_> = assigner.units().collect();

        for (expected_id, unit) in units.iter().enumerate() {
            prop_assert_eq!(unit.chunk_id, expected_id as u64);
            prop_assert!(!unit.sentences.is_empty());
        }

        let regrouped: Vec<String> = units.into_iter().flat_map(|unit| unit.sentences).collect();
        prop_assert_eq!(regrouped, sentences);
    }

    #[test]
    fn prop_ramp_never_shrinks(sizing in sizing(), steps in 1usize..20) {
        let mut current = sizing.initial_words();
        for _ in 0..steps {
            let next = sizing.grow(current);
            prop_assert!(next >= current.min(sizing.target_words()));
            prop_assert!(next <= sizing.target_words());
            current = next;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_audio_follows_text_order(
        sentences in prop::collection::vec(sentence(), 1..30),
        jobs in 1usize..6,
        chunk_words in 1usize..10,
        grow_chunks in any::<bool>(),
    ) {
        let text = sentences.join(" ");
        let chunker = TtsChunker::new(ChunkerConfig {
            jobs,
            chunk_words,
            grow_chunks,
            ..ChunkerConfig::default()
        })
        .unwrap();
        chunker.start_synthesis(&text, echo_voice()).unwrap();

        let streamed: Vec<i16> = chunker
            .stream(Some(Duration::from_millis(20)))
            .flat_map(|audio| audio.samples)
            .collect();
        let all = chunker.get_all_audio();
        prop_assert_eq!(&streamed, &all.samples);

        let chunks = chunker.chunks();
        let ids: Vec<u64> = chunks.iter().map(|chunk| chunk.chunk_id).collect();
        let expected_ids: Vec<u64> = (0..chunks.len() as u64).collect();
        prop_assert_eq!(ids, expected_ids);
        prop_assert_eq!(chunker.progress().total, Some(chunks.len() as u64));

        let joined: Vec<&str> = chunks.iter().map(|chunk| chunk.source_text.as_str()).collect();
        prop_assert_eq!(joined.join(" "), text);
    }
}
