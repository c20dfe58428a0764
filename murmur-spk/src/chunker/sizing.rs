//! Adaptive chunk sizing
//!
//! The first chunk is deliberately tiny so the first audio fragment is ready
//! quickly; later chunks grow toward a size that keeps the voice busy.

use murmur_core::ChunkerConfig;
use serde::{Deserialize, Serialize};

/// Word-count target policy for consecutive chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkSizing {
    /// Every chunk targets the same number of words
    Fixed { words: usize },
    /// Start at `initial` and multiply by `factor` after every dispatch, capped at `target`
    Ramp {
        initial: usize,
        factor: usize,
        target: usize,
    },
}

impl ChunkSizing {
    /// Word target for the first chunk
    pub fn initial_words(&self) -> usize {
        match *self {
            ChunkSizing::Fixed { words } => words.max(1),
            ChunkSizing::Ramp { initial, target, .. } => initial.clamp(1, target.max(1)),
        }
    }

    /// Word target for the chunk after one that targeted `current`.
    /// Never shrinks and never exceeds the steady-state target.
    pub fn grow(&self, current: usize) -> usize {
        match *self {
            ChunkSizing::Fixed { words } => words.max(1),
            ChunkSizing::Ramp { factor, target, .. } => {
                let target = target.max(1);
                if current >= target {
                    target
                } else {
                    current.saturating_mul(factor.max(1)).clamp(current, target)
                }
            }
        }
    }

    /// Steady-state word target
    pub fn target_words(&self) -> usize {
        match *self {
            ChunkSizing::Fixed { words } => words.max(1),
            ChunkSizing::Ramp { target, .. } => target.max(1),
        }
    }
}

impl From<&ChunkerConfig> for ChunkSizing {
    fn from(config: &ChunkerConfig) -> Self {
        if config.grow_chunks {
            ChunkSizing::Ramp {
                initial: config.initial_chunk_words,
                factor: config.growth_factor,
                target: config.chunk_words,
            }
        } else {
            ChunkSizing::Fixed {
                words: config.chunk_words,
            }
        }
    }
}
