//! Work queue and chunk assignment
//!
//! Dequeuing sentences and stamping the chunk id happen under one lock. If
//! they were separate steps two workers could interleave and receive ids
//! out of text order. Synthesis itself runs outside the lock.

use crate::chunker::sizing::ChunkSizing;
use crate::segmenter::count_words;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Sentences waiting to be grouped into chunks, in text order
#[derive(Debug, Default)]
pub struct WorkQueue {
    sentences: VecDeque<String>,
}

impl WorkQueue {
    pub fn new(sentences: Vec<String>) -> Self {
        Self {
            sentences: sentences.into(),
        }
    }

    pub fn pop(&mut self) -> Option<String> {
        self.sentences.pop_front()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn clear(&mut self) {
        self.sentences.clear();
    }
}

/// Consecutive sentences stamped with their chunk id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub chunk_id: u64,
    pub sentences: Vec<String>,
    pub word_count: usize,
}

impl WorkUnit {
    /// Text handed to the voice
    pub fn text(&self) -> String {
        self.sentences.join(" ")
    }
}

#[derive(Debug)]
struct AssignerState {
    queue: WorkQueue,
    next_chunk_id: u64,
    target_words: usize,
}

/// Hands out work units in text order with contiguous chunk ids
#[derive(Debug)]
pub struct ChunkAssigner {
    state: Mutex<AssignerState>,
    sizing: ChunkSizing,
}

impl ChunkAssigner {
    pub fn new(sentences: Vec<String>, sizing: ChunkSizing) -> Self {
        Self {
            state: Mutex::new(AssignerState {
                queue: WorkQueue::new(sentences),
                next_chunk_id: 0,
                target_words: sizing.initial_words(),
            }),
            sizing,
        }
    }

    /// Next unit of work, or `None` once every sentence has been assigned.
    ///
    /// A unit always holds at least one sentence, even a sentence longer
    /// than the current target.
    pub fn next_unit(&self) -> Option<WorkUnit> {
        let mut state = self.state.lock();

        let target = state.target_words;
        let mut sentences = Vec::new();
        let mut word_count = 0;
        while word_count < target {
            match state.queue.pop() {
                Some(sentence) => {
                    word_count += count_words(&sentence);
                    sentences.push(sentence);
                }
                None => break,
            }
        }

        if sentences.is_empty() {
            return None;
        }

        let chunk_id = state.next_chunk_id;
        state.next_chunk_id += 1;
        state.target_words = self.sizing.grow(target);

        Some(WorkUnit {
            chunk_id,
            sentences,
            word_count,
        })
    }

    /// Number of chunk ids handed out so far
    pub fn assigned(&self) -> u64 {
        self.state.lock().next_chunk_id
    }

    /// Sentences not yet assigned
    pub fn remaining(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Drop every unassigned sentence. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.queue.len();
        state.queue.clear();
        dropped
    }

    /// Pull units until the queue is exhausted
    pub fn units(&self) -> impl Iterator<Item = WorkUnit> + '_ {
        std::iter::from_fn(move || self.next_unit())
    }
}
