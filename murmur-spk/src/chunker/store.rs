//! Result store and stream cursor

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use murmur_core::AudioBuffer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Audio produced for one chunk. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub chunk_id: u64,
    pub source_text: String,
    pub sample_rate: u32,
    pub samples: Vec<i16>,
    /// False when synthesis failed; the chunk then holds no samples but
    /// still occupies its slot so ordered reads can move past it
    pub ok: bool,
}

impl AudioChunk {
    pub fn synthesized(chunk_id: u64, source_text: String, audio: AudioBuffer) -> Self {
        Self {
            chunk_id,
            source_text,
            sample_rate: audio.sample_rate,
            samples: audio.samples,
            ok: true,
        }
    }

    /// Placeholder for a chunk whose synthesis failed
    pub fn failed(chunk_id: u64, source_text: String, sample_rate: u32) -> Self {
        Self {
            chunk_id,
            source_text,
            sample_rate,
            samples: Vec::new(),
            ok: false,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Chunk id -> audio, written once per id by the worker that synthesized it
#[derive(Debug, Default)]
pub struct ResultStore {
    chunks: DashMap<u64, Arc<AudioChunk>>,
    total: Mutex<Option<u64>>,
    failed: AtomicU64,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a chunk. An id that is already present keeps its first value
    /// and the call returns false.
    pub fn insert(&self, chunk: AudioChunk) -> bool {
        let ok = chunk.ok;
        match self.chunks.entry(chunk.chunk_id) {
            Entry::Occupied(_) => {
                warn!(chunk_id = chunk.chunk_id, "Chunk already stored, ignoring duplicate");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(chunk));
                if !ok {
                    self.failed.fetch_add(1, Ordering::SeqCst);
                }
                true
            }
        }
    }

    pub fn get(&self, chunk_id: u64) -> Option<Arc<AudioChunk>> {
        self.chunks.get(&chunk_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, chunk_id: u64) -> bool {
        self.chunks.contains_key(&chunk_id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of stored chunks whose synthesis failed
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Record the number of chunks the job will produce, once the work queue is exhausted
    pub fn set_total(&self, total: u64) {
        let mut guard = self.total.lock();
        match *guard {
            Some(existing) if existing != total => {
                warn!(existing, total, "Conflicting chunk totals, keeping the first");
            }
            Some(_) => {}
            None => *guard = Some(total),
        }
    }

    /// Total chunk count, known once the work queue is exhausted
    pub fn total(&self) -> Option<u64> {
        *self.total.lock()
    }

    /// Every stored chunk in ascending id order
    pub fn sorted(&self) -> Vec<Arc<AudioChunk>> {
        let mut chunks: Vec<Arc<AudioChunk>> = self
            .chunks
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        chunks.sort_by_key(|chunk| chunk.chunk_id);
        chunks
    }

    /// Concatenation of every stored chunk in id order
    pub fn concat_all(&self, sample_rate: u32) -> AudioBuffer {
        let mut audio = AudioBuffer::empty(sample_rate);
        for chunk in self.sorted() {
            audio.extend_from_slice(&chunk.samples);
        }
        audio
    }
}

/// Next chunk id a streaming reader expects
///
/// Only one consumer thread reads through a cursor.
#[derive(Debug, Default)]
pub struct StreamCursor {
    next: AtomicU64,
}

impl StreamCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Consume the contiguous run of stored chunks starting at the cursor.
    /// Failed chunks are skipped over without contributing samples.
    pub fn read_new(&self, store: &ResultStore, sample_rate: u32) -> AudioBuffer {
        let mut audio = AudioBuffer::empty(sample_rate);
        let mut next = self.position();
        while let Some(chunk) = store.get(next) {
            audio.extend_from_slice(&chunk.samples);
            next += 1;
        }
        self.next.store(next, Ordering::SeqCst);
        audio
    }
}
