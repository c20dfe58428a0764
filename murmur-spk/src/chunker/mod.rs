//! Chunked, concurrent synthesis of large texts
//!
//! A job splits its text into sentences, then a fixed pool of worker threads
//! repeatedly takes the next group of sentences, synthesizes it with the job's
//! voice and stores the audio under that group's chunk id. Chunk ids follow
//! text order, so readers can reassemble audio in order no matter which
//! worker finishes first.

pub mod assigner;
pub mod signal;
pub mod sizing;
pub mod store;
pub mod stream;
mod worker;

pub use assigner::{ChunkAssigner, WorkQueue, WorkUnit};
pub use signal::JobState;
pub use sizing::ChunkSizing;
pub use store::{AudioChunk, ResultStore, StreamCursor};
pub use stream::AudioStream;

use crate::error::SpeechError;
use crate::segmenter::{Segmenter, SentenceSegmenter};
use crate::voice::Voice;
use chrono::{DateTime, Utc};
use murmur_core::{AudioBuffer, ChunkerConfig};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;
use worker::{run_worker, Job};

/// Snapshot of the current job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub state: JobState,
    pub voice: String,
    pub started_at: DateTime<Utc>,
    /// Chunk ids handed to workers so far
    pub assigned: u64,
    /// Chunks stored, including failed ones
    pub completed: u64,
    pub failed: u64,
    /// Final chunk count, once every sentence has been assigned
    pub total: Option<u64>,
    pub remaining_sentences: usize,
    /// Next chunk id `get_new_audio` will return
    pub cursor: u64,
}

/// Splits text into chunks, synthesizes them in parallel and serves the audio back in order
///
/// One job is active at a time. Starting a new job cancels the previous one
/// and discards its results. Reads through the stream cursor
/// (`get_new_audio`, `wait_for_new_audio`, `stream`) assume a single consumer.
pub struct TtsChunker {
    config: ChunkerConfig,
    sizing: ChunkSizing,
    segmenter: Arc<dyn Segmenter>,
    job: RwLock<Arc<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TtsChunker {
    /// Create a chunker using the Unicode sentence segmenter
    pub fn new(config: ChunkerConfig) -> Result<Self, SpeechError> {
        config.validate()?;

        let sizing = ChunkSizing::from(&config);
        let segmenter = Arc::new(SentenceSegmenter::with_max_bytes(config.max_text_bytes));

        Ok(Self {
            config,
            sizing,
            segmenter,
            job: RwLock::new(Arc::new(Job::idle(sizing))),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Use a different sentence segmenter
    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// How long interactive callers should wait for the first fragment
    pub fn first_audio_timeout(&self) -> Duration {
        Duration::from_secs(self.config.first_audio_timeout_secs)
    }

    fn current(&self) -> Arc<Job> {
        Arc::clone(&self.job.read())
    }

    /// Begin synthesizing a large block of text. Returns the new job's id.
    ///
    /// Any job still running is cancelled and joined first, and its results
    /// are discarded. Fails without touching the current job if the text
    /// cannot be segmented or the voice is unavailable. Synthesis failures
    /// never surface here; they become failed chunks.
    pub fn start_synthesis(&self, text: &str, voice: Arc<dyn Voice>) -> Result<Uuid, SpeechError> {
        if !voice.is_available() {
            return Err(SpeechError::Voice(format!(
                "Voice '{}' ({}) is not available",
                voice.name(),
                voice.backend()
            )));
        }

        let sentences = self.segmenter.split(text)?;
        let sentence_count = sentences.len();
        let jobs = self.config.jobs;

        let mut workers = self.workers.lock();
        self.cancel_locked(&mut workers);

        let job = Arc::new(Job::new(sentences, self.sizing, voice.as_ref(), jobs));
        *self.job.write() = Arc::clone(&job);

        info!(
            job_id = %job.id,
            voice = %job.voice_name,
            sentences = sentence_count,
            workers = jobs,
            sample_rate = job.sample_rate,
            "Starting synthesis"
        );

        for worker_id in 1..=jobs {
            let worker_job = Arc::clone(&job);
            let worker_voice = Arc::clone(&voice);
            let spawned = thread::Builder::new()
                .name(format!("murmur-tts-{}", worker_id))
                .spawn(move || run_worker(worker_id, worker_job, worker_voice));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(job_id = %job.id, worker_id, "Failed to spawn worker: {}", e);
                    // Workers that never ran still count as live
                    for _ in worker_id..=jobs {
                        job.worker_exited();
                    }
                    self.cancel_locked(&mut workers);
                    return Err(SpeechError::Io(e));
                }
            }
        }

        Ok(job.id)
    }

    /// Cancel an on-going synthesis and wait for every worker to exit
    ///
    /// Workers finish the unit they are synthesizing; no chunk is written
    /// after this returns. Returns immediately when nothing is running.
    pub fn cancel(&self) {
        let mut workers = self.workers.lock();
        self.cancel_locked(&mut workers);
    }

    fn cancel_locked(&self, workers: &mut Vec<JoinHandle<()>>) {
        if workers.is_empty() {
            return;
        }

        let job = self.current();
        if job.request_cancel() {
            warn!(job_id = %job.id, "Cancelling ongoing synthesis");
        }

        for handle in workers.drain(..) {
            if handle.join().is_err() {
                error!(job_id = %job.id, "Synthesis worker panicked");
            }
        }
    }

    /// Cancel any running job, then clear stored audio and rewind the cursor
    pub fn reset(&self) {
        let mut workers = self.workers.lock();
        self.cancel_locked(&mut workers);
        *self.job.write() = Arc::new(Job::idle(self.sizing));
    }

    /// True once every worker of the current job has exited (or no job was started)
    pub fn is_done(&self) -> bool {
        self.state().is_settled()
    }

    pub fn state(&self) -> JobState {
        self.current().signals.state()
    }

    /// Id of the current job; nil when idle
    pub fn job_id(&self) -> Uuid {
        self.current().id
    }

    /// Sample rate of the current job, fixed when it started
    pub fn sample_rate(&self) -> u32 {
        self.current().sample_rate
    }

    /// Audio that became available, in order, since the last call
    ///
    /// Returns an empty buffer when the next chunk in text order is not ready
    /// yet, even if later chunks are.
    pub fn get_new_audio(&self) -> AudioBuffer {
        let job = self.current();
        job.cursor.read_new(&job.store, job.sample_rate)
    }

    /// Every stored chunk concatenated in text order. Does not move the cursor.
    pub fn get_all_audio(&self) -> AudioBuffer {
        let job = self.current();
        job.store.concat_all(job.sample_rate)
    }

    /// Stored chunks in id order
    pub fn chunks(&self) -> Vec<Arc<AudioChunk>> {
        self.current().store.sorted()
    }

    pub fn progress(&self) -> JobProgress {
        let job = self.current();
        JobProgress {
            job_id: job.id,
            state: job.signals.state(),
            voice: job.voice_name.clone(),
            started_at: job.started_at,
            assigned: job.assigner.assigned(),
            completed: job.store.len() as u64,
            failed: job.store.failed_count(),
            total: job.store.total(),
            remaining_sentences: job.assigner.remaining(),
            cursor: job.cursor.position(),
        }
    }

    /// Wait until any chunk exists. Returns false on timeout, or when the
    /// job finished without producing a chunk.
    pub fn wait_for_audio(&self, timeout: Option<Duration>) -> bool {
        let job = self.current();
        job.signals
            .wait_until(timeout, |state| !job.store.is_empty() || state.is_settled());
        !job.store.is_empty()
    }

    /// Wait until the chunk at the cursor is ready. Returns false on timeout,
    /// or when the job can no longer produce that chunk.
    pub fn wait_for_new_audio(&self, timeout: Option<Duration>) -> bool {
        let job = self.current();
        let cursor_ready = || job.store.contains(job.cursor.position());
        job.signals.wait_until(timeout, |state| {
            let position = job.cursor.position();
            cursor_ready()
                || job.store.total().is_some_and(|total| position >= total)
                || state.is_settled()
        });
        cursor_ready()
    }

    /// Wait until every worker has exited
    pub fn wait_for_audio_complete(&self, timeout: Option<Duration>) -> bool {
        self.current()
            .signals
            .wait_until(timeout, |state| state.is_settled())
    }

    /// Iterate over new audio as it becomes ready, in order
    ///
    /// Each wait is bounded by `poll`; the iterator ends once the job is done
    /// and every chunk has been read.
    pub fn stream(&self, poll: Option<Duration>) -> AudioStream<'_> {
        AudioStream::new(self, poll)
    }
}

impl Drop for TtsChunker {
    fn drop(&mut self) {
        self.cancel();
    }
}
