//! Shared job state and the worker loop

use crate::chunker::assigner::ChunkAssigner;
use crate::chunker::signal::{JobState, Signals};
use crate::chunker::sizing::ChunkSizing;
use crate::chunker::store::{AudioChunk, ResultStore, StreamCursor};
use crate::error::SpeechError;
use crate::voice::Voice;
use chrono::{DateTime, Utc};
use murmur_core::AudioBuffer;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything one job's workers and readers share
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) id: Uuid,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) voice_name: String,
    pub(crate) sample_rate: u32,
    pub(crate) assigner: ChunkAssigner,
    pub(crate) store: ResultStore,
    pub(crate) cursor: StreamCursor,
    pub(crate) signals: Signals,
    cancelled: AtomicBool,
    active_workers: AtomicUsize,
    started: Instant,
}

impl Job {
    /// A job that already counts `workers` live workers
    pub(crate) fn new(
        sentences: Vec<String>,
        sizing: ChunkSizing,
        voice: &dyn Voice,
        workers: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            voice_name: voice.name().to_string(),
            sample_rate: voice.sample_rate(),
            assigner: ChunkAssigner::new(sentences, sizing),
            store: ResultStore::new(),
            cursor: StreamCursor::new(),
            signals: Signals::new(JobState::Running),
            cancelled: AtomicBool::new(false),
            active_workers: AtomicUsize::new(workers),
            started: Instant::now(),
        }
    }

    /// Placeholder for a chunker with no job
    pub(crate) fn idle(sizing: ChunkSizing) -> Self {
        Self {
            id: Uuid::nil(),
            started_at: Utc::now(),
            voice_name: String::new(),
            sample_rate: 0,
            assigner: ChunkAssigner::new(Vec::new(), sizing),
            store: ResultStore::new(),
            cursor: StreamCursor::new(),
            signals: Signals::new(JobState::Idle),
            cancelled: AtomicBool::new(false),
            active_workers: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Ask workers to stop after their current unit
    pub(crate) fn request_cancel(&self) -> bool {
        if self.signals.state().is_settled() {
            return false;
        }
        self.cancelled.store(true, Ordering::SeqCst);

        let dropped = self.assigner.clear();
        if dropped > 0 {
            debug!(job_id = %self.id, dropped, "Dropped unassigned sentences");
        }
        self.signals.transition(JobState::Running, JobState::Cancelling)
    }

    /// Called exactly once per counted worker, including workers that never started
    pub(crate) fn worker_exited(&self) {
        if self.active_workers.fetch_sub(1, Ordering::SeqCst) != 1 {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        if self.is_cancelled() {
            warn!(
                job_id = %self.id,
                chunks = self.store.len(),
                failed = self.store.failed_count(),
                elapsed_secs = elapsed,
                "Synthesis cancelled"
            );
        } else {
            info!(
                job_id = %self.id,
                chunks = self.store.len(),
                failed = self.store.failed_count(),
                elapsed_secs = elapsed,
                "Synthesis complete"
            );
        }
        self.signals.set_state(JobState::Done);
    }
}

/// Marks the worker as exited even if the loop unwinds
struct ExitGuard<'a> {
    job: &'a Job,
    worker_id: usize,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        debug!(job_id = %self.job.id, worker_id = self.worker_id, "Worker exiting");
        self.job.worker_exited();
    }
}

/// Worker loop: take a unit, synthesize it, store it, repeat until the queue
/// is empty or the job is cancelled
pub(crate) fn run_worker(worker_id: usize, job: Arc<Job>, voice: Arc<dyn Voice>) {
    let _guard = ExitGuard {
        job: &job,
        worker_id,
    };
    debug!(job_id = %job.id, worker_id, "Worker starting up");

    while !job.is_cancelled() {
        let Some(unit) = job.assigner.next_unit() else {
            // Every id has been handed out, so the count is final
            job.store.set_total(job.assigner.assigned());
            break;
        };

        let text = unit.text();
        debug!(
            job_id = %job.id,
            worker_id,
            chunk_id = unit.chunk_id,
            words = unit.word_count,
            "Worker got work item"
        );

        let start = Instant::now();
        let chunk = match synthesize_guarded(voice.as_ref(), &text) {
            Ok(audio) => {
                if audio.sample_rate != job.sample_rate {
                    warn!(
                        job_id = %job.id,
                        chunk_id = unit.chunk_id,
                        expected = job.sample_rate,
                        actual = audio.sample_rate,
                        "Voice returned audio at an unexpected sample rate"
                    );
                }
                AudioChunk::synthesized(unit.chunk_id, text, audio)
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    worker_id,
                    chunk_id = unit.chunk_id,
                    "Synthesize error: {}",
                    e
                );
                AudioChunk::failed(unit.chunk_id, text, job.sample_rate)
            }
        };

        let chars = chunk.source_text.chars().count();
        let audio_secs = chunk.duration().as_secs_f64();
        job.store.insert(chunk);
        job.signals.notify_chunk();

        let elapsed = start.elapsed().as_secs_f64();
        info!(
            job_id = %job.id,
            worker_id,
            chunk_id = unit.chunk_id,
            elapsed_secs = elapsed,
            audio_secs,
            chars_per_sec = chars as f64 / elapsed.max(f64::EPSILON),
            "Done working on chunk"
        );
    }
}

/// Run the voice, turning a panic into an ordinary error
fn synthesize_guarded(voice: &dyn Voice, text: &str) -> Result<AudioBuffer, SpeechError> {
    match panic::catch_unwind(AssertUnwindSafe(|| voice.synthesize(text))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SpeechError::Voice(format!("Voice panicked: {}", message)))
        }
    }
}
