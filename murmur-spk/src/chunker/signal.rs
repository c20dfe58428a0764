//! Job state and wake-ups for waiting readers
//!
//! Writers publish to the result store first and only then take the signal
//! lock to notify. Waiters evaluate their predicate while holding the same
//! lock, so a notification can never slip in between the check and the wait.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Lifecycle of one synthesis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No job has been started (or the chunker was reset)
    Idle,
    /// Workers are synthesizing
    Running,
    /// Cancellation requested; workers are finishing their current unit
    Cancelling,
    /// Every worker has exited
    Done,
}

impl JobState {
    /// True when no worker can write to the job's result store any more
    pub fn is_settled(self) -> bool {
        matches!(self, JobState::Idle | JobState::Done)
    }
}

#[derive(Debug)]
struct SignalState {
    job: JobState,
}

#[derive(Debug)]
pub struct Signals {
    state: Mutex<SignalState>,
    changed: Condvar,
}

impl Signals {
    pub fn new(initial: JobState) -> Self {
        Self {
            state: Mutex::new(SignalState { job: initial }),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state.lock().job
    }

    /// A chunk was written to the store
    pub fn notify_chunk(&self) {
        // Taken so a waiter between its check and its wait cannot miss this
        let _state = self.state.lock();
        self.changed.notify_all();
    }

    /// Move from `from` to `to`. Returns false, and changes nothing, if the
    /// job was not in `from`.
    pub fn transition(&self, from: JobState, to: JobState) -> bool {
        let mut state = self.state.lock();
        if state.job != from {
            return false;
        }
        state.job = to;
        self.changed.notify_all();
        true
    }

    /// Unconditionally enter `to`
    pub fn set_state(&self, to: JobState) {
        let mut state = self.state.lock();
        state.job = to;
        self.changed.notify_all();
    }

    /// Block until `ready` holds or the timeout elapses. `None`, or a timeout
    /// too large to express as a deadline, waits forever.
    /// Returns the last evaluation of `ready`.
    pub fn wait_until<F>(&self, timeout: Option<Duration>, mut ready: F) -> bool
    where
        F: FnMut(JobState) -> bool,
    {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();
        loop {
            if ready(state.job) {
                return true;
            }
            match deadline {
                None => self.changed.wait(&mut state),
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        return ready(state.job);
                    }
                }
            }
        }
    }
}
