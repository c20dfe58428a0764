//! In-memory PCM audio

use std::time::Duration;

/// Mono 16-bit PCM audio at a fixed sample rate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// An empty buffer that still carries its sample rate
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length. Zero when the sample rate is unknown.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn extend_from_slice(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }
}
