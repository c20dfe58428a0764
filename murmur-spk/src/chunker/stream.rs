//! Blocking iterator over ordered audio fragments

use crate::chunker::TtsChunker;
use murmur_core::AudioBuffer;
use std::time::Duration;

/// Yields each newly available run of audio until the job is done
pub struct AudioStream<'a> {
    chunker: &'a TtsChunker,
    poll: Option<Duration>,
    finished: bool,
}

impl<'a> AudioStream<'a> {
    pub(crate) fn new(chunker: &'a TtsChunker, poll: Option<Duration>) -> Self {
        Self {
            chunker,
            poll,
            finished: false,
        }
    }
}

impl Iterator for AudioStream<'_> {
    type Item = AudioBuffer;

    fn next(&mut self) -> Option<AudioBuffer> {
        while !self.finished {
            let audio = self.chunker.get_new_audio();
            if !audio.is_empty() {
                return Some(audio);
            }

            if self.chunker.is_done() {
                // Chunks are stored before the job settles, so one last read sees them all
                self.finished = true;
                let audio = self.chunker.get_new_audio();
                return (!audio.is_empty()).then_some(audio);
            }

            self.chunker.wait_for_new_audio(self.poll);
        }
        None
    }
}
