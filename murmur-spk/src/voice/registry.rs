//! Named collection of voices
//!
//! Passed around explicitly; there is no process-wide registry.

use crate::voice::Voice;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Default, Clone)]
pub struct VoiceRegistry {
    voices: BTreeMap<String, Arc<dyn Voice>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a voice under its own name. Returns the voice it replaced, if any.
    pub fn register(&mut self, voice: Arc<dyn Voice>) -> Option<Arc<dyn Voice>> {
        let name = voice.name().to_string();
        let previous = self.voices.insert(name.clone(), voice);
        if previous.is_some() {
            warn!("Voice '{}' registered twice, keeping the newest", name);
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Voice>> {
        self.voices.get(name).cloned()
    }

    /// Voice names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    pub fn voices(&self) -> impl Iterator<Item = &Arc<dyn Voice>> {
        self.voices.values()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}
