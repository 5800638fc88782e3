//! Backend registry
//!
//! Maps each [`VoiceBackend`] to the adapter that serves it. The pipeline
//! looks the adapter up once per request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::VoiceBackend;
use crate::ports::SpeechSynthesizer;

/// Lookup table from backend id to adapter
#[derive(Clone, Default)]
pub struct BackendRegistry {
    adapters: HashMap<VoiceBackend, Arc<dyn SpeechSynthesizer>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, returning the one it replaces
    pub fn register(
        &mut self,
        backend: VoiceBackend,
        adapter: Arc<dyn SpeechSynthesizer>,
    ) -> Option<Arc<dyn SpeechSynthesizer>> {
        self.adapters.insert(backend, adapter)
    }

    /// Builder-style registration
    #[must_use]
    pub fn with(mut self, backend: VoiceBackend, adapter: Arc<dyn SpeechSynthesizer>) -> Self {
        self.register(backend, adapter);
        self
    }

    /// Adapter for a backend
    #[must_use]
    pub fn get(&self, backend: VoiceBackend) -> Option<Arc<dyn SpeechSynthesizer>> {
        self.adapters.get(&backend).cloned()
    }

    #[must_use]
    pub fn contains(&self, backend: VoiceBackend) -> bool {
        self.adapters.contains_key(&backend)
    }

    /// Registered backends in stable order
    #[must_use]
    pub fn backends(&self) -> Vec<VoiceBackend> {
        let mut backends: Vec<_> = self.adapters.keys().copied().collect();
        backends.sort();
        backends
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}
