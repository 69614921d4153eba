//! Volatile backend for tests and throwaway stores.

use crate::repo::{Backend, BackendError, BackendResult, StoreState};

/// Keeps the last persisted state in memory.
///
/// Persist failures can be injected to exercise the "unchanged on failure"
/// paths of the services.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    persisted: StoreState,
    persist_count: usize,
    fail_persists: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the backend as if `state` had been persisted earlier.
    pub fn with_state(state: StoreState) -> Self {
        Self {
            persisted: state,
            ..Self::default()
        }
    }

    /// Makes every following `persist` call fail until switched off.
    pub fn fail_persists(&mut self, fail: bool) {
        self.fail_persists = fail;
    }

    pub fn persisted(&self) -> &StoreState {
        &self.persisted
    }

    /// Number of successful persists.
    pub fn persist_count(&self) -> usize {
        self.persist_count
    }
}

impl Backend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> BackendResult<StoreState> {
        Ok(self.persisted.clone())
    }

    fn persist(&mut self, state: &StoreState) -> BackendResult<()> {
        if self.fail_persists {
            return Err(BackendError::Unavailable("persist failure injected"));
        }
        self.persisted = state.clone();
        self.persist_count += 1;
        Ok(())
    }
}
