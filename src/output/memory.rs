use super::traits::{BatchWriter, OutputError};
use crate::pipeline::Reading;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MemoryState {
    batches: Vec<Vec<Reading>>,
    finished: bool,
    aborted: bool,
}

/// Writer that keeps flushed batches in memory.
///
/// Clones share state, so a handle kept by the caller can inspect what the
/// pipeline wrote after the writer itself has been moved into the sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Batches in flush order. Empty after an abort.
    pub fn batches(&self) -> Vec<Vec<Reading>> {
        self.with_state(|s| s.batches.clone())
    }

    pub fn is_finished(&self) -> bool {
        self.with_state(|s| s.finished)
    }

    pub fn is_aborted(&self) -> bool {
        self.with_state(|s| s.aborted)
    }
}

#[async_trait]
impl BatchWriter for MemoryWriter {
    async fn write_batch(&mut self, batch: &[Reading]) -> Result<(), OutputError> {
        self.with_state(|s| {
            if s.finished || s.aborted {
                return Err(OutputError::Closed);
            }
            s.batches.push(batch.to_vec());
            Ok(())
        })
    }

    async fn finish(&mut self) -> Result<(), OutputError> {
        self.with_state(|s| s.finished = true);
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), OutputError> {
        self.with_state(|s| {
            s.batches.clear();
            s.aborted = true;
        });
        Ok(())
    }
}
