//! Output capture shared between the controller and an engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable buffer an engine appends standard output to.
///
/// All clones share one buffer; the controller hands a clone to the engine
/// before a run and reads the concatenated text afterwards.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    chunks: Arc<Mutex<Vec<String>>>,
}

impl OutputSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn chunks_mut(&self) -> MutexGuard<'_, Vec<String>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a chunk of output. Empty chunks are dropped.
    pub fn push(&self, chunk: impl Into<String>) {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.chunks_mut().push(chunk);
        }
    }

    /// Everything pushed so far, concatenated in order.
    pub fn contents(&self) -> String {
        self.chunks_mut().concat()
    }
}
