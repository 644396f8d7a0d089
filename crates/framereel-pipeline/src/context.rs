//! Run-scoped context: cancellation and progress reporting.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Sender for reporting progress from the consumer side of a run.
///
/// Wraps a callback that receives the number of items written so far and
/// the total number of descriptors.
pub struct ProgressSender {
    callback: Box<dyn Fn(usize, usize) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, written: usize, total: usize) {
        (self.callback)(written, total);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Context shared by the orchestrator, the workers and the consumer.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Checked by workers before claiming each index.
    pub cancellation: CancellationToken,
    /// Receives a report after every append.
    pub progress: Arc<ProgressSender>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
