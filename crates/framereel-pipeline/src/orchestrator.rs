//! Pipeline orchestrator: owns the lifecycle of one ordered run.
//!
//! `Idle -> Enumerating -> Running -> Draining -> Finalized`. The calling
//! thread acts as the single consumer: while the [`WorkerPool`] runs on
//! scoped threads, it pulls ordered batches from the [`Reassembler`] and
//! appends them to the sink. `Draining` starts once the pool has stopped
//! claiming indices, while the consumer may still be appending. The sink is
//! closed exactly once on every path that reaches it.

use std::fmt;
use std::thread;
use std::time::Instant;

use framereel_core::{Error, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::{ProgressSender, RunContext};
use crate::pool::{PoolReport, WorkerPool};
use crate::reassembler::{Reassembler, Release};
use crate::result::PipelineResult;
use crate::sink::SinkGate;
use crate::traits::{ItemLoader, ItemSource, ItemTransform, Sink};

/// Lifecycle state of an [`Orchestrator`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Enumerating,
    Running,
    Draining,
    Finalized { failed: bool },
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Enumerating => write!(f, "enumerating"),
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Finalized { failed: false } => write!(f, "finalized"),
            Self::Finalized { failed: true } => write!(f, "finalized (failed)"),
        }
    }
}

/// What the consumer loop saw.
struct Drained {
    written: usize,
    fatal: Option<String>,
}

/// Runs sources through a worker pool into a sink, in order.
pub struct Orchestrator {
    pool: WorkerPool,
    ctx: RunContext,
    require_items: bool,
    state: Mutex<OrchestratorState>,
}

impl Orchestrator {
    /// Create an orchestrator using the available hardware parallelism.
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::with_default_concurrency(),
            ctx: RunContext::new(),
            require_items: false,
            state: Mutex::new(OrchestratorState::Idle),
        }
    }

    /// Builder: set the number of workers.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.pool = WorkerPool::new(concurrency);
        self
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.ctx = self.ctx.with_cancellation(token);
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.ctx = self.ctx.with_progress(progress);
        self
    }

    /// Builder: report an empty source as [`Error::EmptySource`] instead of
    /// an empty success.
    pub fn require_items(mut self, require: bool) -> Self {
        self.require_items = require;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.pool.concurrency()
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    fn transition(&self, to: OrchestratorState) {
        let mut state = self.state.lock();
        let from = *state;
        tracing::debug!(%from, %to, "pipeline state change");
        *state = to;
    }

    /// Enumerate `source`, process every descriptor with `loader` then
    /// `transform` on the worker pool, and append results to `sink` in index
    /// order.
    ///
    /// Per-item load failures are skipped and reported in the result. Sink
    /// failures stop the run and are reported in [`PipelineResult::fatal`]
    /// or [`PipelineResult::close_error`].
    ///
    /// # Errors
    ///
    /// - Propagates errors from [`ItemSource::list`].
    /// - Returns [`Error::EmptySource`] for an empty source when
    ///   [`require_items`](Self::require_items) is set.
    /// - Returns a validation error if this orchestrator already ran.
    pub fn run<Src, L, X, S>(
        &self,
        source: &Src,
        loader: &L,
        transform: &X,
        sink: &mut S,
    ) -> Result<PipelineResult>
    where
        Src: ItemSource,
        L: ItemLoader<Src::Payload>,
        X: ItemTransform<L::Item>,
        S: Sink<Item = L::Item>,
    {
        if self.state() != OrchestratorState::Idle {
            return Err(Error::Validation(format!(
                "orchestrator already used (state: {})",
                self.state()
            )));
        }
        let started = Instant::now();

        self.transition(OrchestratorState::Enumerating);
        let descriptors = match source.list() {
            Ok(descriptors) => descriptors,
            Err(e) => {
                if let Err(close) = SinkGate::new(sink).close() {
                    tracing::warn!("failed to finalize sink after enumeration error: {close}");
                }
                self.transition(OrchestratorState::Finalized { failed: true });
                return Err(e);
            }
        };
        let total = descriptors.len();
        tracing::info!(
            source = %source.describe(),
            items = total,
            workers = self.pool.concurrency(),
            "starting pipeline"
        );

        if total == 0 {
            let close = SinkGate::new(sink).close();
            let failed = self.require_items || close.is_err();
            self.transition(OrchestratorState::Finalized { failed });
            if self.require_items {
                return Err(Error::empty_source(source.describe()));
            }
            let mut result = PipelineResult::empty();
            if let Err(e) = close {
                result.succeeded = false;
                result.close_error = Some(e.to_string());
            }
            return Ok(result);
        }

        self.transition(OrchestratorState::Running);
        // Fatal sink errors cancel this child token only, never the caller's.
        let cancel = self.ctx.cancellation.child_token();
        let reassembler = Reassembler::new(total);
        let gate = SinkGate::new(sink);

        let (drained, report) = thread::scope(|scope| {
            let workers = scope.spawn(|| {
                let report = self.pool.run(
                    &descriptors,
                    loader,
                    transform,
                    &reassembler,
                    |item| gate.ensure_open(item),
                    &cancel,
                );
                // Nothing is claimed from here on; the consumer may still be
                // writing released items.
                self.transition(OrchestratorState::Draining);
                report
            });
            let drained = self.consume(&reassembler, &gate, &cancel, total);
            let report = workers.join().unwrap_or_else(|_| {
                tracing::error!("worker pool panicked");
                self.transition(OrchestratorState::Draining);
                PoolReport::default()
            });
            (drained, report)
        });

        let fatal = drained
            .fatal
            .or_else(|| gate.open_error().map(|m| Error::SinkOpen(m).to_string()));
        tracing::debug!(opened = gate.is_open(), "finalizing sink");
        let close = gate.close();
        if let Err(ref e) = close {
            tracing::error!("failed to finalize sink: {e}");
        }

        let cancelled = report.cancelled > 0 && fatal.is_none();
        let mut result = PipelineResult {
            succeeded: false,
            items_written: drained.written,
            total,
            failures: report.failures,
            fatal,
            close_error: close.err().map(|e| e.to_string()),
            cancelled,
            anomalies: reassembler.anomalies(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        result.succeeded = result.failures.is_empty()
            && result.fatal.is_none()
            && result.close_error.is_none()
            && !result.cancelled
            && result.items_written == total;

        self.transition(OrchestratorState::Finalized {
            failed: !result.succeeded,
        });
        tracing::info!(
            written = result.items_written,
            total,
            failed = result.failures.len(),
            elapsed_ms = result.elapsed_ms,
            succeeded = result.succeeded,
            "pipeline finished"
        );
        Ok(result)
    }

    /// Single consumer: append released items until every index is
    /// accounted for or the sink fails.
    fn consume<S: Sink>(
        &self,
        reassembler: &Reassembler<S::Item>,
        gate: &SinkGate<'_, S>,
        cancel: &CancellationToken,
        total: usize,
    ) -> Drained {
        let mut written = 0;
        while let Some(batch) = reassembler.next_batch() {
            for release in batch {
                match release {
                    Release::Item { index, item } => {
                        if let Err(e) = gate.append(index, item) {
                            tracing::error!(index, "stopping pipeline: {e}");
                            cancel.cancel();
                            reassembler.abandon();
                            return Drained {
                                written,
                                fatal: Some(e.to_string()),
                            };
                        }
                        written += 1;
                        self.ctx.progress.send(written, total);
                    }
                    Release::Skipped { index } => {
                        tracing::debug!(index, "index skipped");
                    }
                }
            }
        }
        Drained {
            written,
            fatal: None,
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one pipeline with `concurrency` workers and default settings.
pub fn run<Src, L, X, S>(
    source: &Src,
    loader: &L,
    transform: &X,
    sink: &mut S,
    concurrency: usize,
) -> Result<PipelineResult>
where
    Src: ItemSource,
    L: ItemLoader<Src::Payload>,
    X: ItemTransform<L::Item>,
    S: Sink<Item = L::Item>,
{
    Orchestrator::new()
        .with_concurrency(concurrency)
        .run(source, loader, transform, sink)
}
