//! Fixed-size worker pool with lock-free index claiming.
//!
//! Each worker repeatedly claims the next index from a shared atomic
//! counter, loads and transforms that descriptor, and hands the outcome to
//! the [`Reassembler`]. Failed indices are marked skipped so the consumer
//! never waits on an index that will not arrive.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use framereel_core::{Error, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::descriptor::WorkDescriptor;
use crate::reassembler::Reassembler;
use crate::result::ItemFailure;
use crate::traits::{ItemLoader, ItemTransform};

/// Hands out every index in `[0, total)` exactly once.
#[derive(Debug)]
pub struct ClaimCounter {
    next: AtomicUsize,
    total: usize,
}

impl ClaimCounter {
    pub fn new(total: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            total,
        }
    }

    /// Claim the next unclaimed index, or `None` once all are taken.
    pub fn claim(&self) -> Option<usize> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index < self.total).then_some(index)
    }

    /// Take every index nobody has claimed yet.
    ///
    /// Only one caller receives a non-empty range.
    pub fn claim_remaining(&self) -> Range<usize> {
        let first = self.next.swap(self.total, Ordering::AcqRel);
        first.min(self.total)..self.total
    }
}

/// Summary of what the workers did.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Load failures ordered by index.
    pub failures: Vec<ItemFailure>,
    /// Indices marked skipped because of cancellation.
    pub cancelled: usize,
    /// Indices that produced an item.
    pub produced: usize,
}

/// A fixed number of OS threads running load + transform in parallel.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    /// Create a pool with `concurrency` workers (at least one).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Create a pool sized to the available hardware parallelism.
    pub fn with_default_concurrency() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every descriptor through `loader` and `transform`, blocking until
    /// all workers have finished.
    ///
    /// `open` is called with every produced item before it is inserted; it
    /// is expected to be cheap after the first call. If it fails the run is
    /// cancelled and the reassembler abandoned.
    pub fn run<P, L, X, O>(
        &self,
        descriptors: &[WorkDescriptor<P>],
        loader: &L,
        transform: &X,
        reassembler: &Reassembler<L::Item>,
        open: O,
        cancel: &CancellationToken,
    ) -> PoolReport
    where
        P: Sync,
        L: ItemLoader<P>,
        X: ItemTransform<L::Item>,
        O: Fn(&L::Item) -> Result<()> + Sync,
    {
        let claims = ClaimCounter::new(descriptors.len());
        let report = Mutex::new(PoolReport::default());
        let workers = self.concurrency.min(descriptors.len());

        tracing::debug!(workers, items = descriptors.len(), "starting worker pool");

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let worker = Worker {
                    id: worker_id,
                    descriptors,
                    claims: &claims,
                    loader,
                    transform,
                    reassembler,
                    open: &open,
                    cancel,
                    report: &report,
                };
                scope.spawn(move || worker.run());
            }
        });

        let mut report = report.into_inner();
        report.failures.sort_by_key(|f| f.index);
        report
    }
}

struct Worker<'a, P, L: ItemLoader<P>, X, O> {
    id: usize,
    descriptors: &'a [WorkDescriptor<P>],
    claims: &'a ClaimCounter,
    loader: &'a L,
    transform: &'a X,
    reassembler: &'a Reassembler<L::Item>,
    open: &'a O,
    cancel: &'a CancellationToken,
    report: &'a Mutex<PoolReport>,
}

impl<P, L, X, O> Worker<'_, P, L, X, O>
where
    L: ItemLoader<P>,
    X: ItemTransform<L::Item>,
    O: Fn(&L::Item) -> Result<()>,
{
    fn run(&self) {
        loop {
            if self.cancel.is_cancelled() {
                let remaining = self.claims.claim_remaining();
                if !remaining.is_empty() {
                    tracing::info!(
                        worker = self.id,
                        from = remaining.start,
                        count = remaining.len(),
                        "cancelled; skipping unclaimed items"
                    );
                    self.report.lock().cancelled += remaining.len();
                    self.reassembler.skip_range(remaining);
                }
                return;
            }

            let Some(index) = self.claims.claim() else {
                return;
            };

            match self.produce(index) {
                Ok(item) => {
                    if let Err(e) = (self.open)(&item) {
                        tracing::error!(worker = self.id, index, "{e}");
                        self.cancel.cancel();
                        self.reassembler.abandon();
                        return;
                    }
                    tracing::trace!(worker = self.id, index, "item ready");
                    self.report.lock().produced += 1;
                    // Anomalies are recorded by the reassembler itself.
                    let _ = self.reassembler.insert(index, item);
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, index, "skipping item: {e}");
                    self.report.lock().failures.push(ItemFailure {
                        index,
                        reason: e.to_string(),
                    });
                    let _ = self.reassembler.skip(index);
                }
            }
        }
    }

    /// Load and transform one descriptor. A panic counts as a load failure.
    fn produce(&self, index: usize) -> Result<L::Item> {
        let descriptor = &self.descriptors[index];
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.loader
                .load(descriptor)
                .map(|item| self.transform.transform(item))
        }))
        .unwrap_or_else(|payload| {
            let message = format!("worker panicked: {}", panic_message(payload.as_ref()));
            Err(Error::load(index, message))
        })
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
