//! Collaborator traits plugged into the pipeline.
//!
//! The pipeline itself knows nothing about images or video. It enumerates
//! descriptors from an [`ItemSource`], turns each one into an item with an
//! [`ItemLoader`] followed by an [`ItemTransform`], and hands the items to a
//! [`Sink`] strictly in index order.

use framereel_core::Result;

use crate::descriptor::WorkDescriptor;

/// An ordered, finite sequence of work descriptors.
///
/// The position of a descriptor in the returned vector is its canonical
/// index; implementations must return them already sorted.
pub trait ItemSource {
    /// Opaque data the loader needs for one item (e.g. a path).
    type Payload: Send + Sync;

    /// Materialize every descriptor up front.
    fn list(&self) -> Result<Vec<WorkDescriptor<Self::Payload>>>;

    /// Short description used in logs and the empty-source error.
    fn describe(&self) -> String {
        "item source".into()
    }
}

impl<P: Clone + Send + Sync> ItemSource for Vec<P> {
    type Payload = P;

    fn list(&self) -> Result<Vec<WorkDescriptor<P>>> {
        Ok(WorkDescriptor::enumerate(self.iter().cloned()))
    }

    fn describe(&self) -> String {
        format!("in-memory source of {} items", self.len())
    }
}

/// Produces an item for one descriptor. Called concurrently from workers.
pub trait ItemLoader<P>: Send + Sync {
    type Item: Send;

    /// Load the item, or fail for this index only.
    fn load(&self, descriptor: &WorkDescriptor<P>) -> Result<Self::Item>;
}

/// A total, order-independent per-item transform.
pub trait ItemTransform<T>: Send + Sync {
    fn transform(&self, item: T) -> T;
}

/// Passes items through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> ItemTransform<T> for Identity {
    fn transform(&self, item: T) -> T {
        item
    }
}

/// Adapts a closure into an [`ItemTransform`].
pub struct FnTransform<F>(pub F);

impl<T, F> ItemTransform<T> for FnTransform<F>
where
    F: Fn(T) -> T + Send + Sync,
{
    fn transform(&self, item: T) -> T {
        (self.0)(item)
    }
}

/// Single-writer destination that receives items in index order.
///
/// `open` is called at most once, with the first item any worker
/// produced successfully. `close` is called exactly once per run, even when
/// `open` never happened; closing an unopened sink must succeed as a no-op.
pub trait Sink: Send {
    type Item;

    /// Prepare the sink using the first successfully produced item as the
    /// shape hint.
    fn open(&mut self, first: &Self::Item) -> Result<()>;

    /// Write one item. Indices arrive strictly increasing.
    fn append(&mut self, index: usize, item: Self::Item) -> Result<()>;

    /// Flush and finalize.
    fn close(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    type Item = S::Item;

    fn open(&mut self, first: &Self::Item) -> Result<()> {
        (**self).open(first)
    }

    fn append(&mut self, index: usize, item: Self::Item) -> Result<()> {
        (**self).append(index, item)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
