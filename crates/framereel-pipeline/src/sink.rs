//! Shared handle around a [`Sink`] for one run.
//!
//! Workers race to open the sink with the first item they produce; the
//! open runs exactly once behind a [`OnceLock`]. Appends only ever come
//! from the single consumer, so the mutex around the sink is uncontended
//! after the open. A panic inside `open` is recorded as an open failure
//! so no worker is left waiting on an index that will never arrive.

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use framereel_core::{Error, Result};
use parking_lot::Mutex;

use crate::pool::panic_message;
use crate::traits::Sink;

pub(crate) struct SinkGate<'a, S: Sink> {
    sink: Mutex<&'a mut S>,
    opened: OnceLock<std::result::Result<(), String>>,
}

impl<'a, S: Sink> SinkGate<'a, S> {
    pub(crate) fn new(sink: &'a mut S) -> Self {
        Self {
            sink: Mutex::new(sink),
            opened: OnceLock::new(),
        }
    }

    /// Open the sink with `first` unless some worker already did.
    ///
    /// Every caller observes the outcome of the single open attempt.
    pub(crate) fn ensure_open(&self, first: &S::Item) -> Result<()> {
        self.opened
            .get_or_init(|| {
                tracing::debug!("opening sink with first produced item");
                let attempt =
                    panic::catch_unwind(AssertUnwindSafe(|| self.sink.lock().open(first)));
                match attempt {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(Error::SinkOpen(message))) => Err(message),
                    Ok(Err(other)) => Err(other.to_string()),
                    Err(payload) => Err(format!(
                        "sink open panicked: {}",
                        panic_message(payload.as_ref())
                    )),
                }
            })
            .clone()
            .map_err(Error::SinkOpen)
    }

    pub(crate) fn append(&self, index: usize, item: S::Item) -> Result<()> {
        self.sink.lock().append(index, item)
    }

    pub(crate) fn is_open(&self) -> bool {
        matches!(self.opened.get(), Some(Ok(())))
    }

    pub(crate) fn open_error(&self) -> Option<String> {
        self.opened.get().and_then(|outcome| outcome.clone().err())
    }

    /// Finalize the sink. Consumes the gate so it happens once.
    pub(crate) fn close(self) -> Result<()> {
        self.sink.into_inner().close()
    }
}
