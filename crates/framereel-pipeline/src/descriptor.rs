//! Indexed work descriptors.

/// A lightweight reference to one unit of work.
///
/// Immutable once created; the index is the canonical output position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDescriptor<P> {
    pub index: usize,
    pub payload: P,
}

impl<P> WorkDescriptor<P> {
    pub fn new(index: usize, payload: P) -> Self {
        Self { index, payload }
    }

    /// Assign positional indices, starting at 0, to an ordered sequence.
    pub fn enumerate(payloads: impl IntoIterator<Item = P>) -> Vec<Self> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| Self { index, payload })
            .collect()
    }
}
