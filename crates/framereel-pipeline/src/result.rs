//! Outcome of one pipeline run.

use serde::Serialize;

/// A per-index failure recorded while the run continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub index: usize,
    pub reason: String,
}

/// Final report produced by the orchestrator once the sink is finalized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineResult {
    /// No item failed, the run was not cancelled, and the sink opened,
    /// accepted every item, and closed cleanly.
    pub succeeded: bool,
    /// Number of items appended to the sink.
    pub items_written: usize,
    /// Number of descriptors the source produced.
    pub total: usize,
    /// Load failures, ordered by index.
    pub failures: Vec<ItemFailure>,
    /// Sink open or append failure that stopped the run.
    pub fatal: Option<String>,
    /// Sink close failure. Items already written stay written.
    pub close_error: Option<String>,
    /// The caller cancelled the run before every index was claimed.
    pub cancelled: bool,
    /// Indices dropped by the reorder buffer as late or duplicate.
    pub anomalies: Vec<usize>,
    pub elapsed_ms: u64,
}

impl PipelineResult {
    /// Result for a source with nothing in it.
    pub fn empty() -> Self {
        Self {
            succeeded: true,
            ..Default::default()
        }
    }

    /// Indices that never reached the sink.
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.items_written)
    }

    /// Whether the caller should treat this run as good.
    ///
    /// Without `allow_partial` this is exactly [`succeeded`](Self::succeeded).
    /// With it, skipped items are tolerated as long as something was written
    /// and the sink itself never failed.
    pub fn is_acceptable(&self, allow_partial: bool) -> bool {
        if self.succeeded {
            return true;
        }
        allow_partial
            && !self.cancelled
            && self.fatal.is_none()
            && self.close_error.is_none()
            && self.items_written > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial() -> PipelineResult {
        PipelineResult {
            succeeded: false,
            items_written: 3,
            total: 4,
            failures: vec![ItemFailure {
                index: 2,
                reason: "corrupt".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn empty_result_succeeds() {
        let result = PipelineResult::empty();
        assert!(result.succeeded);
        assert_eq!(result.items_written, 0);
        assert_eq!(result.skipped(), 0);
    }

    #[test]
    fn partial_result_needs_opt_in() {
        let result = partial();
        assert_eq!(result.skipped(), 1);
        assert!(!result.is_acceptable(false));
        assert!(result.is_acceptable(true));
    }

    #[test]
    fn sink_failure_is_never_acceptable() {
        let mut result = partial();
        result.fatal = Some("broken pipe".into());
        assert!(!result.is_acceptable(true));

        let mut result = partial();
        result.close_error = Some("exit status 1".into());
        assert!(!result.is_acceptable(true));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_string(&partial()).unwrap();
        assert!(json.contains("\"items_written\":3"));
        assert!(json.contains("\"reason\":\"corrupt\""));
    }
}
