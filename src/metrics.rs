use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    documents_summarized: AtomicU64,
    documents_failed: AtomicU64,
    chunks_summarized: AtomicU64,
    completion_calls: AtomicU64,
    reduce_fallbacks: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully summarized document.
    pub fn record_success(&self, chunk_count: u64, completion_calls: u64, reduce_fallback: bool) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.completion_calls
            .fetch_add(completion_calls, Ordering::Relaxed);
        if reduce_fallback {
            self.reduce_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a document whose pipeline ended in an error.
    pub fn record_failure(&self, completion_calls: u64) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
        self.completion_calls
            .fetch_add(completion_calls, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            completion_calls: self.completion_calls.load(Ordering::Relaxed),
            reduce_fallbacks: self.reduce_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents that produced a final summary since startup.
    pub documents_summarized: u64,
    /// Documents rejected or aborted with a classified error.
    pub documents_failed: u64,
    /// Total chunk count across summarized documents.
    pub chunks_summarized: u64,
    /// Completion endpoint invocations, successful or not.
    pub completion_calls: u64,
    /// Multi-chunk documents whose reduce pass degraded to concatenation.
    pub reduce_fallbacks: u64,
}
