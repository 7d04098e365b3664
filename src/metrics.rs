use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing parse activity.
#[derive(Default)]
pub struct ParseMetrics {
    documents_parsed: AtomicU64,
    records_extracted: AtomicU64,
    error_records: AtomicU64,
}

impl ParseMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished parse; `is_error` marks responses that carry an error record.
    pub fn record_parse(&self, is_error: bool) {
        self.documents_parsed.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.error_records.fetch_add(1, Ordering::Relaxed);
        } else {
            self.records_extracted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_parsed: self.documents_parsed.load(Ordering::Relaxed),
            records_extracted: self.records_extracted.load(Ordering::Relaxed),
            error_records: self.error_records.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of parse counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents that completed the pipeline since startup.
    pub documents_parsed: u64,
    /// Documents whose model reply parsed into a structured record.
    pub records_extracted: u64,
    /// Documents answered with an `{error, raw_output}` record.
    pub error_records: u64,
}
