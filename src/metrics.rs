use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing gateway activity since startup.
#[derive(Default)]
pub struct GatewayMetrics {
    embeds: AtomicU64,
    imported_texts: AtomicU64,
    searches: AtomicU64,
    collections_deleted: AtomicU64,
    pdfs_parsed: AtomicU64,
    failures: AtomicU64,
}

impl GatewayMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single embedding request.
    pub fn record_embed(&self) {
        self.embeds.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed import and the number of texts it stored.
    pub fn record_import(&self, count: u64) {
        self.imported_texts.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a completed search.
    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deleted collection.
    pub fn record_collection_deleted(&self) {
        self.collections_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a converted PDF document.
    pub fn record_pdf(&self) {
        self.pdfs_parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an operation that ended in an error.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            embeds: self.embeds.load(Ordering::Relaxed),
            imported_texts: self.imported_texts.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            collections_deleted: self.collections_deleted.load(Ordering::Relaxed),
            pdfs_parsed: self.pdfs_parsed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of gateway counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of single-text embedding requests served.
    pub embeds: u64,
    /// Total number of texts stored through imports.
    pub imported_texts: u64,
    /// Number of searches served.
    pub searches: u64,
    /// Number of collections deleted.
    pub collections_deleted: u64,
    /// Number of PDF documents converted to Markdown.
    pub pdfs_parsed: u64,
    /// Number of operations that failed.
    pub failures: u64,
}
