//! Run-wide counters exposed in the run summary (§4.5), grounded on the
//! teacher's `engine-core::metrics::Metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    rows_copied: AtomicU64,
    bytes_transferred: AtomicU64,
    batches_processed: AtomicU64,
    failure_count: AtomicU64,
    retry_count: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub rows_copied: u64,
    pub bytes_transferred: u64,
    pub batches_processed: u64,
    pub failure_count: u64,
    pub retry_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner::default()) }
    }

    pub fn increment_rows(&self, count: u64) {
        self.inner.rows_copied.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner.bytes_transferred.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner.batches_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_copied: self.inner.rows_copied.load(Ordering::Relaxed),
            bytes_transferred: self.inner.bytes_transferred.load(Ordering::Relaxed),
            batches_processed: self.inner.batches_processed.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_every_counter() {
        let m = Metrics::new();
        m.increment_rows(10);
        m.increment_bytes(4096);
        m.increment_batches(1);
        m.increment_failures(2);
        m.increment_retries(3);
        let snap = m.snapshot();
        assert_eq!(snap.rows_copied, 10);
        assert_eq!(snap.bytes_transferred, 4096);
        assert_eq!(snap.batches_processed, 1);
        assert_eq!(snap.failure_count, 2);
        assert_eq!(snap.retry_count, 3);
    }
}
