//! Named counting semaphore (§4.2.2): one per concurrency class —
//! *table-copy* (value 1), *index-build* (value `indexJobs`), *catalog*
//! (value 1). Acquire/release are blocking; ownership of a permit is not
//! tracked beyond its RAII guard, matching the spec's "ownership is not
//! tracked" note.

use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// A named wrapper around `tokio::sync::Semaphore`.
#[derive(Clone)]
pub struct NamedSemaphore {
    name: String,
    inner: Arc<Semaphore>,
}

impl NamedSemaphore {
    pub fn new(name: impl Into<String>, permits: usize) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Semaphore::new(permits.max(1))),
        }
    }

    /// Semaphore guarding the table-level truncate-once section (value 1).
    pub fn table_copy() -> Self {
        Self::new("table-copy", 1)
    }

    /// Semaphore bounding concurrent `CREATE INDEX` on the target.
    pub fn index_build(index_jobs: usize) -> Self {
        Self::new("index-build", index_jobs)
    }

    /// Semaphore serializing Catalog Store writers (value 1).
    pub fn catalog() -> Self {
        Self::new("catalog", 1)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until a permit is available. The returned guard releases the
    /// permit on drop.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        self.inner
            .acquire()
            .await
            .expect("semaphore is never closed for the lifetime of a run")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn caps_concurrency_at_the_configured_value() {
        let sem = NamedSemaphore::index_build(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let sem = sem.clone();
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
