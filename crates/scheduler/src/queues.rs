//! Stage C queue wiring (§4.2.1, §4.3): a copy queue keyed by `PartId`, one
//! combined index/constraint queue (indexed work and constraint-only work
//! share a single pool of `indexJobs` workers, distinguished by
//! [`IndexWork`]), and a vacuum queue keyed by table oid.

use concurrency::queue::{QueueReceiver, ReceivedMessage};
use concurrency::CancelFlags;
use model::ObjectId;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Bounded capacity for every named queue (§4.2.1 "tiny fixed-size
/// messages... a bounded channel sized to a small fixed capacity").
pub const QUEUE_CAPACITY: usize = 256;

/// One unit of work dequeued by an index worker. Both variants carry an
/// index oid: `Constraint` is looked up the same way `Index` is, the
/// variant only tells the worker which phase's action to perform.
#[derive(Debug, Clone, Copy)]
pub enum IndexWork {
    Index(ObjectId),
    Constraint(ObjectId),
}

/// Wraps a single-consumer [`QueueReceiver`] so a pool of worker tasks can
/// share it: each task locks briefly to pull the next message, then
/// releases the lock while it does the (possibly slow) work.
pub type SharedReceiver<T> = Arc<AsyncMutex<QueueReceiver<T>>>;

pub fn shared<T: Send + 'static>(rx: QueueReceiver<T>) -> SharedReceiver<T> {
    Arc::new(AsyncMutex::new(rx))
}

pub async fn recv_shared<T>(rx: &SharedReceiver<T>, cancel: &CancelFlags) -> ReceivedMessage<T> {
    let mut guard = rx.lock().await;
    guard.receive(cancel).await
}
