//! In-process mapping of pgcopydb's SysV IPC layer (§4.2, §9): named durable
//! queues, named counting semaphores, and three-level cancellation flags.
//! A process-per-worker reference becomes a task-per-worker here; these
//! primitives replace shared-memory semaphores and SysV message queues with
//! their `tokio` equivalents while keeping the same call shapes.

pub mod cancel;
pub mod pid;
pub mod queue;
pub mod semaphore;

pub use cancel::CancelFlags;
pub use pid::PidLiveness;
pub use queue::{NamedQueue, QueueClosed, QueueMessage, QueueReceiver, ReceivedMessage};
pub use semaphore::NamedSemaphore;
