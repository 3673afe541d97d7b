//! Named queue (§4.2.1): durable within a run, multi-producer
//! multi-consumer, FIFO, carrying tiny fixed-size messages.
//!
//! A SysV queue's "poison pill" idiom (send one `STOP` per consumer after
//! the work set is drained) is modeled directly: `Stop` is a variant of the
//! message envelope rather than a side channel, so `receive` always returns
//! promptly even while the queue is otherwise empty.

use crate::cancel::CancelFlags;
use tokio::sync::mpsc;

/// Envelope around a queue payload. `Stop` terminates exactly one consumer.
#[derive(Debug, Clone)]
pub enum QueueMessage<T> {
    Work(T),
    Stop,
}

/// A multi-producer multi-consumer named queue.
///
/// Cloning a `NamedQueue` clones the sender handle; every clone shares the
/// same bounded channel, matching the "multi-producer" half of the spec.
/// Consumers call `receive` on a private [`QueueReceiver`] obtained from
/// [`NamedQueue::receiver`] once per worker task (a channel has exactly one
/// receiver at a time, so a pool hands out the single `Receiver` it owns).
pub struct NamedQueue<T> {
    name: String,
    sender: mpsc::Sender<QueueMessage<T>>,
}

impl<T> Clone for NamedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
        }
    }
}

/// The consuming half of a [`NamedQueue`]. Not clonable: ownership of a
/// payload transfers to whichever task holds the receiver.
pub struct QueueReceiver<T> {
    name: String,
    receiver: mpsc::Receiver<QueueMessage<T>>,
}

impl<T: Send + 'static> NamedQueue<T> {
    /// `create`: allocates a new named queue with the given bounded capacity.
    /// Returns the producer handle and the single consumer handle.
    pub fn create(name: impl Into<String>, capacity: usize) -> (Self, QueueReceiver<T>) {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.clone(),
                sender,
            },
            QueueReceiver { name, receiver },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `send`: enqueues one payload. Errors only if every receiver has been
    /// dropped (queue unlinked).
    pub async fn send(&self, item: T) -> Result<(), QueueClosed> {
        self.sender
            .send(QueueMessage::Work(item))
            .await
            .map_err(|_| QueueClosed)
    }

    /// Sends a `Stop` poison pill; call once per consumer after the
    /// producer side has drained its work set.
    pub async fn send_stop(&self) -> Result<(), QueueClosed> {
        self.sender.send(QueueMessage::Stop).await.map_err(|_| QueueClosed)
    }

    /// `unlink`: drops this producer handle. Once every clone is dropped the
    /// channel closes and a blocked `receive` resolves to `None`.
    pub fn unlink(self) {
        drop(self);
    }
}

impl<T> QueueReceiver<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `receive`: blocks until a message arrives, a `Stop` poison pill is
    /// seen, or cancellation is requested. A fast-stop wakes a blocked
    /// receiver immediately rather than waiting for the in-flight queue to
    /// drain naturally (§5 "stop_fast sends STOP messages to all queues").
    pub async fn receive(&mut self, cancel: &CancelFlags) -> ReceivedMessage<T> {
        tokio::select! {
            biased;
            _ = cancel.fast_stop_token().cancelled() => ReceivedMessage::Cancelled,
            msg = self.receiver.recv() => match msg {
                Some(QueueMessage::Work(item)) => ReceivedMessage::Item(item),
                Some(QueueMessage::Stop) => ReceivedMessage::Stop,
                None => ReceivedMessage::Closed,
            },
        }
    }
}

/// Outcome of a [`QueueReceiver::receive`] call.
#[derive(Debug)]
pub enum ReceivedMessage<T> {
    Item(T),
    Stop,
    /// All producers dropped without sending `Stop` (treated the same as `Stop`).
    Closed,
    /// A fast-stop or quit cancellation was observed before a message arrived.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
#[error("queue closed: no receivers remain")]
pub struct QueueClosed;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_work_then_stop() {
        let (queue, mut rx) = NamedQueue::create("copy", 8);
        queue.send(1u32).await.unwrap();
        queue.send(2u32).await.unwrap();
        queue.send_stop().await.unwrap();

        let cancel = CancelFlags::new();
        assert!(matches!(rx.receive(&cancel).await, ReceivedMessage::Item(1)));
        assert!(matches!(rx.receive(&cancel).await, ReceivedMessage::Item(2)));
        assert!(matches!(rx.receive(&cancel).await, ReceivedMessage::Stop));
    }

    #[tokio::test]
    async fn unlink_closes_the_channel() {
        let (queue, mut rx) = NamedQueue::<u32>::create("copy", 4);
        queue.unlink();
        let cancel = CancelFlags::new();
        assert!(matches!(rx.receive(&cancel).await, ReceivedMessage::Closed));
    }

    #[tokio::test]
    async fn fast_stop_wakes_a_blocked_receiver() {
        let (_queue, mut rx) = NamedQueue::<u32>::create("copy", 4);
        let cancel = CancelFlags::new();
        cancel.request_stop_fast();
        assert!(matches!(
            rx.receive(&cancel).await,
            ReceivedMessage::Cancelled
        ));
    }
}
