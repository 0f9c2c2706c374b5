//! Fan-out over per-subscriber bounded channels.
//!
//! A [`Broadcaster`] owns a list of subscriber channels behind a mutex.
//! Sending clones the element into every live subscriber's ring; a blocking
//! [`send`](Broadcaster::send) applies back-pressure from the slowest
//! subscriber, while [`try_send`](Broadcaster::try_send) is all-or-nothing.
//! Subscribers that release their receivers are pruned lazily on the next
//! send.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::channel::{channel, ChannelError, Receiver, Sender};

struct Subscribers<T> {
    /// One bounded channel's send side per subscriber.
    entries: Vec<Sender<T>>,
    /// Ring capacity used for each subscriber channel.
    capacity: usize,
    closed: bool,
}

/// The controlling handle of a broadcast channel.
///
/// Clones share the subscriber list; when the last clone drops, every
/// subscriber channel is closed so receivers observe end-of-stream.
///
/// # Examples
///
/// ```
/// use mainspring_communication::broadcast;
///
/// let fanout = broadcast::<u64>(8).unwrap();
/// let first = fanout.subscribe();
/// let second = fanout.subscribe();
///
/// fanout.send(3).unwrap();
/// fanout.close();
///
/// assert_eq!(first.recv(), Ok(3));
/// assert_eq!(second.recv(), Ok(3));
/// assert!(second.recv().is_err());
/// ```
pub struct Broadcaster<T> {
    subscribers: Arc<Mutex<Subscribers<T>>>,
}

/// Creates a broadcast channel whose subscriber rings hold `capacity`
/// elements each.
///
/// Fails with [`ChannelError::InvalidCapacity`] when `capacity` is zero.
pub fn broadcast<T: Clone>(capacity: usize) -> Result<Broadcaster<T>, ChannelError> {
    if capacity == 0 {
        return Err(ChannelError::InvalidCapacity);
    }
    Ok(Broadcaster {
        subscribers: Arc::new(Mutex::new(Subscribers {
            entries: Vec::new(),
            capacity,
            closed: false,
        })),
    })
}

impl<T: Clone> Broadcaster<T> {
    fn lock(&self) -> MutexGuard<'_, Subscribers<T>> {
        self.subscribers
            .lock()
            .expect("failed to lock subscriber list")
    }

    /// Adds a subscriber, returning the receive side of its channel.
    ///
    /// Subscribing to a closed broadcaster succeeds, but the receiver
    /// observes [`ChannelError::Closed`] immediately.
    pub fn subscribe(&self) -> Receiver<T> {
        let mut subscribers = self.lock();
        // Capacity was validated when the broadcaster was created.
        let (sender, receiver) =
            channel(subscribers.capacity).expect("subscriber capacity invalidated");
        if subscribers.closed {
            sender.close();
        } else {
            subscribers.entries.push(sender);
        }
        receiver
    }

    /// Sends an element to every live subscriber, blocking on full rings.
    ///
    /// Delivery is in subscription order, so a slow subscriber delays those
    /// after it. Subscribers whose receivers have all been released are
    /// dropped from the list instead of receiving the element.
    pub fn send(&self, element: T) -> Result<(), ChannelError> {
        let mut subscribers = self.lock();
        if subscribers.closed {
            return Err(ChannelError::Closed);
        }
        subscribers.entries.retain(|entry| !entry.is_orphaned());
        for entry in subscribers.entries.iter() {
            // A subscriber closing its own channel mid-send is equivalent to
            // releasing it; the entry is pruned on the next send.
            let _ = entry.send(element.clone());
        }
        Ok(())
    }

    /// Sends an element only if every live subscriber's ring has room.
    ///
    /// Returns `Ok(false)` without enqueueing anywhere if any ring is full.
    /// Room cannot be stolen between the check and the pushes: subscriber
    /// channels have no senders besides this controller, and receivers only
    /// make room.
    pub fn try_send(&self, element: T) -> Result<bool, ChannelError> {
        let mut subscribers = self.lock();
        if subscribers.closed {
            return Err(ChannelError::Closed);
        }
        subscribers.entries.retain(|entry| !entry.is_orphaned());
        if !subscribers.entries.iter().all(|entry| entry.has_room()) {
            return Ok(false);
        }
        for entry in subscribers.entries.iter() {
            let _ = entry.try_send(element.clone());
        }
        Ok(true)
    }

    /// Closes every subscriber channel and marks the broadcaster closed.
    ///
    /// Elements already in subscriber rings remain receivable. Later calls
    /// to [`subscribe`](Broadcaster::subscribe) yield immediately-closed
    /// receivers.
    pub fn close(&self) {
        let mut subscribers = self.lock();
        subscribers.closed = true;
        for entry in subscribers.entries.drain(..) {
            entry.close();
        }
    }
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Broadcaster {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Drop for Broadcaster<T> {
    fn drop(&mut self) {
        // The last controller closes the stream for all subscribers.
        if Arc::strong_count(&self.subscribers) == 1 {
            if let Ok(mut subscribers) = self.subscribers.lock() {
                subscribers.closed = true;
                for entry in subscribers.entries.drain(..) {
                    entry.close();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::broadcast;
    use crate::channel::ChannelError;

    #[test]
    fn subscribe_after_close_is_terminal() {
        let fanout = broadcast::<u32>(4).unwrap();
        fanout.close();
        let late = fanout.subscribe();
        assert_eq!(late.recv(), Err(ChannelError::Closed));
        assert_eq!(fanout.send(1), Err(ChannelError::Closed));
    }

    #[test]
    fn try_send_is_all_or_nothing() {
        let fanout = broadcast::<u32>(1).unwrap();
        let roomy = fanout.subscribe();
        let full = fanout.subscribe();

        assert_eq!(fanout.try_send(1), Ok(true));
        // Drain one subscriber only; the other stays full.
        assert_eq!(roomy.recv(), Ok(1));
        assert_eq!(fanout.try_send(2), Ok(false));
        assert!(roomy.try_recv().is_none());
        assert_eq!(full.len(), 1);
    }

    #[test]
    fn released_subscribers_are_pruned() {
        let fanout = broadcast::<u32>(1).unwrap();
        let keeper = fanout.subscribe();
        let leaver = fanout.subscribe();

        leaver.release();
        // A full, abandoned subscriber must not block the broadcast.
        fanout.send(1).unwrap();
        fanout.send(2).unwrap();
        assert_eq!(keeper.recv(), Ok(1));
        assert_eq!(keeper.recv(), Ok(2));
    }
}
