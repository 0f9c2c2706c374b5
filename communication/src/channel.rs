//! A bounded multi-producer multi-consumer channel over a shared ring buffer.
//!
//! [`channel`] allocates one ring buffer and returns a [`Sender`] and a
//! [`Receiver`] handle onto it. Handles may be cloned freely; the ring is
//! freed exactly once, when the last handle goes away. Senders block while
//! the ring is full, receivers block while it is empty, and [`close`]
//! transitions the channel into a terminal state in which waiters wake and
//! remaining elements can still be drained.
//!
//! [`close`]: Sender::close

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;

/// Failures surfaced by channel operations.
///
/// Closure is the only terminal state: operations never fail spuriously.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelError {
    /// The channel is closed to this handle.
    Closed,
    /// A channel cannot be created with capacity zero.
    InvalidCapacity,
}

impl Error for ChannelError {}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Closed => "operating on a closed channel".fmt(f),
            ChannelError::InvalidCapacity => "channels require capacity at least one".fmt(f),
        }
    }
}

/// Fixed-capacity ring storage, addressed by a head cursor and a length.
///
/// The element at logical position `i` lives at `(head + i) % capacity`.
/// Pushes land at `(head + len) % capacity` and pops advance `head`.
struct Ring<T> {
    buffer: Box<[Option<T>]>,
    head: usize,
    len: usize,
    closed: bool,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, || None);
        Ring {
            buffer: buffer.into_boxed_slice(),
            head: 0,
            len: 0,
            closed: false,
        }
    }

    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    fn push(&mut self, element: T) {
        debug_assert!(!self.is_full());
        let tail = (self.head + self.len) % self.capacity();
        self.buffer[tail] = Some(element);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let element = self.buffer[self.head].take();
        debug_assert!(element.is_some());
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        element
    }
}

/// Shared channel state: the ring under its mutex, condition variables for
/// each direction of waiting, and a count of live receiver handles.
struct Inner<T> {
    ring: CachePadded<Mutex<Ring<T>>>,
    not_full: Condvar,
    not_empty: Condvar,
    receivers: AtomicUsize,
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().expect("failed to lock channel ring")
    }

    fn close(&self) {
        let mut ring = self.lock();
        ring.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

/// Creates a bounded channel, returning its initial pair of handles.
///
/// `capacity` must be at least one; zero fails with
/// [`ChannelError::InvalidCapacity`].
///
/// # Examples
///
/// ```
/// use mainspring_communication::channel;
///
/// let (sender, receiver) = channel::<String>(2).unwrap();
/// sender.send("hello".to_owned()).unwrap();
/// assert_eq!(receiver.recv().unwrap(), "hello");
/// ```
pub fn channel<T>(capacity: usize) -> Result<(Sender<T>, Receiver<T>), ChannelError> {
    if capacity == 0 {
        return Err(ChannelError::InvalidCapacity);
    }
    let inner = Arc::new(Inner {
        ring: CachePadded::new(Mutex::new(Ring::with_capacity(capacity))),
        not_full: Condvar::new(),
        not_empty: Condvar::new(),
        receivers: AtomicUsize::new(1),
    });
    let sender = Sender {
        inner: Arc::clone(&inner),
        released: AtomicBool::new(false),
    };
    let receiver = Receiver {
        inner,
        released: AtomicBool::new(false),
    };
    Ok((sender, receiver))
}

/// The sending half of a bounded channel.
pub struct Sender<T> {
    inner: Arc<Inner<T>>,
    released: AtomicBool,
}

impl<T> Sender<T> {
    /// Sends an element, blocking while the ring is full.
    ///
    /// Fails with [`ChannelError::Closed`] if the channel is closed, or
    /// becomes closed while waiting for space.
    pub fn send(&self, element: T) -> Result<(), ChannelError> {
        if self.is_released() {
            return Err(ChannelError::Closed);
        }
        let mut ring = self.inner.lock();
        while ring.is_full() && !ring.closed {
            ring = self
                .inner
                .not_full
                .wait(ring)
                .expect("failed to wait on channel ring");
        }
        if ring.closed {
            return Err(ChannelError::Closed);
        }
        ring.push(element);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Sends an element if the ring has room, without blocking.
    ///
    /// Returns `Ok(false)` when the ring is full, and fails with
    /// [`ChannelError::Closed`] if the channel is closed.
    pub fn try_send(&self, element: T) -> Result<bool, ChannelError> {
        if self.is_released() {
            return Err(ChannelError::Closed);
        }
        let mut ring = self.inner.lock();
        if ring.closed {
            return Err(ChannelError::Closed);
        }
        if ring.is_full() {
            return Ok(false);
        }
        ring.push(element);
        self.inner.not_empty.notify_one();
        Ok(true)
    }

    /// Closes the channel, waking all waiting senders and receivers.
    ///
    /// Elements already in the ring remain receivable. Closing a released
    /// handle is a no-op, and closing twice is harmless.
    pub fn close(&self) {
        if !self.is_released() {
            self.inner.close();
        }
    }

    /// Detaches this handle from the channel.
    ///
    /// Subsequent operations on the handle report [`ChannelError::Closed`];
    /// other handles are unaffected. Releasing is idempotent, and happens
    /// automatically when the handle drops. The shared ring is freed when the
    /// last handle releases.
    pub fn release(&self) {
        let _ = self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// True when no live receiver handle remains on this channel.
    pub(crate) fn is_orphaned(&self) -> bool {
        self.inner.receivers.load(Ordering::SeqCst) == 0
    }

    /// True when the channel is open and the ring has room for one element.
    pub(crate) fn has_room(&self) -> bool {
        let ring = self.inner.lock();
        !ring.closed && !ring.is_full()
    }
}

impl<T> Clone for Sender<T> {
    /// Creates another sending handle on the same channel.
    ///
    /// Panics if this handle has already been released.
    fn clone(&self) -> Self {
        assert!(
            !self.is_released(),
            "cloning a released channel handle"
        );
        Sender {
            inner: Arc::clone(&self.inner),
            released: AtomicBool::new(false),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// The receiving half of a bounded channel.
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
    released: AtomicBool,
}

impl<T> Receiver<T> {
    /// Receives an element, blocking while the ring is empty.
    ///
    /// A closed channel drains: elements sent before closure are still
    /// returned, and only an empty, closed channel fails with
    /// [`ChannelError::Closed`].
    pub fn recv(&self) -> Result<T, ChannelError> {
        if self.is_released() {
            return Err(ChannelError::Closed);
        }
        let mut ring = self.inner.lock();
        loop {
            if let Some(element) = ring.pop() {
                self.inner.not_full.notify_one();
                return Ok(element);
            }
            if ring.closed {
                return Err(ChannelError::Closed);
            }
            ring = self
                .inner
                .not_empty
                .wait(ring)
                .expect("failed to wait on channel ring");
        }
    }

    /// Receives an element if one is ready, without blocking.
    ///
    /// `None` does not distinguish an empty channel from a closed and empty
    /// one; callers who need the distinction use [`recv`](Receiver::recv).
    pub fn try_recv(&self) -> Option<T> {
        if self.is_released() {
            return None;
        }
        let mut ring = self.inner.lock();
        let element = ring.pop();
        if element.is_some() {
            self.inner.not_full.notify_one();
        }
        element
    }

    /// Receives an element, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` if the timeout elapsed with the channel still open
    /// and empty, and fails with [`ChannelError::Closed`] once a closed
    /// channel has drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, ChannelError> {
        if self.is_released() {
            return Err(ChannelError::Closed);
        }
        let deadline = Instant::now() + timeout;
        let mut ring = self.inner.lock();
        loop {
            if let Some(element) = ring.pop() {
                self.inner.not_full.notify_one();
                return Ok(Some(element));
            }
            if ring.closed {
                return Err(ChannelError::Closed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let (guard, _timed_out) = self
                .inner
                .not_empty
                .wait_timeout(ring, remaining)
                .expect("failed to wait on channel ring");
            ring = guard;
        }
    }

    /// Closes the channel, waking all waiting senders and receivers.
    pub fn close(&self) {
        if !self.is_released() {
            self.inner.close();
        }
    }

    /// Detaches this handle from the channel.
    ///
    /// See [`Sender::release`]; in addition, releasing a receiver retires it
    /// from the channel's live-receiver count.
    pub fn release(&self) {
        if self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.inner.receivers.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// The number of elements currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// True when no elements are currently buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed capacity of the ring.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl<T> Clone for Receiver<T> {
    /// Creates another receiving handle on the same channel.
    ///
    /// Panics if this handle has already been released.
    fn clone(&self) -> Self {
        assert!(
            !self.is_released(),
            "cloning a released channel handle"
        );
        self.inner.receivers.fetch_add(1, Ordering::Relaxed);
        Receiver {
            inner: Arc::clone(&self.inner),
            released: AtomicBool::new(false),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Blocking iteration: each step is a [`recv`](Receiver::recv), and a closed,
/// drained channel ends the stream.
impl<T> Iterator for Receiver<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.recv().ok()
    }
}

#[cfg(test)]
mod tests {

    use super::{channel, ChannelError};

    #[test]
    fn ring_wraps_around() {
        let (sender, receiver) = channel::<u32>(2).unwrap();
        for round in 0..5 {
            sender.send(round).unwrap();
            sender.send(round + 100).unwrap();
            assert_eq!(receiver.recv(), Ok(round));
            assert_eq!(receiver.recv(), Ok(round + 100));
        }
        assert!(receiver.is_empty());
    }

    #[test]
    fn released_handle_acts_closed() {
        let (sender, receiver) = channel::<u32>(1).unwrap();
        sender.release();
        sender.release();
        assert_eq!(sender.send(1), Err(ChannelError::Closed));
        assert_eq!(sender.try_send(1), Err(ChannelError::Closed));
        // The channel itself is untouched by the release.
        let replacement = {
            let mut ring = receiver.inner.lock();
            ring.push(7);
            drop(ring);
            receiver.recv()
        };
        assert_eq!(replacement, Ok(7));
    }

    #[test]
    #[should_panic(expected = "cloning a released channel handle")]
    fn clone_after_release_panics() {
        let (sender, _receiver) = channel::<u32>(1).unwrap();
        sender.release();
        let _ = sender.clone();
    }
}
