//! End-to-end tests of the bounded channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use mainspring_communication::{channel, ChannelError};

#[test]
fn send_try_send_close_drain() {
    let (sender, receiver) = channel::<i32>(2).unwrap();

    sender.send(1).unwrap();
    sender.send(2).unwrap();
    assert_eq!(sender.try_send(3), Ok(false));

    assert_eq!(receiver.recv(), Ok(1));
    assert_eq!(sender.try_send(3), Ok(true));

    sender.close();
    assert_eq!(receiver.recv(), Ok(2));
    assert_eq!(receiver.recv(), Ok(3));
    assert_eq!(receiver.recv(), Err(ChannelError::Closed));
}

#[test]
fn zero_capacity_is_rejected() {
    assert_eq!(
        channel::<i32>(0).map(|_| ()),
        Err(ChannelError::InvalidCapacity)
    );
}

#[test]
fn fifo_across_threads() {
    let (sender, receiver) = channel::<u64>(4).unwrap();

    let producer = thread::spawn(move || {
        for value in 0..1000 {
            sender.send(value).unwrap();
        }
        sender.close();
    });

    let mut expected = 0;
    for value in receiver {
        assert_eq!(value, expected);
        expected += 1;
    }
    assert_eq!(expected, 1000);

    producer.join().unwrap();
}

#[test]
fn close_wakes_a_blocked_sender() {
    let (sender, receiver) = channel::<u8>(1).unwrap();
    sender.send(0).unwrap();

    let blocked = thread::spawn(move || sender.send(1));
    // Give the sender a moment to block on the full ring.
    thread::sleep(std::time::Duration::from_millis(20));
    receiver.close();

    assert_eq!(blocked.join().unwrap(), Err(ChannelError::Closed));
    assert_eq!(receiver.recv(), Ok(0));
    assert_eq!(receiver.recv(), Err(ChannelError::Closed));
}

#[test]
fn cloned_senders_share_the_ring() {
    let (sender, receiver) = channel::<u32>(8).unwrap();
    let other = sender.clone();

    sender.send(1).unwrap();
    other.send(2).unwrap();
    sender.release();
    // The clone outlives the released handle.
    other.send(3).unwrap();
    other.close();

    assert_eq!(receiver.collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn release_is_idempotent() {
    let (sender, receiver) = channel::<u32>(1).unwrap();
    sender.send(4).unwrap();

    sender.release();
    sender.release();
    assert_eq!(sender.send(5), Err(ChannelError::Closed));

    // The receiver still drains what was sent before the release.
    assert_eq!(receiver.recv(), Ok(4));
}

/// Counts drops of undelivered elements to observe the ring being freed
/// exactly once, after the last handle goes away.
struct Token(Arc<AtomicUsize>);

impl Drop for Token {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn storage_is_freed_once_after_the_last_handle() {
    let drops = Arc::new(AtomicUsize::new(0));

    let (sender, receiver) = channel::<Token>(4).unwrap();
    let extra_sender = sender.clone();
    let extra_receiver = receiver.clone();

    sender.send(Token(Arc::clone(&drops))).unwrap();
    sender.send(Token(Arc::clone(&drops))).unwrap();
    drop(receiver.recv().unwrap());
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    drop(sender);
    drop(receiver);
    drop(extra_sender);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    // The last handle frees the ring and the one undelivered element.
    drop(extra_receiver);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}
