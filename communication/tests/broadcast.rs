//! End-to-end tests of broadcast fan-out.

use std::thread;

use mainspring_communication::{broadcast, ChannelError};

#[test]
fn every_subscriber_sees_every_element() {
    let fanout = broadcast::<u32>(16).unwrap();
    let first = fanout.subscribe();
    let second = fanout.subscribe();

    for value in 0..10 {
        fanout.send(value).unwrap();
    }
    fanout.close();

    for receiver in [first, second] {
        let mut drained = Vec::new();
        while let Some(value) = receiver.try_recv() {
            drained.push(value);
        }
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
        assert_eq!(receiver.recv(), Err(ChannelError::Closed));
    }
}

#[test]
fn per_subscriber_order_is_preserved_across_threads() {
    let fanout = broadcast::<u64>(4).unwrap();

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let receiver = fanout.subscribe();
            thread::spawn(move || {
                let mut expected = 0;
                for value in receiver {
                    assert_eq!(value, expected);
                    expected += 1;
                }
                expected
            })
        })
        .collect();

    for value in 0..100 {
        fanout.send(value).unwrap();
    }
    fanout.close();

    for consumer in consumers {
        assert_eq!(consumer.join().unwrap(), 100);
    }
}

#[test]
fn late_subscribers_miss_earlier_elements() {
    let fanout = broadcast::<u32>(8).unwrap();
    let early = fanout.subscribe();

    fanout.send(1).unwrap();
    let late = fanout.subscribe();
    fanout.send(2).unwrap();
    fanout.close();

    assert_eq!(early.try_recv(), Some(1));
    assert_eq!(early.try_recv(), Some(2));
    assert_eq!(late.try_recv(), Some(2));
    assert_eq!(late.recv(), Err(ChannelError::Closed));
}

#[test]
fn dropping_the_last_controller_ends_the_stream() {
    let fanout = broadcast::<u32>(4).unwrap();
    let receiver = fanout.subscribe();
    let alias = fanout.clone();

    fanout.send(9).unwrap();
    drop(fanout);
    // The alias still holds the stream open.
    alias.send(10).unwrap();
    drop(alias);

    assert_eq!(receiver.recv(), Ok(9));
    assert_eq!(receiver.recv(), Ok(10));
    assert_eq!(receiver.recv(), Err(ChannelError::Closed));
}
