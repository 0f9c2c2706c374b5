//! End-to-end tests of the actor runtime.

use std::time::Duration;

use mainspring_communication::actor::{spawn, ActorConfig, Outbox, Worker};
use mainspring_communication::ActorError;

struct Doubler;

impl Worker for Doubler {
    type Command = i32;
    type Event = i32;
    fn step(&mut self, command: i32, events: &Outbox<i32>) -> Result<(), String> {
        events.send(command * 2).map_err(|e| e.to_string())
    }
}

#[test]
fn doubler_round_trip() {
    let mut handle = spawn(|| Doubler, ActorConfig::default()).unwrap();

    handle.send(10).unwrap();
    handle.send(25).unwrap();
    assert_eq!(handle.recv(), Ok(20));
    assert_eq!(handle.recv(), Ok(50));

    handle.wait_for_stop(Duration::from_millis(1000)).unwrap();
    assert_eq!(handle.send(1), Err(ActorError::InboxClosed));
}

/// A worker that accumulates commands and reports the total on stop.
struct Summer {
    total: u64,
}

impl Worker for Summer {
    type Command = u64;
    type Event = u64;
    fn step(&mut self, command: u64, _events: &Outbox<u64>) -> Result<(), String> {
        self.total += command;
        Ok(())
    }
}

#[test]
fn stop_discards_late_events_and_joins() {
    let mut handle = spawn(|| Summer { total: 0 }, ActorConfig::default()).unwrap();
    for value in 1..=10 {
        handle.send(value).unwrap();
    }
    // All queued commands drain ahead of the stop request.
    handle.wait_for_stop(Duration::from_millis(1000)).unwrap();
}

struct Faulty;

impl Worker for Faulty {
    type Command = u32;
    type Event = u32;
    fn step(&mut self, command: u32, events: &Outbox<u32>) -> Result<(), String> {
        if command == 0 {
            return Err("zero is not a command".to_owned());
        }
        events.send(command).map_err(|e| e.to_string())
    }
}

#[test]
fn step_errors_terminate_the_worker() {
    let mut handle = spawn(|| Faulty, ActorConfig::default()).unwrap();

    handle.send(7).unwrap();
    assert_eq!(handle.recv(), Ok(7));

    handle.send(0).unwrap();
    // The loop exits on the error and announces the stop.
    assert_eq!(handle.recv(), Err(ActorError::Stopped));
    handle.wait_for_stop(Duration::from_millis(1000)).unwrap();
}

/// A worker that emits bursts, to exercise outbox back-pressure.
struct Chatty;

impl Worker for Chatty {
    type Command = u32;
    type Event = u32;
    fn step(&mut self, command: u32, events: &Outbox<u32>) -> Result<(), String> {
        for value in 0..command {
            events.send(value).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

#[test]
fn small_outbox_applies_back_pressure() {
    let config = ActorConfig {
        inbox_capacity: 2,
        outbox_capacity: 2,
        ..ActorConfig::default()
    };
    let mut handle = spawn(|| Chatty, config).unwrap();

    handle.send(100).unwrap();
    for expected in 0..100 {
        assert_eq!(handle.recv(), Ok(expected));
    }
    handle.wait_for_stop(Duration::from_millis(1000)).unwrap();
}

#[test]
fn dropping_a_handle_stops_the_actor() {
    let handle = spawn(|| Doubler, ActorConfig::default()).unwrap();
    handle.send(3).unwrap();
    // The drop below must request a stop and join without hanging.
    drop(handle);
}
