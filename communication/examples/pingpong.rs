use std::time::Duration;

use mainspring_communication::actor::{spawn, ActorConfig, Outbox, Worker};

/// Replies to each ping with a pong carrying the same sequence number.
struct Ponger;

impl Worker for Ponger {
    type Command = u64;
    type Event = u64;
    fn step(&mut self, ping: u64, events: &Outbox<u64>) -> Result<(), String> {
        events.send(ping).map_err(|e| e.to_string())
    }
}

fn main() {
    let mut handle = spawn(|| Ponger, ActorConfig::default()).expect("failed to spawn");

    for ping in 0..5 {
        handle.send(ping).expect("failed to ping");
        let pong = handle.recv().expect("failed to receive pong");
        println!("ping {} -> pong {}", ping, pong);
    }

    handle
        .wait_for_stop(Duration::from_secs(1))
        .expect("failed to stop");
}
