//! Bounded channels, signals, and actors for the mainspring framework.
//!
//! This crate is the concurrency substrate of mainspring, separated out to
//! make clear boundaries in the project. It provides, leaves first:
//!
//! * [`channel`]: a bounded multi-producer multi-consumer channel whose
//!   endpoints are reference-counted handles over one shared ring buffer.
//! * [`Signal`]: a reference-counted, atomically readable and writable cell,
//!   used for one-way status communication such as shutdown flags.
//! * [`broadcast`]: fan-out built from one bounded channel per subscriber,
//!   coordinated by a controller that owns the subscriber list.
//! * [`actor`]: a worker loop on a dedicated OS thread, bridged to callers
//!   by an inbox/outbox channel pair carrying control envelopes.
//!
//! # Examples
//!
//! ```
//! let (sender, receiver) = mainspring_communication::channel::<u64>(4).unwrap();
//!
//! sender.send(17).unwrap();
//! sender.close();
//!
//! assert_eq!(receiver.recv(), Ok(17));
//! assert!(receiver.recv().is_err());
//! ```

#![forbid(missing_docs)]

pub mod actor;
pub mod broadcast;
pub mod channel;
pub mod logging;
pub mod signal;

pub use actor::{spawn, ActorConfig, ActorError, Command, Event, Handle, Outbox, Worker};
pub use broadcast::{broadcast, Broadcaster};
pub use channel::{channel, ChannelError, Receiver, Sender};
pub use signal::Signal;
