//! Events describing actor lifecycles, for the `"mainspring/comm"` stream.

use serde::{Deserialize, Serialize};

/// Logger type carrying communication events.
pub type CommLogger = mainspring_logging::Logger<ActorEvent>;

/// The conventional registry name for the communication event stream.
pub const COMM_STREAM: &str = "mainspring/comm";

/// Lifecycle events of an actor, observed from its spawning thread.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub enum ActorEvent {
    /// A worker thread was spawned with the given channel capacities.
    Spawned {
        /// Name of the worker thread.
        name: String,
        /// Ring capacity of the command inbox.
        inbox_capacity: usize,
        /// Ring capacity of the event outbox.
        outbox_capacity: usize,
    },
    /// A graceful stop was requested through a handle.
    StopRequested {
        /// Name of the worker thread.
        name: String,
    },
    /// The worker thread was joined.
    Joined {
        /// Name of the worker thread.
        name: String,
        /// False when the thread had panicked.
        clean: bool,
    },
}
