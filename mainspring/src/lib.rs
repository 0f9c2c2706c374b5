//! Mainspring is a schedule-driven application framework: named schedules of
//! named systems, ordered by a constraint graph and driven by a runner, with
//! background work hosted in actor-owned subapps.
//!
//! The code is organized in crates and modules that are meant to depend as
//! little as possible on each other.
//!
//! **Communication**: The [`mainspring_communication`] crate provides the
//! bounded channels, signals, and actors the framework is built from.
//!
//! **Logging**: The [`mainspring_logging`] crate provides the typed event
//! logging used throughout; this crate's [`logging`] module defines the
//! events the runner emits.
//!
//! **Scheduling**: The [`graph`] module orders schedules topologically, the
//! [`app`] module owns registries and drives ticks, and the [`subapp`]
//! module hosts child apps on actor threads.
//!
//! # Examples
//!
//! The following is a hello-world mainspring program.
//!
//! ```
//! mainspring::example(|app| {
//!     app.add_schedule("update").unwrap();
//!     app.add_system("update", "greet", |_txn| {
//!         println!("hello");
//!         Ok(())
//!     })
//!     .unwrap();
//! });
//! ```
//!
//! The program uses [`example`] to assemble an app with one schedule and one
//! system and drive a single tick. Larger programs use [`execute`] with a
//! [`Config`] (often parsed from command line arguments), bind before/after
//! constraints between schedules, and let systems exchange data through
//! resources and the transaction.

#![forbid(missing_docs)]

pub use crate::app::{App, AppError, Runner};
pub use crate::execute::{example, execute, Config};
pub use crate::graph::{Graph, GraphError, NodeIndex, TopologicalOrder};
pub use crate::resource::{ResourceError, Resources};
pub use crate::schedule::{ScheduleId, SystemResult};
pub use crate::subapp::{
    SubAppChildResource, SubAppConfig, SubAppError, SubAppLifecycle, SubAppParentResource,
};
pub use crate::transaction::{Database, Transaction};

/// Re-export of the `mainspring_communication` crate.
pub mod communication {
    pub use mainspring_communication::*;
}

/// Re-export of the `mainspring_logging` crate.
pub mod logging_core {
    pub use mainspring_logging::*;
}

pub mod app;
pub mod execute;
pub mod graph;
pub mod logging;
pub mod resource;
pub mod schedule;
pub mod subapp;
pub mod transaction;
