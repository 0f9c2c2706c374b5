//! Events describing tick execution, for the `"mainspring"` stream.

use serde::{Deserialize, Serialize};

/// Logger type carrying app events.
pub type AppLogger = mainspring_logging::Logger<AppEvent>;

/// The conventional registry name for the app event stream.
pub const APP_STREAM: &str = "mainspring";

/// Boundaries crossed while the runner drives a tick.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub enum AppEvent {
    /// A tick began.
    TickStart,
    /// A tick finished, cleanly or not.
    TickStop,
    /// A schedule's transaction was opened.
    ScheduleStart {
        /// Name of the schedule.
        name: String,
    },
    /// A schedule's transaction was closed.
    ScheduleStop {
        /// Name of the schedule.
        name: String,
        /// False when a system error rolled the schedule back.
        committed: bool,
    },
    /// A system was invoked.
    SystemStart {
        /// Name of the enclosing schedule.
        schedule: String,
        /// Name of the system.
        name: String,
    },
    /// A system returned.
    SystemStop {
        /// Name of the enclosing schedule.
        schedule: String,
        /// Name of the system.
        name: String,
        /// False when the system returned an error.
        succeeded: bool,
    },
}
