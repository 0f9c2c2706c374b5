//! Named schedules: ordered lists of named systems.

use crate::transaction::Transaction;

/// The outcome of one system invocation.
///
/// An error stops the enclosing schedule and rolls its transaction back.
pub type SystemResult = Result<(), String>;

/// A stable handle to a registered schedule.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ScheduleId(pub(crate) usize);

impl ScheduleId {
    /// The schedule's position in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named system: user logic invoked with the schedule's transaction.
pub(crate) struct SystemEntry {
    pub(crate) name: String,
    pub(crate) logic: Box<dyn FnMut(&mut Transaction) -> SystemResult>,
}

/// A named, ordered list of systems, run in registration order.
pub(crate) struct Schedule {
    pub(crate) name: String,
    pub(crate) systems: Vec<SystemEntry>,
    /// False for manual schedules, which ticks skip.
    pub(crate) ticked: bool,
}

impl Schedule {
    pub(crate) fn new(name: &str, ticked: bool) -> Self {
        Schedule {
            name: name.to_owned(),
            systems: Vec::new(),
            ticked,
        }
    }

    pub(crate) fn contains_system(&self, name: &str) -> bool {
        self.systems.iter().any(|system| system.name == name)
    }
}
