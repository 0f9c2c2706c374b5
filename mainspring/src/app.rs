//! The ownership root of a mainspring program.
//!
//! An [`App`] owns the schedule registry, the schedule-order graph, the
//! resource map, the database seam, any spawned subapps, and an optional
//! runner. Ticks traverse the schedules in an order respecting every
//! before/after constraint, giving each schedule a fresh transaction and
//! each system its turn in registration order.

use std::cell::{RefCell, RefMut};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use mainspring_communication::{ActorError, Signal};
use mainspring_logging::Registry;

use crate::graph::{Graph, NodeIndex};
use crate::logging::{AppEvent, AppLogger, APP_STREAM};
use crate::resource::{ResourceError, Resources};
use crate::schedule::{Schedule, ScheduleId, SystemEntry, SystemResult};
use crate::subapp::SubAppLifecycle;
use crate::transaction::{Database, Transaction};

/// Failures surfaced by schedule registration and tick execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppError {
    /// A schedule with this name is already registered.
    DuplicateSchedule(String),
    /// A system with this name is already registered in the schedule.
    DuplicateSystem {
        /// Name of the schedule.
        schedule: String,
        /// Name of the already-registered system.
        system: String,
    },
    /// No schedule with this name is registered.
    UnknownSchedule(String),
    /// The schedule-order constraints form a directed cycle.
    CycleDetected,
    /// `run` was invoked with no runner bound.
    NoRunner,
    /// A system returned an error, stopping its schedule.
    System {
        /// Name of the schedule that was stopped.
        schedule: String,
        /// Name of the failing system.
        system: String,
        /// The system's own description of the failure.
        source: String,
    },
}

impl Error for AppError {}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DuplicateSchedule(name) => {
                write!(f, "schedule {:?} already exists", name)
            }
            AppError::DuplicateSystem { schedule, system } => {
                write!(f, "system {:?} already exists in schedule {:?}", system, schedule)
            }
            AppError::UnknownSchedule(name) => write!(f, "no schedule named {:?}", name),
            AppError::CycleDetected => "schedule ordering constraints form a cycle".fmt(f),
            AppError::NoRunner => "no runner is bound to the app".fmt(f),
            AppError::System {
                schedule,
                system,
                source,
            } => {
                write!(f, "system {:?} in schedule {:?} failed: {}", system, schedule, source)
            }
        }
    }
}

/// Logic invoked by [`App::run`] to drive the app.
pub type Runner = Box<dyn FnMut(&mut App) -> Result<(), AppError>>;

/// The top-level owner of schedules, resources, subapps, and the runner.
///
/// # Examples
///
/// ```
/// use mainspring::App;
///
/// let mut app = App::new();
/// app.add_schedule("update").unwrap();
/// app.add_system("update", "greet", |_txn| {
///     println!("hello");
///     Ok(())
/// }).unwrap();
/// app.run_once().unwrap();
/// ```
pub struct App {
    schedules: Vec<Schedule>,
    names: HashMap<String, ScheduleId>,
    /// Before/after constraints; an edge `a -> b` means `a` runs before `b`.
    order: Graph<usize, ()>,
    /// Graph node of each schedule, indexed by schedule id.
    order_nodes: Vec<NodeIndex>,
    resources: Resources,
    database: Box<dyn Database>,
    runner: Option<Runner>,
    subapps: Vec<Box<dyn SubAppLifecycle>>,
    logging: Rc<RefCell<Registry>>,
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

impl App {
    /// Creates an app with no schedules, a no-op database, and no runner.
    pub fn new() -> Self {
        App {
            schedules: Vec::new(),
            names: HashMap::new(),
            order: Graph::new(),
            order_nodes: Vec::new(),
            resources: Resources::new(),
            database: Box::new(()),
            runner: None,
            subapps: Vec::new(),
            logging: Rc::new(RefCell::new(Registry::new(Instant::now()))),
        }
    }

    /// Provides access to named logging streams.
    pub fn log_register(&self) -> RefMut<'_, Registry> {
        self.logging.borrow_mut()
    }

    fn logger(&self) -> Option<AppLogger> {
        self.logging.borrow().get(APP_STREAM)
    }

    /// Registers an empty schedule under a unique, non-empty name.
    pub fn add_schedule(&mut self, name: &str) -> Result<ScheduleId, AppError> {
        self.register_schedule(name, true)
    }

    /// Registers a schedule that ticks skip.
    ///
    /// Manual schedules run only through [`App::run_schedule`]; subapps use
    /// them for teardown work that must not run every tick.
    pub fn add_manual_schedule(&mut self, name: &str) -> Result<ScheduleId, AppError> {
        self.register_schedule(name, false)
    }

    fn register_schedule(&mut self, name: &str, ticked: bool) -> Result<ScheduleId, AppError> {
        assert!(!name.is_empty(), "schedule names must be non-empty");
        if self.names.contains_key(name) {
            return Err(AppError::DuplicateSchedule(name.to_owned()));
        }
        let id = ScheduleId(self.schedules.len());
        self.schedules.push(Schedule::new(name, ticked));
        self.names.insert(name.to_owned(), id);
        self.order_nodes.push(self.order.add_node(id.0));
        Ok(id)
    }

    /// The id of the schedule registered under `name`.
    pub fn schedule_id(&self, name: &str) -> Result<ScheduleId, AppError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| AppError::UnknownSchedule(name.to_owned()))
    }

    /// Constrains schedule `first` to run before schedule `second`.
    ///
    /// Fails with [`AppError::CycleDetected`] when the new constraint would
    /// close a cycle; the constraint is then not recorded.
    pub fn schedule_before(&mut self, first: &str, second: &str) -> Result<(), AppError> {
        let earlier = self.schedule_id(first)?;
        let later = self.schedule_id(second)?;
        if earlier == later {
            return Err(AppError::CycleDetected);
        }
        let from = self.order_nodes[earlier.0];
        let to = self.order_nodes[later.0];
        if self
            .order
            .contains_path(to, from)
            .expect("schedule order node missing")
        {
            return Err(AppError::CycleDetected);
        }
        // A duplicate constraint is already satisfied; nothing to store.
        let _ = self
            .order
            .add_edge(from, to, ())
            .expect("schedule order node missing");
        Ok(())
    }

    /// Constrains schedule `first` to run after schedule `second`.
    pub fn schedule_after(&mut self, first: &str, second: &str) -> Result<(), AppError> {
        self.schedule_before(second, first)
    }

    /// Appends a named system to a schedule.
    ///
    /// Systems run in registration order; names are unique per schedule.
    pub fn add_system<F>(&mut self, schedule: &str, name: &str, logic: F) -> Result<(), AppError>
    where
        F: FnMut(&mut Transaction) -> SystemResult + 'static,
    {
        let id = self.schedule_id(schedule)?;
        let entry = &mut self.schedules[id.0];
        if entry.contains_system(name) {
            return Err(AppError::DuplicateSystem {
                schedule: schedule.to_owned(),
                system: name.to_owned(),
            });
        }
        entry.systems.push(SystemEntry {
            name: name.to_owned(),
            logic: Box::new(logic),
        });
        Ok(())
    }

    /// Stores a resource, rejecting a second value of the same type.
    pub fn insert_resource<R: 'static>(&mut self, value: R) -> Result<(), ResourceError> {
        self.resources.insert(value)
    }

    /// A shared borrow of the resource of type `R`.
    pub fn resource<R: 'static>(&self) -> Result<&R, ResourceError> {
        self.resources.get::<R>()
    }

    /// An exclusive borrow of the resource of type `R`.
    pub fn resource_mut<R: 'static>(&mut self) -> Result<&mut R, ResourceError> {
        self.resources.get_mut::<R>()
    }

    /// Removes and returns the resource of type `R`, if any.
    pub fn remove_resource<R: 'static>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    /// Replaces the database driven by schedule transactions.
    pub fn set_database<D: Database>(&mut self, database: D) {
        self.database = Box::new(database);
    }

    /// Binds the runner invoked by [`App::run`], replacing any previous one.
    pub fn set_runner<F>(&mut self, runner: F)
    where
        F: FnMut(&mut App) -> Result<(), AppError> + 'static,
    {
        self.runner = Some(Box::new(runner));
    }

    /// True when a runner is bound.
    pub fn has_runner(&self) -> bool {
        self.runner.is_some()
    }

    /// Invokes the bound runner on this app.
    pub fn run(&mut self) -> Result<(), AppError> {
        let mut runner = self.runner.take().ok_or(AppError::NoRunner)?;
        let result = runner(self);
        self.runner = Some(runner);
        result
    }

    /// Runs one tick: every schedule, in constraint order.
    ///
    /// Ordering cycles abort with [`AppError::CycleDetected`] before any
    /// schedule runs. A system error stops its schedule, rolls the
    /// schedule's transaction back, and propagates without running later
    /// schedules.
    pub fn run_once(&mut self) -> Result<(), AppError> {
        let logger = self.logger();
        if let Some(logger) = logger.as_ref() {
            logger.log(AppEvent::TickStart);
        }

        let sorted = self.order.topological_sort();
        let mut result = if sorted.has_cycles {
            Err(AppError::CycleDetected)
        } else {
            Ok(())
        };

        if result.is_ok() {
            for node in sorted.order {
                let index = *self
                    .order
                    .node_weight(node)
                    .expect("schedule order node missing");
                if !self.schedules[index].ticked {
                    continue;
                }
                if let Err(error) = self.run_schedule_at(index) {
                    result = Err(error);
                    break;
                }
            }
        }

        if let Some(logger) = logger.as_ref() {
            logger.log(AppEvent::TickStop);
            logger.flush();
        }
        result
    }

    /// Runs ticks until `stop` reads true.
    ///
    /// The signal is consulted before each tick, so a stop raised mid-tick
    /// lets the tick finish. Tick errors propagate immediately.
    pub fn run_until_stopped(&mut self, stop: &Signal<bool>) -> Result<(), AppError> {
        while !stop.get() {
            self.run_once()?;
        }
        Ok(())
    }

    /// Runs a single schedule by name, outside any tick.
    pub fn run_schedule(&mut self, name: &str) -> Result<(), AppError> {
        let id = self.schedule_id(name)?;
        self.run_schedule_at(id.0)
    }

    /// Runs one schedule inside a fresh transaction: systems in registration
    /// order, stopping at the first error.
    fn run_schedule_at(&mut self, index: usize) -> Result<(), AppError> {
        let logger = self.logger();
        let schedule = &mut self.schedules[index];
        let schedule_name = schedule.name.clone();

        if let Some(logger) = logger.as_ref() {
            logger.log(AppEvent::ScheduleStart {
                name: schedule_name.clone(),
            });
        }

        let mut txn = Transaction::begin(&mut *self.database, &mut self.resources);
        let mut failure = None;
        for system in schedule.systems.iter_mut() {
            if let Some(logger) = logger.as_ref() {
                logger.log(AppEvent::SystemStart {
                    schedule: schedule_name.clone(),
                    name: system.name.clone(),
                });
            }
            let outcome = (system.logic)(&mut txn);
            if let Some(logger) = logger.as_ref() {
                logger.log(AppEvent::SystemStop {
                    schedule: schedule_name.clone(),
                    name: system.name.clone(),
                    succeeded: outcome.is_ok(),
                });
            }
            if let Err(source) = outcome {
                failure = Some(AppError::System {
                    schedule: schedule_name.clone(),
                    system: system.name.clone(),
                    source,
                });
                break;
            }
        }

        let committed = failure.is_none();
        if committed {
            txn.commit();
        } else {
            txn.rollback();
        }
        if let Some(logger) = logger.as_ref() {
            logger.log(AppEvent::ScheduleStop {
                name: schedule_name,
                committed,
            });
        }
        match failure {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Adopts a spawned subapp for lifecycle management.
    pub(crate) fn register_subapp(&mut self, subapp: Box<dyn SubAppLifecycle>) {
        self.subapps.push(subapp);
    }

    /// The number of subapps currently managed.
    pub fn subapp_count(&self) -> usize {
        self.subapps.len()
    }

    /// Stops every subapp, sequentially, waiting at most `timeout` for each.
    ///
    /// All subapps are stopped even when one reports an error; the first
    /// error is returned after the walk completes.
    pub fn stop_subapps(&mut self, timeout: Duration) -> Result<(), ActorError> {
        let mut first_error = None;
        for mut subapp in self.subapps.drain(..) {
            if let Err(error) = subapp.wait_for_stop(timeout) {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}
