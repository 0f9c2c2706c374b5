//! Apps hosted inside actors, bridged to a parent app by typed channels.
//!
//! A subapp is a child [`App`] owned by an actor's worker thread. Each
//! inbound message is routed into the child (by resource write or
//! transaction) and followed by one tick; systems of the child emit
//! outbound events through a [`SubAppChildResource`] found in their
//! transaction. The parent addresses the subapp through a
//! [`SubAppParentResource`] in its own resource map, and manages shutdown
//! through a type-erased lifecycle handle.

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use mainspring_communication::actor::{spawn, ActorConfig, Command, Event, Handle, Outbox, Worker};
use mainspring_communication::channel::{Receiver, Sender};
use mainspring_communication::{ActorError, ChannelError};

use crate::app::{App, AppError};
use crate::resource::ResourceError;

/// Failures surfaced while spawning a subapp.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubAppError {
    /// An actor channel could not be allocated.
    Channel(ChannelError),
    /// The parent already hosts a subapp with these message types.
    Resource(ResourceError),
}

impl Error for SubAppError {}

impl fmt::Display for SubAppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubAppError::Channel(error) => write!(f, "spawning a subapp: {}", error),
            SubAppError::Resource(error) => write!(f, "registering a subapp: {}", error),
        }
    }
}

impl From<ChannelError> for SubAppError {
    fn from(error: ChannelError) -> Self {
        SubAppError::Channel(error)
    }
}

impl From<ResourceError> for SubAppError {
    fn from(error: ResourceError) -> Self {
        SubAppError::Resource(error)
    }
}

/// Options for a spawned subapp.
pub struct SubAppConfig {
    /// A schedule of the child run once when the subapp stops, typically
    /// registered with [`App::add_manual_schedule`] so ticks skip it.
    pub teardown_schedule: Option<String>,
    /// Channel capacities and logging for the hosting actor.
    pub actor: ActorConfig,
}

impl Default for SubAppConfig {
    fn default() -> Self {
        SubAppConfig {
            teardown_schedule: None,
            actor: ActorConfig::default(),
        }
    }
}

/// The capability surface a parent keeps for each subapp.
///
/// Erasing the message types here lets one collection manage heterogeneous
/// subapps uniformly.
pub trait SubAppLifecycle {
    /// Requests a graceful stop and joins the subapp's thread.
    fn wait_for_stop(&mut self, timeout: Duration) -> Result<(), ActorError>;
}

impl<C: Send + 'static, E: Send + 'static> SubAppLifecycle for Handle<C, E> {
    fn wait_for_stop(&mut self, timeout: Duration) -> Result<(), ActorError> {
        Handle::wait_for_stop(self, timeout)
    }
}

/// The parent-facing endpoints of a subapp, stored in the parent's
/// resource map: the inbox's send side and the outbox's receive side.
pub struct SubAppParentResource<I, O> {
    commands: Sender<Command<I>>,
    events: Receiver<Event<O>>,
}

impl<I, O> SubAppParentResource<I, O> {
    /// Delivers a message to the subapp, blocking on a full inbox.
    pub fn send(&self, message: I) -> Result<(), ActorError> {
        self.commands
            .send(Command::Message(message))
            .map_err(|_| ActorError::InboxSendFailed)
    }

    /// Receives the subapp's next event, blocking until one arrives.
    pub fn recv(&self) -> Result<O, ActorError> {
        match self.events.recv() {
            Ok(Event::Message(event)) => Ok(event),
            Ok(Event::Stopped) => Err(ActorError::Stopped),
            Err(_) => Err(ActorError::OutboxClosed),
        }
    }

    /// Receives an event if one is ready; `Ok(None)` means none yet.
    pub fn try_recv(&self) -> Result<Option<O>, ActorError> {
        match self.events.try_recv() {
            Some(Event::Message(event)) => Ok(Some(event)),
            Some(Event::Stopped) => Err(ActorError::Stopped),
            None => Ok(None),
        }
    }
}

/// The child-facing outbox of a subapp, stored in the child's resource map
/// so systems can emit events through their transaction.
pub struct SubAppChildResource<O> {
    events: Outbox<O>,
}

impl<O> SubAppChildResource<O> {
    /// Emits an event toward the parent, blocking on a full outbox.
    pub fn send(&self, event: O) -> Result<(), ActorError> {
        self.events.send(event)
    }

    /// Emits an event if the outbox has room.
    pub fn try_send(&self, event: O) -> Result<bool, ActorError> {
        self.events.try_send(event)
    }
}

/// The worker hosting a child app: route each message, then tick.
struct SubAppWorker<I, O> {
    app: App,
    route: Box<dyn FnMut(&mut App, I) -> Result<(), AppError>>,
    teardown: Option<String>,
    _events: PhantomData<O>,
}

impl<I: Send + 'static, O: Send + 'static> Worker for SubAppWorker<I, O> {
    type Command = I;
    type Event = O;

    fn attach(&mut self, events: &Outbox<O>) {
        // The slot may be pre-claimed by a child that routes events itself.
        let _ = self.app.insert_resource(SubAppChildResource {
            events: events.clone(),
        });
    }

    fn step(&mut self, command: I, _events: &Outbox<O>) -> Result<(), String> {
        (self.route)(&mut self.app, command).map_err(|error| error.to_string())?;
        let tick = if self.app.has_runner() {
            self.app.run()
        } else {
            self.app.run_once()
        };
        tick.map_err(|error| error.to_string())
    }

    fn finish(&mut self) {
        if let Some(teardown) = self.teardown.clone() {
            // Teardown failures have nowhere to surface; the stop proceeds.
            let _ = self.app.run_schedule(&teardown);
        }
    }
}

impl App {
    /// Spawns a child app on a dedicated actor thread.
    ///
    /// The `build` closure runs on the new thread to construct and populate
    /// the child app; `route` folds each inbound `I` into the child before
    /// the tick that follows it. The parent gains a
    /// [`SubAppParentResource<I, O>`] resource and a lifecycle entry
    /// stoppable through [`App::stop_subapps`]; the child gains a
    /// [`SubAppChildResource<O>`] resource.
    ///
    /// # Examples
    ///
    /// ```
    /// use mainspring::{App, SubAppConfig, SubAppParentResource};
    ///
    /// let mut parent = App::new();
    /// parent.spawn_subapp::<u64, u64, _, _>(
    ///     || {
    ///         let mut child = App::new();
    ///         child.add_schedule("respond").unwrap();
    ///         child.add_system("respond", "echo", |txn| {
    ///             let value = *txn.resource::<u64>().map_err(|e| e.to_string())?;
    ///             txn.resource::<mainspring::SubAppChildResource<u64>>()
    ///                 .map_err(|e| e.to_string())?
    ///                 .send(value)
    ///                 .map_err(|e| e.to_string())
    ///         }).unwrap();
    ///         child
    ///     },
    ///     |child, message| {
    ///         if child.insert_resource(message).is_err() {
    ///             *child.resource_mut::<u64>().expect("just checked") = message;
    ///         }
    ///         Ok(())
    ///     },
    ///     SubAppConfig::default(),
    /// ).unwrap();
    ///
    /// let pipe = parent.resource::<SubAppParentResource<u64, u64>>().unwrap();
    /// pipe.send(11).unwrap();
    /// assert_eq!(pipe.recv(), Ok(11));
    /// parent.stop_subapps(std::time::Duration::from_secs(1)).unwrap();
    /// ```
    pub fn spawn_subapp<I, O, B, R>(
        &mut self,
        build: B,
        route: R,
        config: SubAppConfig,
    ) -> Result<(), SubAppError>
    where
        I: Send + 'static,
        O: Send + 'static,
        B: FnOnce() -> App + Send + 'static,
        R: FnMut(&mut App, I) -> Result<(), AppError> + Send + 'static,
    {
        if self.resource::<SubAppParentResource<I, O>>().is_ok() {
            return Err(SubAppError::Resource(ResourceError::AlreadyExists));
        }
        let teardown = config.teardown_schedule;
        let handle = spawn(
            move || SubAppWorker {
                app: build(),
                route: Box::new(route),
                teardown,
                _events: PhantomData::<O>,
            },
            config.actor,
        )?;
        let pipe = SubAppParentResource {
            commands: handle.command_sender(),
            events: handle.event_receiver(),
        };
        self.insert_resource(pipe)?;
        self.register_subapp(Box::new(handle));
        Ok(())
    }
}
