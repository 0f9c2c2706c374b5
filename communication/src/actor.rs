//! Worker loops on dedicated OS threads, bridged by channel pairs.
//!
//! [`spawn`] starts a thread, builds a [`Worker`] inside it, and runs the
//! worker's step function over an inbox of commands. The caller keeps a
//! [`Handle`] bundling the inbox's send side, the outbox's receive side, and
//! the thread's join handle. User messages travel inside control envelopes
//! ([`Command`], [`Event`]) so that a graceful stop and an end-of-stream
//! marker are representable in-band.
//!
//! Workers are constructed from a builder closure shipped into the thread,
//! so a worker itself need not be `Send`; state the worker shares with the
//! spawning thread is whatever the builder captured.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::channel::{channel, ChannelError, Receiver, Sender};
use crate::logging::{ActorEvent, CommLogger};

/// Failures surfaced by actor handles and outboxes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActorError {
    /// The worker announced its stop; no further events will arrive.
    Stopped,
    /// The inbox is closed to this handle after a stop request.
    InboxClosed,
    /// The outbox ended without a stop announcement.
    OutboxClosed,
    /// A command could not be delivered to the worker.
    InboxSendFailed,
    /// An event could not be delivered from the worker.
    OutboxSendFailed,
    /// A channel underlying the actor reported closure.
    ChannelClosed,
}

impl Error for ActorError {}

impl fmt::Display for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorError::Stopped => "the worker has stopped".fmt(f),
            ActorError::InboxClosed => "the inbox is closed to this handle".fmt(f),
            ActorError::OutboxClosed => "the outbox ended without a stop announcement".fmt(f),
            ActorError::InboxSendFailed => "failed to deliver a command to the worker".fmt(f),
            ActorError::OutboxSendFailed => "failed to deliver an event from the worker".fmt(f),
            ActorError::ChannelClosed => "an actor channel closed".fmt(f),
        }
    }
}

impl From<ChannelError> for ActorError {
    fn from(_: ChannelError) -> Self {
        ActorError::ChannelClosed
    }
}

/// Inbox envelope: a user command, or a request to stop the loop.
pub enum Command<T> {
    /// A user message for the worker's step function.
    Message(T),
    /// Breaks the worker loop once commands ahead of it have drained.
    Stop,
}

/// Outbox envelope: a user event, or the worker's final stop announcement.
pub enum Event<U> {
    /// A user message emitted by the worker's step function.
    Message(U),
    /// The worker loop has exited; at most one per actor, always last.
    Stopped,
}

/// Logic hosted by an actor thread.
///
/// The worker is built inside its thread and owns its state, so steps take
/// `&mut self`. A step error terminates the loop, after which the actor
/// announces `Stopped` and closes its outbox.
pub trait Worker: 'static {
    /// Commands accepted from the inbox.
    type Command: Send + 'static;
    /// Events emitted to the outbox.
    type Event: Send + 'static;

    /// Called once, before the first command, with the worker's outbox.
    fn attach(&mut self, events: &Outbox<Self::Event>) {
        let _ = events;
    }

    /// Processes one command, possibly emitting events.
    fn step(&mut self, command: Self::Command, events: &Outbox<Self::Event>)
        -> Result<(), String>;

    /// Called once when the loop exits, before the stop announcement.
    fn finish(&mut self) {}
}

/// The worker-facing send side of an actor's outbox.
pub struct Outbox<U> {
    events: Sender<Event<U>>,
}

impl<U> Outbox<U> {
    /// Emits an event toward the actor's handle, blocking on a full outbox.
    pub fn send(&self, event: U) -> Result<(), ActorError> {
        self.events
            .send(Event::Message(event))
            .map_err(|_| ActorError::OutboxSendFailed)
    }

    /// Emits an event if the outbox has room.
    pub fn try_send(&self, event: U) -> Result<bool, ActorError> {
        self.events
            .try_send(Event::Message(event))
            .map_err(|_| ActorError::OutboxSendFailed)
    }
}

impl<U> Clone for Outbox<U> {
    fn clone(&self) -> Self {
        Outbox {
            events: self.events.clone(),
        }
    }
}

/// Capacities and logging for a spawned actor.
pub struct ActorConfig {
    /// Ring capacity of the command inbox.
    pub inbox_capacity: usize,
    /// Ring capacity of the event outbox.
    pub outbox_capacity: usize,
    /// Optional logger for actor lifecycle events.
    pub logger: Option<CommLogger>,
}

impl Default for ActorConfig {
    fn default() -> Self {
        ActorConfig {
            inbox_capacity: 16,
            outbox_capacity: 16,
            logger: None,
        }
    }
}

/// How long a dropped, un-stopped handle waits before forcing the join.
const DROP_STOP_TIMEOUT: Duration = Duration::from_secs(1);

static ACTOR_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Spawns a worker on a dedicated OS thread.
///
/// The builder closure runs on the new thread to construct the worker, in
/// the manner of an allocator builder: the worker itself never crosses a
/// thread boundary, only the builder does. Fails only if a channel cannot
/// be allocated from the configured capacities.
///
/// # Examples
///
/// ```
/// use mainspring_communication::actor::{spawn, ActorConfig, Outbox, Worker};
///
/// struct Doubler;
///
/// impl Worker for Doubler {
///     type Command = i32;
///     type Event = i32;
///     fn step(&mut self, command: i32, events: &Outbox<i32>) -> Result<(), String> {
///         events.send(command * 2).map_err(|e| e.to_string())
///     }
/// }
///
/// let mut handle = spawn(|| Doubler, ActorConfig::default()).unwrap();
/// handle.send(21).unwrap();
/// assert_eq!(handle.recv(), Ok(42));
/// handle.wait_for_stop(std::time::Duration::from_secs(1)).unwrap();
/// ```
pub fn spawn<W, F>(
    builder: F,
    config: ActorConfig,
) -> Result<Handle<W::Command, W::Event>, ChannelError>
where
    W: Worker,
    F: FnOnce() -> W + Send + 'static,
{
    let (commands, inbox) = channel(config.inbox_capacity)?;
    let (outbox, events) = channel(config.outbox_capacity)?;

    let index = ACTOR_COUNT.fetch_add(1, Ordering::Relaxed);
    let name = format!("actor thread {}", index);

    let thread = thread::Builder::new()
        .name(name.clone())
        .spawn(move || worker_loop(builder(), inbox, outbox))
        .expect("failed to spawn actor thread");

    if let Some(logger) = config.logger.as_ref() {
        logger.log(ActorEvent::Spawned {
            name: name.clone(),
            inbox_capacity: config.inbox_capacity,
            outbox_capacity: config.outbox_capacity,
        });
    }

    Ok(Handle {
        commands,
        events,
        thread: Some(thread),
        name,
        logger: config.logger,
    })
}

/// The worker loop: drain the inbox, stepping the worker on each message,
/// until a stop request, stream end, or step error; then announce the stop
/// and close the outbox.
fn worker_loop<W: Worker>(
    mut worker: W,
    inbox: Receiver<Command<W::Command>>,
    outbox: Sender<Event<W::Event>>,
) {
    let events = Outbox {
        events: outbox.clone(),
    };
    worker.attach(&events);
    loop {
        match inbox.recv() {
            Ok(Command::Message(message)) => {
                if worker.step(message, &events).is_err() {
                    break;
                }
            }
            Ok(Command::Stop) => break,
            Err(_) => break,
        }
    }
    worker.finish();
    // Closing the inbox fails later sends fast instead of queueing them at
    // a dead worker.
    inbox.close();
    inbox.release();
    // The handle may have stopped listening; the announcement is best-effort.
    let _ = outbox.send(Event::Stopped);
    outbox.close();
    outbox.release();
}

/// The caller-facing side of an actor: command sender, event receiver, and
/// the join handle of the worker thread.
///
/// Dropping an un-stopped handle performs a best-effort stop and joins the
/// thread, so an actor never outlives the last handle to it.
pub struct Handle<C, E> {
    commands: Sender<Command<C>>,
    events: Receiver<Event<E>>,
    thread: Option<thread::JoinHandle<()>>,
    name: String,
    logger: Option<CommLogger>,
}

impl<C, E> Handle<C, E> {
    /// The name of the actor's worker thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers a command to the worker, blocking on a full inbox.
    ///
    /// Fails with [`ActorError::InboxClosed`] once a stop has been waited
    /// out on this handle, and with [`ActorError::InboxSendFailed`] when
    /// the command cannot be enqueued.
    pub fn send(&self, command: C) -> Result<(), ActorError> {
        if self.thread.is_none() {
            return Err(ActorError::InboxClosed);
        }
        self.commands
            .send(Command::Message(command))
            .map_err(|_| ActorError::InboxSendFailed)
    }

    /// Receives the next event, blocking until one arrives.
    ///
    /// Fails with [`ActorError::Stopped`] once the worker announces its
    /// stop, and with [`ActorError::OutboxClosed`] if the outbox ends
    /// without an announcement.
    pub fn recv(&self) -> Result<E, ActorError> {
        match self.events.recv() {
            Ok(Event::Message(event)) => Ok(event),
            Ok(Event::Stopped) => Err(ActorError::Stopped),
            Err(_) => Err(ActorError::OutboxClosed),
        }
    }

    /// Receives an event if one is ready.
    ///
    /// `Ok(None)` means no event is currently available.
    pub fn try_recv(&self) -> Result<Option<E>, ActorError> {
        match self.events.try_recv() {
            Some(Event::Message(event)) => Ok(Some(event)),
            Some(Event::Stopped) => Err(ActorError::Stopped),
            None => Ok(None),
        }
    }

    /// A detached clone of the command sender, for embedding in resources.
    pub fn command_sender(&self) -> Sender<Command<C>> {
        self.commands.clone()
    }

    /// A detached clone of the event receiver, for embedding in resources.
    pub fn event_receiver(&self) -> Receiver<Event<E>> {
        self.events.clone()
    }

    /// Requests a graceful stop and joins the worker thread.
    ///
    /// Best-effort sends a stop request, then drains the outbox for at most
    /// `timeout`, discarding late events. Whether the stop announcement, the
    /// end of the stream, or the timeout arrives first, the thread is joined
    /// before returning.
    pub fn wait_for_stop(&mut self, timeout: Duration) -> Result<(), ActorError> {
        if self.thread.is_none() {
            return Ok(());
        }
        if let Some(logger) = self.logger.as_ref() {
            logger.log(ActorEvent::StopRequested {
                name: self.name.clone(),
            });
        }

        // Closing after the stop request wakes the loop even when the
        // request did not fit the inbox.
        let _ = self.commands.try_send(Command::Stop);
        self.commands.close();

        self.drain_until_stopped(timeout);

        // Closing the outbox unblocks a worker mid-send, so the join below
        // cannot hang on a full outbox.
        self.events.close();
        self.join();
        Ok(())
    }

    fn drain_until_stopped(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(Some(Event::Message(_))) => continue,
                Ok(Some(Event::Stopped)) | Ok(None) | Err(_) => return,
            }
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let clean = thread.join().is_ok();
            if let Some(logger) = self.logger.as_ref() {
                logger.log(ActorEvent::Joined {
                    name: self.name.clone(),
                    clean,
                });
            }
            assert!(clean, "actor thread panicked");
        }
        self.commands.release();
        self.events.release();
    }
}

impl<C, E> Drop for Handle<C, E> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.wait_for_stop(DROP_STOP_TIMEOUT);
        }
    }
}
