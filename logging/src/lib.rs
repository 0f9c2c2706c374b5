//! Typed, buffering event logging shared by the mainspring crates.
//!
//! A [`Registry`] maps stream names to typed loggers. Hosting code binds an
//! action to a name with [`Registry::insert`], and instrumented code looks a
//! logger up with [`Registry::get`] and records events against it. Events are
//! buffered with the duration elapsed since the registry was created, and are
//! handed to the action in batches.

#![forbid(missing_docs)]

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A registry binding log stream names to typed loggers.
pub struct Registry {
    /// An instant common to all logging statements.
    time: Instant,
    /// A map from names to typed loggers.
    map: HashMap<String, Box<dyn Any>>,
}

impl Registry {
    /// Creates a new logger registry.
    pub fn new(time: Instant) -> Self {
        Registry {
            time,
            map: HashMap::new(),
        }
    }

    /// Binds a log name to an action on batches of timestamped events.
    ///
    /// Returns any pre-installed logger for the name rather than overwriting
    /// it mid-stream: loggers acquired before the call continue to write to
    /// the old destination, and loggers acquired afterwards use the new one.
    pub fn insert<E: 'static, F: FnMut(&Duration, &[(Duration, E)]) + 'static>(
        &mut self,
        name: &str,
        action: F,
    ) -> Option<Box<dyn Any>> {
        let logger = Logger::<E>::new(self.time, action);
        self.map.insert(name.to_owned(), Box::new(logger))
    }

    /// Removes a bound logger.
    ///
    /// This closes the logging stream: once every outstanding handle is
    /// dropped the action is dropped as well, which is the only indication
    /// of end-of-stream a consumer receives.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.map.remove(name)
    }

    /// Retrieves a shared logger, if one has been inserted under `name`
    /// with event type `E`.
    pub fn get<E: 'static>(&self, name: &str) -> Option<Logger<E>> {
        self.map
            .get(name)
            .and_then(|entry| entry.downcast_ref::<Logger<E>>())
            .cloned()
    }
}

/// A buffering logger for events of type `E`.
///
/// Loggers are cheaply clonable; clones share one buffer and one action, so
/// the action observes a single stream of events with non-decreasing
/// timestamps. Buffered events are flushed when the buffer fills, on an
/// explicit [`flush`](Logger::flush), and when the last handle drops.
pub struct Logger<E> {
    inner: Rc<RefCell<LoggerInner<E>>>,
}

impl<E> Clone for Logger<E> {
    fn clone(&self) -> Self {
        Logger {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct LoggerInner<E> {
    /// Common instant against which event times are measured.
    time: Instant,
    /// Action to take on batches of timestamped events.
    action: Box<dyn FnMut(&Duration, &[(Duration, E)])>,
    /// Buffer of pending events.
    buffer: Vec<(Duration, E)>,
}

impl<E> Logger<E> {
    const BUFFER_CAPACITY: usize = 1024;

    /// Allocates a new logger bound to a write destination.
    pub fn new<F: FnMut(&Duration, &[(Duration, E)]) + 'static>(time: Instant, action: F) -> Self {
        Logger {
            inner: Rc::new(RefCell::new(LoggerInner {
                time,
                action: Box::new(action),
                buffer: Vec::with_capacity(Self::BUFFER_CAPACITY),
            })),
        }
    }

    /// Logs an event.
    ///
    /// The event has its timestamp recorded at the moment of logging, but it
    /// may be delivered late due to buffering.
    pub fn log(&self, event: E) {
        self.log_many(Some(event));
    }

    /// Logs a sequence of events.
    pub fn log_many<I: IntoIterator<Item = E>>(&self, events: I) {
        let mut inner = self.inner.borrow_mut();
        let elapsed = inner.time.elapsed();
        for event in events {
            inner.buffer.push((elapsed, event));
            if inner.buffer.len() == inner.buffer.capacity() {
                inner.dispatch();
            }
        }
    }

    /// Flushes buffered events and communicates the current elapsed time.
    ///
    /// An empty batch still reaches the action, as a statement that all
    /// events before the accompanying duration have been delivered.
    pub fn flush(&self) {
        self.inner.borrow_mut().dispatch();
    }
}

impl<E> LoggerInner<E> {
    fn dispatch(&mut self) {
        let elapsed = self.time.elapsed();
        (self.action)(&elapsed, &self.buffer[..]);
        self.buffer.clear();
    }
}

impl<E> Drop for LoggerInner<E> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.dispatch();
        }
    }
}

#[cfg(test)]
mod tests {

    use super::Registry;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    #[test]
    fn round_trip() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new(Instant::now());

        let sink = Rc::clone(&seen);
        registry.insert::<u64, _>("events", move |_, batch| {
            sink.borrow_mut().extend(batch.iter().map(|(_, e)| *e));
        });

        let logger = registry.get::<u64>("events").expect("logger missing");
        logger.log(3);
        logger.log_many(vec![4, 5]);
        logger.flush();

        assert_eq!(&*seen.borrow(), &[3, 4, 5]);
    }

    #[test]
    fn typed_lookup() {
        let mut registry = Registry::new(Instant::now());
        registry.insert::<u64, _>("events", |_, _| {});
        assert!(registry.get::<u64>("events").is_some());
        assert!(registry.get::<String>("events").is_none());
        assert!(registry.get::<u64>("absent").is_none());
    }

    #[test]
    fn flush_on_drop() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new(Instant::now());

        let sink = Rc::clone(&seen);
        registry.insert::<&'static str, _>("events", move |_, batch| {
            sink.borrow_mut().extend(batch.iter().map(|(_, e)| *e));
        });

        let logger = registry
            .get::<&'static str>("events")
            .expect("logger missing");
        logger.log("pending");
        registry.remove("events");
        drop(logger);

        assert_eq!(&*seen.borrow(), &["pending"]);
    }
}
