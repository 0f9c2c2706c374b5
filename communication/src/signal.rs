//! Reference-counted atomic cells for lightweight cross-thread status.

use std::sync::Arc;

use crossbeam_utils::atomic::AtomicCell;

/// A shared, atomically readable and writable cell.
///
/// Every clone observes the same value; the storage is freed when the last
/// clone drops. The framework uses `Signal<bool>` as a one-way shutdown flag
/// and as a readiness indicator, but any `Copy` value works. Loads and
/// stores are lock-free for values no wider than a machine word.
///
/// # Examples
///
/// ```
/// use mainspring_communication::Signal;
///
/// let stop = Signal::new(false);
/// let observer = stop.clone();
///
/// stop.set(true);
/// assert!(observer.get());
/// ```
pub struct Signal<T: Copy> {
    cell: Arc<AtomicCell<T>>,
}

impl<T: Copy> Signal<T> {
    /// Allocates a new signal holding `value`.
    pub fn new(value: T) -> Self {
        Signal {
            cell: Arc::new(AtomicCell::new(value)),
        }
    }

    /// Reads the current value.
    pub fn get(&self) -> T {
        self.cell.load()
    }

    /// Replaces the current value, visible to every clone.
    pub fn set(&self, value: T) {
        self.cell.store(value);
    }
}

impl<T: Copy> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Signal").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {

    use super::Signal;

    #[test]
    fn clones_share_the_value() {
        let signal = Signal::new(0u32);
        let other = signal.clone();
        signal.set(5);
        assert_eq!(other.get(), 5);
        other.set(9);
        assert_eq!(signal.get(), 9);
    }

    #[test]
    fn visible_across_threads() {
        let flag = Signal::new(false);
        let seen = flag.clone();
        let handle = std::thread::spawn(move || {
            while !seen.get() {
                std::thread::yield_now();
            }
        });
        flag.set(true);
        handle.join().unwrap();
    }
}
