//! Type-keyed heterogeneous storage for application resources.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Failures surfaced by the resource map.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceError {
    /// A resource of the same type is already stored.
    AlreadyExists,
    /// No resource of the requested type is stored.
    NotFound,
}

impl Error for ResourceError {}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::AlreadyExists => "a resource of this type already exists".fmt(f),
            ResourceError::NotFound => "no resource of this type exists".fmt(f),
        }
    }
}

/// A map from types to at most one owned value of each.
///
/// Values are registered at first insertion and recovered by downcast, so
/// arbitrary types coexist in one collection without a shared trait.
///
/// # Examples
///
/// ```
/// use mainspring::resource::Resources;
///
/// struct FrameCount(u64);
///
/// let mut resources = Resources::new();
/// resources.insert(FrameCount(0)).unwrap();
/// resources.get_mut::<FrameCount>().unwrap().0 += 1;
/// assert_eq!(resources.get::<FrameCount>().unwrap().0, 1);
/// ```
#[derive(Default)]
pub struct Resources {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl Resources {
    /// Creates an empty resource map.
    pub fn new() -> Self {
        Resources {
            map: HashMap::new(),
        }
    }

    /// Stores `value` under its type.
    ///
    /// At most one value per type: a second insertion of the same type fails
    /// with [`ResourceError::AlreadyExists`] and leaves the original.
    pub fn insert<R: 'static>(&mut self, value: R) -> Result<(), ResourceError> {
        match self.map.entry(TypeId::of::<R>()) {
            std::collections::hash_map::Entry::Occupied(_) => Err(ResourceError::AlreadyExists),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(Box::new(value));
                Ok(())
            }
        }
    }

    /// A shared borrow of the stored `R`.
    pub fn get<R: 'static>(&self) -> Result<&R, ResourceError> {
        self.map
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<R>())
            .ok_or(ResourceError::NotFound)
    }

    /// An exclusive borrow of the stored `R`.
    pub fn get_mut<R: 'static>(&mut self) -> Result<&mut R, ResourceError> {
        self.map
            .get_mut(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_mut::<R>())
            .ok_or(ResourceError::NotFound)
    }

    /// Removes and returns the stored `R`, if any.
    pub fn remove<R: 'static>(&mut self) -> Option<R> {
        self.map
            .remove(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    /// True when a resource of type `R` is stored.
    pub fn contains<R: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<R>())
    }
}
