//! The seam between the scheduler and an external entity database.
//!
//! The framework is agnostic to how entity data is modeled; it only promises
//! a system exclusive access while it runs. A [`Database`] supplies
//! begin/commit/rollback hooks, and a [`Transaction`] is the guard the
//! runner opens around each schedule: it exposes the database (by downcast)
//! and the app's resources to the systems of that schedule.

use std::any::Any;

use crate::resource::{ResourceError, Resources};

/// An external store of entity data, driven through transactions.
///
/// The unit type implements this trait as the no-op database every app
/// starts with, so apps without entity storage run unchanged.
pub trait Database: Any {
    /// Marks the start of a schedule's exclusive access.
    fn begin(&mut self);
    /// Publishes the effects of a cleanly completed schedule.
    fn commit(&mut self);
    /// Discards the effects of a schedule that failed.
    fn rollback(&mut self);
}

impl Database for () {
    fn begin(&mut self) {}
    fn commit(&mut self) {}
    fn rollback(&mut self) {}
}

/// Exclusive access to the app's database and resources, for the duration
/// of one schedule.
///
/// Exclusivity is structural: the transaction mutably borrows both, so no
/// other access can exist while any system of the schedule runs.
pub struct Transaction<'a> {
    database: &'a mut dyn Database,
    resources: &'a mut Resources,
}

impl<'a> Transaction<'a> {
    /// Opens a transaction, invoking the database's begin hook.
    pub(crate) fn begin(database: &'a mut dyn Database, resources: &'a mut Resources) -> Self {
        database.begin();
        Transaction {
            database,
            resources,
        }
    }

    pub(crate) fn commit(self) {
        self.database.commit();
    }

    pub(crate) fn rollback(self) {
        self.database.rollback();
    }

    /// The database, downcast to its concrete type.
    pub fn database<D: Database>(&self) -> Option<&D> {
        let database: &dyn Any = self.database;
        database.downcast_ref::<D>()
    }

    /// The database, downcast to its concrete type, mutably.
    pub fn database_mut<D: Database>(&mut self) -> Option<&mut D> {
        let database: &mut dyn Any = self.database;
        database.downcast_mut::<D>()
    }

    /// A shared borrow of the app resource of type `R`.
    pub fn resource<R: 'static>(&self) -> Result<&R, ResourceError> {
        self.resources.get::<R>()
    }

    /// An exclusive borrow of the app resource of type `R`.
    pub fn resource_mut<R: 'static>(&mut self) -> Result<&mut R, ResourceError> {
        self.resources.get_mut::<R>()
    }
}

#[cfg(test)]
mod tests {

    use super::{Database, Transaction};
    use crate::resource::Resources;

    #[derive(Default)]
    struct Ledger {
        begun: usize,
        committed: usize,
        rolled_back: usize,
    }

    impl Database for Ledger {
        fn begin(&mut self) {
            self.begun += 1;
        }
        fn commit(&mut self) {
            self.committed += 1;
        }
        fn rollback(&mut self) {
            self.rolled_back += 1;
        }
    }

    #[test]
    fn hooks_fire_in_order() {
        let mut database = Ledger::default();
        let mut resources = Resources::new();

        let txn = Transaction::begin(&mut database, &mut resources);
        txn.commit();
        let txn = Transaction::begin(&mut database, &mut resources);
        txn.rollback();

        assert_eq!(database.begun, 2);
        assert_eq!(database.committed, 1);
        assert_eq!(database.rolled_back, 1);
    }

    #[test]
    fn downcast_reaches_the_concrete_database() {
        let mut database = Ledger::default();
        let mut resources = Resources::new();
        resources.insert(7u32).unwrap();

        let mut txn = Transaction::begin(&mut database, &mut resources);
        assert!(txn.database::<Ledger>().is_some());
        txn.database_mut::<Ledger>().unwrap().committed += 1;
        assert_eq!(txn.resource::<u32>(), Ok(&7));
        txn.commit();
    }
}
