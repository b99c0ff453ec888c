// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reader/writer guards protecting registry state.

Two strategies implement the same capability set. [Synchronized] is a real
reader/writer lock: any number of concurrent readers, or exactly one writer.
[Unsynchronized] performs no synchronization at all and is `!Sync`, so the
compiler confines it to a single thread.

The strategy is a type parameter chosen at construction, so no flag is
consulted on each access.
*/

use {parking_lot::RwLock, std::cell::RefCell};

/// Mutual exclusion over a value of type `T`.
///
/// Access is scoped to a closure so a guard can never outlive the operation
/// that acquired it.
pub trait Guard<T> {
    fn new(value: T) -> Self;

    /// Run `f` with shared access.
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Run `f` with exclusive access.
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

/// A guard backed by a [RwLock].
///
/// The lock does not poison: a panic while holding it leaves later accesses
/// working. Entries are replaced whole, so the protected state is
/// consistent between operations.
#[derive(Debug, Default)]
pub struct Synchronized<T>(RwLock<T>);

impl<T> Guard<T> for Synchronized<T> {
    fn new(value: T) -> Self {
        Self(RwLock::new(value))
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.read())
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.write())
    }
}

/// A guard that performs no locking.
///
/// For registries populated and read from a single thread.
#[derive(Debug, Default)]
pub struct Unsynchronized<T>(RefCell<T>);

impl<T> Guard<T> for Unsynchronized<T> {
    fn new(value: T) -> Self {
        Self(RefCell::new(value))
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}
