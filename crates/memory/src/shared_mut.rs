use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{
    SharedHandle,
    count_impl::{
        BorrowImpl, BorrowMutImpl, CellImpl, borrow, borrow_mut, try_borrow, try_borrow_mut,
    },
};

/// A shared handle to a mutable object
///
/// Mutation of a shared object always goes through a valid handle and a
/// runtime-checked borrow; weak observers never reach the object directly.
pub type SharedHandleMut<T> = SharedHandle<MutCell<T>>;

impl<T> From<T> for SharedHandleMut<T> {
    fn from(value: T) -> Self {
        SharedHandle::new(MutCell::from(value))
    }
}

/// A mutable value with borrowing checked at runtime
#[derive(Debug, Default)]
pub struct MutCell<T>(CellImpl<T>);

impl<T> From<T> for MutCell<T> {
    fn from(value: T) -> Self {
        Self(CellImpl::from(value))
    }
}

impl<T> MutCell<T> {
    /// Immutably borrows the wrapped value.
    ///
    /// Multiple immutable borrows can be made at the same time.
    ///
    /// # Feature-specific behavior
    ///
    /// If the value is currently mutably borrowed then
    /// - with the "rc" feature, this will panic
    /// - with the "arc" feature, this will block
    ///
    /// See `try_borrow` for a non-panicking/non-blocking version.
    pub fn borrow(&self) -> Borrow<'_, T> {
        Borrow(borrow(&self.0))
    }

    /// Attempts to immutably borrow the wrapped value.
    ///
    /// Returns `None` if the value is currently mutably borrowed.
    pub fn try_borrow(&self) -> Option<Borrow<'_, T>> {
        try_borrow(&self.0).map(Borrow)
    }

    /// Mutably borrows the wrapped value.
    ///
    /// # Feature-specific behavior
    ///
    /// If the value is currently borrowed then
    /// - with the "rc" feature, this will panic
    /// - with the "arc" feature, this will block
    ///
    /// See `try_borrow_mut` for a non-panicking/non-blocking version.
    pub fn borrow_mut(&self) -> BorrowMut<'_, T> {
        BorrowMut(borrow_mut(&self.0))
    }

    /// Attempts to mutably borrow the wrapped value.
    ///
    /// Returns `None` if the value is currently borrowed.
    pub fn try_borrow_mut(&self) -> Option<BorrowMut<'_, T>> {
        try_borrow_mut(&self.0).map(BorrowMut)
    }
}

/// An immutably borrowed reference to a value borrowed from a [SharedHandleMut]
pub struct Borrow<'a, T>(BorrowImpl<'a, T>);

impl<T> Deref for Borrow<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.0.deref()
    }
}

impl<T: fmt::Display> fmt::Display for Borrow<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A mutably borrowed reference to a value borrowed from a [SharedHandleMut]
pub struct BorrowMut<'a, T>(BorrowMutImpl<'a, T>);

impl<T> Deref for BorrowMut<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.0.deref()
    }
}

impl<T> DerefMut for BorrowMut<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.0.deref_mut()
    }
}

impl<T: fmt::Display> fmt::Display for BorrowMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_mutation_is_visible_through_every_handle() {
        let a = SharedHandleMut::from(vec![1, 2]);
        let b = a.clone();
        b.get().unwrap().borrow_mut().push(3);
        assert_eq!(*a.get().unwrap().borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn conflicting_borrows_are_refused() {
        let handle = SharedHandleMut::from(0);
        let cell = handle.get().unwrap();
        let reading = cell.borrow();
        assert!(cell.try_borrow_mut().is_none());
        assert!(cell.try_borrow().is_some());
        drop(reading);
        assert!(cell.try_borrow_mut().is_some());
    }

    #[test]
    fn upgraded_observers_can_mutate() {
        let handle = SharedHandleMut::from(String::from("a"));
        let weak = handle.downgrade();
        {
            let strong = weak.upgrade().unwrap();
            strong.get().unwrap().borrow_mut().push('b');
        }
        assert_eq!(*handle.get().unwrap().borrow(), "ab");
    }
}
