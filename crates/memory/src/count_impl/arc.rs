use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering, fence};

pub(crate) use parking_lot::MappedRwLockReadGuard as BorrowImpl;
pub(crate) use parking_lot::MappedRwLockWriteGuard as BorrowMutImpl;
pub(crate) use parking_lot::RwLock as CellImpl;

use crate::{SharedHandle, WeakHandle};

// The counters are the only shared mutable state behind the handles, so the
// handles can cross threads whenever the object itself can.
unsafe impl<T: Send + Sync> Send for SharedHandle<T> {}
unsafe impl<T: Send + Sync> Sync for SharedHandle<T> {}
unsafe impl<T: Send + Sync> Send for WeakHandle<T> {}
unsafe impl<T: Send + Sync> Sync for WeakHandle<T> {}

// Counts above this are forged, e.g. by a mem::forget loop over clones;
// aborting keeps a wrapped count from ever reaching zero and freeing live
// objects. Also keeps the usize::MAX lock sentinel unambiguous.
const MAX_COUNT: usize = isize::MAX as usize;

/// An atomic reference count
///
/// Memory orderings follow `std::sync::Arc`: increments are relaxed, while a
/// decrement releases and the final decrement acquires before teardown.
pub(crate) struct Count(AtomicUsize);

impl Count {
    pub fn new(initial: usize) -> Self {
        Self(AtomicUsize::new(initial))
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn increment(&self) {
        if self.0.fetch_add(1, Ordering::Relaxed) > MAX_COUNT {
            std::process::abort();
        }
    }

    /// Decrements the count, returning the remaining value
    #[inline]
    pub fn decrement(&self) -> usize {
        let prior = self.0.fetch_sub(1, Ordering::Release);
        if prior == 1 {
            fence(Ordering::Acquire);
        }
        prior - 1
    }

    /// Increments the count unless it has already reached zero
    ///
    /// A plain load-then-store would admit a race where the object is
    /// destroyed between the check and the increment, so the increment is a
    /// compare-and-swap retry loop over the observed value.
    #[inline]
    pub fn increment_if_nonzero(&self) -> bool {
        self.0
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |count| match count {
                0 => None,
                count if count > MAX_COUNT => std::process::abort(),
                count => Some(count + 1),
            })
            .is_ok()
    }

    /// Increments the count, waiting out a transient uniqueness lock
    #[inline]
    pub fn increment_past_lock(&self) {
        let mut count = self.0.load(Ordering::Relaxed);
        loop {
            if count == usize::MAX {
                std::hint::spin_loop();
                count = self.0.load(Ordering::Relaxed);
                continue;
            }
            if count > MAX_COUNT {
                std::process::abort();
            }
            match self
                .0
                .compare_exchange_weak(count, count + 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(observed) => count = observed,
            }
        }
    }

    /// Locks the count with a sentinel if exactly one reference remains
    ///
    /// Used by the uniqueness check; pair with [unlock](Self::unlock).
    /// Increments made through [increment_past_lock](Self::increment_past_lock)
    /// wait for the lock to clear instead of trampling the sentinel.
    #[inline]
    pub fn lock_if_one(&self) -> bool {
        self.0
            .compare_exchange(1, usize::MAX, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the uniqueness lock, restoring the count to one
    #[inline]
    pub fn unlock(&self) {
        self.0.store(1, Ordering::Release);
    }
}

/// The control block's nullable owning object pointer
pub(crate) struct ObjectSlot<T>(AtomicPtr<T>);

impl<T> ObjectSlot<T> {
    pub fn new(object: *mut T) -> Self {
        Self(AtomicPtr::new(object))
    }

    #[inline]
    pub fn get(&self) -> *mut T {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the slot, returning the previously stored pointer
    #[inline]
    pub fn take(&self) -> *mut T {
        self.0.swap(std::ptr::null_mut(), Ordering::AcqRel)
    }
}

#[inline]
pub(crate) fn borrow<T: ?Sized>(cell: &CellImpl<T>) -> BorrowImpl<'_, T> {
    parking_lot::RwLockReadGuard::map(cell.read(), |x| x)
}

#[inline]
pub(crate) fn try_borrow<T: ?Sized>(cell: &CellImpl<T>) -> Option<BorrowImpl<'_, T>> {
    cell.try_read()
        .map(|g| parking_lot::RwLockReadGuard::map(g, |x| x))
}

#[inline]
pub(crate) fn borrow_mut<T: ?Sized>(cell: &CellImpl<T>) -> BorrowMutImpl<'_, T> {
    parking_lot::RwLockWriteGuard::map(cell.write(), |x| x)
}

#[inline]
pub(crate) fn try_borrow_mut<T: ?Sized>(cell: &CellImpl<T>) -> Option<BorrowMutImpl<'_, T>> {
    cell.try_write()
        .map(|g| parking_lot::RwLockWriteGuard::map(g, |x| x))
}
