use std::cell::Cell;

pub(crate) use std::cell::Ref as BorrowImpl;
pub(crate) use std::cell::RefCell as CellImpl;
pub(crate) use std::cell::RefMut as BorrowMutImpl;

// Counts above this are forged, e.g. by a mem::forget loop over clones;
// aborting keeps a wrapped count from ever reaching zero and freeing live
// objects. Also keeps the usize::MAX lock sentinel unambiguous.
const MAX_COUNT: usize = isize::MAX as usize;

/// A non-atomic reference count for single-threaded use
pub(crate) struct Count(Cell<usize>);

impl Count {
    pub fn new(initial: usize) -> Self {
        Self(Cell::new(initial))
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.0.get()
    }

    #[inline]
    pub fn increment(&self) {
        let count = self.0.get() + 1;
        if count > MAX_COUNT {
            std::process::abort();
        }
        self.0.set(count);
    }

    /// Decrements the count, returning the remaining value
    #[inline]
    pub fn decrement(&self) -> usize {
        let remaining = self.0.get() - 1;
        self.0.set(remaining);
        remaining
    }

    /// Increments the count unless it has already reached zero
    #[inline]
    pub fn increment_if_nonzero(&self) -> bool {
        match self.0.get() {
            0 => false,
            _ => {
                self.increment();
                true
            }
        }
    }

    /// Increments the count; lock-aware in the atomic strategy
    ///
    /// A uniqueness lock is never observable here, since locking and
    /// unlocking happen within a single single-threaded call.
    #[inline]
    pub fn increment_past_lock(&self) {
        self.increment();
    }

    /// Locks the count with a sentinel if exactly one reference remains
    ///
    /// Used by the uniqueness check; pair with [unlock](Self::unlock).
    #[inline]
    pub fn lock_if_one(&self) -> bool {
        if self.0.get() == 1 {
            self.0.set(usize::MAX);
            true
        } else {
            false
        }
    }

    /// Releases the uniqueness lock, restoring the count to one
    #[inline]
    pub fn unlock(&self) {
        self.0.set(1);
    }
}

/// The control block's nullable owning object pointer
pub(crate) struct ObjectSlot<T>(Cell<*mut T>);

impl<T> ObjectSlot<T> {
    pub fn new(object: *mut T) -> Self {
        Self(Cell::new(object))
    }

    #[inline]
    pub fn get(&self) -> *mut T {
        self.0.get()
    }

    /// Clears the slot, returning the previously stored pointer
    #[inline]
    pub fn take(&self) -> *mut T {
        self.0.replace(std::ptr::null_mut())
    }
}

#[inline]
pub(crate) fn borrow<T: ?Sized>(cell: &CellImpl<T>) -> BorrowImpl<'_, T> {
    cell.borrow()
}

#[inline]
pub(crate) fn try_borrow<T: ?Sized>(cell: &CellImpl<T>) -> Option<BorrowImpl<'_, T>> {
    cell.try_borrow().ok()
}

#[inline]
pub(crate) fn borrow_mut<T: ?Sized>(cell: &CellImpl<T>) -> BorrowMutImpl<'_, T> {
    cell.borrow_mut()
}

#[inline]
pub(crate) fn try_borrow_mut<T: ?Sized>(cell: &CellImpl<T>) -> Option<BorrowMutImpl<'_, T>> {
    cell.try_borrow_mut().ok()
}
