use std::{
    alloc::{Layout, alloc, dealloc},
    ptr::{self, NonNull},
};

use crate::{
    Error, Result,
    count_impl::{Count, ObjectSlot},
};

/// The shared bookkeeping structure behind [SharedHandle](crate::SharedHandle)
/// and [WeakHandle](crate::WeakHandle)
///
/// The block owns the object pointer and the strong and weak counts, and is
/// the sole authority on destruction timing: the object is destroyed exactly
/// once, on the strong count's one-to-zero edge, while the block itself lives
/// on until the last observer lets go.
///
/// The block never frees itself. Handles route every count mutation through
/// [add_strong](Self::add_strong)/[remove_strong](Self::remove_strong)/
/// [add_weak](Self::add_weak)/[remove_weak](Self::remove_weak) and call
/// [free](Self::free) when a removal reports that the block is done.
pub(crate) struct ControlBlock<T> {
    object: ObjectSlot<T>,
    strong: Count,
    // Holds one extra increment on behalf of all strong handles, released on
    // the strong count's one-to-zero edge. The block is freed by whichever
    // handle takes this count to zero.
    weak: Count,
}

impl<T> ControlBlock<T> {
    /// Allocates a block taking ownership of `object`, with one strong and no
    /// weak references
    ///
    /// On allocation failure no state is created and `object` remains owned
    /// by the caller.
    pub fn try_create(object: NonNull<T>) -> Result<NonNull<Self>> {
        let layout = Layout::new::<Self>();
        let Some(block) = NonNull::new(unsafe { alloc(layout) } as *mut Self) else {
            return Err(Error::AllocationFailure);
        };
        unsafe {
            block.as_ptr().write(Self {
                object: ObjectSlot::new(object.as_ptr()),
                strong: Count::new(1),
                weak: Count::new(1),
            });
        }
        Ok(block)
    }

    /// Frees a block previously returned by [try_create](Self::try_create)
    ///
    /// # Safety
    /// The caller must be the handle whose count removal reported the block
    /// as done; no other handle may still reference it.
    pub unsafe fn free(block: NonNull<Self>) {
        unsafe {
            ptr::drop_in_place(block.as_ptr());
            dealloc(block.as_ptr() as *mut u8, Layout::new::<Self>());
        }
    }

    /// True while the object is alive
    pub fn is_valid(&self) -> bool {
        !self.object.get().is_null()
    }

    /// The stored object pointer, null once the object has been destroyed
    pub fn object(&self) -> *mut T {
        self.object.get()
    }

    /// The number of strong references keeping the object alive
    pub fn strong_count(&self) -> usize {
        self.strong.get()
    }

    /// The number of live weak observers, excluding the increment held on
    /// behalf of the strong handles
    pub fn weak_count(&self) -> usize {
        match self.weak.get() {
            // transiently locked by a uniqueness check, so no observers exist
            usize::MAX => 0,
            weak if self.strong.get() > 0 => weak - 1,
            weak => weak,
        }
    }

    /// True when the caller holds the only strong reference and no weak
    /// observer exists
    ///
    /// The weak count is locked against concurrent downgrades while the
    /// strong count is inspected; a plain pair of reads would let an
    /// observer on another thread upgrade between them and alias the
    /// exclusive reference that uniqueness is meant to guarantee.
    pub fn is_unique(&self) -> bool {
        if self.weak.lock_if_one() {
            let unique = self.strong.get() == 1;
            self.weak.unlock();
            unique
        } else {
            false
        }
    }

    pub fn add_strong(&self) {
        self.strong.increment();
    }

    /// Adds a strong reference only while the object is still alive
    ///
    /// This is the upgrade path from a weak observer; it can never resurrect
    /// an object whose strong count already reached zero.
    pub fn try_add_strong(&self) -> bool {
        self.strong.increment_if_nonzero()
    }

    /// Removes a strong reference, destroying the object when the last one
    /// goes
    ///
    /// Returns true when the caller must also [free](Self::free) the block.
    #[must_use]
    pub fn remove_strong(&self) -> bool {
        if self.strong.decrement() > 0 {
            return false;
        }
        let object = self.object.take();
        if !object.is_null() {
            drop(unsafe { Box::from_raw(object) });
        }
        // Release the increment held for the strong handles; whoever takes
        // the weak count to zero frees the block.
        self.remove_weak()
    }

    pub fn add_weak(&self) {
        self.weak.increment_past_lock();
    }

    /// Removes a weak reference, returning true when the caller must
    /// [free](Self::free) the block
    #[must_use]
    pub fn remove_weak(&self) -> bool {
        self.weak.decrement() == 0
    }
}
