use std::{
    alloc::{Layout, handle_alloc_error},
    fmt,
    hash::{Hash, Hasher},
    ptr::NonNull,
};

use crate::{Address, Error, Result, WeakHandle, block::ControlBlock};

/// A strong, owning handle to a reference-counted object
///
/// Cloning a handle shares the object; the object is destroyed when the last
/// strong handle drops, regardless of surviving [WeakHandle] observers.
/// Default-constructed handles own nothing and are invalid until replaced.
///
/// Equality between handles is identity equality: two handles are equal when
/// they share one allocation, never when separately allocated objects happen
/// to compare equal.
pub struct SharedHandle<T> {
    block: Option<NonNull<ControlBlock<T>>>,
}

impl<T> SharedHandle<T> {
    /// Moves `value` into newly allocated memory owned by the new handle
    ///
    /// Aborts the process if memory for the control block can't be
    /// allocated; use [try_from_raw](Self::try_from_raw) to handle
    /// exhaustion gracefully.
    pub fn new(value: T) -> Self {
        let object = NonNull::from(Box::leak(Box::new(value)));
        match unsafe { Self::try_from_raw(object) } {
            Ok(handle) => handle,
            Err(_) => {
                drop(unsafe { Box::from_raw(object.as_ptr()) });
                handle_alloc_error(Layout::new::<ControlBlock<T>>())
            }
        }
    }

    /// Takes ownership of the object behind a raw pointer, tracking it with
    /// a freshly allocated control block
    ///
    /// Fails with [Error::AllocationFailure] under memory exhaustion, in
    /// which case the object is untouched and stays owned by the caller.
    ///
    /// # Safety
    /// `object` must have been allocated via `Box`, and on success must not
    /// be retained or freed by the caller afterwards; ownership transfers
    /// unconditionally to the handle.
    pub unsafe fn try_from_raw(object: NonNull<T>) -> Result<Self> {
        let block = ControlBlock::try_create(object)?;
        Ok(Self { block: Some(block) })
    }

    pub(crate) fn from_block(block: NonNull<ControlBlock<T>>) -> Self {
        Self { block: Some(block) }
    }

    /// True while the handle owns an object
    pub fn is_valid(&self) -> bool {
        self.block.is_some()
    }

    /// Returns a reference to the owned object
    ///
    /// Fails with [Error::InvalidDereference] on a default-constructed or
    /// taken handle.
    pub fn get(&self) -> Result<&T> {
        let block = self.block.ok_or(Error::InvalidDereference)?;
        // A valid handle holds a strong reference, so the object is alive
        unsafe { Ok(&*block.as_ref().object()) }
    }

    /// Returns a mutable reference to the owned object if this is the only
    /// handle that can reach it
    ///
    /// Returns `None` when the handle is invalid, when other strong handles
    /// share the object, or when a weak observer could still upgrade. The
    /// uniqueness check holds the weak count locked while the strong count
    /// is read, so an observer racing this call can never upgrade into an
    /// aliasing strong handle.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let block = self.block?;
        unsafe {
            let block = block.as_ref();
            if block.is_unique() {
                Some(&mut *block.object())
            } else {
                None
            }
        }
    }

    /// Moves the handle out, leaving an invalid handle behind
    ///
    /// Ownership transfers without touching the reference counts, and
    /// dropping the taken-from handle afterwards has no effect.
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
        }
    }

    /// Returns a weak observer of the owned object
    ///
    /// Downgrading an invalid handle yields an already-expired observer.
    pub fn downgrade(&self) -> WeakHandle<T> {
        if let Some(block) = self.block {
            unsafe { block.as_ref() }.add_weak();
        }
        WeakHandle::from_block(self.block)
    }

    /// The number of strong handles sharing the object, zero for an invalid
    /// handle
    pub fn strong_count(&self) -> usize {
        self.block
            .map_or(0, |block| unsafe { block.as_ref() }.strong_count())
    }

    /// The number of weak observers of the object, zero for an invalid handle
    pub fn weak_count(&self) -> usize {
        self.block
            .map_or(0, |block| unsafe { block.as_ref() }.weak_count())
    }

    /// The address of the handle's control block, [Address::null] when
    /// invalid
    ///
    /// A [SharedHandle] and a [WeakHandle] observing the same object report
    /// the same address.
    pub fn address(&self) -> Address {
        match self.block {
            Some(block) => (block.as_ptr() as *const ControlBlock<T>).into(),
            None => Address::null(),
        }
    }
}

impl<T> Default for SharedHandle<T> {
    /// Makes an invalid handle that owns nothing
    fn default() -> Self {
        Self { block: None }
    }
}

impl<T> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            unsafe { block.as_ref() }.add_strong();
        }
        Self { block: self.block }
    }
}

impl<T> Drop for SharedHandle<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            unsafe {
                if block.as_ref().remove_strong() {
                    ControlBlock::free(block);
                }
            }
        }
    }
}

impl<T> PartialEq for SharedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T> Eq for SharedHandle<T> {}

impl<T> Hash for SharedHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state)
    }
}

impl<T> fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("address", &self.address())
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(value) => value.fmt(f),
            Err(_) => f.write_str("<invalid handle>"),
        }
    }
}

impl<T> From<T> for SharedHandle<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_invalid() {
        let handle = SharedHandle::<i32>::default();
        assert!(!handle.is_valid());
        assert_eq!(handle.strong_count(), 0);
        assert_eq!(handle.get(), Err(Error::InvalidDereference));
    }

    #[test]
    fn new_handle_is_valid_with_one_reference() {
        let handle = SharedHandle::new(99);
        assert!(handle.is_valid());
        assert_eq!(handle.strong_count(), 1);
        assert_eq!(handle.weak_count(), 0);
        assert_eq!(handle.get(), Ok(&99));
    }

    #[test]
    fn clones_share_the_allocation() {
        let a = SharedHandle::new("shared".to_string());
        let b = a.clone();
        assert!(a.is_valid() && b.is_valid());
        assert_eq!(a, b);
        assert_eq!(a.strong_count(), 2);
        drop(b);
        assert_eq!(a.strong_count(), 1);
    }

    #[test]
    fn equality_is_identity_not_value() {
        let a = SharedHandle::new(7);
        let b = SharedHandle::new(7);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn take_leaves_an_invalid_handle() {
        let mut a = SharedHandle::new(1);
        let b = a.take();
        assert!(!a.is_valid());
        assert!(b.is_valid());
        assert_eq!(b.strong_count(), 1);
        // dropping the taken-from handle must not disturb the count
        drop(a);
        assert_eq!(b.strong_count(), 1);
    }

    #[test]
    fn get_mut_requires_a_unique_handle() {
        let mut handle = SharedHandle::new(10);
        *handle.get_mut().unwrap() += 1;
        assert_eq!(handle.get(), Ok(&11));

        let copy = handle.clone();
        assert!(handle.get_mut().is_none());
        drop(copy);

        let weak = handle.downgrade();
        assert!(handle.get_mut().is_none());
        drop(weak);
        assert!(handle.get_mut().is_some());
    }

    #[test]
    fn invalid_handles_share_the_null_address() {
        let a = SharedHandle::<i32>::default();
        let b = SharedHandle::<i32>::default();
        assert!(a.address().is_null());
        assert_eq!(a, b);
    }
}
