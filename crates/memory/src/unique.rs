use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr::NonNull,
};

use crate::{Address, Error, Result};

/// An exclusive, move-only owning handle
///
/// Unlike [SharedHandle](crate::SharedHandle) there is no reference counting
/// and no control block; the handle destroys its object when dropped.
/// `UniqueHandle` is deliberately not `Clone`, and offers no weak
/// observation: exclusive ownership leaves nothing for an observer to safely
/// alias.
pub struct UniqueHandle<T> {
    object: Option<NonNull<T>>,
}

impl<T> UniqueHandle<T> {
    /// Moves `value` into newly allocated memory owned by the new handle
    pub fn new(value: T) -> Self {
        Self {
            object: Some(NonNull::from(Box::leak(Box::new(value)))),
        }
    }

    /// Takes exclusive ownership of the object behind a raw pointer
    ///
    /// # Safety
    /// `object` must have been allocated via `Box` and must not be retained
    /// or freed by the caller afterwards; ownership transfers unconditionally
    /// to the handle.
    pub unsafe fn from_raw(object: NonNull<T>) -> Self {
        Self {
            object: Some(object),
        }
    }

    /// True while the handle owns an object
    pub fn is_valid(&self) -> bool {
        self.object.is_some()
    }

    /// Returns a reference to the owned object
    ///
    /// Fails with [Error::InvalidDereference] on a default-constructed or
    /// taken handle.
    pub fn get(&self) -> Result<&T> {
        match self.object {
            Some(object) => Ok(unsafe { object.as_ref() }),
            None => Err(Error::InvalidDereference),
        }
    }

    /// Returns a mutable reference to the owned object
    ///
    /// Fails with [Error::InvalidDereference] on a default-constructed or
    /// taken handle.
    pub fn get_mut(&mut self) -> Result<&mut T> {
        match self.object {
            Some(mut object) => Ok(unsafe { object.as_mut() }),
            None => Err(Error::InvalidDereference),
        }
    }

    /// Moves the handle out, leaving an invalid handle behind
    ///
    /// Dropping the taken-from handle afterwards has no effect.
    pub fn take(&mut self) -> Self {
        Self {
            object: self.object.take(),
        }
    }

    /// Releases ownership, returning the raw object pointer
    ///
    /// The caller becomes responsible for destroying the object, typically by
    /// handing the pointer back to [from_raw](Self::from_raw). Returns `None`
    /// for an invalid handle.
    pub fn into_raw(mut self) -> Option<NonNull<T>> {
        self.object.take()
    }

    /// The address of the owned object, [Address::null] when invalid
    pub fn address(&self) -> Address {
        match self.object {
            Some(object) => (object.as_ptr() as *const T).into(),
            None => Address::null(),
        }
    }
}

impl<T> Default for UniqueHandle<T> {
    /// Makes an invalid handle that owns nothing
    fn default() -> Self {
        Self { object: None }
    }
}

impl<T> Drop for UniqueHandle<T> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            drop(unsafe { Box::from_raw(object.as_ptr()) });
        }
    }
}

impl<T> From<T> for UniqueHandle<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> PartialEq for UniqueHandle<T> {
    /// Handles are equal only when invalid; two valid handles can never
    /// share an object
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T> Eq for UniqueHandle<T> {}

impl<T> Hash for UniqueHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state)
    }
}

impl<T> fmt::Debug for UniqueHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueHandle")
            .field("address", &self.address())
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for UniqueHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(value) => value.fmt(f),
            Err(_) => f.write_str("<invalid handle>"),
        }
    }
}

// Ownership is exclusive, so the handle moves between threads exactly when
// the object can.
unsafe impl<T: Send> Send for UniqueHandle<T> {}
unsafe impl<T: Sync> Sync for UniqueHandle<T> {}
