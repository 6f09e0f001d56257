use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr::NonNull,
};

use crate::{Address, SharedHandle, block::ControlBlock};

/// A non-owning observer of a reference-counted object
///
/// A weak handle never keeps the object alive and never exposes it directly;
/// the only route to the object is [upgrade](Self::upgrade), which produces a
/// fresh [SharedHandle] while the object still exists. Obtained from
/// [SharedHandle::downgrade]; a default-constructed weak handle observes
/// nothing and is permanently expired.
pub struct WeakHandle<T> {
    block: Option<NonNull<ControlBlock<T>>>,
}

impl<T> WeakHandle<T> {
    pub(crate) fn from_block(block: Option<NonNull<ControlBlock<T>>>) -> Self {
        Self { block }
    }

    /// True once the observed object has been destroyed, or when the handle
    /// never observed one
    pub fn is_expired(&self) -> bool {
        match self.block {
            Some(block) => !unsafe { block.as_ref() }.is_valid(),
            None => true,
        }
    }

    /// Attempts to produce a strong handle for the observed object
    ///
    /// Returns `None` once the object has been destroyed; otherwise the
    /// returned handle keeps the object alive for at least as long as it
    /// lives. Upgrading an expired observer is not an error, absence is the
    /// contract.
    pub fn upgrade(&self) -> Option<SharedHandle<T>> {
        let block = self.block?;
        unsafe { block.as_ref() }
            .try_add_strong()
            .then(|| SharedHandle::from_block(block))
    }

    /// Moves the observer out, leaving an expired handle behind
    ///
    /// Ownership transfers without touching the reference counts, and
    /// dropping the taken-from handle afterwards has no effect.
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
        }
    }

    /// The number of strong handles currently keeping the object alive
    pub fn strong_count(&self) -> usize {
        self.block
            .map_or(0, |block| unsafe { block.as_ref() }.strong_count())
    }

    /// The address of the observed control block, [Address::null] when the
    /// handle observes nothing
    pub fn address(&self) -> Address {
        match self.block {
            Some(block) => (block.as_ptr() as *const ControlBlock<T>).into(),
            None => Address::null(),
        }
    }
}

impl<T> Default for WeakHandle<T> {
    /// Makes a permanently expired observer
    fn default() -> Self {
        Self { block: None }
    }
}

impl<T> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            unsafe { block.as_ref() }.add_weak();
        }
        Self { block: self.block }
    }
}

impl<T> Drop for WeakHandle<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            unsafe {
                if block.as_ref().remove_weak() {
                    ControlBlock::free(block);
                }
            }
        }
    }
}

impl<T> PartialEq for WeakHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T> Eq for WeakHandle<T> {}

impl<T> Hash for WeakHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state)
    }
}

impl<T> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("address", &self.address())
            .field("expired", &self.is_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_observer_is_expired() {
        let weak = WeakHandle::<u8>::default();
        assert!(weak.is_expired());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn upgrade_succeeds_while_the_object_lives() {
        let strong = SharedHandle::new(5);
        let weak = strong.downgrade();
        assert!(!weak.is_expired());
        assert_eq!(strong.weak_count(), 1);

        let upgraded = weak.upgrade().unwrap();
        assert_eq!(upgraded, strong);
        assert_eq!(strong.strong_count(), 2);
    }

    #[test]
    fn upgrade_fails_after_the_last_strong_drop() {
        let strong = SharedHandle::new(5);
        let weak = strong.downgrade();
        drop(strong);
        assert!(weak.is_expired());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn downgrading_an_invalid_handle_yields_an_expired_observer() {
        let strong = SharedHandle::<u8>::default();
        let weak = strong.downgrade();
        assert!(weak.is_expired());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn cloned_observers_count_independently() {
        let strong = SharedHandle::new(1);
        let a = strong.downgrade();
        let b = a.clone();
        assert_eq!(strong.weak_count(), 2);
        assert_eq!(a, b);
        drop(a);
        assert_eq!(strong.weak_count(), 1);
        drop(b);
        assert_eq!(strong.weak_count(), 0);
    }

    #[test]
    fn take_leaves_an_expired_observer() {
        let strong = SharedHandle::new(1);
        let mut a = strong.downgrade();
        let b = a.take();
        assert!(a.is_expired());
        assert!(!b.is_expired());
        assert_eq!(strong.weak_count(), 1);
        drop(a);
        assert_eq!(strong.weak_count(), 1);
    }

    #[test]
    fn upgrade_extends_the_object_lifetime() {
        let strong = SharedHandle::new(String::from("kept alive"));
        let weak = strong.downgrade();
        let extension = weak.upgrade().unwrap();
        drop(strong);
        assert!(!weak.is_expired());
        assert_eq!(extension.get().unwrap(), "kept alive");
        drop(extension);
        assert!(weak.is_expired());
    }
}
