use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// A wrapper for comparing and hashing pointer addresses
///
/// Handle equality is identity equality: two handles are equal when their
/// addresses match, never when the objects they own happen to be equal.
/// Invalid handles report the null address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Address(*const u8);

impl Address {
    /// The address reported by handles that own nothing
    pub fn null() -> Self {
        Self(std::ptr::null())
    }

    /// Returns true for the null address
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl<T: ?Sized> From<*const T> for Address {
    fn from(pointer: *const T) -> Self {
        Self(pointer as *const u8)
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0 as usize);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
