use thiserror::Error;

/// The errors that can be produced by handle operations
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Allocating a control block failed
    ///
    /// The object that was being handed to the handle is left untouched and
    /// remains owned by the caller.
    #[error("allocation failed while creating a control block")]
    AllocationFailure,

    /// An object was accessed through a default-constructed or taken handle
    ///
    /// Validity can be checked up front with the handles' `is_valid`.
    #[error("attempted to access an object through an invalid handle")]
    InvalidDereference,
}

/// The Result type used by fallible handle operations
pub type Result<T> = std::result::Result<T, Error>;
