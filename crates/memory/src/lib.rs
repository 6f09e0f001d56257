//! Memory management primitives for Tether
//!
//! Deterministic, reference-counted ownership without a tracing collector:
//!
//! - [`SharedHandle`]: shared ownership of a heap object, with the object
//!   destroyed when the last strong handle drops.
//! - [`WeakHandle`]: a non-owning observer that can detect the object's
//!   destruction and [`upgrade`](WeakHandle::upgrade) into a strong handle
//!   while the object is still alive.
//! - [`UniqueHandle`]: exclusive move-only ownership, with no counting
//!   overhead and no weak observation.
//!
//! Reference cycles between shared handles are never collected; breaking a
//! cycle requires a [`WeakHandle`] at one of its edges.
//!
//! Two counter strategies are available. The default `rc` feature uses
//! non-atomic counters for single-threaded use, while the `arc` feature
//! switches to atomic counters and makes the handles `Send`/`Sync`.

#![warn(missing_docs)]

#[cfg(all(feature = "arc", feature = "rc"))]
compile_error!("A single memory management feature can be enabled at a time");

mod address;
mod block;
mod count_impl;
mod error;
mod shared;
mod shared_mut;
mod unique;
mod weak;

pub use crate::{
    address::Address,
    error::{Error, Result},
    shared::SharedHandle,
    shared_mut::{Borrow, BorrowMut, MutCell, SharedHandleMut},
    unique::UniqueHandle,
    weak::WeakHandle,
};
