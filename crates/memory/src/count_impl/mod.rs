#[cfg(feature = "arc")]
mod arc;
#[cfg(feature = "arc")]
pub(crate) use arc::*;

#[cfg(feature = "rc")]
mod rc;
#[cfg(feature = "rc")]
pub(crate) use rc::*;
