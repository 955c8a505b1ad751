//! Eagerly constructed singleton.
//!
//! The instance exists before the registry does, so the accessor is a plain
//! field read with no synchronization at all. Rust has no static
//! initializers that run before `main`: a `static` must be built in a const
//! context with [`Eager::with_instance`], and a registry built at runtime with
//! [`Eager::new`] cannot be shared with another thread until `new` has
//! returned. Either way construction happens-before every access.
//!
//! # Bypass
//!
//! Nothing stops other code from constructing the resource type directly.
//! See [`Sole`](crate::Sole) for a registry that refuses that.

use core::any::type_name;
use core::convert::Infallible;
use core::fmt;

use crate::error::{Result, SingletonError};
use crate::registry::{Accessor, Strategy};
use crate::state::Phase;

/// Singleton whose instance is built together with the registry.
///
/// ```rust
/// use sole_instance::Eager;
///
/// static BANNER: Eager<&str> = Eager::with_instance("Hello");
/// assert!(core::ptr::eq(BANNER.instance(), BANNER.instance()));
/// ```
pub struct Eager<T> {
   instance: T,
}

impl<T> Eager<T> {
   /// Wraps an already constructed instance. Usable in `static` items.
   #[inline]
   #[must_use]
   pub const fn with_instance(instance: T) -> Self {
      Self { instance }
   }

   /// Runs `init` now and owns the result.
   ///
   /// A failing constructor means no registry exists at all, so there is
   /// nothing to reset.
   pub fn new<E, F>(init: F) -> Result<Self, E>
   where
      F: FnOnce() -> core::result::Result<T, E>,
   {
      tracing::debug!(
         resource = type_name::<T>(),
         strategy = %Strategy::Eager,
         "constructing singleton"
      );
      match init() {
         Ok(instance) => Ok(Self { instance }),
         Err(err) => {
            tracing::warn!(
               resource = type_name::<T>(),
               strategy = %Strategy::Eager,
               "singleton construction failed"
            );
            Err(SingletonError::ConstructionFailed(err))
         }
      }
   }

   /// Returns the instance. Never blocks, never fails.
   #[inline]
   pub fn instance(&self) -> &T {
      &self.instance
   }

   /// Same as [`instance`](Self::instance), shaped like the lazy accessors.
   #[inline]
   pub fn get_instance(&self) -> Result<&T> {
      Ok(&self.instance)
   }
}

impl<T> Accessor for Eager<T> {
   type Resource = T;
   type Error = Infallible;

   fn get_instance(&self) -> Result<&T> {
      Eager::get_instance(self)
   }

   fn get(&self) -> Option<&T> {
      Some(&self.instance)
   }

   fn phase(&self) -> Phase {
      Phase::Ready
   }

   fn strategy(&self) -> Strategy {
      Strategy::Eager
   }
}

impl<T: fmt::Debug> fmt::Debug for Eager<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("Eager").field(&self.instance).finish()
   }
}
