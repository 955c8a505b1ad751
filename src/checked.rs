//! Lazy registry behind a double-checked construction gate.
//!
//! This module provides [`DoubleChecked`], the lazy strategy most callers
//! want. The first check is a lock-free acquire load of the gate state; only
//! when the instance is missing does a caller take the registry's
//! construction lock and check again before running the constructor. The
//! second check is what keeps two threads that both saw "missing" from each
//! building an instance.
//!
//! # Bypass
//!
//! The gate protects the registry, not the resource type. Any code that can
//! call the constructor itself, or create a second `DoubleChecked` for the
//! same type, ends up with a second, distinct instance. Use [`Sole`] when the
//! type itself must refuse a second construction.
//!
//! [`Sole`]: crate::Sole

use core::any::type_name;
use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::marker::PhantomData;
use core::{fmt, mem};

use crate::error::{expect_infallible, Result, SingletonError};
use crate::registry::{Accessor, Strategy};
use crate::state::{Gate, GateGuard, Phase};

/// Lazily constructed singleton with a lock-free fast path.
///
/// `F` is called at most once per successful construction. If it fails, the
/// registry returns to [`Phase::Uninitialized`] and the next accessor call
/// tries again.
///
/// ```rust
/// use sole_instance::DoubleChecked;
///
/// static SPOOLER: DoubleChecked<Vec<&str>> = DoubleChecked::new(|| Ok(vec!["lp0"]));
///
/// let a = SPOOLER.instance();
/// let b = SPOOLER.instance();
/// assert!(core::ptr::eq(a, b));
/// ```
pub struct DoubleChecked<T, E = Infallible, F = fn() -> core::result::Result<T, E>> {
   gate: Gate,
   value: UnsafeCell<mem::MaybeUninit<T>>,
   init: F,
   _error: PhantomData<fn() -> E>,
}

impl<T, E, F> DoubleChecked<T, E, F>
where
   F: Fn() -> core::result::Result<T, E>,
{
   /// Creates an empty registry that will build its instance with `init`.
   #[inline]
   #[must_use]
   pub const fn new(init: F) -> Self {
      Self {
         gate: Gate::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         init,
         _error: PhantomData,
      }
   }

   /// Returns the instance, constructing it on the first call.
   ///
   /// Concurrent first callers block until the single construction finishes
   /// and then all receive the same reference.
   #[inline]
   pub fn get_instance(&self) -> Result<&T, E> {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.initialize()?;
      // SAFETY: `initialize` returned Ok, so the gate is READY.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Async flavour of [`get_instance`](Self::get_instance).
   ///
   /// Waiting for another task's construction yields to the runtime instead
   /// of parking the worker thread. The constructor itself still runs
   /// synchronously.
   #[cfg(feature = "async-tokio")]
   pub async fn get_instance_async(&self) -> Result<&T, E> {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      match self.gate.lock_async().await {
         Ok(Some(guard)) => self.construct(guard)?,
         Ok(None) => {}
         Err(_) => return Err(self.reentrant()),
      }
      // SAFETY: READY either before we locked or after `construct`.
      Ok(unsafe { self.get_unchecked() })
   }

   #[cold]
   fn initialize(&self) -> Result<(), E> {
      match self.gate.lock() {
         Ok(Some(guard)) => self.construct(guard),
         // Published by another thread while we waited.
         Ok(None) => Ok(()),
         Err(_) => Err(self.reentrant()),
      }
   }

   fn construct(&self, guard: GateGuard<'_>) -> Result<(), E> {
      tracing::debug!(
         resource = type_name::<T>(),
         strategy = %Strategy::DoubleChecked,
         "constructing singleton"
      );
      // A panic here drops the guard, which rolls the gate back.
      match (self.init)() {
         Ok(value) => {
            // SAFETY: The guard gives us exclusive access to the slot, and
            // nothing has been written to it while the gate was not READY.
            unsafe { (*self.value.get()).write(value) };
            guard.publish();
            tracing::debug!(resource = type_name::<T>(), "singleton published");
            Ok(())
         }
         Err(err) => {
            drop(guard);
            tracing::warn!(
               resource = type_name::<T>(),
               strategy = %Strategy::DoubleChecked,
               "singleton construction failed, registry reset"
            );
            Err(SingletonError::ConstructionFailed(err))
         }
      }
   }

   fn reentrant(&self) -> SingletonError<E> {
      tracing::error!(
         resource = type_name::<T>(),
         strategy = %Strategy::DoubleChecked,
         "constructor re-entered its own registry"
      );
      SingletonError::ReentrantConstruction {
         type_name: type_name::<T>(),
      }
   }
}

impl<T, F> DoubleChecked<T, Infallible, F>
where
   F: Fn() -> core::result::Result<T, Infallible>,
{
   /// Returns the instance of an infallible registry.
   ///
   /// # Panics
   ///
   /// Panics if called from inside this registry's own constructor.
   #[inline]
   #[track_caller]
   pub fn instance(&self) -> &T {
      expect_infallible(self.get_instance())
   }
}

impl<T, E, F> DoubleChecked<T, E, F> {
   /// Returns the instance if it has been published. Never blocks or constructs.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.gate.is_ready() {
         // SAFETY: The acquire load in `is_ready` synchronizes with the
         // release in `publish`, so the write of the value is visible.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Checks whether the instance has been published. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.gate.is_ready()
   }

   /// Current lifecycle phase.
   #[inline]
   pub fn phase(&self) -> Phase {
      self.gate.phase()
   }

   /// # Safety
   ///
   /// The gate must be READY.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.gate.is_ready(), "get_unchecked on unpublished registry");
      (*self.value.get()).assume_init_ref()
   }
}

impl<T, E, F> Accessor for DoubleChecked<T, E, F>
where
   F: Fn() -> core::result::Result<T, E>,
{
   type Resource = T;
   type Error = E;

   fn get_instance(&self) -> Result<&T, E> {
      DoubleChecked::get_instance(self)
   }

   fn get(&self) -> Option<&T> {
      DoubleChecked::get(self)
   }

   fn phase(&self) -> Phase {
      DoubleChecked::phase(self)
   }

   fn strategy(&self) -> Strategy {
      Strategy::DoubleChecked
   }
}

// SAFETY:
// Shared access hands out `&T` to many threads (`T: Sync`) and the instance
// may be built on one thread and dropped on another (`T: Send`). `init` is
// called through `&F` from whichever thread wins the gate (`F: Sync`).
unsafe impl<T: Send + Sync, E, F: Sync> Sync for DoubleChecked<T, E, F> {}

impl<T: fmt::Debug, E, F> fmt::Debug for DoubleChecked<T, E, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("DoubleChecked");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<{:?}>", self.phase())),
      };
      d.finish()
   }
}

impl<T, E, F> Drop for DoubleChecked<T, E, F> {
   #[inline]
   fn drop(&mut self) {
      if self.gate.is_ready() {
         // SAFETY: Exclusive access and the value was published.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn debug_shows_phase_until_published() {
      let registry: DoubleChecked<u32> = DoubleChecked::new(|| Ok(7));
      assert_eq!(format!("{registry:?}"), "DoubleChecked(<Uninitialized>)");
      registry.instance();
      assert_eq!(format!("{registry:?}"), "DoubleChecked(7)");
   }

   #[test]
   fn get_never_constructs() {
      let registry: DoubleChecked<u32, &str> = DoubleChecked::new(|| panic!("must not run"));
      assert_eq!(registry.get(), None);
      assert_eq!(registry.phase(), Phase::Uninitialized);
   }
}
