//! Lazy registry that takes its lock on every call.
//!
//! [`CoarseLocked`] is the simplest correct lazy strategy: lock, check,
//! construct if missing, unlock. Readers pay for the lock even after the
//! instance is published, which only matters for hot accessors.
//!
//! The lock is a `parking_lot` re-entrant mutex, so a constructor that calls
//! back into its own registry observes `Initializing` and gets
//! [`SingletonError::ReentrantConstruction`] instead of deadlocking.
//!
//! # Bypass
//!
//! Like [`DoubleChecked`](crate::DoubleChecked), this guards the registry and
//! not the type.

use core::any::type_name;
use core::cell::{Cell, UnsafeCell};
use core::convert::Infallible;
use core::marker::PhantomData;
use core::{fmt, mem};

use parking_lot::ReentrantMutex;

use crate::error::{expect_infallible, Result, SingletonError};
use crate::registry::{Accessor, Strategy};
use crate::state::Phase;

/// Lazily constructed singleton that serializes every accessor call.
pub struct CoarseLocked<T, E = Infallible, F = fn() -> core::result::Result<T, E>> {
   phase: ReentrantMutex<Cell<Phase>>,
   value: UnsafeCell<mem::MaybeUninit<T>>,
   init: F,
   _error: PhantomData<fn() -> E>,
}

/// Puts the phase back to `Uninitialized` unless the construction published.
struct Rollback<'a>(&'a Cell<Phase>);

impl Drop for Rollback<'_> {
   fn drop(&mut self) {
      self.0.set(Phase::Uninitialized);
   }
}

impl<T, E, F> CoarseLocked<T, E, F>
where
   F: Fn() -> core::result::Result<T, E>,
{
   /// Creates an empty registry that will build its instance with `init`.
   #[inline]
   #[must_use]
   pub const fn new(init: F) -> Self {
      Self {
         phase: parking_lot::const_reentrant_mutex(Cell::new(Phase::Uninitialized)),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         init,
         _error: PhantomData,
      }
   }

   /// Returns the instance, constructing it under the lock if missing.
   pub fn get_instance(&self) -> Result<&T, E> {
      let phase = self.phase.lock();
      match phase.get() {
         // SAFETY: READY is terminal and the slot is never written again.
         Phase::Ready => return Ok(unsafe { self.get_unchecked() }),
         // Only the thread holding the lock can observe this.
         Phase::Initializing => {
            tracing::error!(
               resource = type_name::<T>(),
               strategy = %Strategy::CoarseLocked,
               "constructor re-entered its own registry"
            );
            return Err(SingletonError::ReentrantConstruction {
               type_name: type_name::<T>(),
            });
         }
         Phase::Uninitialized => {}
      }

      tracing::debug!(
         resource = type_name::<T>(),
         strategy = %Strategy::CoarseLocked,
         "constructing singleton"
      );
      phase.set(Phase::Initializing);
      let rollback = Rollback(&phase);
      match (self.init)() {
         Ok(value) => {
            // SAFETY: We hold the lock and the phase was Uninitialized, so no
            // reference into the slot exists yet.
            unsafe { (*self.value.get()).write(value) };
            mem::forget(rollback);
            phase.set(Phase::Ready);
            tracing::debug!(resource = type_name::<T>(), "singleton published");
            // SAFETY: Written just above.
            Ok(unsafe { self.get_unchecked() })
         }
         Err(err) => {
            drop(rollback);
            tracing::warn!(
               resource = type_name::<T>(),
               strategy = %Strategy::CoarseLocked,
               "singleton construction failed, registry reset"
            );
            Err(SingletonError::ConstructionFailed(err))
         }
      }
   }
}

impl<T, F> CoarseLocked<T, Infallible, F>
where
   F: Fn() -> core::result::Result<T, Infallible>,
{
   /// Returns the instance of an infallible registry.
   ///
   /// # Panics
   ///
   /// Panics if called from inside this registry's own constructor.
   #[track_caller]
   pub fn instance(&self) -> &T {
      expect_infallible(self.get_instance())
   }
}

impl<T, E, F> CoarseLocked<T, E, F> {
   /// Returns the instance if it has been published. Takes the lock, never constructs.
   pub fn get(&self) -> Option<&T> {
      let phase = self.phase.lock();
      if phase.get() == Phase::Ready {
         // SAFETY: READY is terminal and the slot is never written again.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Current lifecycle phase.
   pub fn phase(&self) -> Phase {
      self.phase.lock().get()
   }

   /// Checks whether the instance has been published.
   pub fn is_ready(&self) -> bool {
      self.phase() == Phase::Ready
   }

   /// # Safety
   ///
   /// The phase must be `Ready`.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      (*self.value.get()).assume_init_ref()
   }
}

impl<T, E, F> Accessor for CoarseLocked<T, E, F>
where
   F: Fn() -> core::result::Result<T, E>,
{
   type Resource = T;
   type Error = E;

   fn get_instance(&self) -> Result<&T, E> {
      CoarseLocked::get_instance(self)
   }

   fn get(&self) -> Option<&T> {
      CoarseLocked::get(self)
   }

   fn phase(&self) -> Phase {
      CoarseLocked::phase(self)
   }

   fn strategy(&self) -> Strategy {
      Strategy::CoarseLocked
   }
}

// SAFETY: The slot is written once under the mutex and only read afterwards.
// See the matching impl on `DoubleChecked` for the bounds.
unsafe impl<T: Send + Sync, E, F: Sync> Sync for CoarseLocked<T, E, F> {}

impl<T: fmt::Debug, E, F> fmt::Debug for CoarseLocked<T, E, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("CoarseLocked");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<{:?}>", self.phase())),
      };
      d.finish()
   }
}

impl<T, E, F> Drop for CoarseLocked<T, E, F> {
   fn drop(&mut self) {
      if self.phase.get_mut().get() == Phase::Ready {
         // SAFETY: Exclusive access and the value was published.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
