//! The accessor contract shared by every strategy, and a registry front that
//! picks its strategy at runtime.

use core::convert::Infallible;
use core::fmt;

use crate::checked::DoubleChecked;
use crate::eager::Eager;
use crate::error::{expect_infallible, Result};
use crate::locked::CoarseLocked;
use crate::state::Phase;

/// How a registry constructs and publishes its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
   /// Built together with the registry; reads are unsynchronized.
   Eager,
   /// Built on first use; lock-free fast path, lock plus re-check on the slow path.
   DoubleChecked,
   /// Built on first use; every call takes the lock.
   CoarseLocked,
   /// Built on first use from the type's process-wide seal.
   Sealed,
}

impl fmt::Display for Strategy {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(match self {
         Self::Eager => "eager",
         Self::DoubleChecked => "double-checked",
         Self::CoarseLocked => "coarse-locked",
         Self::Sealed => "sealed",
      })
   }
}

/// The strategies a [`SingletonRegistry`] can be configured with.
///
/// [`Strategy::Sealed`] has no counterpart: a sealed type is only ever built
/// by its own holder, never from a caller-supplied constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryStrategy {
   /// See [`Strategy::Eager`].
   Eager,
   /// See [`Strategy::DoubleChecked`].
   DoubleChecked,
   /// See [`Strategy::CoarseLocked`].
   CoarseLocked,
}

impl From<RegistryStrategy> for Strategy {
   fn from(strategy: RegistryStrategy) -> Self {
      match strategy {
         RegistryStrategy::Eager => Strategy::Eager,
         RegistryStrategy::DoubleChecked => Strategy::DoubleChecked,
         RegistryStrategy::CoarseLocked => Strategy::CoarseLocked,
      }
   }
}

impl fmt::Display for RegistryStrategy {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Display::fmt(&Strategy::from(*self), f)
   }
}

/// The sanctioned way to reach a singleton.
///
/// Components that need the resource can take `&impl Accessor` instead of
/// naming a global.
pub trait Accessor {
   /// The singleton type.
   type Resource;
   /// Constructor failure.
   type Error;

   /// Returns the instance, constructing it first if the strategy is lazy.
   fn get_instance(&self) -> Result<&Self::Resource, Self::Error>;

   /// Returns the instance only if it is already published.
   fn get(&self) -> Option<&Self::Resource>;

   /// Current lifecycle phase.
   fn phase(&self) -> Phase;

   /// Strategy behind this accessor.
   fn strategy(&self) -> Strategy;

   /// Checks whether the instance is published.
   fn is_ready(&self) -> bool {
      self.phase() == Phase::Ready
   }
}

impl<A: Accessor + ?Sized> Accessor for &A {
   type Resource = A::Resource;
   type Error = A::Error;

   fn get_instance(&self) -> Result<&Self::Resource, Self::Error> {
      (**self).get_instance()
   }

   fn get(&self) -> Option<&Self::Resource> {
      (**self).get()
   }

   fn phase(&self) -> Phase {
      (**self).phase()
   }

   fn strategy(&self) -> Strategy {
      (**self).strategy()
   }
}

/// A singleton registry whose strategy is chosen when it is created.
///
/// Only the strategies in [`RegistryStrategy`] can be chosen. Sealed types
/// go through [`Sole`](crate::Sole).
///
/// ```rust
/// use std::convert::Infallible;
///
/// use sole_instance::{RegistryStrategy, SingletonRegistry, Strategy};
///
/// let registry = SingletonRegistry::new(RegistryStrategy::DoubleChecked, || {
///    Ok::<_, Infallible>("config".to_string())
/// })
/// .unwrap();
/// assert_eq!(registry.strategy(), Strategy::DoubleChecked);
/// assert_eq!(registry.instance(), "config");
/// ```
pub enum SingletonRegistry<T, E = Infallible, F = fn() -> core::result::Result<T, E>> {
   /// Instance built when the registry was created.
   Eager(Eager<T>),
   /// Lazy, behind the double-checked gate.
   DoubleChecked(DoubleChecked<T, E, F>),
   /// Lazy, locking on every call.
   CoarseLocked(CoarseLocked<T, E, F>),
}

impl<T, E, F> SingletonRegistry<T, E, F>
where
   F: Fn() -> core::result::Result<T, E>,
{
   /// Creates a registry using `strategy`.
   ///
   /// With [`RegistryStrategy::Eager`] the constructor runs now and its
   /// failure is returned here; the lazy strategies always succeed.
   pub fn new(strategy: RegistryStrategy, init: F) -> Result<Self, E> {
      Ok(match strategy {
         RegistryStrategy::Eager => Self::Eager(Eager::new(init)?),
         RegistryStrategy::DoubleChecked => Self::DoubleChecked(DoubleChecked::new(init)),
         RegistryStrategy::CoarseLocked => Self::CoarseLocked(CoarseLocked::new(init)),
      })
   }

   /// Constructs now and owns the instance.
   pub fn eager(init: F) -> Result<Self, E> {
      Ok(Self::Eager(Eager::new(init)?))
   }

   /// Lazy registry behind the double-checked gate.
   pub const fn double_checked(init: F) -> Self {
      Self::DoubleChecked(DoubleChecked::new(init))
   }

   /// Lazy registry behind a lock taken on every call.
   pub const fn coarse_locked(init: F) -> Self {
      Self::CoarseLocked(CoarseLocked::new(init))
   }

   /// Returns the instance, constructing it first for lazy strategies.
   pub fn get_instance(&self) -> Result<&T, E> {
      match self {
         Self::Eager(r) => Ok(r.instance()),
         Self::DoubleChecked(r) => r.get_instance(),
         Self::CoarseLocked(r) => r.get_instance(),
      }
   }

   /// Returns the instance if it is already published.
   pub fn get(&self) -> Option<&T> {
      match self {
         Self::Eager(r) => Some(r.instance()),
         Self::DoubleChecked(r) => r.get(),
         Self::CoarseLocked(r) => r.get(),
      }
   }

   /// Current lifecycle phase.
   pub fn phase(&self) -> Phase {
      match self {
         Self::Eager(_) => Phase::Ready,
         Self::DoubleChecked(r) => r.phase(),
         Self::CoarseLocked(r) => r.phase(),
      }
   }

   /// Strategy the registry was created with.
   pub fn strategy(&self) -> Strategy {
      match self {
         Self::Eager(_) => Strategy::Eager,
         Self::DoubleChecked(_) => Strategy::DoubleChecked,
         Self::CoarseLocked(_) => Strategy::CoarseLocked,
      }
   }
}

impl<T, F> SingletonRegistry<T, Infallible, F>
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

impl<T, E, F> Accessor for SingletonRegistry<T, E, F>
where
   F: Fn() -> core::result::Result<T, E>,
{
   type Resource = T;
   type Error = E;

   fn get_instance(&self) -> Result<&T, E> {
      SingletonRegistry::get_instance(self)
   }

   fn get(&self) -> Option<&T> {
      SingletonRegistry::get(self)
   }

   fn phase(&self) -> Phase {
      SingletonRegistry::phase(self)
   }

   fn strategy(&self) -> Strategy {
      SingletonRegistry::strategy(self)
   }
}

impl<T: fmt::Debug, E, F> fmt::Debug for SingletonRegistry<T, E, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Eager(r) => fmt::Debug::fmt(r, f),
         Self::DoubleChecked(r) => fmt::Debug::fmt(r, f),
         Self::CoarseLocked(r) => fmt::Debug::fmt(r, f),
      }
   }
}
