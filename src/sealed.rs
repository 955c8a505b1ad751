//! Singletons whose type refuses a second construction.
//!
//! The lazy and eager registries only guard their own slot: anyone able to
//! call the constructor gets another instance. Here the constructor of a
//! [`Sealed`] type requires a [`Seal`], and only the crate can mint one. It
//! does so for a single holder per type, the `static` returned by
//! [`Sealed::holder`]. Any other [`Sole`] of the same type, whether reached
//! before or after the real one, fails with
//! [`SingletonError::BypassDetected`] and leaves the real instance alone.
//!
//! A constructor that fails or panics leaves the holder
//! [`Phase::Uninitialized`]. The holder keeps its claim on the type, so the
//! next access mints a fresh seal and tries again.
//!
//! [`singleton_enum!`] puts a closed, single-member enum in front of the
//! holder.
//!
//! [`singleton_enum!`]: crate::singleton_enum

use core::any::{type_name, TypeId};
use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::{fmt, mem, ptr};
use std::collections::btree_map::{BTreeMap, Entry};

use parking_lot::Mutex;

use crate::error::{Result, SingletonError};
use crate::registry::{Accessor, Strategy};
use crate::state::{Gate, GateGuard, Phase};

/// Owner of each sealed type's seal, by holder address. Entries are never removed.
static CLAIMS: Mutex<BTreeMap<TypeId, usize>> = parking_lot::const_mutex(BTreeMap::new());

fn bypass<T, E>() -> SingletonError<E> {
   SingletonError::BypassDetected {
      type_name: type_name::<T>(),
   }
}

/// Proof that the holder of `T` is constructing it.
///
/// Not `Clone`, not `Default`, no public fields and no public constructor:
/// seals only ever reach [`Sealed::construct`] through the holder.
///
/// ```compile_fail
/// use sole_instance::{Seal, Sole};
///
/// struct Rogue;
/// static ROGUE: Sole<Rogue> = Sole::new();
///
/// let _seal = Seal::<Rogue>::claim(&ROGUE);
/// ```
pub struct Seal<T> {
   _type: PhantomData<fn() -> T>,
}

impl<T: 'static> Seal<T> {
   /// Mints a seal for `owner`.
   ///
   /// The first holder to ask becomes the owner of `T` for the rest of the
   /// process. It may ask again after a failed construction; every other
   /// holder is refused.
   pub(crate) fn claim(owner: &Sole<T>) -> Result<Self> {
      let owner = owner as *const Sole<T> as usize;
      let owned = match CLAIMS.lock().entry(TypeId::of::<T>()) {
         Entry::Vacant(slot) => {
            slot.insert(owner);
            true
         }
         Entry::Occupied(slot) => *slot.get() == owner,
      };
      if owned {
         tracing::debug!(resource = type_name::<T>(), "seal issued");
         Ok(Self { _type: PhantomData })
      } else {
         tracing::error!(
            resource = type_name::<T>(),
            "seal requested by a holder that does not own the type"
         );
         Err(bypass::<T, _>())
      }
   }

   /// Checks whether some holder has claimed `T`.
   pub fn is_claimed() -> bool {
      CLAIMS.lock().contains_key(&TypeId::of::<T>())
   }
}

impl<T> fmt::Debug for Seal<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "Seal<{}>", type_name::<T>())
   }
}

/// A type that can only be built from its [`Seal`], by its one holder.
///
/// Implementors must not provide any other constructor, and must not
/// implement `Clone`, `Default` or deserialization.
pub trait Sealed: Sized + 'static {
   /// Construction failure.
   type Error: fmt::Debug + fmt::Display;

   /// The holder of the sole instance.
   ///
   /// Must return the same `static` on every call.
   fn holder() -> &'static Sole<Self>;

   /// Builds the sole instance, consuming the seal.
   fn construct(seal: Seal<Self>) -> core::result::Result<Self, Self::Error>;
}

/// Lazy holder of the sole instance of a [`Sealed`] type.
///
/// ```rust
/// use sole_instance::{Seal, Sealed, SingletonError, Sole};
///
/// struct Clock {
///    started: u64,
/// }
///
/// impl Sealed for Clock {
///    type Error = std::convert::Infallible;
///
///    fn holder() -> &'static Sole<Self> {
///       static CLOCK: Sole<Clock> = Sole::new();
///       &CLOCK
///    }
///
///    fn construct(_seal: Seal<Self>) -> Result<Self, Self::Error> {
///       Ok(Clock { started: 42 })
///    }
/// }
///
/// assert_eq!(Clock::holder().instance().started, 42);
///
/// let rogue: Sole<Clock> = Sole::new();
/// assert!(matches!(rogue.get_instance(), Err(SingletonError::BypassDetected { .. })));
/// ```
pub struct Sole<T> {
   gate: Gate,
   value: UnsafeCell<mem::MaybeUninit<T>>,
}

impl<T> Sole<T> {
   /// Creates an empty holder. Claims nothing until first access.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         gate: Gate::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Returns the instance if it has been published. Never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.gate.is_ready() {
         // SAFETY: Acquire load of READY pairs with the release in `publish`.
         Some(unsafe { (*self.value.get()).assume_init_ref() })
      } else {
         None
      }
   }

   /// Current lifecycle phase.
   #[inline]
   pub fn phase(&self) -> Phase {
      self.gate.phase()
   }

   /// Checks whether the instance has been published.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.gate.is_ready()
   }
}

impl<T: Sealed> Sole<T> {
   /// Returns the sole instance, constructing it on first use.
   ///
   /// Fails with [`SingletonError::BypassDetected`] unless `self` is
   /// [`T::holder()`](Sealed::holder).
   pub fn get_instance(&self) -> Result<&T, T::Error> {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.initialize()?;
      // SAFETY: `initialize` returned Ok, so the gate is READY.
      Ok(unsafe { (*self.value.get()).assume_init_ref() })
   }

   /// Returns the sole instance.
   ///
   /// # Panics
   ///
   /// Panics with the accessor error if the instance cannot be handed out.
   #[track_caller]
   pub fn instance(&self) -> &T {
      match self.get_instance() {
         Ok(value) => value,
         Err(err) => panic!("{err}"),
      }
   }

   #[cold]
   fn initialize(&self) -> Result<(), T::Error> {
      if !ptr::eq(self, T::holder()) {
         tracing::error!(
            resource = type_name::<T>(),
            strategy = %Strategy::Sealed,
            "sealed singleton reached through a second holder"
         );
         return Err(bypass::<T, _>());
      }
      match self.gate.lock() {
         Ok(Some(guard)) => self.construct(guard),
         Ok(None) => Ok(()),
         Err(_) => {
            tracing::error!(
               resource = type_name::<T>(),
               strategy = %Strategy::Sealed,
               "constructor re-entered its own registry"
            );
            Err(SingletonError::ReentrantConstruction {
               type_name: type_name::<T>(),
            })
         }
      }
   }

   fn construct(&self, guard: GateGuard<'_>) -> Result<(), T::Error> {
      let seal = match Seal::claim(self) {
         Ok(seal) => seal,
         Err(err) => return Err(err.widen()),
      };

      tracing::debug!(
         resource = type_name::<T>(),
         strategy = %Strategy::Sealed,
         "constructing singleton"
      );
      // A panic here drops the guard; the claim stays ours for the retry.
      match T::construct(seal) {
         Ok(value) => {
            // SAFETY: Exclusive access under the guard, slot still empty.
            unsafe { (*self.value.get()).write(value) };
            guard.publish();
            tracing::debug!(resource = type_name::<T>(), "singleton published");
            Ok(())
         }
         Err(error) => {
            drop(guard);
            tracing::warn!(
               resource = type_name::<T>(),
               strategy = %Strategy::Sealed,
               "singleton construction failed, holder reset"
            );
            Err(SingletonError::ConstructionFailed(error))
         }
      }
   }
}

impl<T: Sealed> Accessor for Sole<T> {
   type Resource = T;
   type Error = T::Error;

   fn get_instance(&self) -> Result<&T, T::Error> {
      Sole::get_instance(self)
   }

   fn get(&self) -> Option<&T> {
      Sole::get(self)
   }

   fn phase(&self) -> Phase {
      Sole::phase(self)
   }

   fn strategy(&self) -> Strategy {
      Strategy::Sealed
   }
}

impl<T> Default for Sole<T> {
   fn default() -> Self {
      Self::new()
   }
}

// SAFETY: Same reasoning as `DoubleChecked`.
unsafe impl<T: Send + Sync> Sync for Sole<T> {}

impl<T: fmt::Debug> fmt::Debug for Sole<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Sole");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<{:?}>", self.phase())),
      };
      d.finish()
   }
}

impl<T> Drop for Sole<T> {
   fn drop(&mut self) {
      if self.gate.is_ready() {
         // SAFETY: Exclusive access and the value was published.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}

/// Declares a closed, single-member enum standing for the sole instance of a
/// [`Sealed`] type.
///
/// The enum's only value dereferences to the instance held by
/// [`Sealed::holder`], which is constructed on first use. `get` returns the
/// accessor result instead of panicking.
///
/// ```rust
/// use sole_instance::{singleton_enum, Seal, Sealed, Sole};
///
/// pub struct Registry {
///    pub name: &'static str,
/// }
///
/// impl Sealed for Registry {
///    type Error = std::convert::Infallible;
///
///    fn holder() -> &'static Sole<Self> {
///       static REGISTRY: Sole<Registry> = Sole::new();
///       &REGISTRY
///    }
///
///    fn construct(_seal: Seal<Self>) -> Result<Self, Self::Error> {
///       Ok(Registry { name: "main" })
///    }
/// }
///
/// singleton_enum! {
///    pub enum Main { INSTANCE } => Registry
/// }
///
/// assert_eq!(Main::INSTANCE.name, "main");
/// assert!(core::ptr::eq(&*Main::INSTANCE, Main::INSTANCE.get().unwrap()));
/// ```
#[macro_export]
macro_rules! singleton_enum {
   ($(#[$meta:meta])* $vis:vis enum $name:ident { $variant:ident $(,)? } => $target:ty $(;)?) => {
      $(#[$meta])*
      #[allow(non_camel_case_types)]
      #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
      $vis enum $name {
         $variant,
      }

      impl $name {
         /// Returns the sole instance behind this constant.
         $vis fn get(
            self,
         ) -> $crate::Result<&'static $target, <$target as $crate::Sealed>::Error> {
            match self {
               Self::$variant => <$target as $crate::Sealed>::holder().get_instance(),
            }
         }
      }

      impl ::core::ops::Deref for $name {
         type Target = $target;

         #[track_caller]
         fn deref(&self) -> &$target {
            match self.get() {
               ::core::result::Result::Ok(instance) => instance,
               ::core::result::Result::Err(err) => ::core::panic!("{}", err),
            }
         }
      }
   };
}
