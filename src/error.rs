//! Error types surfaced by every registry accessor.

use core::convert::Infallible;

use thiserror::Error;

/// Why an accessor did not hand out the instance.
///
/// None of these are retried by the registry. A caller that wants to retry
/// after `ConstructionFailed` simply calls the accessor again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SingletonError<E> {
   /// The resource constructor returned an error. The registry is back in
   /// [`Phase::Uninitialized`](crate::Phase::Uninitialized).
   #[error("singleton construction failed: {0}")]
   ConstructionFailed(E),

   /// A sealed type was reached through something other than its holder.
   #[error("second construction of sealed singleton `{type_name}` rejected")]
   BypassDetected {
      /// Type whose construction was attempted.
      type_name: &'static str,
   },

   /// The constructor called back into the registry it is constructing for.
   #[error("re-entrant construction of singleton `{type_name}`")]
   ReentrantConstruction {
      /// Type under construction.
      type_name: &'static str,
   },
}

impl<E> SingletonError<E> {
   /// Returns `true` for [`SingletonError::ConstructionFailed`].
   pub fn is_construction_failed(&self) -> bool {
      matches!(self, Self::ConstructionFailed(_))
   }

   /// Maps the constructor error, keeping the other variants as they are.
   pub fn map_err<F, E2>(self, f: F) -> SingletonError<E2>
   where
      F: FnOnce(E) -> E2,
   {
      match self {
         Self::ConstructionFailed(e) => SingletonError::ConstructionFailed(f(e)),
         Self::BypassDetected { type_name } => SingletonError::BypassDetected { type_name },
         Self::ReentrantConstruction { type_name } => {
            SingletonError::ReentrantConstruction { type_name }
         }
      }
   }
}

impl SingletonError<Infallible> {
   /// Widens an error from an infallible constructor to any error type.
   pub fn widen<E>(self) -> SingletonError<E> {
      self.map_err(|never| match never {})
   }
}

/// Shorthand `Result` for accessor calls.
pub type Result<T, E = Infallible> = core::result::Result<T, SingletonError<E>>;

/// Unwraps an accessor result whose constructor cannot fail.
///
/// # Panics
///
/// Panics on [`SingletonError::BypassDetected`] and
/// [`SingletonError::ReentrantConstruction`], both programmer errors.
#[track_caller]
pub(crate) fn expect_infallible<T>(result: Result<T>) -> T {
   match result {
      Ok(value) => value,
      Err(SingletonError::ConstructionFailed(never)) => match never {},
      Err(err) => panic!("{err}"),
   }
}
