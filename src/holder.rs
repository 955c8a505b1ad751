//! Accessor functions that own their registry.
//!
//! [`singleton_holder!`] declares a function whose body is the constructor.
//! The registry is a `static` local to that function, so nothing but the
//! function itself can reach it, and nothing is built until the first call.
//! Callers see no lock and no error type: the function returns
//! `&'static T`.
//!
//! [`singleton_holder!`]: crate::singleton_holder

/// Declares a function returning the sole, lazily built instance of a type.
///
/// The block is run once, on the first call, behind a [`DoubleChecked`]
/// gate private to the function. It must evaluate to the instance and has
/// no access to the function's callers.
///
/// # Panics
///
/// The generated function panics if the block calls the function again, and
/// propagates a panic from the block. After a panic the next call runs the
/// block again.
///
/// ```rust
/// use sole_instance::singleton_holder;
///
/// pub struct Config {
///    pub retries: u32,
/// }
///
/// singleton_holder! {
///    /// Process-wide configuration.
///    pub fn config() -> Config {
///       Config { retries: 3 }
///    }
/// }
///
/// assert_eq!(config().retries, 3);
/// assert!(core::ptr::eq(config(), config()));
/// ```
///
/// [`DoubleChecked`]: crate::DoubleChecked
#[macro_export]
macro_rules! singleton_holder {
   ($(#[$meta:meta])* $vis:vis fn $name:ident() -> $ty:ty $body:block) => {
      $(#[$meta])*
      $vis fn $name() -> &'static $ty {
         static HOLDER: $crate::DoubleChecked<$ty> =
            $crate::DoubleChecked::new(|| ::core::result::Result::Ok($body));
         HOLDER.instance()
      }
   };
}

#[cfg(test)]
mod tests {
   use std::sync::atomic::{AtomicUsize, Ordering};

   static CALLS: AtomicUsize = AtomicUsize::new(0);

   singleton_holder! {
      fn greeting() -> String {
         CALLS.fetch_add(1, Ordering::SeqCst);
         String::from("hello")
      }
   }

   singleton_holder! {
      fn other_greeting() -> String {
         String::from("hello")
      }
   }

   #[test]
   fn body_runs_on_first_call_only() {
      assert_eq!(greeting(), "hello");
      assert!(core::ptr::eq(greeting(), greeting()));
      assert_eq!(CALLS.load(Ordering::SeqCst), 1);
   }

   #[test]
   fn each_function_owns_its_instance() {
      assert_eq!(greeting(), other_greeting());
      assert!(!core::ptr::eq(greeting(), other_greeting()));
   }
}
