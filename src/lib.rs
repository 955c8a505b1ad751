//! Process singletons that are constructed exactly once and safely published.
//!
//! Every registry in this crate owns one instance of a resource type and
//! hands it out through a single accessor. Whatever the number of threads or
//! tasks calling it, the constructor runs at most once per successful
//! construction, and no caller ever sees a partially built instance.
//!
//! - [`Eager<T>`]: the instance is built together with the registry. Reads
//!   are plain field accesses.
//! - [`DoubleChecked<T, E, F>`]: built on first use. Readers check a
//!   published flag with an acquire load; only when it is missing do they
//!   take the registry's lock and check again before constructing.
//! - [`CoarseLocked<T, E, F>`]: built on first use, every call takes the lock.
//! - [`Sole<T>`] and [`singleton_enum!`]: the type itself can only be built
//!   from a [`Seal`], and seals only reach the type's one holder. Any other
//!   route fails with [`SingletonError::BypassDetected`].
//! - [`singleton_holder!`]: a function that owns a private, lazily built
//!   instance and returns `&'static T`.
//! - [`SingletonRegistry`]: picks eager, double-checked or coarse-locked at
//!   runtime.
//!
//! The registry types implement [`Accessor`], so code that needs the resource can
//! take the accessor as a parameter instead of reaching for a global.
//!
//! # Failures
//!
//! A constructor that returns an error or panics leaves the registry
//! [`Phase::Uninitialized`]; the next call tries again. A constructor that
//! calls back into its own registry gets
//! [`SingletonError::ReentrantConstruction`] instead of a deadlock.
//!
//! # Examples
//!
//! ```rust
//! use sole_instance::DoubleChecked;
//!
//! struct Printer {
//!    queue: Vec<String>,
//! }
//!
//! static PRINTER: DoubleChecked<Printer> = DoubleChecked::new(|| Ok(Printer { queue: Vec::new() }));
//!
//! let a = PRINTER.instance();
//! let b = PRINTER.instance();
//! assert!(core::ptr::eq(a, b));
//! assert!(a.queue.is_empty());
//! ```
//!
//! Fallible construction is retried on the next call:
//!
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! use sole_instance::{DoubleChecked, Phase, SingletonError};
//!
//! static FAIL: AtomicBool = AtomicBool::new(true);
//! static PORT: DoubleChecked<u16, &str> = DoubleChecked::new(|| {
//!    if FAIL.swap(false, Ordering::SeqCst) {
//!       Err("port busy")
//!    } else {
//!       Ok(8080)
//!    }
//! });
//!
//! assert_eq!(PORT.get_instance(), Err(SingletonError::ConstructionFailed("port busy")));
//! assert_eq!(PORT.phase(), Phase::Uninitialized);
//! assert_eq!(PORT.get_instance(), Ok(&8080));
//! ```

/// Double-checked lazy registry.
mod checked;

/// Eager registry.
mod eager;

/// Error taxonomy.
mod error;

/// Function-local holders.
mod holder;

/// Coarse-locked lazy registry.
mod locked;

/// Accessor trait and runtime-selected registry.
mod registry;

/// Seal-backed registry.
mod sealed;

/// Internal construction gate.
mod state;

pub use checked::DoubleChecked;
pub use eager::Eager;
pub use error::{Result, SingletonError};
pub use locked::CoarseLocked;
pub use registry::{Accessor, RegistryStrategy, SingletonRegistry, Strategy};
pub use sealed::{Seal, Sealed, Sole};
pub use state::Phase;
