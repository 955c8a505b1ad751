//! Properties every lazy strategy has to satisfy, checked through [`Accessor`].

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use sole_instance::{
   Accessor, CoarseLocked, DoubleChecked, Phase, RegistryStrategy, SingletonError, SingletonRegistry,
   Strategy,
};

mod common;

/// Resource whose constructor is slow and sets its completion marker last.
struct Marked {
   payload: Vec<u64>,
   finished: bool,
}

fn build_marked(counter: &AtomicUsize) -> Marked {
   counter.fetch_add(1, Ordering::SeqCst);
   let mut marked = Marked {
      payload: Vec::with_capacity(256),
      finished: false,
   };
   thread::sleep(Duration::from_millis(15));
   marked.payload.extend(0..256);
   marked.finished = true;
   marked
}

/// Single instance, single construction, no premature publication.
fn check_published_once<A>(registry: &A, counter: &AtomicUsize)
where
   A: Accessor<Resource = Marked> + Sync,
   A::Error: std::fmt::Debug,
{
   assert_eq!(registry.phase(), Phase::Uninitialized);
   let seen = AtomicUsize::new(0);
   thread::scope(|s| {
      for _ in 0..50 {
         s.spawn(|| {
            let marked = registry.get_instance().unwrap();
            assert!(marked.finished);
            assert_eq!(marked.payload.len(), 256);
            seen.fetch_add(1, Ordering::SeqCst);
         });
      }
   });
   assert_eq!(seen.load(Ordering::SeqCst), 50);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
   assert_eq!(common::distinct_addresses(registry, 50).len(), 1);
   assert_eq!(registry.phase(), Phase::Ready);
}

#[test]
fn test_double_checked_properties() {
   common::init_tracing();
   let counter = Arc::new(AtomicUsize::new(0));
   let ctor_counter = Arc::clone(&counter);
   let registry = DoubleChecked::new(move || Ok::<_, Infallible>(build_marked(&ctor_counter)));
   check_published_once(&registry, &counter);
}

#[test]
fn test_coarse_locked_properties() {
   let counter = Arc::new(AtomicUsize::new(0));
   let ctor_counter = Arc::clone(&counter);
   let registry = CoarseLocked::new(move || Ok::<_, Infallible>(build_marked(&ctor_counter)));
   check_published_once(&registry, &counter);
}

#[test]
fn test_registry_front_properties() {
   for strategy in [RegistryStrategy::DoubleChecked, RegistryStrategy::CoarseLocked] {
      let counter = Arc::new(AtomicUsize::new(0));
      let ctor_counter = Arc::clone(&counter);
      let registry = SingletonRegistry::new(strategy, move || {
         Ok::<_, Infallible>(build_marked(&ctor_counter))
      })
      .unwrap();
      assert_eq!(registry.strategy(), Strategy::from(strategy));
      check_published_once(&registry, &counter);
   }
}

/// Calls the accessor until it succeeds, the way a caller that chooses to
/// retry would.
fn get_with_retry<A: Accessor>(registry: &A) -> usize
where
   A::Error: std::fmt::Debug,
{
   loop {
      match registry.get_instance() {
         Ok(instance) => return instance as *const A::Resource as usize,
         Err(SingletonError::ConstructionFailed(_)) => continue,
         Err(other) => panic!("unexpected accessor error: {other:?}"),
      }
   }
}

proptest! {
   #![proptest_config(ProptestConfig::with_cases(16))]

   #[test]
   fn prop_constructor_succeeds_exactly_once(
      threads in 2usize..48,
      failures in 0usize..4,
      coarse in any::<bool>(),
   ) {
      let attempts = Arc::new(AtomicUsize::new(0));
      let successes = Arc::new(AtomicUsize::new(0));
      let ctor = {
         let attempts = Arc::clone(&attempts);
         let successes = Arc::clone(&successes);
         move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < failures {
               Err(n)
            } else {
               successes.fetch_add(1, Ordering::SeqCst);
               Ok(n.to_string())
            }
         }
      };
      let strategy = if coarse {
         RegistryStrategy::CoarseLocked
      } else {
         RegistryStrategy::DoubleChecked
      };
      let registry = SingletonRegistry::new(strategy, ctor).unwrap();

      let addresses: HashSet<usize> = thread::scope(|s| {
         let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| get_with_retry(&registry)))
            .collect();
         handles.into_iter().map(|h| h.join().unwrap()).collect()
      });

      prop_assert_eq!(addresses.len(), 1);
      prop_assert_eq!(successes.load(Ordering::SeqCst), 1);
      prop_assert_eq!(attempts.load(Ordering::SeqCst), failures + 1);
      prop_assert_eq!(registry.get(), Some(&failures.to_string()));
   }
}
