use std::convert::Infallible;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use sole_instance::{
   Accessor, Eager, Phase, RegistryStrategy, SingletonError, SingletonRegistry, Strategy,
};

mod common;

static BANNER: Eager<&str> = Eager::with_instance("Hello, world");

#[test]
fn test_static_instance_is_shared() {
   let first = BANNER.instance();
   let second = BANNER.get_instance().unwrap();
   assert!(ptr::eq(first, second));
   assert_eq!(*first, "Hello, world");
   assert_eq!(Accessor::phase(&BANNER), Phase::Ready);
   assert_eq!(Accessor::strategy(&BANNER), Strategy::Eager);
}

#[test]
fn test_new_constructs_before_returning() {
   let counter = AtomicUsize::new(0);
   let registry = Eager::new(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok::<_, Infallible>(vec![String::from("id-card")])
   })
   .unwrap();
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   assert!(ptr::eq(registry.instance(), registry.instance()));
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_new_surfaces_construction_failure() {
   let result = Eager::<u32>::new(|| Err("bad config"));
   assert!(matches!(result, Err(SingletonError::ConstructionFailed("bad config"))));
}

#[test]
fn test_two_threads_at_start_see_one_construction() {
   common::init_tracing();
   let counter = Arc::new(AtomicUsize::new(0));
   let registry = {
      let counter = Arc::clone(&counter);
      SingletonRegistry::new(RegistryStrategy::Eager, move || {
         counter.fetch_add(1, Ordering::SeqCst);
         Ok::<_, Infallible>(String::from("eager"))
      })
      .unwrap()
   };
   assert_eq!(registry.strategy(), Strategy::Eager);

   let barrier = &Barrier::new(2);
   let registry = &registry;
   let counter = &counter;
   let (a, b) = thread::scope(|s| {
      let spawn = || {
         s.spawn(move || {
            barrier.wait();
            let instance = registry.instance();
            // Construction finished before either call could return.
            assert_eq!(counter.load(Ordering::SeqCst), 1);
            instance as *const String as usize
         })
      };
      let a = spawn();
      let b = spawn();
      (a.join().unwrap(), b.join().unwrap())
   });

   assert_eq!(a, b);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}
