#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use sole_instance::Accessor;

/// Installs a test-writer subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
   let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
}

/// Releases `threads` callers at once against `registry` and returns the
/// distinct instance addresses they observed.
pub fn distinct_addresses<A>(registry: &A, threads: usize) -> HashSet<usize>
where
   A: Accessor + Sync,
   A::Error: std::fmt::Debug,
{
   let barrier = Arc::new(Barrier::new(threads));
   thread::scope(|s| {
      let handles: Vec<_> = (0..threads)
         .map(|_| {
            let barrier = Arc::clone(&barrier);
            s.spawn(move || {
               barrier.wait();
               let instance = registry.get_instance().unwrap();
               instance as *const A::Resource as usize
            })
         })
         .collect();
      handles.into_iter().map(|h| h.join().unwrap()).collect()
   })
}
