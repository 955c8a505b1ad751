#![cfg(feature = "async-tokio")]

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sole_instance::{DoubleChecked, Phase, SingletonError};

mod common;

#[tokio::test]
async fn test_get_instance_async() {
   let counter = AtomicUsize::new(0);
   let registry = DoubleChecked::new(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok::<_, Infallible>(String::from("async spool"))
   });

   let first = registry.get_instance_async().await.unwrap();
   let second = registry.get_instance_async().await.unwrap();
   assert!(std::ptr::eq(first, second));
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   // Sync and async accessors share one gate.
   assert!(std::ptr::eq(first, registry.instance()));
}

#[tokio::test]
async fn test_get_instance_async_failure_resets() {
   let attempts = AtomicUsize::new(0);
   let registry = DoubleChecked::new(|| match attempts.fetch_add(1, Ordering::SeqCst) {
      0 => Err("backend down"),
      n => Ok(n),
   });

   assert_eq!(
      registry.get_instance_async().await,
      Err(SingletonError::ConstructionFailed("backend down"))
   );
   assert_eq!(registry.phase(), Phase::Uninitialized);
   assert_eq!(registry.get_instance_async().await, Ok(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_share_one_instance() {
   common::init_tracing();
   let counter = Arc::new(AtomicUsize::new(0));
   let registry = {
      let counter = Arc::clone(&counter);
      Arc::new(DoubleChecked::new(move || {
         counter.fetch_add(1, Ordering::SeqCst);
         // Hold the gate long enough for other tasks to queue behind it.
         std::thread::sleep(Duration::from_millis(30));
         Ok::<_, Infallible>(vec![7u8; 32])
      }))
   };

   let tasks: Vec<_> = (0..32)
      .map(|_| {
         let registry = Arc::clone(&registry);
         tokio::spawn(async move {
            let instance = registry.get_instance_async().await.unwrap();
            instance as *const Vec<u8> as usize
         })
      })
      .collect();

   let mut addresses = HashSet::new();
   for task in tasks {
      addresses.insert(task.await.unwrap());
   }
   assert_eq!(addresses.len(), 1);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}
