use std::sync::atomic::{AtomicBool, Ordering};

use sole_instance::{DoubleChecked, SingletonError};

static FAIL: AtomicBool = AtomicBool::new(true);
static DATABASE: DoubleChecked<String, &'static str> = DoubleChecked::new(|| {
   let fail = FAIL.load(Ordering::SeqCst);
   println!("Attempting construction (fail={fail})...");
   if fail {
      Err("Construction failed!")
   } else {
      Ok("maildata".to_string())
   }
});

fn main() {
   // First attempt fails
   FAIL.store(true, Ordering::SeqCst);
   match DATABASE.get_instance() {
      Ok(_) => panic!("Should have failed"),
      Err(SingletonError::ConstructionFailed(e)) => println!("Caught error: {e}"),
      Err(e) => panic!("Unexpected error: {e}"),
   }
   assert!(!DATABASE.is_ready()); // Back to uninitialized

   // Second attempt succeeds
   FAIL.store(false, Ordering::SeqCst);
   match DATABASE.get_instance() {
      Ok(data) => println!("Got data: {data}"),
      Err(_) => panic!("Should have succeeded"),
   }
   assert!(DATABASE.is_ready());

   // Once published, the constructor is never consulted again
   FAIL.store(true, Ordering::SeqCst);
   match DATABASE.get_instance() {
      Ok(data) => println!("Got data again: {data}"),
      Err(_) => panic!("Should have returned existing data"),
   }
}
