use std::sync::atomic::{AtomicUsize, Ordering};

use sole_instance::singleton_holder;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Spooler {
   name: &'static str,
}

singleton_holder! {
   fn spooler() -> Spooler {
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Created an instance.");
      std::thread::sleep(std::time::Duration::from_millis(50));
      Spooler { name: "lp0" }
   }
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .init();

   println!("Start.");
   // Nothing is built until the first call.
   assert_eq!(COUNTER.load(Ordering::Relaxed), 0);

   let threads: Vec<_> = (0..5)
      .map(|_| std::thread::spawn(|| println!("Thread access: {}", spooler().name)))
      .collect();
   for t in threads {
      t.join().unwrap();
   }

   if std::ptr::eq(spooler(), spooler()) {
      println!("holder returns the same instance.");
   } else {
      println!("holder returns different instances.");
   }
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);
   println!("End.");
}
