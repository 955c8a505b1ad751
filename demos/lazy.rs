use std::sync::atomic::{AtomicUsize, Ordering};

use sole_instance::{CoarseLocked, DoubleChecked};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Spooler {
   name: String,
}

fn build_spooler() -> Result<Spooler, std::convert::Infallible> {
   // This runs only once per registry
   COUNTER.fetch_add(1, Ordering::Relaxed);
   println!("Created an instance.");
   std::thread::sleep(std::time::Duration::from_millis(50));
   Ok(Spooler {
      name: "lp0".to_string(),
   })
}

static CHECKED: DoubleChecked<Spooler> = DoubleChecked::new(build_spooler);
static LOCKED: CoarseLocked<Spooler> = CoarseLocked::new(build_spooler);

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .init();

   println!("Start.");
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            let a = CHECKED.instance();
            let b = LOCKED.instance();
            println!("Thread access: {} / {}", a.name, b.name);
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   let lazy1 = CHECKED.instance();
   let lazy2 = CHECKED.instance();
   if std::ptr::eq(lazy1, lazy2) {
      println!("lazy1 and lazy2 are the same instance.");
   } else {
      println!("lazy1 and lazy2 are different instances.");
   }
   // One construction per registry
   assert_eq!(COUNTER.load(Ordering::Relaxed), 2);
   println!("End.");
}
