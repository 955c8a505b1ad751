use sole_instance::{Eager, RegistryStrategy, SingletonRegistry};

struct Banner {
   text: &'static str,
}

static BANNER: Eager<Banner> = Eager::with_instance(Banner { text: "Hello" });

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .init();

   println!("Start.");
   let obj1 = BANNER.instance();
   let obj2 = BANNER.instance();
   if std::ptr::eq(obj1, obj2) {
      println!("obj1 and obj2 are the same instance: {}", obj1.text);
   } else {
      println!("obj1 and obj2 are different instances.");
   }

   // Same thing, chosen at runtime and built before any thread can see it.
   let registry = SingletonRegistry::new(RegistryStrategy::Eager, || {
      println!("Created an instance.");
      Ok::<_, std::convert::Infallible>(Banner { text: "World" })
   })
   .unwrap();

   std::thread::scope(|s| {
      for _ in 0..2 {
         s.spawn(|| println!("Thread access: {}", registry.instance().text));
      }
   });
   println!("End.");
}
