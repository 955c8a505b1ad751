use std::sync::atomic::{AtomicUsize, Ordering};

use sole_instance::DoubleChecked;

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static FACTORY: DoubleChecked<String> = DoubleChecked::new(|| {
   // This runs only once, whichever task gets here first
   COUNTER.fetch_add(1, Ordering::Relaxed);
   println!("Constructing factory...");
   std::thread::sleep(std::time::Duration::from_millis(50));
   Ok("IDCardFactory".to_string())
});

#[tokio::main]
async fn main() {
   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            let factory = FACTORY.get_instance_async().await.unwrap();
            println!("Task access: {factory}");
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);
   println!("Final factory: {}", FACTORY.instance());
}
