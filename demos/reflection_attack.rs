//! Two attempts at a second instance: one against a double-checked registry,
//! one against a sealed singleton.

use sole_instance::{singleton_enum, DoubleChecked, Seal, Sealed, Sole};

struct Printer {
   id: u32,
}

impl Printer {
   // Reachable by anyone in this module, exactly like a reflected constructor.
   fn new() -> Printer {
      Printer { id: 1 }
   }
}

static PRINTER: DoubleChecked<Printer> = DoubleChecked::new(|| Ok(Printer::new()));

struct Spooler {
   id: u32,
}

impl Sealed for Spooler {
   type Error = std::convert::Infallible;

   fn holder() -> &'static Sole<Self> {
      static SPOOLER: Sole<Spooler> = Sole::new();
      &SPOOLER
   }

   fn construct(_seal: Seal<Self>) -> Result<Self, Self::Error> {
      Ok(Spooler { id: 2 })
   }
}

singleton_enum! {
   enum SpoolerSingleton { INSTANCE } => Spooler
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .init();

   let s1 = PRINTER.instance();
   let s2 = PRINTER.instance();
   let s3 = Printer::new();
   println!("instance one {:p} (id {})", s1, s1.id);
   println!("instance two {:p} (id {})", s2, s2.id);
   println!("instance three, bypassed {:p} (id {})", &s3, s3.id);
   println!("normal access, same instance: {}", std::ptr::eq(s1, s2));
   println!("after bypass, same instance: {}", std::ptr::eq(s1, &s3));

   let e1 = SpoolerSingleton::INSTANCE.get().unwrap();
   let e2 = SpoolerSingleton::INSTANCE.get().unwrap();
   println!("normal access, same instance: {} (id {})", std::ptr::eq(e1, e2), e1.id);
   // `Spooler::construct` needs a seal, and seals cannot be minted out here.
   // The remaining route is a second holder.
   println!("constructing through a second holder...");
   let rogue: Sole<Spooler> = Sole::new();
   match rogue.get_instance() {
      Ok(e3) => println!("second instance created (id {})", e3.id),
      Err(err) => println!("rejected: {err}"),
   }
   println!(
      "accessor still returns the original: {}",
      std::ptr::eq(e1, SpoolerSingleton::INSTANCE.get().unwrap())
   );
}
