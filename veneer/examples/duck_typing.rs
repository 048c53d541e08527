//! Heterogeneous dispatch without trait objects: every value below is
//! erased behind the `Quacks` capability, and calls go through external
//! per-operation tables instead of embedded vtables.

use veneer::{Capability, SmallProxy, capability};

capability! {
    /// Things that make a noise.
    pub trait Quacks {
        fn quack(&self) -> String;
    }
}

#[derive(Clone)]
struct Duck;

impl Quacks for Duck {
    fn quack(&self) -> String {
        String::from("quack")
    }
}

#[derive(Clone)]
struct Robot {
    charge: u8,
}

impl Quacks for Robot {
    fn quack(&self) -> String {
        format!("QUACK.EXE ({}%)", self.charge)
    }
}

#[derive(Clone)]
struct Chorus {
    voices: usize,
}

impl Quacks for Chorus {
    fn quack(&self) -> String {
        vec!["quack"; self.voices].join(" ")
    }
}

fn main() {
    let pond: Vec<SmallProxy<dyn Quacks>> = vec![
        SmallProxy::new(Duck),
        SmallProxy::new(Robot { charge: 87 }),
        SmallProxy::new(Chorus { voices: 3 }),
    ];

    for proxy in &pond {
        println!("{:>24}: {}", proxy.type_name(), proxy.quack());
    }

    let node = <dyn Quacks as Capability>::node();
    println!(
        "\ncapability `{}`: {} types, {} tables",
        node.name(),
        node.type_count(),
        node.table_count(),
    );
}
