use core::any::TypeId;

use veneer::{Capability, ValueProxy, ViewProxy, capability};
use veneer_testhelpers::setup;

capability! {
    /// Base capability.
    pub trait Greeter {
        fn greet(&self, name: &str) -> String;
    }
}

capability! {
    /// Derived capability; every `Loud` type is also a `Greeter`.
    pub trait Loud: Greeter {
        fn shout(&self) -> String;
    }
}

#[derive(Clone)]
struct Megaphone;

impl Greeter for Megaphone {
    fn greet(&self, name: &str) -> String {
        format!("HEY {name}")
    }
}

impl Loud for Megaphone {
    fn shout(&self) -> String {
        String::from("AAAH")
    }
}

#[test]
fn derived_registration_covers_the_base() {
    setup();
    let proxy = ValueProxy::<dyn Loud>::new(Megaphone);
    assert_eq!(proxy.shout(), "AAAH");
    // Base operation, dispatched straight off the derived proxy.
    assert_eq!(proxy.greet("you"), "HEY you");

    let base = <dyn Greeter as Capability>::node();
    assert!(base.index_of(TypeId::of::<Megaphone>()).is_some());
    assert_eq!(<dyn Loud as Capability>::node().base_names(), ["Greeter"]);
    assert_eq!(base.derived_names(), ["Loud"]);
}

#[test]
fn upcast_rebinds_the_index_and_keeps_the_value() {
    setup();
    let proxy = ValueProxy::<dyn Loud>::new(Megaphone).upcast::<dyn Greeter>();
    assert_eq!(proxy.greet("base"), "HEY base");
}

#[test]
fn views_upcast_too() {
    setup();
    let value = Megaphone;
    let view = ViewProxy::<dyn Loud>::borrowing(&value);
    let base_view = view.upcast::<dyn Greeter>();
    assert_eq!(base_view.greet("view"), "HEY view");
}

#[test]
fn upcast_to_self_is_the_identity() {
    setup();
    let proxy = ValueProxy::<dyn Loud>::new(Megaphone);
    let index = proxy.type_index();
    let same = proxy.upcast::<dyn Loud>();
    assert_eq!(same.type_index(), index);
    assert_eq!(same.shout(), "AAAH");
}
