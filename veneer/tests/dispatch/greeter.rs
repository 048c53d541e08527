use core::sync::atomic::{AtomicUsize, Ordering};

use veneer::{
    DispatchError, SharedProxy, UniqueProxy, ValueProxy, ViewProxy, capability,
};
use veneer_testhelpers::setup;

capability! {
    /// Greets people.
    pub trait Greeter {
        fn greet(&self, name: &str) -> String;
    }
}

#[derive(Clone)]
struct Uppercase;

impl Greeter for Uppercase {
    fn greet(&self, name: &str) -> String {
        name.to_uppercase()
    }
}

#[derive(Clone)]
struct Politely(String);

impl Greeter for Politely {
    fn greet(&self, name: &str) -> String {
        format!("{} {name}", self.0)
    }
}

#[test]
fn uppercase_greets_world() {
    setup();
    let proxy = UniqueProxy::<dyn Greeter>::new(Uppercase);
    assert_eq!(proxy.greet("world"), "WORLD");
}

#[test]
fn one_capability_erases_many_types() {
    setup();
    let a = ValueProxy::<dyn Greeter>::new(Uppercase);
    let b = ValueProxy::<dyn Greeter>::new(Politely(String::from("hello,")));
    assert_eq!(a.greet("world"), "WORLD");
    assert_eq!(b.greet("world"), "hello, world");
    assert_ne!(a.type_index(), b.type_index());
}

#[test]
fn dispatch_by_tag_matches_the_generated_method() {
    setup();
    let proxy = UniqueProxy::<dyn Greeter>::new(Uppercase);
    let out = proxy
        .dispatch::<greet, _>(|entry, recv| unsafe { entry(recv, "tag") })
        .unwrap();
    assert_eq!(out, "TAG");
}

#[test]
fn dispatch_unchecked_skips_the_empty_check() {
    setup();
    let proxy = UniqueProxy::<dyn Greeter>::new(Uppercase);
    let out =
        unsafe { proxy.dispatch_unchecked::<greet, _>(|entry, recv| unsafe { entry(recv, "raw") }) };
    assert_eq!(out, "RAW");
}

#[test]
fn empty_proxy_fails_with_empty_proxy() {
    setup();
    let proxy = UniqueProxy::<dyn Greeter>::empty();
    assert!(proxy.is_empty());
    assert_eq!(proxy.type_index(), None);
    let err = proxy.dispatch::<greet, _>(|entry, recv| unsafe { entry(recv, "x") });
    assert!(matches!(err, Err(DispatchError::EmptyProxy { .. })));
}

#[test]
fn view_proxies_borrow_without_owning() {
    setup();
    let value = Politely(String::from("hi,"));
    let view = ViewProxy::<dyn Greeter>::borrowing(&value);
    assert_eq!(view.greet("you"), "hi, you");

    let owner = ValueProxy::<dyn Greeter>::new(Uppercase);
    let reborrow = owner.as_view();
    assert_eq!(reborrow.greet("view"), "VIEW");
    // The view is `Copy`; the owner is untouched.
    let again = reborrow;
    assert_eq!(again.greet("again"), "AGAIN");
    assert_eq!(reborrow.greet("copied"), "COPIED");
    assert_eq!(owner.greet("still"), "STILL");
}

#[test]
fn via_dispatches_through_the_pointee() {
    setup();
    let proxy = UniqueProxy::<dyn Greeter>::via(Box::new(Uppercase));
    assert_eq!(proxy.greet("ptr"), "PTR");

    let shared = std::rc::Rc::new(Politely(String::from("yo,")));
    let proxy = UniqueProxy::<dyn Greeter>::via(std::rc::Rc::clone(&shared));
    assert_eq!(proxy.greet("rc"), "yo, rc");
    // The Rc itself was erased, not its target.
    assert_eq!(std::rc::Rc::strong_count(&shared), 2);
}

#[test]
fn shared_proxy_clones_share_one_value() {
    setup();
    let a = SharedProxy::<dyn Greeter>::new(Uppercase);
    let b = a.clone();
    assert_eq!(b.greet("x"), "X");
    assert_eq!(a.storage().strong_count(), 2);
    drop(b);
    assert_eq!(a.storage().strong_count(), 1);
}

#[test]
fn take_moves_the_value_to_a_fresh_proxy() {
    setup();
    let mut a = UniqueProxy::<dyn Greeter>::new(Uppercase);
    let b = a.take();
    assert!(a.is_empty());
    assert_eq!(b.greet("moved"), "MOVED");
}

#[test]
fn dispatch_owned_destroys_the_value_after_the_call() {
    setup();
    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Greeter for Counted {
        fn greet(&self, name: &str) -> String {
            format!("bye {name}")
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::Relaxed);
        }
    }

    let proxy = UniqueProxy::<dyn Greeter>::new(Counted);
    let out = proxy
        .dispatch_owned::<greet, _>(|entry, recv| unsafe { entry(recv, "now") })
        .unwrap();
    assert_eq!(out, "bye now");
    assert_eq!(DROPS.load(Ordering::Relaxed), 1);
}

#[test]
fn debug_names_the_capability_and_type() {
    setup();
    let proxy = UniqueProxy::<dyn Greeter>::new(Uppercase);
    let rendered = format!("{proxy:?}");
    assert!(rendered.contains("Greeter"));
    assert!(rendered.contains("Uppercase"));
}
