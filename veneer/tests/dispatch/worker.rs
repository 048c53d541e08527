use veneer::{Capability, DispatchError, SharedProxy, UniqueProxy, capability};
use veneer_testhelpers::setup;

capability! {
    #[dispatch(static_capacity = 8)]
    /// A task runner with bounded dispatch tables.
    pub trait Worker {
        fn label(&self) -> String;
        fn process(&mut self, amount: u32) -> u32;
    }
}

struct Fast {
    total: u32,
}

impl Worker for Fast {
    fn label(&self) -> String {
        String::from("fast")
    }

    fn process(&mut self, amount: u32) -> u32 {
        self.total += amount * 2;
        self.total
    }
}

struct Slow {
    total: u32,
}

impl Worker for Slow {
    fn label(&self) -> String {
        String::from("slow")
    }

    fn process(&mut self, amount: u32) -> u32 {
        self.total += amount;
        self.total
    }
}

#[test]
fn two_workers_mean_two_live_entries_per_table() {
    setup();
    let mut fast = UniqueProxy::<dyn Worker>::new(Fast { total: 0 });
    let mut slow = UniqueProxy::<dyn Worker>::new(Slow { total: 0 });

    assert_eq!(fast.process(10), 20);
    assert_eq!(fast.process(1), 22);
    assert_eq!(slow.process(10), 10);
    assert_eq!(fast.label(), "fast");
    assert_eq!(slow.label(), "slow");

    let node = <dyn Worker as Capability>::node();
    assert_eq!(node.type_count(), 2);
    let tables = node.tables();
    assert_eq!(tables.len(), 2);
    for table in tables {
        assert_eq!(table.live_entries, 2);
        assert_eq!(table.capacity, 8);
    }
}

#[test]
fn mutable_dispatch_through_shared_storage_is_refused() {
    setup();
    let mut proxy = SharedProxy::<dyn Worker>::new(Fast { total: 0 });
    assert_eq!(proxy.label(), "fast");
    let err = proxy.dispatch_mut::<process, _>(|entry, recv| unsafe { entry(recv, 1) });
    assert!(matches!(err, Err(DispatchError::Immutable { .. })));
}

capability! {
    /// A counter whose bump support is optional at the dispatch level.
    pub trait Counter {
        fn value(&self) -> u32;
        #[dispatch(or_default)]
        fn bump(&mut self) -> u32;
    }
}

struct Clicks(u32);

impl Counter for Clicks {
    fn value(&self) -> u32 {
        self.0
    }

    fn bump(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

#[test]
fn deref_pointer_wires_shared_operations_only() {
    setup();
    let mut proxy = UniqueProxy::<dyn Counter>::via(Box::new(Clicks(3)));
    assert_eq!(proxy.value(), 3);
    // `Box` went in through `via`, so the mutable slot is empty and the
    // `or_default` opt-in substitutes the default.
    assert_eq!(proxy.bump(), 0);
    assert_eq!(proxy.value(), 3);
}

// A second counter type, so this pointer registration cannot collide
// with the `Box<Clicks>` the `via` test wires (first registration of a
// pointer type wins process-wide).
struct Taps(u32);

impl Counter for Taps {
    fn value(&self) -> u32 {
        self.0
    }

    fn bump(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

#[test]
fn deref_mut_pointer_wires_everything() {
    setup();
    let mut proxy = UniqueProxy::<dyn Counter>::via_mut(Box::new(Taps(3)));
    assert_eq!(proxy.bump(), 4);
    assert_eq!(proxy.value(), 4);
}

capability! {
    /// Like `Counter`, but without the `or_default` escape hatch.
    pub trait Resettable {
        fn peek(&self) -> u32;
        fn clear(&mut self);
    }
}

impl Resettable for Clicks {
    fn peek(&self) -> u32 {
        self.0
    }

    fn clear(&mut self) {
        self.0 = 0;
    }
}

#[test]
fn unregistered_without_opt_in_is_an_error() {
    setup();
    let mut proxy = UniqueProxy::<dyn Resettable>::via(Box::new(Clicks(7)));
    assert_eq!(proxy.peek(), 7);
    let err = proxy.dispatch_mut::<clear, _>(|entry, recv| unsafe { entry(recv) });
    assert!(matches!(err, Err(DispatchError::Unregistered { .. })));
}
