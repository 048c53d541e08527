use static_assertions::{assert_impl_all, assert_not_impl_any};
use veneer::{
    ChainStorage, InlineProxy, LocalCount, LocalSharedProxy, MutViewProxy, SharedStorage,
    SlotProxy, SmallProxy, SyncCount, UniqueProxy, ValueProxy, capability,
};
use veneer_testhelpers::setup;

// The atomic flavor may cross threads; the local one must not.
assert_impl_all!(SharedStorage<SyncCount>: Send, Sync);
assert_not_impl_any!(SharedStorage<LocalCount>: Send, Sync);

// Unique ownership is move-only.
assert_not_impl_any!(veneer::BoxStorage: Clone);
assert_not_impl_any!(UniqueProxy<dyn Tally>: Clone);

capability! {
    /// A running total.
    pub trait Tally {
        fn total(&self) -> u64;
        fn add(&mut self, n: u64);
    }
}

#[derive(Clone)]
struct Ledger {
    total: u64,
}

impl Tally for Ledger {
    fn total(&self) -> u64 {
        self.total
    }

    fn add(&mut self, n: u64) {
        self.total += n;
    }
}

#[derive(Clone)]
struct BigLedger {
    total: u64,
    _history: [u64; 32],
}

impl Tally for BigLedger {
    fn total(&self) -> u64 {
        self.total
    }

    fn add(&mut self, n: u64) {
        self.total += n;
    }
}

#[test]
fn value_proxy_clones_are_independent() {
    setup();
    let mut a = ValueProxy::<dyn Tally>::new(Ledger { total: 1 });
    let b = a.clone();
    a.add(5);
    assert_eq!(a.total(), 6);
    assert_eq!(b.total(), 1);
}

#[test]
fn mut_view_writes_through_to_the_original() {
    setup();
    let mut ledger = Ledger { total: 0 };
    {
        let mut view = MutViewProxy::<dyn Tally>::borrowing_mut(&mut ledger);
        view.add(9);
        assert_eq!(view.total(), 9);
    }
    assert_eq!(ledger.total, 9);
}

#[test]
fn inline_proxy_dispatches_like_any_other() {
    setup();
    let mut proxy = InlineProxy::<dyn Tally>::new(Ledger { total: 2 });
    proxy.add(2);
    assert_eq!(proxy.total(), 4);
    let copy = proxy.clone();
    proxy.add(1);
    assert_eq!(copy.total(), 4);
}

#[test]
fn small_proxy_keeps_small_values_inline_and_spills_big_ones() {
    setup();
    let small = SmallProxy::<dyn Tally>::new(Ledger { total: 3 });
    assert!(matches!(small.storage(), ChainStorage::First(_)));
    assert_eq!(small.total(), 3);

    let big = SmallProxy::<dyn Tally>::new(BigLedger {
        total: 4,
        _history: [0; 32],
    });
    assert!(matches!(big.storage(), ChainStorage::Second(_)));
    assert_eq!(big.total(), 4);
}

#[test]
fn try_new_hands_the_value_back_on_refusal() {
    setup();
    let refused = InlineProxy::<dyn Tally, [usize; 2]>::try_new(BigLedger {
        total: 9,
        _history: [0; 32],
    });
    let Err(value) = refused else {
        panic!("a 33-word value fit a 2-word buffer");
    };
    assert_eq!(value.total, 9);

    let accepted = InlineProxy::<dyn Tally, [usize; 2]>::try_new(Ledger { total: 1 });
    assert!(accepted.is_ok());
}

#[test]
fn slot_proxy_recovers_the_typed_value() {
    setup();
    let mut proxy = SlotProxy::<dyn Tally, Ledger>::new(Ledger { total: 1 });
    proxy.add(2);
    let ledger = proxy.into_storage().into_inner().unwrap();
    assert_eq!(ledger.total, 3);
}

#[test]
fn local_shared_proxy_accepts_non_send_values() {
    setup();
    use std::rc::Rc;

    #[derive(Clone)]
    struct RcLedger(Rc<Ledger>);

    impl Tally for RcLedger {
        fn total(&self) -> u64 {
            self.0.total
        }

        fn add(&mut self, _n: u64) {}
    }

    let inner = Rc::new(Ledger { total: 8 });
    let a = LocalSharedProxy::<dyn Tally>::new(RcLedger(Rc::clone(&inner)));
    let b = a.clone();
    assert_eq!(a.storage().strong_count(), 2);
    assert_eq!(b.total(), 8);
    drop(a);
    drop(b);
    // Both proxy references are gone; only our local Rc remains.
    assert_eq!(Rc::strong_count(&inner), 1);
}

#[test]
fn reset_empties_any_policy() {
    setup();
    let mut proxy = UniqueProxy::<dyn Tally>::new(Ledger { total: 1 });
    assert!(!proxy.is_empty());
    proxy.reset();
    assert!(proxy.is_empty());
    assert_eq!(proxy.type_name(), "<empty>");
}
