use veneer::{Accepts, Capability, SharedProxy, UniqueProxy, capability};
use veneer_testhelpers::setup;

capability! {
    /// Answers with a fixed number.
    pub trait Pingable {
        fn ping(&self) -> u32;
    }
}

macro_rules! pinger {
    ($name:ident, $answer:literal) => {
        struct $name;

        impl Pingable for $name {
            fn ping(&self) -> u32 {
                $answer
            }
        }
    };
}

pinger!(P1, 1);
pinger!(P2, 2);
pinger!(P3, 3);
pinger!(P4, 4);

#[test]
fn late_registrations_reach_already_attached_tables() {
    setup();
    let a = UniqueProxy::<dyn Pingable>::new(P1);
    // First dispatch attaches the table and back-fills it.
    assert_eq!(a.ping(), 1);
    // This registration happens after the table attached; it must be
    // forward-filled.
    let b = UniqueProxy::<dyn Pingable>::new(P2);
    assert_eq!(b.ping(), 2);
    assert_eq!(a.ping(), 1);
}

#[test]
fn registration_races_dispatch() {
    setup();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    let proxy = UniqueProxy::<dyn Pingable>::new(P3);
                    assert_eq!(proxy.ping(), 3);
                }
            });
            s.spawn(|| {
                for _ in 0..100 {
                    let proxy = SharedProxy::<dyn Pingable>::new(P4);
                    assert_eq!(proxy.clone().ping(), 4);
                }
            });
        }
    });
}

capability! {
    /// Capability reserved for the dense-index race below; nothing else
    /// in this process registers under it.
    trait Racy {
        fn id(&self) -> u32;
    }
}

macro_rules! racer {
    ($name:ident, $id:literal) => {
        struct $name;

        impl Racy for $name {
            fn id(&self) -> u32 {
                $id
            }
        }
    };
}

racer!(R0, 0);
racer!(R1, 1);
racer!(R2, 2);
racer!(R3, 3);
racer!(R4, 4);
racer!(R5, 5);
racer!(R6, 6);
racer!(R7, 7);

#[test]
fn concurrent_registration_assigns_dense_unique_indexes() {
    setup();
    let mut indexes = std::thread::scope(|s| {
        let handles = vec![
            s.spawn(|| <dyn Racy as Accepts<R0>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R1>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R2>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R3>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R4>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R5>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R6>>::register()),
            s.spawn(|| <dyn Racy as Accepts<R7>>::register()),
        ];
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    indexes.sort_unstable();
    indexes.dedup();
    assert_eq!(indexes, [0, 1, 2, 3, 4, 5, 6, 7]);

    let node = <dyn Racy as Capability>::node();
    assert_eq!(node.type_count(), 8);
    // Re-registering is idempotent.
    assert!(<dyn Racy as Accepts<R0>>::register() < 8);
}

#[test]
fn introspection_reports_registered_types() {
    setup();
    let proxy = UniqueProxy::<dyn Pingable>::new(P1);
    assert_eq!(proxy.ping(), 1);

    let node = <dyn Pingable as Capability>::node();
    let types = node.known_types();
    assert!(types.iter().any(|t| t.type_name.ends_with("P1")));
    let tables = node.tables();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].operation, "ping");
    assert!(tables[0].live_entries >= 1);
}
