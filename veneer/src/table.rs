//! Dispatch tables
//!
//! One table per operation, holding entry-point function pointers indexed
//! by the dense per-capability type index. Tables attach themselves to
//! their capability's registry node on first use, which back-fills entries
//! for every type registered before the table existed.

use std::sync::{Once, PoisonError, RwLock};

use crate::registry::CapabilityNode;

/// Identity of a dispatch table: the address of its `'static` allocation.
///
/// Registration wire functions receive a `TableKey` and compare it against
/// their operation's table to decide whether the wiring request is theirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableKey(usize);

/// Shape-agnostic view of a dispatch table, for registry bookkeeping and
/// introspection. Object-safe, unlike [`DispatchTable`].
pub trait TableInfo: Sync {
    /// Name of the operation this table dispatches.
    fn table_name(&self) -> &'static str;

    /// Number of populated slots.
    fn live_entries(&self) -> usize;

    /// Number of slots, populated or not.
    fn capacity(&self) -> usize;
}

/// A growable, write-once mapping from type index to dispatch entry.
pub trait DispatchTable: TableInfo + Sized + Sync + 'static {
    /// The entry-point function pointer type this table holds.
    type Entry: Copy + Send + Sync + 'static;

    /// This table's identity.
    #[inline]
    fn key(&'static self) -> TableKey {
        TableKey(core::ptr::from_ref(self) as *const u8 as usize)
    }

    /// Installs an entry at `index`. First write wins; later writes to the
    /// same slot are ignored.
    fn put(&self, index: u32, entry: Self::Entry);

    /// Reads the entry at `index`, if one was installed.
    fn get(&self, index: u32) -> Option<Self::Entry>;

    /// Reads the entry at `index`, attaching this table to `node` first if
    /// this is the table's first lookup.
    fn lookup(&'static self, node: &'static CapabilityNode, index: u32) -> Option<Self::Entry>;
}

/// Growth factor applied when an [`OpTable`] index lands past the end.
const GROWTH_FACTOR: usize = 2;

/// A dynamically sized dispatch table.
///
/// Slots grow geometrically (never below the requested index), so an
/// installed entry is never relocated out from under a concurrent reader:
/// reads and writes both go through the lock, and entries are plain
/// function pointers copied out on read.
pub struct OpTable<F> {
    name: &'static str,
    slots: RwLock<Vec<Option<F>>>,
    attached: Once,
}

impl<F> OpTable<F> {
    /// An empty table for the operation named `name`.
    pub const fn new(name: &'static str) -> Self {
        OpTable {
            name,
            slots: RwLock::new(Vec::new()),
            attached: Once::new(),
        }
    }
}

impl<F: Copy + Send + Sync + 'static> TableInfo for OpTable<F> {
    fn table_name(&self) -> &'static str {
        self.name
    }

    fn live_entries(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn capacity(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.len()
    }
}

impl<F: Copy + Send + Sync + 'static> DispatchTable for OpTable<F> {
    type Entry = F;

    fn put(&self, index: u32, entry: F) {
        let index = index as usize;
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if index >= slots.len() {
            let target = usize::max(index + 1, slots.len() * GROWTH_FACTOR);
            slots.resize_with(target, || None);
        }
        let slot = &mut slots[index];
        if slot.is_none() {
            *slot = Some(entry);
        }
    }

    fn get(&self, index: u32) -> Option<F> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(index as usize).copied().flatten()
    }

    fn lookup(&'static self, node: &'static CapabilityNode, index: u32) -> Option<F> {
        self.attached
            .call_once(|| node.attach_table(self.key(), self));
        self.get(index)
    }
}

/// A fixed-capacity dispatch table.
///
/// Trades growth for a bounded footprint. Installing an entry past `N` is
/// a configuration error and panics; looking one up merely misses.
pub struct StaticOpTable<F, const N: usize> {
    name: &'static str,
    slots: RwLock<[Option<F>; N]>,
    attached: Once,
}

impl<F: Copy, const N: usize> StaticOpTable<F, N> {
    /// An empty table for the operation named `name`.
    pub const fn new(name: &'static str) -> Self {
        StaticOpTable {
            name,
            slots: RwLock::new([None; N]),
            attached: Once::new(),
        }
    }
}

impl<F: Copy + Send + Sync + 'static, const N: usize> TableInfo for StaticOpTable<F, N> {
    fn table_name(&self) -> &'static str {
        self.name
    }

    fn live_entries(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<F: Copy + Send + Sync + 'static, const N: usize> DispatchTable for StaticOpTable<F, N> {
    type Entry = F;

    fn put(&self, index: u32, entry: F) {
        let index = index as usize;
        if index >= N {
            panic!(
                "static dispatch table `{}` has capacity {N}, cannot install entry at index {index}",
                self.name,
            );
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = &mut slots[index];
        if slot.is_none() {
            *slot = Some(entry);
        }
    }

    fn get(&self, index: u32) -> Option<F> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(index as usize).copied().flatten()
    }

    fn lookup(&'static self, node: &'static CapabilityNode, index: u32) -> Option<F> {
        self.attached
            .call_once(|| node.attach_table(self.key(), self));
        self.get(index)
    }
}
