//! Capability registry
//!
//! Each capability owns one [`CapabilityNode`], a process-wide singleton
//! reached through the capability's `node()` associated function. The node
//! assigns dense type indexes, remembers which dispatch tables have
//! attached, and replays registrations in both directions: a new type is
//! wired into every attached table, and a newly attached table is
//! back-filled with every known type.

use std::any::TypeId;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use veneer_core::TypeInfo;

use crate::table::{TableInfo, TableKey};

/// Installs one type's entry into one table, if the table belongs to an
/// operation of the wire function's capability.
///
/// Returns `true` when the key matched an operation and entries were
/// installed. Monomorphized per (capability, concrete type) pair by the
/// `capability!` macro.
pub type WireFn = fn(TableKey, u32) -> bool;

struct TypeRecord {
    type_id: TypeId,
    index: u32,
    info: &'static TypeInfo,
    wire: WireFn,
}

#[derive(Default)]
struct NodeState {
    next_index: u32,
    types: Vec<TypeRecord>,
    tables: Vec<(TableKey, &'static dyn TableInfo)>,
    bases: Vec<&'static CapabilityNode>,
    derived: Vec<&'static CapabilityNode>,
}

/// A snapshot of one registered type, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSnapshot {
    /// The registered type's name.
    pub type_name: &'static str,
    /// The dense index assigned to it under this capability.
    pub index: u32,
}

/// A snapshot of one attached table, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Name of the operation the table dispatches.
    pub operation: &'static str,
    /// Number of populated slots at snapshot time.
    pub live_entries: usize,
    /// Number of slots at snapshot time.
    pub capacity: usize,
}

/// Per-capability registry node.
///
/// Lock ordering: a node's lock is always taken before any table lock.
/// Wire functions and back-fills run while the node lock is held and only
/// ever take table locks, never another node's lock.
pub struct CapabilityNode {
    name: &'static str,
    state: RwLock<NodeState>,
}

impl CapabilityNode {
    /// A fresh node for the capability named `name`.
    pub fn new(name: &'static str) -> Self {
        CapabilityNode {
            name,
            state: RwLock::new(NodeState::default()),
        }
    }

    /// The capability's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `T` under this capability, returning its dense index.
    ///
    /// Idempotent: re-registering returns the index assigned the first
    /// time. A first registration forward-fills every attached table
    /// through `wire`.
    pub fn register_type<T: 'static>(
        &self,
        info: &'static TypeInfo,
        wire: WireFn,
    ) -> u32 {
        let type_id = TypeId::of::<T>();
        if let Some(index) = self.index_of(type_id) {
            return index;
        }

        let mut state = self.write();
        // Lost the race between the read above and taking the write lock?
        if let Some(record) = state.types.iter().find(|r| r.type_id == type_id) {
            return record.index;
        }

        let index = state.next_index;
        state.next_index += 1;
        state.types.push(TypeRecord {
            type_id,
            index,
            info,
            wire,
        });
        for (key, _) in &state.tables {
            wire(*key, index);
        }
        log::trace!(
            "capability `{}`: registered `{}` at index {index} ({} tables wired)",
            self.name,
            info.type_name,
            state.tables.len(),
        );
        index
    }

    /// Attaches a dispatch table to this node and back-fills it with every
    /// registered type. Idempotent per key.
    pub(crate) fn attach_table(&self, key: TableKey, table: &'static dyn TableInfo) {
        let mut state = self.write();
        if state.tables.iter().any(|(k, _)| *k == key) {
            return;
        }
        state.tables.push((key, table));
        for record in &state.types {
            (record.wire)(key, record.index);
        }
        log::trace!(
            "capability `{}`: attached table `{}` ({} types back-filled)",
            self.name,
            table.table_name(),
            state.types.len(),
        );
    }

    /// Records `base` as a base capability of this one (and this one as
    /// derived from `base`). Idempotent; linking a node to itself is a
    /// no-op.
    pub fn link_base(&'static self, base: &'static CapabilityNode) {
        if core::ptr::eq(self, base) {
            return;
        }
        {
            let mut state = self.write();
            if state.bases.iter().any(|b| core::ptr::eq(*b, base)) {
                return;
            }
            state.bases.push(base);
        }
        let mut base_state = base.write();
        if !base_state.derived.iter().any(|d| core::ptr::eq(*d, self)) {
            base_state.derived.push(self);
        }
        log::trace!("capability `{}`: extends `{}`", self.name, base.name);
    }

    /// The index assigned to `type_id`, if it is registered here.
    pub fn index_of(&self, type_id: TypeId) -> Option<u32> {
        let state = self.read();
        state
            .types
            .iter()
            .find(|r| r.type_id == type_id)
            .map(|r| r.index)
    }

    /// Number of types registered under this capability.
    pub fn type_count(&self) -> usize {
        self.read().types.len()
    }

    /// Number of dispatch tables attached to this capability.
    pub fn table_count(&self) -> usize {
        self.read().tables.len()
    }

    /// Snapshot of every registered type, in index order.
    pub fn known_types(&self) -> Vec<TypeSnapshot> {
        self.read()
            .types
            .iter()
            .map(|r| TypeSnapshot {
                type_name: r.info.type_name,
                index: r.index,
            })
            .collect()
    }

    /// Snapshot of every attached table.
    pub fn tables(&self) -> Vec<TableSnapshot> {
        self.read()
            .tables
            .iter()
            .map(|(_, t)| TableSnapshot {
                operation: t.table_name(),
                live_entries: t.live_entries(),
                capacity: t.capacity(),
            })
            .collect()
    }

    /// Names of the capabilities this one extends.
    pub fn base_names(&self) -> Vec<&'static str> {
        self.read().bases.iter().map(|b| b.name).collect()
    }

    /// Names of the capabilities extending this one.
    pub fn derived_names(&self) -> Vec<&'static str> {
        self.read().derived.iter().map(|d| d.name).collect()
    }
}

impl core::fmt::Debug for CapabilityNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CapabilityNode")
            .field("name", &self.name)
            .field("types", &self.type_count())
            .field("tables", &self.table_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DispatchTable, OpTable};

    fn noop_wire(_: TableKey, _: u32) -> bool {
        false
    }

    #[test]
    fn indexes_are_dense_and_stable() {
        let node = CapabilityNode::new("probe");
        let a = node.register_type::<u8>(TypeInfo::of::<u8>(), noop_wire);
        let b = node.register_type::<u16>(TypeInfo::of::<u16>(), noop_wire);
        assert_eq!((a, b), (0, 1));
        assert_eq!(node.register_type::<u8>(TypeInfo::of::<u8>(), noop_wire), 0);
        assert_eq!(node.type_count(), 2);
        assert_eq!(node.index_of(TypeId::of::<u16>()), Some(1));
        assert_eq!(node.index_of(TypeId::of::<u32>()), None);
    }

    #[test]
    fn attached_table_is_back_filled() {
        static NODE_HOLDER: std::sync::OnceLock<CapabilityNode> = std::sync::OnceLock::new();
        static TABLE: OpTable<fn() -> u32> = OpTable::new("probe-op");

        fn wire(key: TableKey, index: u32) -> bool {
            if key == TABLE.key() {
                TABLE.put(index, || 41);
                return true;
            }
            false
        }

        let node = NODE_HOLDER.get_or_init(|| CapabilityNode::new("backfill"));
        node.register_type::<u8>(TypeInfo::of::<u8>(), wire);
        // Type registered before the table attached: the lookup must see it.
        let entry = TABLE.lookup(node, 0).unwrap();
        assert_eq!(entry(), 41);

        // And a type registered afterwards is forward-filled.
        let index = node.register_type::<u16>(TypeInfo::of::<u16>(), wire);
        assert_eq!(TABLE.get(index).map(|f| f()), Some(41));
        assert_eq!(node.table_count(), 1);
    }

    #[test]
    fn base_links_are_recorded_once() {
        static BASE: std::sync::OnceLock<CapabilityNode> = std::sync::OnceLock::new();
        static DERIVED: std::sync::OnceLock<CapabilityNode> = std::sync::OnceLock::new();
        let base = BASE.get_or_init(|| CapabilityNode::new("base"));
        let derived = DERIVED.get_or_init(|| CapabilityNode::new("derived"));

        derived.link_base(base);
        derived.link_base(base);
        derived.link_base(derived);

        assert_eq!(derived.base_names(), ["base"]);
        assert_eq!(base.derived_names(), ["derived"]);
        assert!(base.base_names().is_empty());
    }
}
