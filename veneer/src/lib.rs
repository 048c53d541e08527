#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod capability;
mod error;
mod proxy;
mod registry;
mod semantics;
mod storage;
mod table;

pub use capability::{Accepts, AcceptsVia, AcceptsViaMut, Capability, Extends, Operation};
pub use error::{DispatchError, dispatch_failed};
pub use proxy::{
    InlineProxy, LocalSharedProxy, MutViewProxy, Proxy, SharedProxy, SlotProxy, SmallProxy,
    UniqueProxy, ValueProxy, ViewProxy,
};
pub use registry::{CapabilityNode, TableSnapshot, TypeSnapshot, WireFn};
pub use semantics::{Receiver, ReceiverKind};
pub use storage::{
    BorrowedMutStorage, BorrowedStorage, BoxStorage, ChainStorage, ExclusiveStorage,
    InlineStorage, LocalCount, RefCount, SharedStorage, SlotStorage, SmallStorage, Storage,
    StoreValue, SyncCount, TryStoreValue, ValueStorage,
};
pub use table::{DispatchTable, OpTable, StaticOpTable, TableInfo, TableKey};

pub use veneer_core::{ConstTypeId, PtrConst, PtrMut, PtrUninit, TypeInfo, TypeOps};

/// Implementation details the `capability!` macro expands to. Not part of
/// the public API; do not use directly.
#[doc(hidden)]
pub mod __private {
    pub use std::sync::{Once, OnceLock};
}
