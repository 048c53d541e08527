//! Proxy composition
//!
//! A [`Proxy`] pairs a capability with a storage policy. The capability
//! fixes *what* can be invoked, the storage fixes *how* the value is
//! owned; the only per-proxy dispatch state is the storage plus one
//! cached type index.

use core::any::TypeId;
use core::marker::PhantomData;

use crate::capability::{Accepts, AcceptsVia, AcceptsViaMut, Capability, Extends, Operation};
use crate::error::{DispatchError, dispatch_failed};
use crate::semantics::Receiver;
use crate::storage::{
    BorrowedMutStorage, BorrowedStorage, ExclusiveStorage, InlineStorage, LocalCount,
    SharedStorage, SlotStorage, SmallStorage, Storage, StoreValue, SyncCount, TryStoreValue,
};
use crate::storage::{BoxStorage, ValueStorage};
use crate::table::DispatchTable;

/// Index value carried by proxies whose index could not be resolved (an
/// upcast of a type somehow unknown to the target capability). No table
/// ever has an entry there, so dispatch reports `Unregistered` instead
/// of calling a stranger's entry point.
const UNRESOLVED: u32 = u32::MAX;

/// An erased value usable through capability `C`, owned per storage
/// policy `S`.
pub struct Proxy<C: ?Sized, S> {
    storage: S,
    index: u32,
    _capability: PhantomData<fn(&C)>,
}

/// Heap-owning proxy with value semantics (`Clone` clones the value).
pub type ValueProxy<C> = Proxy<C, ValueStorage>;

/// Heap-owning, move-only proxy.
pub type UniqueProxy<C> = Proxy<C, BoxStorage>;

/// Shared-ownership proxy with an atomic reference count.
pub type SharedProxy<C> = Proxy<C, SharedStorage<SyncCount>>;

/// Shared-ownership proxy with a single-threaded reference count.
pub type LocalSharedProxy<C> = Proxy<C, SharedStorage<LocalCount>>;

/// Non-owning proxy over a shared borrow.
pub type ViewProxy<'a, C> = Proxy<C, BorrowedStorage<'a>>;

/// Non-owning proxy over an exclusive borrow.
pub type MutViewProxy<'a, C> = Proxy<C, BorrowedMutStorage<'a>>;

/// Allocation-free proxy; the value must fit `Space`.
pub type InlineProxy<C, Space = [usize; 3]> = Proxy<C, InlineStorage<Space>>;

/// Small-buffer-optimized proxy: inline when the value fits `Space`,
/// heap otherwise.
pub type SmallProxy<C, Space = [usize; 3]> = Proxy<C, SmallStorage<Space>>;

/// Proxy over a statically known type, dispatching like any other.
pub type SlotProxy<C, T> = Proxy<C, SlotStorage<T>>;

impl<C: Capability + ?Sized, S: Storage> Proxy<C, S> {
    fn assemble(storage: S, index: u32) -> Self {
        Proxy {
            storage,
            index,
            _capability: PhantomData,
        }
    }

    /// A proxy holding nothing. Dispatch fails with `EmptyProxy`.
    pub fn empty() -> Self {
        Self::assemble(S::empty(), UNRESOLVED)
    }

    /// Erases `value` behind capability `C`.
    ///
    /// Registers `T` under `C` (and its bases) on first use.
    pub fn new<T: 'static>(value: T) -> Self
    where
        C: Accepts<T>,
        S: StoreValue<T>,
    {
        let index = <C as Accepts<T>>::register();
        Self::assemble(S::store(value), index)
    }

    /// Like [`Proxy::new`], but hands the value back when the storage
    /// policy refuses it.
    pub fn try_new<T: 'static>(value: T) -> Result<Self, T>
    where
        C: Accepts<T>,
        S: TryStoreValue<T>,
    {
        // Registration is idempotent and harmless if storage then refuses.
        let index = <C as Accepts<T>>::register();
        Ok(Self::assemble(S::try_store(value)?, index))
    }

    /// Erases a pointer, dispatching on its `Deref` target.
    ///
    /// Only shared-receiver operations are wired; mutable ones report
    /// `Unregistered`. Use [`Proxy::via_mut`] for a `DerefMut` pointer.
    pub fn via<P: 'static>(pointer: P) -> Self
    where
        C: AcceptsVia<P>,
        S: StoreValue<P>,
    {
        let index = <C as AcceptsVia<P>>::register_via();
        Self::assemble(S::store(pointer), index)
    }

    /// Erases a `DerefMut` pointer, dispatching on its target with both
    /// shared and mutable operations wired.
    pub fn via_mut<P: 'static>(pointer: P) -> Self
    where
        C: AcceptsViaMut<P>,
        S: StoreValue<P>,
    {
        let index = <C as AcceptsViaMut<P>>::register_via_mut();
        Self::assemble(S::store(pointer), index)
    }

    /// Whether the proxy currently holds a value.
    pub fn is_empty(&self) -> bool {
        self.storage.type_info().is_none()
    }

    /// Descriptor of the stored value's concrete type.
    pub fn type_info(&self) -> Option<&'static veneer_core::TypeInfo> {
        self.storage.type_info()
    }

    /// Name of the stored value's concrete type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.storage
            .type_info()
            .map(|info| info.type_name)
            .unwrap_or("<empty>")
    }

    /// The stored type's dense index under `C`, when non-empty.
    pub fn type_index(&self) -> Option<u32> {
        (!self.is_empty()).then_some(self.index)
    }

    /// The storage policy, for policy-specific accessors
    /// (`SharedStorage::strong_count`, say).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Unwraps the storage policy. Useful with [`SlotStorage`], whose
    /// `into_inner` recovers the typed value.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Destroys the stored value (or releases the reference), leaving
    /// the proxy empty.
    pub fn reset(&mut self) {
        self.storage.reset();
    }

    /// Moves the stored value into a fresh proxy, leaving this one
    /// empty.
    pub fn take(&mut self) -> Self {
        Proxy {
            storage: self.storage.take(),
            index: self.index,
            _capability: PhantomData,
        }
    }

    /// Reborrows as a non-owning proxy of the same capability.
    pub fn as_view(&self) -> ViewProxy<'_, C> {
        let storage = match (self.storage.as_ptr(), self.storage.type_info()) {
            (Some(ptr), Some(info)) => BorrowedStorage::from_raw_parts(ptr, info),
            _ => BorrowedStorage::empty(),
        };
        Proxy {
            storage,
            index: self.index,
            _capability: PhantomData,
        }
    }

    /// Converts into a proxy of a base capability, keeping the storage.
    ///
    /// The cached index is re-resolved against the base capability's
    /// registry; the registration protocol guarantees the type is known
    /// there.
    pub fn upcast<B>(self) -> Proxy<B, S>
    where
        B: Capability + ?Sized,
        C: Extends<B>,
    {
        let index = match self.storage.type_info() {
            Some(info) => B::node().index_of(info.id.get()).unwrap_or(UNRESOLVED),
            None => UNRESOLVED,
        };
        Proxy {
            storage: self.storage,
            index,
            _capability: PhantomData,
        }
    }

    /// Resolves the stored type's index under capability `B`: the cached
    /// index when `B` is `C`, a registry lookup otherwise.
    fn resolved_index<B>(&self) -> Option<u32>
    where
        B: Capability + ?Sized,
        C: Extends<B>,
    {
        if TypeId::of::<B>() == TypeId::of::<C>() {
            return Some(self.index);
        }
        let info = self.storage.type_info()?;
        B::node().index_of(info.id.get())
    }

    /// Invokes operation `O` with a shared receiver.
    ///
    /// `call` receives the table entry and the receiver; the generated
    /// capability methods pass a closure that applies the operation's
    /// arguments. `O` may belong to `C` or to any capability `C`
    /// extends.
    pub fn dispatch<'p, O, R>(
        &'p self,
        call: impl FnOnce(O::Entry, Receiver<'p>) -> R,
    ) -> Result<R, DispatchError>
    where
        O: Operation,
        C: Extends<O::Cap>,
    {
        let ptr = self.storage.as_ptr().ok_or(DispatchError::EmptyProxy {
            capability: <O::Cap as Capability>::NAME,
            operation: O::NAME,
        })?;
        let entry = self.entry_for::<O>()?;
        Ok(call(entry, Receiver::Ref(ptr)))
    }

    /// Invokes operation `O` with an exclusive receiver.
    ///
    /// Fails with `Immutable` on storage policies that only grant shared
    /// access.
    pub fn dispatch_mut<'p, O, R>(
        &'p mut self,
        call: impl FnOnce(O::Entry, Receiver<'p>) -> R,
    ) -> Result<R, DispatchError>
    where
        O: Operation,
        C: Extends<O::Cap>,
    {
        if self.is_empty() {
            return Err(DispatchError::EmptyProxy {
                capability: <O::Cap as Capability>::NAME,
                operation: O::NAME,
            });
        }
        let entry = self.entry_for::<O>()?;
        let type_name = self.type_name();
        let Some(ptr) = self.storage.as_ptr_mut() else {
            return Err(DispatchError::Immutable {
                capability: <O::Cap as Capability>::NAME,
                operation: O::NAME,
                type_name,
            });
        };
        Ok(call(entry, Receiver::Mut(ptr)))
    }

    /// Invokes operation `O` with an owned receiver, consuming the proxy
    /// and destroying the value after the call returns.
    pub fn dispatch_owned<O, R>(
        mut self,
        call: impl for<'r> FnOnce(O::Entry, Receiver<'r>) -> R,
    ) -> Result<R, DispatchError>
    where
        O: Operation,
        C: Extends<O::Cap>,
        S: ExclusiveStorage,
    {
        if self.is_empty() {
            return Err(DispatchError::EmptyProxy {
                capability: <O::Cap as Capability>::NAME,
                operation: O::NAME,
            });
        }
        let entry = self.entry_for::<O>()?;
        let type_name = self.type_name();
        let Some(ptr) = self.storage.as_ptr_mut() else {
            return Err(DispatchError::Immutable {
                capability: <O::Cap as Capability>::NAME,
                operation: O::NAME,
                type_name,
            });
        };
        let out = call(entry, Receiver::Owned(ptr));
        self.storage.reset();
        Ok(out)
    }

    /// Invokes operation `O` with a shared receiver, skipping the empty
    /// check.
    ///
    /// An unregistered operation still fails fast (it panics rather than
    /// returning an error).
    ///
    /// # Safety
    ///
    /// The proxy must hold a value.
    pub unsafe fn dispatch_unchecked<'p, O, R>(
        &'p self,
        call: impl FnOnce(O::Entry, Receiver<'p>) -> R,
    ) -> R
    where
        O: Operation,
        C: Extends<O::Cap>,
    {
        let ptr = unsafe { self.storage.as_ptr().unwrap_unchecked() };
        let entry = match self.entry_for::<O>() {
            Ok(entry) => entry,
            Err(err) => dispatch_failed(err),
        };
        call(entry, Receiver::Ref(ptr))
    }

    fn entry_for<O>(&self) -> Result<O::Entry, DispatchError>
    where
        O: Operation,
        C: Extends<O::Cap>,
    {
        let unregistered = || DispatchError::Unregistered {
            capability: <O::Cap as Capability>::NAME,
            operation: O::NAME,
            type_name: self.type_name(),
        };
        let index = self.resolved_index::<O::Cap>().ok_or_else(unregistered)?;
        O::table()
            .lookup(<O::Cap as Capability>::node(), index)
            .ok_or_else(unregistered)
    }
}

impl<'a, C: Capability + ?Sized> ViewProxy<'a, C> {
    /// Borrows `value` behind capability `C` without taking ownership.
    pub fn borrowing<T: 'static>(value: &'a T) -> Self
    where
        C: Accepts<T>,
    {
        let index = <C as Accepts<T>>::register();
        Self::assemble(BorrowedStorage::borrowing(value), index)
    }
}

impl<'a, C: Capability + ?Sized> MutViewProxy<'a, C> {
    /// Borrows `value` exclusively behind capability `C`.
    pub fn borrowing_mut<T: 'static>(value: &'a mut T) -> Self
    where
        C: Accepts<T>,
    {
        let index = <C as Accepts<T>>::register();
        Self::assemble(BorrowedMutStorage::borrowing_mut(value), index)
    }
}

impl<C: Capability + ?Sized, S: Storage> Default for Proxy<C, S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: ?Sized, S: Copy> Copy for Proxy<C, S> {}

impl<C: ?Sized, S: Clone> Clone for Proxy<C, S> {
    fn clone(&self) -> Self {
        Proxy {
            storage: self.storage.clone(),
            index: self.index,
            _capability: PhantomData,
        }
    }
}

impl<C: Capability + ?Sized, S: Storage> core::fmt::Debug for Proxy<C, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Proxy")
            .field("capability", &C::NAME)
            .field("type_name", &self.type_name())
            .field("index", &self.type_index())
            .finish()
    }
}
