//! Shared-ownership storage.
//!
//! One allocation holds a reference count header followed by the value,
//! `Arc`-style. The counter strategy is pluggable: [`SyncCount`] for
//! cross-thread sharing, [`LocalCount`] for cheaper single-threaded
//! sharing.

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering, fence};

use veneer_core::{PtrConst, PtrMut, TypeInfo};

use super::{Storage, StoreValue, TryStoreValue};

/// Reference counting strategy for [`SharedStorage`].
pub trait RefCount: 'static {
    /// A counter starting at one.
    fn one() -> Self;

    /// Adds a reference.
    fn increment(&self);

    /// Drops a reference; returns `true` when it was the last one.
    fn decrement(&self) -> bool;

    /// Current count. Racy under [`SyncCount`]; useful for diagnostics
    /// and tests only.
    fn load(&self) -> usize;
}

/// Single-threaded reference count.
pub struct LocalCount(Cell<usize>);

impl RefCount for LocalCount {
    fn one() -> Self {
        LocalCount(Cell::new(1))
    }

    fn increment(&self) {
        self.0.set(self.0.get() + 1);
    }

    fn decrement(&self) -> bool {
        let count = self.0.get() - 1;
        self.0.set(count);
        count == 0
    }

    fn load(&self) -> usize {
        self.0.get()
    }
}

/// Atomic reference count, with the usual release-decrement /
/// acquire-fence handshake before destruction.
pub struct SyncCount(AtomicUsize);

impl RefCount for SyncCount {
    fn one() -> Self {
        SyncCount(AtomicUsize::new(1))
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn decrement(&self) -> bool {
        if self.0.fetch_sub(1, Ordering::Release) == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    fn load(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[repr(C)]
struct SharedHeader<C> {
    count: C,
    info: &'static TypeInfo,
    value_offset: usize,
}

fn shared_layout<C>(info: &TypeInfo) -> (Layout, usize) {
    match Layout::new::<SharedHeader<C>>().extend(info.layout) {
        Ok((layout, offset)) => (layout.pad_to_align(), offset),
        Err(_) => panic!("value layout overflows a shared allocation"),
    }
}

/// Shared-ownership storage: cloning the proxy adds a reference, never
/// copies the value.
///
/// Hands out shared access only — mutable dispatch through a shared
/// storage fails with `DispatchError::Immutable`.
pub struct SharedStorage<C: RefCount = SyncCount> {
    head: Option<NonNull<SharedHeader<C>>>,
}

impl<C: RefCount> SharedStorage<C> {
    fn store_value<T: 'static>(value: T) -> Self {
        let info = TypeInfo::of::<T>();
        let (layout, offset) = shared_layout::<C>(info);
        unsafe {
            let base = std::alloc::alloc(layout);
            if base.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            let head = base.cast::<SharedHeader<C>>();
            head.write(SharedHeader {
                count: C::one(),
                info,
                value_offset: offset,
            });
            base.add(offset).cast::<T>().write(value);
            SharedStorage {
                head: Some(NonNull::new_unchecked(head)),
            }
        }
    }

    fn value_ptr(&self) -> Option<NonNull<u8>> {
        self.head.map(|head| unsafe {
            let offset = head.as_ref().value_offset;
            NonNull::new_unchecked(head.as_ptr().cast::<u8>().add(offset))
        })
    }

    fn release(&mut self) {
        let Some(head) = self.head.take() else {
            return;
        };
        unsafe {
            if head.as_ref().count.decrement() {
                let info = head.as_ref().info;
                let offset = head.as_ref().value_offset;
                let base = head.as_ptr().cast::<u8>();
                (info.ops.drop_in_place)(PtrMut::new(NonNull::new_unchecked(base.add(offset))));
                let (layout, _) = shared_layout::<C>(info);
                core::ptr::drop_in_place(head.as_ptr());
                std::alloc::dealloc(base, layout);
            }
        }
    }

    /// Number of live references to the stored value. Zero when empty.
    pub fn strong_count(&self) -> usize {
        self.head
            .map(|head| unsafe { head.as_ref().count.load() })
            .unwrap_or(0)
    }
}

impl<C: RefCount> Storage for SharedStorage<C> {
    fn empty() -> Self {
        SharedStorage { head: None }
    }

    fn as_ptr(&self) -> Option<PtrConst<'_>> {
        self.value_ptr().map(PtrConst::new)
    }

    fn as_ptr_mut(&mut self) -> Option<PtrMut<'_>> {
        // Other references may exist; exclusive access is never granted.
        None
    }

    fn type_info(&self) -> Option<&'static TypeInfo> {
        self.head.map(|head| unsafe { head.as_ref().info })
    }

    fn reset(&mut self) {
        self.release();
    }

    fn take(&mut self) -> Self {
        SharedStorage {
            head: self.head.take(),
        }
    }
}

impl<C: RefCount> Clone for SharedStorage<C> {
    fn clone(&self) -> Self {
        if let Some(head) = self.head {
            unsafe { head.as_ref().count.increment() };
        }
        SharedStorage { head: self.head }
    }
}

impl<C: RefCount> Drop for SharedStorage<C> {
    fn drop(&mut self) {
        self.release();
    }
}

// Sound because construction of the `SyncCount` flavor requires the
// stored type to be `Send + Sync` (see the `StoreValue` impl below), and
// the count itself is atomic.
unsafe impl Send for SharedStorage<SyncCount> {}
unsafe impl Sync for SharedStorage<SyncCount> {}

impl<T: Send + Sync + 'static> StoreValue<T> for SharedStorage<SyncCount> {
    fn store(value: T) -> Self {
        Self::store_value(value)
    }
}

impl<T: Send + Sync + 'static> TryStoreValue<T> for SharedStorage<SyncCount> {
    fn try_store(value: T) -> Result<Self, T> {
        Ok(Self::store_value(value))
    }
}

impl<T: 'static> StoreValue<T> for SharedStorage<LocalCount> {
    fn store(value: T) -> Self {
        Self::store_value(value)
    }
}

impl<T: 'static> TryStoreValue<T> for SharedStorage<LocalCount> {
    fn try_store(value: T) -> Result<Self, T> {
        Ok(Self::store_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_value() {
        let storage = <SharedStorage as StoreValue<String>>::store(String::from("shared"));
        let copy = storage.clone();
        assert_eq!(storage.strong_count(), 2);
        assert_eq!(
            storage.as_ptr().unwrap().as_byte_ptr(),
            copy.as_ptr().unwrap().as_byte_ptr(),
        );
        drop(copy);
        assert_eq!(storage.strong_count(), 1);
    }

    #[test]
    fn last_reference_destroys_the_value() {
        use core::sync::atomic::AtomicUsize;
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Bomb;
        impl Drop for Bomb {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let storage = <SharedStorage<LocalCount> as StoreValue<Bomb>>::store(Bomb);
        let copy = storage.clone();
        drop(storage);
        assert_eq!(DROPS.load(Ordering::Relaxed), 0);
        drop(copy);
        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn shared_storage_never_grants_exclusive_access() {
        let mut storage = <SharedStorage as StoreValue<u32>>::store(3);
        assert!(storage.as_ptr().is_some());
        assert!(storage.as_ptr_mut().is_none());
    }
}
