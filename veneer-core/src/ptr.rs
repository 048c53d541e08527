//! Erased pointers
//!
//! Type-erased thin pointer helpers for values held behind a capability.
//! Every value a proxy stores is `Sized`, so no metadata word is carried:
//! these are `NonNull<u8>` plus a lifetime brand tracking the borrow of the
//! underlying memory.

use core::{fmt, marker::PhantomData, ptr::NonNull};

/// A type-erased pointer to an uninitialized value.
///
/// The lifetime `'mem` represents the borrow of the underlying
/// uninitialized memory.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PtrUninit<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem mut ()>,
}

impl<'mem> PtrUninit<'mem> {
    /// Create an erased pointer from a raw mutable pointer.
    #[inline]
    pub const fn new<T>(ptr: NonNull<T>) -> Self {
        Self {
            ptr: ptr.cast(),
            phantom: PhantomData,
        }
    }

    /// Creates an erased pointer from a reference to a [`core::mem::MaybeUninit`].
    ///
    /// The pointer will point at the potentially uninitialized contents.
    #[inline]
    pub const fn from_maybe_uninit<T>(borrow: &'mem mut core::mem::MaybeUninit<T>) -> Self {
        Self {
            ptr: unsafe { NonNull::new_unchecked(borrow.as_mut_ptr().cast::<u8>()) },
            phantom: PhantomData,
        }
    }

    /// Assumes the pointed-to memory is initialized.
    ///
    /// # Safety
    ///
    /// The pointer must actually point to an initialized value.
    #[inline]
    pub const unsafe fn assume_init(self) -> PtrMut<'mem> {
        PtrMut {
            ptr: self.ptr,
            phantom: PhantomData,
        }
    }

    /// Write a value to this location and convert to an initialized pointer.
    ///
    /// # Safety
    ///
    /// The pointer must be properly aligned for `T` and point to allocated
    /// memory large enough for a `T`.
    #[inline]
    pub const unsafe fn put<T>(self, value: T) -> PtrMut<'mem> {
        unsafe {
            core::ptr::write(self.ptr.as_ptr().cast::<T>(), value);
            self.assume_init()
        }
    }

    /// Returns the underlying raw pointer as a byte pointer.
    #[inline]
    pub const fn as_mut_byte_ptr(self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

/// A type-erased, read-only pointer to an initialized value.
///
/// Cannot be null (but may be dangling for ZSTs). The lifetime `'mem`
/// represents the borrow of the underlying memory, which must remain valid
/// and initialized.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PtrConst<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem ()>,
}

impl<'mem> PtrConst<'mem> {
    /// Creates a new erased const pointer.
    #[inline]
    pub const fn new<T>(ptr: NonNull<T>) -> Self {
        Self {
            ptr: ptr.cast(),
            phantom: PhantomData,
        }
    }

    /// Creates an erased const pointer from a reference.
    #[inline]
    pub const fn from_ref<T>(borrow: &'mem T) -> Self {
        Self {
            ptr: unsafe { NonNull::new_unchecked(core::ptr::from_ref(borrow).cast_mut().cast()) },
            phantom: PhantomData,
        }
    }

    /// Returns the address of the pointed-to value.
    #[inline]
    pub const fn as_byte_ptr(self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Borrows the underlying value as a reference of type `T`.
    ///
    /// # Safety
    ///
    /// - `T` must be the actual underlying type of the pointed-to memory.
    /// - The memory must remain valid and not be mutated while this
    ///   reference exists.
    #[inline]
    pub const unsafe fn get<T>(self) -> &'mem T {
        unsafe { &*self.ptr.as_ptr().cast::<T>() }
    }

    /// Exposes [`core::ptr::read`].
    ///
    /// # Safety
    ///
    /// `T` must be the actual underlying type of the pointed-to memory,
    /// which must be initialized and properly aligned. The value is moved
    /// out; the memory must not be read as a `T` again.
    #[inline]
    pub const unsafe fn read<T>(self) -> T {
        unsafe { core::ptr::read(self.ptr.as_ptr().cast::<T>()) }
    }
}

impl<'mem, T> From<&'mem T> for PtrConst<'mem> {
    #[inline]
    fn from(value: &'mem T) -> Self {
        Self::from_ref(value)
    }
}

/// A type-erased, mutable pointer to an initialized value.
///
/// Provides mutable access to the underlying value, whose borrow is tracked
/// by the lifetime `'mem`.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PtrMut<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem mut ()>,
}

impl<'mem> PtrMut<'mem> {
    /// Creates a new erased mutable pointer.
    #[inline]
    pub const fn new<T>(ptr: NonNull<T>) -> Self {
        Self {
            ptr: ptr.cast(),
            phantom: PhantomData,
        }
    }

    /// Creates an erased mutable pointer from a mutable reference.
    #[inline]
    pub const fn from_mut<T>(borrow: &'mem mut T) -> Self {
        Self {
            ptr: unsafe { NonNull::new_unchecked(core::ptr::from_mut(borrow).cast()) },
            phantom: PhantomData,
        }
    }

    /// Returns the address of the pointed-to value.
    #[inline]
    pub const fn as_byte_ptr(self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Returns the address of the pointed-to value, mutably.
    #[inline]
    pub const fn as_mut_byte_ptr(self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Forgets that the pointed-to memory is initialized.
    #[inline]
    pub const fn as_uninit(self) -> PtrUninit<'mem> {
        PtrUninit {
            ptr: self.ptr,
            phantom: PhantomData,
        }
    }

    /// Reborrows as a const pointer.
    #[inline]
    pub const fn as_const<'borrow: 'mem>(self) -> PtrConst<'borrow> {
        PtrConst {
            ptr: self.ptr,
            phantom: PhantomData,
        }
    }

    /// Borrows the underlying value as a shared reference of type `T`.
    ///
    /// # Safety
    ///
    /// `T` must be the actual underlying type. You're downcasting with no
    /// guardrails; aliasing-xor-mutability is on you.
    #[inline]
    pub const unsafe fn get<'borrow: 'mem, T>(self) -> &'borrow T {
        unsafe { &*(self.ptr.as_ptr().cast::<T>() as *const T) }
    }

    /// Borrows the underlying value as a mutable reference of type `T`.
    ///
    /// # Safety
    ///
    /// `T` must be the actual underlying type, and the caller must have
    /// exclusive access to the pointed-to memory for `'borrow`.
    #[inline]
    pub const unsafe fn as_mut<'borrow: 'mem, T>(self) -> &'borrow mut T {
        unsafe { &mut *self.ptr.as_ptr().cast::<T>() }
    }

    /// Exposes [`core::ptr::read`].
    ///
    /// # Safety
    ///
    /// `T` must be the actual underlying type of the pointed-to memory,
    /// which must be initialized and properly aligned. The value is moved
    /// out; the memory must not be read as a `T` again.
    #[inline]
    pub const unsafe fn read<T>(self) -> T {
        unsafe { core::ptr::read(self.ptr.as_ptr().cast::<T>()) }
    }

    /// Exposes [`core::ptr::drop_in_place`].
    ///
    /// # Safety
    ///
    /// `T` must be the actual underlying type of the pointed-to memory.
    /// After calling this the memory is uninitialized and must not be
    /// accessed until reinitialized.
    #[inline]
    pub unsafe fn drop_in_place<T>(self) -> PtrUninit<'mem> {
        unsafe { core::ptr::drop_in_place(self.ptr.as_ptr().cast::<T>()) }
        self.as_uninit()
    }
}

impl<'mem, T> From<&'mem mut T> for PtrMut<'mem> {
    #[inline]
    fn from(value: &'mem mut T) -> Self {
        Self::from_mut(value)
    }
}

impl fmt::Debug for PtrConst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.as_ptr().fmt(f)
    }
}

impl fmt::Debug for PtrMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.as_ptr().fmt(f)
    }
}

impl fmt::Debug for PtrUninit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.as_ptr().fmt(f)
    }
}
