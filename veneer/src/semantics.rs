//! Receivers
//!
//! Every dispatch entry point takes a [`Receiver`] as its first argument.
//! It is an erased pointer tagged with the value category the call site
//! holds: shared borrow, exclusive borrow, or owned. Entry points generated
//! for `&self` operations downgrade any category to a shared borrow;
//! `&mut self` operations require `Mut` or `Owned`.

use veneer_core::{PtrConst, PtrMut};

/// The value category a [`Receiver`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverKind {
    /// Shared access.
    Ref,
    /// Exclusive access.
    Mut,
    /// Exclusive access to a value the dispatch owns for the duration of
    /// the call.
    Owned,
}

/// An erased receiver: a pointer to the stored value plus its category.
#[derive(Clone, Copy, Debug)]
pub enum Receiver<'r> {
    /// Built from a shared borrow of the stored value.
    Ref(PtrConst<'r>),
    /// Built from an exclusive borrow of the stored value.
    Mut(PtrMut<'r>),
    /// Built from a value the dispatch owns; the value is destroyed after
    /// the entry point returns.
    Owned(PtrMut<'r>),
}

impl<'r> Receiver<'r> {
    /// The category this receiver carries.
    #[inline]
    pub fn kind(self) -> ReceiverKind {
        match self {
            Receiver::Ref(_) => ReceiverKind::Ref,
            Receiver::Mut(_) => ReceiverKind::Mut,
            Receiver::Owned(_) => ReceiverKind::Owned,
        }
    }

    /// Borrows the value as `&T`. Any category supports this.
    ///
    /// # Safety
    ///
    /// `T` must be the concrete type the receiver's pointer refers to.
    #[inline]
    pub unsafe fn borrow<T: 'static>(self) -> &'r T {
        match self {
            Receiver::Ref(ptr) => unsafe { ptr.get::<T>() },
            Receiver::Mut(ptr) | Receiver::Owned(ptr) => unsafe { ptr.get::<T>() },
        }
    }

    /// Borrows the value as `&mut T`.
    ///
    /// Panics on a `Ref` receiver. The dispatch layer never constructs one
    /// for a mutable operation, so hitting that panic means an entry point
    /// was invoked outside the proxy machinery with the wrong category.
    ///
    /// # Safety
    ///
    /// `T` must be the concrete type the receiver's pointer refers to, and
    /// the pointer must carry exclusive access.
    #[inline]
    pub unsafe fn borrow_mut<T: 'static>(self) -> &'r mut T {
        match self {
            Receiver::Mut(ptr) | Receiver::Owned(ptr) => unsafe { ptr.as_mut::<T>() },
            Receiver::Ref(_) => panic!("mutable borrow through a shared receiver"),
        }
    }
}
