//! Capabilities
//!
//! A capability is a trait declared through [`capability!`]. The macro
//! emits the trait itself plus everything dispatch needs: one tag struct
//! and one table per operation, monomorphic entry points, wire functions,
//! and the registration impls that connect concrete types (or
//! deref-through pointers) to the capability's registry node.
//!
//! The capability's identity is its `dyn Trait` type: that is what
//! implements [`Capability`], what proxies are parameterized over, and
//! what registration impls hang off — implementing `Accepts<T>` *for*
//! `dyn Trait` keeps everything inside the declaring crate as far as the
//! orphan rules are concerned.

use crate::registry::CapabilityNode;
use crate::table::DispatchTable;

/// A capability: a named dispatch domain with its own type indexes.
///
/// Implemented by `capability!` for the `dyn Trait` type of each declared
/// trait. Never implement this by hand.
pub trait Capability: 'static {
    /// The capability's name, for diagnostics.
    const NAME: &'static str;

    /// The capability's process-wide registry node.
    fn node() -> &'static CapabilityNode;
}

/// Types a capability can erase directly.
///
/// `capability!` provides a blanket impl covering every `T` implementing
/// the capability trait.
pub trait Accepts<T: 'static>: Capability {
    /// Ensures `T` is registered (here and under every base capability)
    /// and returns its dense index under this capability.
    fn register() -> u32;
}

/// Pointer types a capability can erase deref-through.
///
/// Covers any `P: Deref` whose target implements the capability trait.
/// Only shared-receiver operations are wired; mutable operations on a
/// proxy built this way fail with `Unregistered`.
pub trait AcceptsVia<P: 'static>: Capability {
    /// Ensures `P` is registered as a deref-through pointer and returns
    /// its dense index under this capability.
    fn register_via() -> u32;
}

/// Pointer types a capability can erase deref-through, mutably.
///
/// Covers any `P: DerefMut` whose target implements the capability
/// trait; both shared and mutable operations are wired.
pub trait AcceptsViaMut<P: 'static>: Capability {
    /// Ensures `P` is registered as a mutable deref-through pointer and
    /// returns its dense index under this capability.
    fn register_via_mut() -> u32;
}

/// Witness that capability `Self` extends capability `B`.
///
/// Reflexive: every capability extends itself. `capability!` adds one
/// impl per declared base. Upcasting and cross-capability dispatch are
/// bounded on this trait.
pub trait Extends<B: Capability + ?Sized>: Capability {}

/// One operation of a capability.
///
/// Implemented by the per-operation tag structs `capability!` emits; the
/// tag is how call sites name an operation in [`Proxy::dispatch`]
/// turbofish position.
///
/// [`Proxy::dispatch`]: crate::Proxy::dispatch
pub trait Operation: 'static {
    /// The capability this operation belongs to.
    type Cap: Capability + ?Sized;

    /// The entry-point function pointer type stored in the table.
    type Entry: Copy + Send + Sync + 'static;

    /// The table flavor holding the entries.
    type Table: DispatchTable<Entry = Self::Entry>;

    /// The operation's name, for diagnostics.
    const NAME: &'static str;

    /// The operation's process-wide dispatch table.
    fn table() -> &'static Self::Table;
}

/// Declares a capability trait and its dispatch machinery.
///
/// ```
/// use veneer::{UniqueProxy, capability};
///
/// capability! {
///     /// Things that greet.
///     pub trait Greeter {
///         fn greet(&self, name: &str) -> String;
///     }
/// }
///
/// struct Shouty;
///
/// impl Greeter for Shouty {
///     fn greet(&self, name: &str) -> String {
///         name.to_uppercase()
///     }
/// }
///
/// let proxy = UniqueProxy::<dyn Greeter>::new(Shouty);
/// assert_eq!(proxy.greet("world"), "WORLD");
/// ```
///
/// Operations take `&self` or `&mut self` plus any number of owned or
/// borrowed arguments. For each operation the macro emits a tag struct
/// with the operation's name in the surrounding module, so operation
/// names must be unique per module.
///
/// Base capabilities are listed supertrait-style (`pub trait Loud:
/// Greeter { .. }`); each base must itself be a capability, named by a
/// plain identifier in scope, and a hierarchy deeper than one level must
/// list all its bases, not just the immediate one. Registering a type
/// under a derived capability registers it under every listed base too.
///
/// Knobs:
///
/// - `#[dispatch(static_capacity = N)]` on the trait pins every
///   operation's table to a fixed capacity `N` instead of a growable one.
/// - `#[dispatch(or_default)]` as the *first* attribute of an operation
///   makes an unregistered dispatch return `Default::default()` instead
///   of panicking. The return type must implement `Default`; empty-proxy
///   and immutability errors still panic.
#[macro_export]
macro_rules! capability {
    // ---- entry points ----------------------------------------------------
    (
        #[dispatch(static_capacity = $cap:literal)]
        $(#[$m:meta])*
        $v:vis trait $n:ident $(: $base0:ident $(+ $base:ident)*)? {
            $($body:tt)*
        }
    ) => {
        $crate::capability! {
            @parse
            tbl [static_ $cap]
            meta [$(#[$m])*]
            vis [$v]
            name [$n]
            bases [$($base0 $(, $base)*)?]
            ops []
            munch [$($body)*]
        }
    };
    (
        $(#[$m:meta])*
        $v:vis trait $n:ident $(: $base0:ident $(+ $base:ident)*)? {
            $($body:tt)*
        }
    ) => {
        $crate::capability! {
            @parse
            tbl [dyn_]
            meta [$(#[$m])*]
            vis [$v]
            name [$n]
            bases [$($base0 $(, $base)*)?]
            ops []
            munch [$($body)*]
        }
    };

    // ---- operation muncher -----------------------------------------------
    // The `or_default` marker must come before any other attribute, or the
    // plain arms below swallow it as an ordinary one.
    (@parse
        tbl $tbl:tt meta $m:tt vis $v:tt name $n:tt bases $bases:tt
        ops [$($oprec:tt)*]
        munch [
            #[dispatch(or_default)]
            $(#[$om:meta])*
            fn $op:ident(&self $(, $a:ident : $at:ty)* $(,)?) $(-> $ret:ty)?;
            $($rest:tt)*
        ]
    ) => {
        $crate::capability! {
            @parse
            tbl $tbl meta $m vis $v name $n bases $bases
            ops [$($oprec)* {
                om [$(#[$om])*] op [$op] recv [ref_] fb [default_]
                args [$($a : $at),*] ret [$($ret)?]
            }]
            munch [$($rest)*]
        }
    };
    (@parse
        tbl $tbl:tt meta $m:tt vis $v:tt name $n:tt bases $bases:tt
        ops [$($oprec:tt)*]
        munch [
            #[dispatch(or_default)]
            $(#[$om:meta])*
            fn $op:ident(&mut self $(, $a:ident : $at:ty)* $(,)?) $(-> $ret:ty)?;
            $($rest:tt)*
        ]
    ) => {
        $crate::capability! {
            @parse
            tbl $tbl meta $m vis $v name $n bases $bases
            ops [$($oprec)* {
                om [$(#[$om])*] op [$op] recv [mut_] fb [default_]
                args [$($a : $at),*] ret [$($ret)?]
            }]
            munch [$($rest)*]
        }
    };
    (@parse
        tbl $tbl:tt meta $m:tt vis $v:tt name $n:tt bases $bases:tt
        ops [$($oprec:tt)*]
        munch [
            $(#[$om:meta])*
            fn $op:ident(&self $(, $a:ident : $at:ty)* $(,)?) $(-> $ret:ty)?;
            $($rest:tt)*
        ]
    ) => {
        $crate::capability! {
            @parse
            tbl $tbl meta $m vis $v name $n bases $bases
            ops [$($oprec)* {
                om [$(#[$om])*] op [$op] recv [ref_] fb [panic_]
                args [$($a : $at),*] ret [$($ret)?]
            }]
            munch [$($rest)*]
        }
    };
    (@parse
        tbl $tbl:tt meta $m:tt vis $v:tt name $n:tt bases $bases:tt
        ops [$($oprec:tt)*]
        munch [
            $(#[$om:meta])*
            fn $op:ident(&mut self $(, $a:ident : $at:ty)* $(,)?) $(-> $ret:ty)?;
            $($rest:tt)*
        ]
    ) => {
        $crate::capability! {
            @parse
            tbl $tbl meta $m vis $v name $n bases $bases
            ops [$($oprec)* {
                om [$(#[$om])*] op [$op] recv [mut_] fb [panic_]
                args [$($a : $at),*] ret [$($ret)?]
            }]
            munch [$($rest)*]
        }
    };
    (@parse
        tbl $tbl:tt
        meta [$($m:tt)*]
        vis [$v:vis]
        name [$n:ident]
        bases [$($base:ident),*]
        ops [$($oprec:tt)*]
        munch []
    ) => {
        $crate::capability! {
            @trait_def meta [$($m)*] vis [$v] name [$n] bases [$($base),*] ops [$($oprec)*]
        }
        $crate::capability! {
            @machinery vis [$v] name [$n] bases [$($base),*] ops [$($oprec)*]
        }
        $(
            $crate::capability! { @op_items tbl $tbl vis [$v] name [$n] $oprec }
        )*
    };

    // ---- trait definition ------------------------------------------------
    (@trait_def meta [$(#[$m:meta])*] vis [$v:vis] name [$n:ident] bases [] ops [$($oprec:tt)*]) => {
        $(#[$m])*
        $v trait $n {
            $( $crate::capability! { @trait_item $oprec } )*
        }
    };
    (@trait_def meta [$(#[$m:meta])*] vis [$v:vis] name [$n:ident] bases [$($base:ident),+] ops [$($oprec:tt)*]) => {
        $(#[$m])*
        $v trait $n: $($base +)+ {
            $( $crate::capability! { @trait_item $oprec } )*
        }
    };
    (@trait_item {
        om [$(#[$om:meta])*] op [$op:ident] recv [ref_] fb [$fb:ident]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    }) => {
        $(#[$om])*
        fn $op(&self $(, $a: $at)*) $(-> $ret)?;
    };
    (@trait_item {
        om [$(#[$om:meta])*] op [$op:ident] recv [mut_] fb [$fb:ident]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    }) => {
        $(#[$om])*
        fn $op(&mut self $(, $a: $at)*) $(-> $ret)?;
    };

    // ---- per-capability machinery ------------------------------------------
    (@machinery vis [$v:vis] name [$n:ident] bases [$($base:ident),*] ops [$($oprec:tt)*]) => {
        impl $crate::Capability for dyn $n {
            const NAME: &'static str = stringify!($n);

            fn node() -> &'static $crate::CapabilityNode {
                static NODE: $crate::__private::OnceLock<$crate::CapabilityNode> =
                    $crate::__private::OnceLock::new();
                static LINKED: $crate::__private::Once = $crate::__private::Once::new();
                let node = NODE.get_or_init(|| $crate::CapabilityNode::new(stringify!($n)));
                LINKED.call_once(|| {
                    $( node.link_base(<dyn $base as $crate::Capability>::node()); )*
                });
                node
            }
        }

        impl $crate::Extends<dyn $n> for dyn $n {}
        $( impl $crate::Extends<dyn $base> for dyn $n {} )*

        const _: () = {
            fn wire_direct<T: $n + 'static>(table: $crate::TableKey, index: u32) -> bool {
                $( $crate::capability! {
                    @wire_direct table [table] index [index] ty [T] $oprec
                } )*
                let _ = (table, index);
                false
            }

            fn wire_via<P>(table: $crate::TableKey, index: u32) -> bool
            where
                P: ::core::ops::Deref + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                $( $crate::capability! {
                    @wire_via table [table] index [index] ty [P] $oprec
                } )*
                let _ = (table, index);
                false
            }

            fn wire_via_mut<P>(table: $crate::TableKey, index: u32) -> bool
            where
                P: ::core::ops::DerefMut + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                $( $crate::capability! {
                    @wire_via_mut table [table] index [index] ty [P] $oprec
                } )*
                let _ = (table, index);
                false
            }

            impl<T: $n + 'static> $crate::Accepts<T> for dyn $n {
                fn register() -> u32 {
                    $( let _ = <dyn $base as $crate::Accepts<T>>::register(); )*
                    <dyn $n as $crate::Capability>::node()
                        .register_type::<T>($crate::TypeInfo::of::<T>(), wire_direct::<T>)
                }
            }

            impl<P> $crate::AcceptsVia<P> for dyn $n
            where
                P: ::core::ops::Deref + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                fn register_via() -> u32 {
                    $( let _ = <dyn $base as $crate::AcceptsVia<P>>::register_via(); )*
                    <dyn $n as $crate::Capability>::node()
                        .register_type::<P>($crate::TypeInfo::of::<P>(), wire_via::<P>)
                }
            }

            impl<P> $crate::AcceptsViaMut<P> for dyn $n
            where
                P: ::core::ops::DerefMut + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                fn register_via_mut() -> u32 {
                    $( let _ = <dyn $base as $crate::AcceptsViaMut<P>>::register_via_mut(); )*
                    <dyn $n as $crate::Capability>::node()
                        .register_type::<P>($crate::TypeInfo::of::<P>(), wire_via_mut::<P>)
                }
            }

            impl<C, S> $n for $crate::Proxy<C, S>
            where
                C: $crate::Extends<dyn $n> $( + $crate::Extends<dyn $base> )* + ?Sized,
                S: $crate::Storage,
            {
                $( $crate::capability! { @proxy_method $oprec } )*
            }
        };
    };

    // ---- wire arms ---------------------------------------------------------
    (@wire_direct table [$table:ident] index [$index:ident] ty [$t:ident]
        {om $om:tt op [$op:ident] recv $recv:tt fb $fb:tt args $args:tt ret $ret:tt}
    ) => {
        if $table == $crate::DispatchTable::key(<$op as $crate::Operation>::table()) {
            $crate::DispatchTable::put(
                <$op as $crate::Operation>::table(),
                $index,
                $op::direct_entry::<$t>,
            );
            return true;
        }
    };
    (@wire_via table [$table:ident] index [$index:ident] ty [$t:ident]
        {om $om:tt op [$op:ident] recv [ref_] fb $fb:tt args $args:tt ret $ret:tt}
    ) => {
        if $table == $crate::DispatchTable::key(<$op as $crate::Operation>::table()) {
            $crate::DispatchTable::put(
                <$op as $crate::Operation>::table(),
                $index,
                $op::via_entry::<$t>,
            );
            return true;
        }
    };
    // A `Deref`-only pointer cannot back a mutable operation; its slot
    // stays empty and dispatch reports `Unregistered`.
    (@wire_via table [$table:ident] index [$index:ident] ty [$t:ident]
        {om $om:tt op [$op:ident] recv [mut_] fb $fb:tt args $args:tt ret $ret:tt}
    ) => {};
    (@wire_via_mut table [$table:ident] index [$index:ident] ty [$t:ident]
        {om $om:tt op [$op:ident] recv $recv:tt fb $fb:tt args $args:tt ret $ret:tt}
    ) => {
        if $table == $crate::DispatchTable::key(<$op as $crate::Operation>::table()) {
            $crate::DispatchTable::put(
                <$op as $crate::Operation>::table(),
                $index,
                $op::via_mut_entry::<$t>,
            );
            return true;
        }
    };

    // ---- generated proxy methods -------------------------------------------
    (@proxy_method {
        om $om:tt op [$op:ident] recv [ref_] fb [panic_]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    }) => {
        fn $op(&self $(, $a: $at)*) $(-> $ret)? {
            match self.dispatch::<$op, _>(move |entry, recv| unsafe { entry(recv $(, $a)*) }) {
                Ok(out) => out,
                Err(err) => $crate::dispatch_failed(err),
            }
        }
    };
    (@proxy_method {
        om $om:tt op [$op:ident] recv [ref_] fb [default_]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    }) => {
        fn $op(&self $(, $a: $at)*) $(-> $ret)? {
            match self.dispatch::<$op, _>(move |entry, recv| unsafe { entry(recv $(, $a)*) }) {
                Ok(out) => out,
                Err($crate::DispatchError::Unregistered { .. }) => {
                    ::core::default::Default::default()
                }
                Err(err) => $crate::dispatch_failed(err),
            }
        }
    };
    (@proxy_method {
        om $om:tt op [$op:ident] recv [mut_] fb [panic_]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    }) => {
        fn $op(&mut self $(, $a: $at)*) $(-> $ret)? {
            match self.dispatch_mut::<$op, _>(move |entry, recv| unsafe { entry(recv $(, $a)*) }) {
                Ok(out) => out,
                Err(err) => $crate::dispatch_failed(err),
            }
        }
    };
    (@proxy_method {
        om $om:tt op [$op:ident] recv [mut_] fb [default_]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    }) => {
        fn $op(&mut self $(, $a: $at)*) $(-> $ret)? {
            match self.dispatch_mut::<$op, _>(move |entry, recv| unsafe { entry(recv $(, $a)*) }) {
                Ok(out) => out,
                Err($crate::DispatchError::Unregistered { .. }) => {
                    ::core::default::Default::default()
                }
                Err(err) => $crate::dispatch_failed(err),
            }
        }
    };

    // ---- per-operation items -----------------------------------------------
    (@op_items tbl [dyn_] vis [$v:vis] name [$n:ident]
        {om $om:tt op [$op:ident] recv [$recv:ident] fb $fb:tt args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]}
    ) => {
        #[doc = concat!("Operation tag for [`", stringify!($n), "::", stringify!($op), "`].")]
        #[allow(non_camel_case_types)]
        $v struct $op;

        impl $crate::Operation for $op {
            type Cap = dyn $n;
            type Entry = unsafe fn($crate::Receiver<'_> $(, $at)*) $(-> $ret)?;
            type Table = $crate::OpTable<unsafe fn($crate::Receiver<'_> $(, $at)*) $(-> $ret)?>;
            const NAME: &'static str = stringify!($op);

            fn table() -> &'static Self::Table {
                static TABLE: $crate::OpTable<
                    unsafe fn($crate::Receiver<'_> $(, $at)*) $(-> $ret)?,
                > = $crate::OpTable::new(stringify!($op));
                &TABLE
            }
        }

        $crate::capability! {
            @entry_fns name [$n] recv [$recv] op [$op] args [$($a : $at),*] ret [$($ret)?]
        }
    };
    (@op_items tbl [static_ $cap:literal] vis [$v:vis] name [$n:ident]
        {om $om:tt op [$op:ident] recv [$recv:ident] fb $fb:tt args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]}
    ) => {
        #[doc = concat!("Operation tag for [`", stringify!($n), "::", stringify!($op), "`].")]
        #[allow(non_camel_case_types)]
        $v struct $op;

        impl $crate::Operation for $op {
            type Cap = dyn $n;
            type Entry = unsafe fn($crate::Receiver<'_> $(, $at)*) $(-> $ret)?;
            type Table = $crate::StaticOpTable<
                unsafe fn($crate::Receiver<'_> $(, $at)*) $(-> $ret)?,
                $cap,
            >;
            const NAME: &'static str = stringify!($op);

            fn table() -> &'static Self::Table {
                static TABLE: $crate::StaticOpTable<
                    unsafe fn($crate::Receiver<'_> $(, $at)*) $(-> $ret)?,
                    $cap,
                > = $crate::StaticOpTable::new(stringify!($op));
                &TABLE
            }
        }

        $crate::capability! {
            @entry_fns name [$n] recv [$recv] op [$op] args [$($a : $at),*] ret [$($ret)?]
        }
    };

    // ---- entry points into concrete impls ------------------------------------
    (@entry_fns name [$n:ident] recv [ref_] op [$op:ident]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    ) => {
        impl $op {
            unsafe fn direct_entry<T: $n + 'static>(
                recv: $crate::Receiver<'_>
                $(, $a: $at)*
            ) $(-> $ret)? {
                let this = unsafe { recv.borrow::<T>() };
                <T as $n>::$op(this $(, $a)*)
            }

            unsafe fn via_entry<P>(
                recv: $crate::Receiver<'_>
                $(, $a: $at)*
            ) $(-> $ret)?
            where
                P: ::core::ops::Deref + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                let this = unsafe { recv.borrow::<P>() };
                <<P as ::core::ops::Deref>::Target as $n>::$op(&**this $(, $a)*)
            }

            unsafe fn via_mut_entry<P>(
                recv: $crate::Receiver<'_>
                $(, $a: $at)*
            ) $(-> $ret)?
            where
                P: ::core::ops::DerefMut + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                let this = unsafe { recv.borrow::<P>() };
                <<P as ::core::ops::Deref>::Target as $n>::$op(&**this $(, $a)*)
            }
        }
    };
    (@entry_fns name [$n:ident] recv [mut_] op [$op:ident]
        args [$($a:ident : $at:ty),*] ret [$($ret:ty)?]
    ) => {
        impl $op {
            unsafe fn direct_entry<T: $n + 'static>(
                recv: $crate::Receiver<'_>
                $(, $a: $at)*
            ) $(-> $ret)? {
                let this = unsafe { recv.borrow_mut::<T>() };
                <T as $n>::$op(this $(, $a)*)
            }

            unsafe fn via_mut_entry<P>(
                recv: $crate::Receiver<'_>
                $(, $a: $at)*
            ) $(-> $ret)?
            where
                P: ::core::ops::DerefMut + 'static,
                <P as ::core::ops::Deref>::Target: $n,
            {
                let this = unsafe { recv.borrow_mut::<P>() };
                <<P as ::core::ops::Deref>::Target as $n>::$op(&mut **this $(, $a)*)
            }
        }
    };
}
