//! Dispatch errors

use core::fmt;

/// All the ways a dispatch can fail.
///
/// Every variant carries enough context to name the capability, the
/// operation, and (where one exists) the concrete type involved, so the
/// message is actionable without a debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The operation's table has no entry for the stored type.
    ///
    /// This is the steady state for operations that were never wired for
    /// the type, and a transient state only in the presence of a bug: the
    /// registration protocol back-fills tables before any lookup on them
    /// can observe a registered type.
    Unregistered {
        /// Name of the capability being dispatched through.
        capability: &'static str,
        /// Name of the operation that had no entry.
        operation: &'static str,
        /// Name of the stored concrete type.
        type_name: &'static str,
    },

    /// The proxy holds no value.
    EmptyProxy {
        /// Name of the capability being dispatched through.
        capability: &'static str,
        /// Name of the operation that was invoked.
        operation: &'static str,
    },

    /// A mutable operation was invoked through a storage policy that only
    /// hands out shared access (shared-ownership and borrowed-view
    /// storages).
    Immutable {
        /// Name of the capability being dispatched through.
        capability: &'static str,
        /// Name of the mutable operation that was invoked.
        operation: &'static str,
        /// Name of the stored concrete type.
        type_name: &'static str,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unregistered {
                capability,
                operation,
                type_name,
            } => {
                write!(
                    f,
                    "no entry for operation `{operation}` of capability `{capability}` on type `{type_name}`"
                )
            }
            DispatchError::EmptyProxy {
                capability,
                operation,
            } => {
                write!(
                    f,
                    "operation `{operation}` of capability `{capability}` invoked on an empty proxy"
                )
            }
            DispatchError::Immutable {
                capability,
                operation,
                type_name,
            } => {
                write!(
                    f,
                    "mutable operation `{operation}` of capability `{capability}` invoked on a shared `{type_name}`"
                )
            }
        }
    }
}

impl core::error::Error for DispatchError {}

/// Logs and panics with a dispatch error.
///
/// The fail-fast path for generated capability methods, which have no
/// `Result` in their signature to surface the error through.
#[cold]
pub fn dispatch_failed(err: DispatchError) -> ! {
    log::error!("{err}");
    panic!("{err}");
}
