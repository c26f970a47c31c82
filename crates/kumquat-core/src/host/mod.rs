//! The host runtime seen from native code
//!
//! A host is a reference-counted runtime (CPython in the extension module,
//! [`Arena`] in tests) that owns the integrand and its extra arguments.
//! Native code only ever touches host values through opaque handles and
//! the paired [`Host::retain`] / [`Host::release`] protocol; [`Retained`]
//! wraps one such stake so that acquisition and release follow Rust
//! ownership.
//!
//! Hosts are single-threaded from this crate's point of view: a `Host`
//! value is a token proving the caller is on the thread that owns the
//! runtime, and is deliberately not required to be `Send`.

mod arena;
mod retained;

use num_complex::Complex64;
use std::fmt;

pub use arena::{Arena, ArenaError, ComplexHook, Event, NativeFn, ObjectId};
pub use retained::Retained;

/// Operations the adapter needs from a reference-counted host runtime
///
/// Every method taking a handle requires the handle to refer to a live
/// host value. Methods documented as returning a *new reference* hand the
/// caller one stake, which must eventually be released (usually by wrapping
/// it in [`Retained::adopt`]).
pub trait Host: Copy {
    /// Opaque, non-owning reference to a host value
    type Handle: Copy + PartialEq + fmt::Debug;

    /// Diagnostic carried by a failed host operation
    type Error;

    /// Add one stake on `handle`
    fn retain(self, handle: Self::Handle);

    /// Drop one stake on `handle`
    ///
    /// This may run arbitrary host code (finalizers) and must never be
    /// called while a host error is pending.
    fn release(self, handle: Self::Handle);

    /// Whether `handle` is the host's "no value" sentinel
    fn is_none(self, handle: Self::Handle) -> bool;

    /// Whether `handle` can be called
    fn is_callable(self, handle: Self::Handle) -> bool;

    /// Length of `handle` if it is a tuple
    fn tuple_len(self, handle: Self::Handle) -> Option<usize>;

    /// Borrowed item of a tuple; no stake is taken
    fn tuple_item(self, tuple: Self::Handle, index: usize) -> Option<Self::Handle>;

    /// Largest tuple length the host can represent
    fn max_tuple_len(self) -> usize {
        isize::MAX as usize
    }

    /// Human readable type name, used in diagnostics
    fn type_name(self, handle: Self::Handle) -> String;

    /// Convert a native float into a host float (new reference)
    fn new_float(self, x: f64) -> Result<Self::Handle, Self::Error>;

    /// Build a tuple that takes over the stakes held by `items`
    ///
    /// On failure the stakes are released when `items` is dropped.
    fn new_tuple(self, items: Vec<Retained<Self>>) -> Result<Retained<Self>, Self::Error>;

    /// Call `callable` with the positional arguments in `args`
    ///
    /// On failure the host's pending error must already be captured in the
    /// returned `Error`, so that the caller may release references safely.
    fn call(
        self,
        callable: Self::Handle,
        args: &Retained<Self>,
    ) -> Result<Retained<Self>, Self::Error>;

    /// Convert a host value into a native complex number
    ///
    /// `Ok(None)` means the value has no complex interpretation at all. A
    /// value that has one but fails while converting (a raising
    /// `__complex__`, say) yields the host error, already captured.
    fn to_complex(self, handle: Self::Handle) -> Result<Option<Complex64>, Self::Error>;
}
