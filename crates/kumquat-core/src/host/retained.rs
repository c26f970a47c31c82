//! Scoped ownership of one host reference

use std::fmt;
use std::mem::ManuallyDrop;

use super::Host;

/// One stake on a host value, released on drop
///
/// Cloning takes a fresh stake instead of sharing this one, so every
/// `Retained` is independently valid to drop exactly once.
pub struct Retained<H: Host> {
    host: H,
    handle: H::Handle,
}

impl<H: Host> Retained<H> {
    /// Take a new stake on a borrowed handle
    pub fn retain(host: H, handle: H::Handle) -> Self {
        host.retain(handle);
        Self { host, handle }
    }

    /// Take ownership of a new reference returned by the host
    pub fn adopt(host: H, handle: H::Handle) -> Self {
        Self { host, handle }
    }

    /// The handle this stake is on
    pub fn handle(&self) -> H::Handle {
        self.handle
    }

    /// The host that owns the value
    pub fn host(&self) -> H {
        self.host
    }

    /// Give the stake away without releasing it
    ///
    /// Used when the host steals a reference, e.g. when filling a tuple.
    pub fn into_raw(self) -> H::Handle {
        let this = ManuallyDrop::new(self);
        this.handle
    }
}

impl<H: Host> Clone for Retained<H> {
    fn clone(&self) -> Self {
        Self::retain(self.host, self.handle)
    }
}

impl<H: Host> Drop for Retained<H> {
    fn drop(&mut self) {
        self.host.release(self.handle);
    }
}

impl<H: Host> PartialEq for Retained<H> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<H: Host> fmt::Debug for Retained<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Retained").field(&self.handle).finish()
    }
}
