//! Scoped, refcounted references to a diagram address.
//!
//! A [`Handle`] pairs an [`Address`] with the [`Manager`] it belongs to
//! (§9 *Cyclic handle<->manager back-reference*, option (a): the handle
//! carries an explicit reference to its manager rather than threading a
//! manager parameter through every call site). Creating or cloning a
//! handle retains its address; dropping or reassigning one releases it.
//! Two handles from different managers must never be compared or combined
//! — doing so is a caller bug, not a recoverable error, since a manager's
//! addresses are only meaningful relative to its own arena.

use crate::addr::Address;
use crate::manager::Manager;

/// A live reference to a diagram. Holding a `Handle` keeps its address (and
/// transitively, everything it depends on) alive across garbage collection.
pub struct Handle {
    addr: Address,
    manager: Manager,
}

impl Handle {
    pub(crate) fn new(manager: Manager, addr: Address) -> Self {
        manager.retain(addr);
        Handle { addr, manager }
    }

    pub fn addr(&self) -> Address {
        self.addr
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        Handle::new(self.manager.clone(), self.addr)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.manager.release(self.addr);
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("addr", &self.addr).finish()
    }
}

impl PartialEq for Handle {
    /// Two handles are equal iff they reference the same address.
    /// Canonicity (§3 invariant 5 / §8 property 7) means structurally
    /// identical diagrams built on the *same* manager always share an
    /// address, so this is exactly set-family equality within one manager.
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for Handle {}
