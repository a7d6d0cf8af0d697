//! Instance identity tags.
//!
//! Entities and components compare and hash by an [`InstanceId`] captured
//! once at construction, never by address. Addresses are not a stable
//! identity under every runtime, and two live nodes must never collide, so
//! the tag comes from a process-wide atomic counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter starts at 1; zero is the reserved [`InstanceId::UNSET`] sentinel.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// A process-wide unique identity tag for one entity or component instance.
///
/// Tags are monotonically increasing and never reused. Zero is reserved and
/// never returned by [`InstanceId::next`]; a 64-bit counter cannot exhaust
/// in practice, so wraparound back into the sentinel is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The reserved "no instance" sentinel. Never produced by [`next`].
    ///
    /// [`next`]: InstanceId::next
    pub const UNSET: InstanceId = InstanceId(0);

    /// Allocate a fresh, process-wide unique tag.
    ///
    /// Safe to call from any number of threads concurrently; no two calls
    /// ever observe the same value.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw `u64` tag value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is the reserved sentinel.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
