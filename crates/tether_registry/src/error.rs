//! Registry error types.
//!
//! Routine rejections (ownership conflicts, duplicate serials, a validation
//! hook saying no) are reported as `bool` results and never appear here.
//! These types cover everything that must carry more information than a
//! rejection: enumeration invalidation, strict-lookup misses, and the fatal
//! class of invariant violations.

use thiserror::Error;

use tether_ident::{InstanceId, Serial};

/// Errors reported by registry and collection operations.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The collection was structurally modified while an enumeration was in
    /// progress. Recoverable by restarting the enumeration.
    #[error("collection changed during enumeration (version {expected} -> {actual})")]
    CollectionChanged {
        /// Version captured when the enumeration began.
        expected: u64,
        /// Version observed on the failing step.
        actual: u64,
    },

    /// A get-or-create style operation could not admit its fresh instance.
    /// Signals a broken precondition in the caller's hooks, not a routine
    /// runtime condition.
    #[error("component {ident} was rejected by the owning entity")]
    AddRejected {
        /// Identity tag of the rejected instance.
        ident: InstanceId,
    },

    /// Strict lookup by serial found no member.
    #[error("no entity registered under serial {0}")]
    NoSuchSerial(Serial),

    /// The registry's stored state no longer matches its invariants.
    #[error(transparent)]
    Fatal(#[from] InvariantViolation),
}

/// Fatal, unrecoverable invariant violations.
///
/// These indicate that a rollback path has already failed: the structure's
/// state no longer matches its own invariants. They must never be silently
/// retried; the process-level caller should treat them as a bug report.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A two-phase move released an object from its old owner, the new
    /// owner refused it, and re-adding it to the old owner failed. The
    /// object is ownerless when it should not be.
    #[error("object {ident} left ownerless after a failed move rollback")]
    Ownerless {
        /// Identity tag of the stranded object.
        ident: InstanceId,
    },

    /// A serial change inserted the entity under its new serial but could
    /// not retire the old entry, leaving one entity reachable twice.
    #[error("entity {ident} reachable under serials {old} and {new}")]
    DualSerial {
        /// Identity tag of the doubly-registered entity.
        ident: InstanceId,
        /// The serial that should have been retired.
        old: Serial,
        /// The serial the entity was re-registered under.
        new: Serial,
    },

    /// Serial allocation probed the entire 32-bit space without finding a
    /// free value.
    #[error("serial space exhausted: no free 32-bit serial remains")]
    SerialSpaceExhausted,
}
