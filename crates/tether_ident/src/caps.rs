//! Per-type capability cache.
//!
//! Component lookup by static type is a linear scan over an identity set.
//! Before scanning, the collection asks this cache whether the requested
//! type could be present at all. Rust exposes no runtime trait-membership
//! inspection, so capability is observed rather than computed: the first
//! successful admission of a concrete type as a component (or entity)
//! records its `TypeId` here. A type never admitted anywhere in the process
//! cannot be a member of any collection, so a miss skips the scan with no
//! false negatives.
//!
//! Entries are written lazily and never removed. Concurrent first-time
//! writers all record the same deterministic fact; the race is benign and
//! the sharded map needs no external locking.

use std::any::TypeId;
use std::sync::LazyLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

static CAPS: LazyLock<DashMap<TypeId, TypeCaps>> = LazyLock::new(DashMap::new);

/// Capability flags recorded for one concrete type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCaps {
    /// An instance of this type has been admitted to a component set.
    pub can_be_component: bool,
    /// An instance of this type has been admitted to an entity registry.
    pub can_be_entity: bool,
}

/// Returns the recorded capabilities for `type_id`.
///
/// Types never seen by the registry report all-false, which callers treat
/// as "cannot be present anywhere".
#[must_use]
pub fn caps_of(type_id: TypeId) -> TypeCaps {
    CAPS.get(&type_id).map(|entry| *entry).unwrap_or_default()
}

/// Record that a value of `type_id` was admitted as a component.
pub fn note_component(type_id: TypeId) {
    CAPS.entry(type_id)
        .and_modify(|caps| caps.can_be_component = true)
        .or_insert(TypeCaps {
            can_be_component: true,
            can_be_entity: false,
        });
}

/// Record that a value of `type_id` was admitted as an entity.
pub fn note_entity(type_id: TypeId) {
    CAPS.entry(type_id)
        .and_modify(|caps| caps.can_be_entity = true)
        .or_insert(TypeCaps {
            can_be_component: false,
            can_be_entity: true,
        });
}
