//! Core [`Entity`] trait, per-instance state, and the hook seam.
//!
//! An entity is an identity-bearing node that may own a component set and
//! may belong to at most one [`EntityCollective`]. Collaborators customise
//! behavior by implementing the four hook methods; all of them default to
//! accept/no-op, so [`BaseEntity`] is enough when no custom behavior is
//! needed.
//!
//! The serial and the container back-reference are written only by the
//! owning registry; external code observes them but cannot forge them.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use tether_ident::{InstanceId, Serial};

use crate::any::AsAny;
use crate::collective::EntityCollective;
use crate::component::Component;
use crate::set::ComponentSet;

/// The core entity trait.
///
/// The validation hooks may veto a component add/remove before any state is
/// touched; the notification hooks fire after the mutation has committed,
/// outside the collection lock. Hook panics are never caught by the
/// collection — a hook is trusted application code.
pub trait Entity: AsAny + Send + Sync {
    /// The per-instance registry state embedded in this entity.
    fn base(&self) -> &EntityBase;

    /// Veto point for component admission. Default: accept.
    fn validate_component_add(&self, component: &Arc<dyn Component>) -> bool {
        let _ = component;
        true
    }

    /// Veto point for component removal. Bypassed by forced removal.
    /// Default: accept.
    fn validate_component_remove(&self, component: &Arc<dyn Component>) -> bool {
        let _ = component;
        true
    }

    /// Fired after a component has been attached.
    fn on_component_added(&self, component: &Arc<dyn Component>) {
        let _ = component;
    }

    /// Fired after a component has been detached.
    fn on_component_removed(&self, component: &Arc<dyn Component>) {
        let _ = component;
    }
}

/// Per-instance state every entity carries: identity tag, serial, container
/// back-reference, and the lazily-created component set.
pub struct EntityBase {
    ident: InstanceId,
    serial: AtomicU32,
    container: RwLock<Option<Weak<EntityCollective>>>,
    components: OnceLock<ComponentSet>,
}

impl EntityBase {
    /// Create unregistered state: serial zero, no container, fresh tag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ident: InstanceId::next(),
            serial: AtomicU32::new(Serial::ZERO.raw()),
            container: RwLock::new(None),
            components: OnceLock::new(),
        }
    }

    /// The identity tag captured at construction. Stable for the lifetime
    /// of the instance.
    #[must_use]
    pub fn ident(&self) -> InstanceId {
        self.ident
    }

    /// The entity's serial. Zero until first admitted to a registry; sticky
    /// afterwards, surviving removal.
    #[must_use]
    pub fn serial(&self) -> Serial {
        Serial::from_raw(self.serial.load(Ordering::Acquire))
    }

    /// The owning registry, or `None` if unregistered (or the registry is
    /// gone).
    #[must_use]
    pub fn container(&self) -> Option<Arc<EntityCollective>> {
        self.container.read().as_ref().and_then(Weak::upgrade)
    }

    /// Serial writes happen only under the owning registry's lock.
    pub(crate) fn set_serial(&self, serial: Serial) {
        self.serial.store(serial.raw(), Ordering::Release);
    }

    /// Atomically claim this entity for `owner`. Fails if it already
    /// belongs to a live registry.
    pub(crate) fn try_claim(&self, owner: Weak<EntityCollective>) -> bool {
        let mut slot = self.container.write();
        if slot.as_ref().is_some_and(|current| current.upgrade().is_some()) {
            return false;
        }
        *slot = Some(owner);
        true
    }

    /// Clear the back-reference, but only if it still points at `owner`.
    pub(crate) fn release_container(&self, owner: &Weak<EntityCollective>) -> bool {
        let mut slot = self.container.write();
        match slot.as_ref() {
            Some(current) if current.ptr_eq(owner) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// O(1) membership check: does the back-reference point at `owner`?
    pub(crate) fn is_contained_by(&self, owner: &Weak<EntityCollective>) -> bool {
        self.container
            .read()
            .as_ref()
            .is_some_and(|current| current.ptr_eq(owner))
    }

    pub(crate) fn components_or_init(
        &self,
        init: impl FnOnce() -> ComponentSet,
    ) -> &ComponentSet {
        self.components.get_or_init(init)
    }
}

impl Default for EntityBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBase")
            .field("ident", &self.ident)
            .field("serial", &self.serial())
            .field("registered", &self.container().is_some())
            .finish()
    }
}

/// An [`Entity`] with no overridden hooks, for collaborators that only need
/// the membership bookkeeping.
#[derive(Debug, Default)]
pub struct BaseEntity {
    base: EntityBase,
}

impl Entity for BaseEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

/// Shared-handle operations on entities.
///
/// The component set needs a weak handle back to its owner, so it is
/// reachable only through an `Arc`: the set is created on first access and
/// lives as long as the entity does.
pub trait EntityExt {
    /// The component set owned by this entity, created lazily on first
    /// access.
    fn components(&self) -> &ComponentSet;
}

impl EntityExt for Arc<dyn Entity> {
    fn components(&self) -> &ComponentSet {
        self.base()
            .components_or_init(|| ComponentSet::new(Arc::downgrade(self)))
    }
}

impl<E: Entity> EntityExt for Arc<E> {
    fn components(&self) -> &ComponentSet {
        self.base().components_or_init(|| {
            let handle: Arc<dyn Entity> = self.clone();
            ComponentSet::new(Arc::downgrade(&handle))
        })
    }
}
