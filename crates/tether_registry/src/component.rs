//! Core [`Component`] trait and per-instance state.
//!
//! A component augments one entity with data or behavior; it never exists
//! as a member of more than one entity at a time. Implementors embed a
//! [`ComponentBase`] and hand it out through [`Component::base`]; everything
//! else about the concrete type is the collaborator's business.
//!
//! The entity back-reference lives inside [`ComponentBase`] and can only be
//! written by this crate. Collaborators cannot forge an attachment without
//! going through [`ComponentSet`] add/remove.
//!
//! [`ComponentSet`]: crate::set::ComponentSet

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tether_ident::InstanceId;

use crate::any::AsAny;
use crate::entity::Entity;

/// The core component trait.
///
/// Requires `Send + Sync` because collections may be driven from any number
/// of threads. Identity (equality, hashing) goes through the embedded
/// [`ComponentBase`], never through addresses.
///
/// # Examples
///
/// ```rust
/// use tether_registry::{Component, ComponentBase};
///
/// #[derive(Default)]
/// struct Health {
///     base: ComponentBase,
///     current: f32,
/// }
///
/// impl Component for Health {
///     fn base(&self) -> &ComponentBase {
///         &self.base
///     }
/// }
/// ```
pub trait Component: AsAny + Send + Sync {
    /// The per-instance registry state embedded in this component.
    fn base(&self) -> &ComponentBase;
}

/// Per-instance state every component carries: the identity tag and the
/// exclusive back-reference to the owning entity.
pub struct ComponentBase {
    ident: InstanceId,
    owner: RwLock<Option<Weak<dyn Entity>>>,
}

impl ComponentBase {
    /// Create detached state with a fresh identity tag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ident: InstanceId::next(),
            owner: RwLock::new(None),
        }
    }

    /// The identity tag captured at construction. Stable for the lifetime
    /// of the instance.
    #[must_use]
    pub fn ident(&self) -> InstanceId {
        self.ident
    }

    /// The owning entity, or `None` if detached (or the owner is gone).
    #[must_use]
    pub fn entity(&self) -> Option<Arc<dyn Entity>> {
        self.owner.read().as_ref().and_then(Weak::upgrade)
    }

    /// Returns `true` if this component currently belongs to a live entity.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.entity().is_some()
    }

    /// Atomically claim this component for `owner`. Fails if it already
    /// belongs to a live entity. This cell is the test-and-set point that
    /// stops two collections from both admitting the same component.
    pub(crate) fn try_claim(&self, owner: Weak<dyn Entity>) -> bool {
        let mut slot = self.owner.write();
        if slot.as_ref().is_some_and(|current| current.upgrade().is_some()) {
            return false;
        }
        *slot = Some(owner);
        true
    }

    /// Clear the back-reference, but only if it still points at
    /// `expected_owner`.
    pub(crate) fn release(&self, expected_owner: InstanceId) -> bool {
        let mut slot = self.owner.write();
        match slot.as_ref().and_then(Weak::upgrade) {
            Some(current) if current.base().ident() == expected_owner => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for ComponentBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("ident", &self.ident)
            .field("attached", &self.is_attached())
            .finish()
    }
}
