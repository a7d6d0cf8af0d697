//! Per-entity component collection.
//!
//! A [`ComponentSet`] indexes the components of one entity by instance
//! identity. It owns the add/remove protocol: ownership is checked first,
//! the owning entity's validation hooks may veto, structural mutation
//! happens under the set's lock, and notification hooks fire after the lock
//! is released. The component's own back-reference cell is the atomic claim
//! point, so two collections can never both admit the same component.
//!
//! Lookup by type is a linear scan, short-circuited by the global
//! capability cache for types that can never be components.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use tether_ident::{caps_of, note_component, InstanceId};

use crate::component::Component;
use crate::entity::Entity;
use crate::error::RegistryError;

struct SetInner {
    items: HashMap<InstanceId, Arc<dyn Component>>,
    /// Bumped on every structural change; enumerations fail on mismatch.
    version: u64,
}

/// The set of components owned by one entity.
pub struct ComponentSet {
    owner: Weak<dyn Entity>,
    inner: Mutex<SetInner>,
}

impl ComponentSet {
    pub(crate) fn new(owner: Weak<dyn Entity>) -> Self {
        Self {
            owner,
            inner: Mutex::new(SetInner {
                items: HashMap::new(),
                version: 0,
            }),
        }
    }

    /// Number of components currently attached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Returns `true` if no components are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Membership test by instance identity.
    #[must_use]
    pub fn contains(&self, component: &Arc<dyn Component>) -> bool {
        self.inner.lock().items.contains_key(&component.base().ident())
    }

    /// Attach `component` to the owning entity.
    ///
    /// Returns `false` if the component already belongs to an entity, or if
    /// the owner's add-validation hook rejects it. On success the
    /// back-reference is set and `on_component_added` fires after the lock
    /// is released.
    ///
    /// The back-reference claim commits before the set insert, so there is
    /// a brief window where the component reports the owner but the set
    /// does not yet list it. Concurrent readers during that window see the
    /// component as attached-but-absent; nothing depends on the window
    /// being invisible.
    pub fn add(&self, component: &Arc<dyn Component>) -> bool {
        let Some(owner) = self.owner.upgrade() else {
            return false;
        };
        // Fast reject outside the lock; the claim below resolves the race.
        if component.base().is_attached() {
            return false;
        }
        if !owner.validate_component_add(component) {
            return false;
        }
        if !component.base().try_claim(self.owner.clone()) {
            return false;
        }
        {
            let mut inner = self.inner.lock();
            inner.items.insert(component.base().ident(), component.clone());
            inner.version += 1;
        }
        note_component((**component).as_any().type_id());
        owner.on_component_added(component);
        debug!(
            component = %component.base().ident(),
            entity = %owner.base().ident(),
            "component attached"
        );
        true
    }

    /// Detach `component` from the owning entity.
    ///
    /// Returns `false` if the component is not attached to this entity, or
    /// if (absent `force`) the owner's remove-validation hook rejects it.
    /// `force` exists for the move protocol, which has already validated
    /// the removal once and must not re-run a hook mid-transfer.
    pub fn remove(&self, component: &Arc<dyn Component>, force: bool) -> bool {
        let Some(owner) = self.owner.upgrade() else {
            return false;
        };
        let owned_here = component
            .base()
            .entity()
            .is_some_and(|entity| entity.base().ident() == owner.base().ident());
        if !owned_here {
            return false;
        }
        if !force && !owner.validate_component_remove(component) {
            return false;
        }
        let removed = {
            let mut inner = self.inner.lock();
            if inner.items.remove(&component.base().ident()).is_some() {
                inner.version += 1;
                component.base().release(owner.base().ident());
                true
            } else {
                false
            }
        };
        if removed {
            owner.on_component_removed(component);
            debug!(component = %component.base().ident(), "component detached");
        }
        removed
    }

    /// Attempt to detach every component.
    ///
    /// Components whose removal the owner's remove-validation hook rejects
    /// are retained: this is a partial-failure operation. Validation and
    /// structural removal happen in a single lock hold — the hook must not
    /// re-enter this set — and removal notifications fire afterwards.
    /// Returns `true` if the set ended up empty.
    pub fn clear(&self) -> bool {
        let Some(owner) = self.owner.upgrade() else {
            return false;
        };
        let (removed, now_empty) = {
            let mut inner = self.inner.lock();
            let accepted: Vec<Arc<dyn Component>> = inner
                .items
                .values()
                .filter(|component| owner.validate_component_remove(component))
                .cloned()
                .collect();
            for component in &accepted {
                inner.items.remove(&component.base().ident());
                component.base().release(owner.base().ident());
            }
            if !accepted.is_empty() {
                inner.version += 1;
            }
            (accepted, inner.items.is_empty())
        };
        for component in &removed {
            owner.on_component_removed(component);
        }
        now_empty
    }

    /// First component whose concrete type is `T`, if any.
    ///
    /// Skips the scan entirely when the capability cache has never seen `T`
    /// admitted as a component anywhere in the process.
    #[must_use]
    pub fn first_of<T: Component>(&self) -> Option<Arc<T>> {
        if !caps_of(TypeId::of::<T>()).can_be_component {
            return None;
        }
        let inner = self.inner.lock();
        inner
            .items
            .values()
            .find_map(|component| component.clone().as_any_arc().downcast::<T>().ok())
    }

    /// Return the first component of type `T`, constructing and attaching a
    /// default instance if none exists.
    ///
    /// Fails with [`RegistryError::AddRejected`] when the owner's
    /// add-validation hook refuses the fresh instance.
    ///
    /// Lookup and creation are not one atomic step: concurrent first calls
    /// for the same `T` may each construct a distinct instance and admit
    /// both. Callers that need exactly one instance per type must serialise
    /// their first access themselves.
    pub fn get_or_create<T: Component + Default>(&self) -> Result<Arc<T>, RegistryError> {
        if let Some(existing) = self.first_of::<T>() {
            return Ok(existing);
        }
        let fresh = Arc::new(T::default());
        let component: Arc<dyn Component> = fresh.clone();
        if self.add(&component) {
            Ok(fresh)
        } else {
            Err(RegistryError::AddRejected {
                ident: component.base().ident(),
            })
        }
    }

    /// Enumerate the components present when the call was made.
    ///
    /// Each step re-checks the structural version: once the set is mutated
    /// mid-enumeration, the next step yields
    /// [`RegistryError::CollectionChanged`] and the iterator fuses.
    #[must_use]
    pub fn iter(&self) -> ComponentIter<'_> {
        let inner = self.inner.lock();
        ComponentIter {
            set: self,
            snapshot: inner.items.values().cloned().collect(),
            version: inner.version,
            cursor: 0,
        }
    }
}

impl std::fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ComponentSet")
            .field("len", &inner.items.len())
            .field("version", &inner.version)
            .finish()
    }
}

/// Version-checked enumeration over a [`ComponentSet`].
pub struct ComponentIter<'a> {
    set: &'a ComponentSet,
    snapshot: Vec<Arc<dyn Component>>,
    version: u64,
    cursor: usize,
}

impl Iterator for ComponentIter<'_> {
    type Item = Result<Arc<dyn Component>, RegistryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.snapshot.len() {
            return None;
        }
        let actual = self.set.inner.lock().version;
        if actual != self.version {
            self.cursor = self.snapshot.len();
            return Some(Err(RegistryError::CollectionChanged {
                expected: self.version,
                actual,
            }));
        }
        let item = self.snapshot[self.cursor].clone();
        self.cursor += 1;
        Some(Ok(item))
    }
}
