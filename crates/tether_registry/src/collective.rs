//! Serial-keyed entity registry.
//!
//! An [`EntityCollective`] owns the entities admitted to it, keyed by
//! [`Serial`]. It allocates serials (zero reserved, sticky once assigned),
//! enforces exclusive containment through the entity's back-reference cell,
//! and exposes the same validate/notify seam the per-entity component set
//! has — here as a [`CollectiveHooks`] trait object, since registries are
//! concrete.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error};

use tether_ident::{note_entity, Serial};

use crate::entity::Entity;
use crate::error::{InvariantViolation, RegistryError};

/// Per-registry extension points. All methods default to accept/no-op;
/// `()` is the hookless registry.
///
/// Validation hooks run before any state is touched and may veto;
/// notification hooks fire after the mutation has committed, outside the
/// registry lock. Hook panics are never caught.
pub trait CollectiveHooks: Send + Sync {
    /// Veto point for entity admission. Default: accept.
    fn validate_add(&self, entity: &Arc<dyn Entity>) -> bool {
        let _ = entity;
        true
    }

    /// Veto point for entity removal. Bypassed by forced removal.
    /// Default: accept.
    fn validate_remove(&self, entity: &Arc<dyn Entity>) -> bool {
        let _ = entity;
        true
    }

    /// Fired after an entity has been admitted.
    fn on_added(&self, entity: &Arc<dyn Entity>) {
        let _ = entity;
    }

    /// Fired after an entity has been released.
    fn on_removed(&self, entity: &Arc<dyn Entity>) {
        let _ = entity;
    }
}

impl CollectiveHooks for () {}

struct CollectiveInner {
    entities: HashMap<Serial, Arc<dyn Entity>>,
    last_serial: Serial,
    /// Bumped on every structural change; enumerations fail on mismatch.
    version: u64,
}

/// A registry of entities under one serial namespace.
///
/// Constructed behind an `Arc` so member entities can hold weak
/// back-references; exactly one collective may claim an entity at a time.
pub struct EntityCollective {
    weak_self: Weak<EntityCollective>,
    hooks: Box<dyn CollectiveHooks>,
    inner: Mutex<CollectiveInner>,
}

impl EntityCollective {
    /// Create a registry with no hooks.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_hooks(())
    }

    /// Create a registry with the given extension hooks.
    #[must_use]
    pub fn with_hooks(hooks: impl CollectiveHooks + 'static) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            hooks: Box::new(hooks),
            inner: Mutex::new(CollectiveInner {
                entities: HashMap::new(),
                last_serial: Serial::ZERO,
                version: 0,
            }),
        })
    }

    /// Number of entities currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entities.len()
    }

    /// Returns `true` if no entities are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entities.is_empty()
    }

    /// O(1) membership test: does `entity`'s container reference point at
    /// this registry?
    #[must_use]
    pub fn contains(&self, entity: &Arc<dyn Entity>) -> bool {
        entity.base().is_contained_by(&self.weak_self)
    }

    /// Returns `true` if `serial` is registered here.
    #[must_use]
    pub fn contains_serial(&self, serial: Serial) -> bool {
        self.inner.lock().entities.contains_key(&serial)
    }

    /// Lookup by serial.
    #[must_use]
    pub fn try_get(&self, serial: Serial) -> Option<Arc<dyn Entity>> {
        self.inner.lock().entities.get(&serial).cloned()
    }

    /// Strict lookup by serial; a miss is a caller error, not a routine
    /// condition.
    pub fn get(&self, serial: Serial) -> Result<Arc<dyn Entity>, RegistryError> {
        self.try_get(serial)
            .ok_or(RegistryError::NoSuchSerial(serial))
    }

    /// Return the next unused, non-zero serial.
    ///
    /// Does not reserve the value; admission re-checks under the same lock.
    /// Fails closed with [`InvariantViolation::SerialSpaceExhausted`] after
    /// probing the full 32-bit space.
    pub fn new_serial(&self) -> Result<Serial, InvariantViolation> {
        Self::alloc_serial(&mut self.inner.lock())
    }

    fn alloc_serial(inner: &mut CollectiveInner) -> Result<Serial, InvariantViolation> {
        let mut probes: u64 = 0;
        loop {
            probes += 1;
            if probes > u64::from(u32::MAX) {
                return Err(InvariantViolation::SerialSpaceExhausted);
            }
            inner.last_serial = inner.last_serial.next();
            if inner.last_serial.is_zero() {
                continue;
            }
            if !inner.entities.contains_key(&inner.last_serial) {
                return Ok(inner.last_serial);
            }
        }
    }

    /// Admit `entity` into this registry.
    ///
    /// Returns `false` if the entity already belongs to some registry, its
    /// current non-zero serial is taken here, or the add-validation hook
    /// rejects it. A zero serial gets a fresh allocation; an assigned one
    /// is kept (serials are sticky). `on_added` fires after the lock is
    /// released.
    pub fn add(&self, entity: &Arc<dyn Entity>) -> bool {
        if entity.base().container().is_some() {
            return false;
        }
        // Fast reject outside the lock; re-checked below.
        let serial = entity.base().serial();
        if !serial.is_zero() && self.contains_serial(serial) {
            return false;
        }
        if !self.hooks.validate_add(entity) {
            return false;
        }
        let assigned = {
            let mut inner = self.inner.lock();
            let serial = entity.base().serial();
            let serial = if serial.is_zero() {
                match Self::alloc_serial(&mut inner) {
                    Ok(fresh) => fresh,
                    Err(violation) => {
                        error!(%violation, "entity admission failed");
                        return false;
                    }
                }
            } else if inner.entities.contains_key(&serial) {
                return false;
            } else {
                serial
            };
            if !entity.base().try_claim(self.weak_self.clone()) {
                return false;
            }
            entity.base().set_serial(serial);
            inner.entities.insert(serial, entity.clone());
            inner.version += 1;
            serial
        };
        note_entity((**entity).as_any().type_id());
        self.hooks.on_added(entity);
        debug!(serial = %assigned, entity = %entity.base().ident(), "entity admitted");
        true
    }

    /// Release `entity` from this registry.
    ///
    /// Returns `false` if the entity is not a member here, or if (absent
    /// `force`) the remove-validation hook rejects it. The serial is left
    /// on the entity; re-admission reuses it. `on_removed` fires after the
    /// lock is released.
    pub fn remove(&self, entity: &Arc<dyn Entity>, force: bool) -> bool {
        if !self.contains(entity) {
            return false;
        }
        if !force && !self.hooks.validate_remove(entity) {
            return false;
        }
        let removed = {
            let mut inner = self.inner.lock();
            let serial = entity.base().serial();
            match inner.entities.get(&serial) {
                Some(member) if member.base().ident() == entity.base().ident() => {
                    inner.entities.remove(&serial);
                    inner.version += 1;
                    entity.base().release_container(&self.weak_self);
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.hooks.on_removed(entity);
            debug!(serial = %entity.base().serial(), "entity released");
        }
        removed
    }

    /// Re-key a member entity under `new_serial`.
    ///
    /// Returns `Ok(false)` for routine rejections: zero serial, non-member
    /// (including an entity removed concurrently with this call), unchanged
    /// serial, or a serial already taken. Returns
    /// [`InvariantViolation::DualSerial`] if the old entry cannot be
    /// retired after the new one was created — the registry then holds the
    /// same entity under two serials and the state is unrecoverable.
    pub fn try_change_serial(
        &self,
        entity: &Arc<dyn Entity>,
        new_serial: Serial,
    ) -> Result<bool, InvariantViolation> {
        if new_serial.is_zero() || !self.contains(entity) {
            return Ok(false);
        }
        let mut inner = self.inner.lock();
        let old_serial = entity.base().serial();
        if old_serial == new_serial || inner.entities.contains_key(&new_serial) {
            return Ok(false);
        }
        // Membership re-checked under the lock, like add/remove: a removal
        // can commit between the fast check above and this point.
        match inner.entities.get(&old_serial) {
            Some(member) if member.base().ident() == entity.base().ident() => {}
            _ => return Ok(false),
        }
        inner.entities.insert(new_serial, entity.clone());
        match inner.entities.remove(&old_serial) {
            Some(member) if member.base().ident() == entity.base().ident() => {
                entity.base().set_serial(new_serial);
                inner.version += 1;
                Ok(true)
            }
            _ => {
                let violation = InvariantViolation::DualSerial {
                    ident: entity.base().ident(),
                    old: old_serial,
                    new: new_serial,
                };
                error!(%violation, "registry state no longer matches its invariants");
                Err(violation)
            }
        }
    }

    /// Enumerate the entities present when the call was made.
    ///
    /// Same contract as the component set's enumeration: any structural
    /// change mid-enumeration makes the next step yield
    /// [`RegistryError::CollectionChanged`], after which the iterator is
    /// fused.
    #[must_use]
    pub fn iter(&self) -> EntityIter<'_> {
        let inner = self.inner.lock();
        EntityIter {
            collective: self,
            snapshot: inner.entities.values().cloned().collect(),
            version: inner.version,
            cursor: 0,
        }
    }

    pub(crate) fn validate_release_of(&self, entity: &Arc<dyn Entity>) -> bool {
        self.hooks.validate_remove(entity)
    }

    /// Pre-validation for the move protocol: would a plain `add` of
    /// `entity` be accepted right now? Covers the hook and serial
    /// availability so a doomed transfer mutates nothing.
    pub(crate) fn validate_admission_of(&self, entity: &Arc<dyn Entity>) -> bool {
        let serial = entity.base().serial();
        if !serial.is_zero() && self.contains_serial(serial) {
            return false;
        }
        self.hooks.validate_add(entity)
    }
}

impl fmt::Debug for EntityCollective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("EntityCollective")
            .field("len", &inner.entities.len())
            .field("last_serial", &inner.last_serial)
            .field("version", &inner.version)
            .finish()
    }
}

/// Version-checked enumeration over an [`EntityCollective`].
pub struct EntityIter<'a> {
    collective: &'a EntityCollective,
    snapshot: Vec<Arc<dyn Entity>>,
    version: u64,
    cursor: usize,
}

impl Iterator for EntityIter<'_> {
    type Item = Result<Arc<dyn Entity>, RegistryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.snapshot.len() {
            return None;
        }
        let actual = self.collective.inner.lock().version;
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
