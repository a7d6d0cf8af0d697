//! Cross-owner transfer protocol.
//!
//! Component-to-entity reattachment and entity-to-registry re-containment
//! are the same problem: move an object between exclusive owners without an
//! observable state where it belongs to both, and without stranding it when
//! the target refuses. One generic routine covers both, parameterised over
//! an owner role.
//!
//! The move is not globally atomic: between the forced release from the old
//! owner and the admission by the new one there is a window where the
//! object has no owner. Concurrent enumeration of either side during that
//! window sees the object as absent; nothing depends on the window being
//! invisible.

use std::sync::Arc;

use tracing::{error, warn};

use tether_ident::InstanceId;

use crate::collective::EntityCollective;
use crate::component::Component;
use crate::entity::{Entity, EntityExt};
use crate::error::InvariantViolation;

/// How a transfer request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Old and new owner were the same (or both absent); nothing happened.
    Unchanged,
    /// The object now belongs to the requested owner (or to no owner, when
    /// the request was a plain detach).
    Moved,
    /// Validation or admission refused the request. Where both owners were
    /// present, the object is exactly where it started.
    Rejected,
}

/// One side of an exclusive ownership relationship, as seen by the
/// transfer routine.
pub(crate) trait OwnerRole {
    type Item: ?Sized;

    fn same_owner(&self, other: &Self) -> bool;

    /// Would removal be accepted right now? Hook check only; no mutation.
    fn can_release(&self, item: &Arc<Self::Item>) -> bool;

    /// Would admission be accepted right now? No mutation.
    fn can_admit(&self, item: &Arc<Self::Item>) -> bool;

    /// Plain add, including its own validation.
    fn admit(&self, item: &Arc<Self::Item>) -> bool;

    /// Remove; `force` skips the already-passed validation.
    fn release(&self, item: &Arc<Self::Item>, force: bool) -> bool;

    fn item_ident(item: &Arc<Self::Item>) -> InstanceId;
}

/// The shared two-phase algorithm. Pre-validates both ends, then releases
/// (forced) and admits; a refused admission rolls back to the old owner,
/// and a failed rollback is the fatal, unrecoverable case.
pub(crate) fn relocate<O: OwnerRole>(
    item: &Arc<O::Item>,
    from: Option<&O>,
    to: Option<&O>,
) -> Result<MoveOutcome, InvariantViolation> {
    match (from, to) {
        (None, None) => Ok(MoveOutcome::Unchanged),
        (Some(old), Some(new)) if old.same_owner(new) => Ok(MoveOutcome::Unchanged),
        (None, Some(new)) => Ok(if new.admit(item) {
            MoveOutcome::Moved
        } else {
            MoveOutcome::Rejected
        }),
        (Some(old), None) => Ok(if old.release(item, false) {
            MoveOutcome::Moved
        } else {
            MoveOutcome::Rejected
        }),
        (Some(old), Some(new)) => {
            if !old.can_release(item) || !new.can_admit(item) {
                return Ok(MoveOutcome::Rejected);
            }
            if !old.release(item, true) {
                // Ownership changed under us before any mutation; nothing
                // to undo.
                return Ok(MoveOutcome::Rejected);
            }
            if new.admit(item) {
                return Ok(MoveOutcome::Moved);
            }
            if old.admit(item) {
                warn!(
                    item = %O::item_ident(item),
                    "move target refused mid-transfer; previous owner restored"
                );
                return Ok(MoveOutcome::Rejected);
            }
            let violation = InvariantViolation::Ownerless {
                ident: O::item_ident(item),
            };
            error!(%violation, "rollback failed after forced release");
            Err(violation)
        }
    }
}

impl OwnerRole for Arc<dyn Entity> {
    type Item = dyn Component;

    fn same_owner(&self, other: &Self) -> bool {
        self.base().ident() == other.base().ident()
    }

    fn can_release(&self, item: &Arc<dyn Component>) -> bool {
        self.validate_component_remove(item)
    }

    fn can_admit(&self, item: &Arc<dyn Component>) -> bool {
        self.validate_component_add(item)
    }

    fn admit(&self, item: &Arc<dyn Component>) -> bool {
        self.components().add(item)
    }

    fn release(&self, item: &Arc<dyn Component>, force: bool) -> bool {
        self.components().remove(item, force)
    }

    fn item_ident(item: &Arc<dyn Component>) -> InstanceId {
        item.base().ident()
    }
}

impl OwnerRole for Arc<EntityCollective> {
    type Item = dyn Entity;

    fn same_owner(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn can_release(&self, item: &Arc<dyn Entity>) -> bool {
        self.validate_release_of(item)
    }

    fn can_admit(&self, item: &Arc<dyn Entity>) -> bool {
        self.validate_admission_of(item)
    }

    fn admit(&self, item: &Arc<dyn Entity>) -> bool {
        self.add(item)
    }

    fn release(&self, item: &Arc<dyn Entity>, force: bool) -> bool {
        self.remove(item, force)
    }

    fn item_ident(item: &Arc<dyn Entity>) -> InstanceId {
        item.base().ident()
    }
}

/// Move `component` to `target` (or detach it when `target` is `None`).
///
/// The current owner is taken from the component's back-reference. With
/// both owners present, validation on both ends happens before any
/// mutation, so a doomed move leaves the component exactly where it was.
pub fn move_component(
    component: &Arc<dyn Component>,
    target: Option<&Arc<dyn Entity>>,
) -> Result<MoveOutcome, InvariantViolation> {
    let current = component.base().entity();
    relocate(component, current.as_ref(), target)
}

/// Move `entity` to `target` (or release it when `target` is `None`).
///
/// Same contract as [`move_component`], at registry granularity; the
/// addability pre-check covers the target's hook and serial availability.
pub fn move_entity(
    entity: &Arc<dyn Entity>,
    target: Option<&Arc<EntityCollective>>,
) -> Result<MoveOutcome, InvariantViolation> {
    let current = entity.base().container();
    relocate(entity, current.as_ref(), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::collective::CollectiveHooks;
    use crate::component::ComponentBase;
    use crate::entity::{BaseEntity, EntityBase};

    #[derive(Default)]
    struct Payload {
        base: ComponentBase,
    }

    impl Component for Payload {
        fn base(&self) -> &ComponentBase {
            &self.base
        }
    }

    /// Entity that refuses every component admission.
    #[derive(Default)]
    struct Refuser {
        base: EntityBase,
    }

    impl Entity for Refuser {
        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn validate_component_add(&self, _component: &Arc<dyn Component>) -> bool {
            false
        }
    }

    /// Entity that accepts a bounded number of component admissions, then
    /// refuses. Used to fail the admit step after pre-validation passed.
    struct Miser {
        base: EntityBase,
        budget: AtomicUsize,
    }

    impl Miser {
        fn with_budget(budget: usize) -> Self {
            Self {
                base: EntityBase::new(),
                budget: AtomicUsize::new(budget),
            }
        }
    }

    impl Entity for Miser {
        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn validate_component_add(&self, _component: &Arc<dyn Component>) -> bool {
            loop {
                let left = self.budget.load(Ordering::Relaxed);
                if left == 0 {
                    return false;
                }
                if self
                    .budget
                    .compare_exchange(left, left - 1, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    return true;
                }
            }
        }
    }

    fn attach(entity: &Arc<dyn Entity>) -> Arc<dyn Component> {
        let component: Arc<dyn Component> = Arc::new(Payload::default());
        assert!(entity.components().add(&component));
        component
    }

    #[test]
    fn test_move_to_same_owner_is_unchanged() {
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let component = attach(&e1);
        assert_eq!(move_component(&component, Some(&e1)), Ok(MoveOutcome::Unchanged));
        assert_eq!(e1.components().len(), 1);
    }

    #[test]
    fn test_detached_move_delegates_to_add() {
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let component: Arc<dyn Component> = Arc::new(Payload::default());
        assert_eq!(move_component(&component, Some(&e1)), Ok(MoveOutcome::Moved));
        assert!(e1.components().contains(&component));
    }

    #[test]
    fn test_move_to_none_delegates_to_remove() {
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let component = attach(&e1);
        assert_eq!(move_component(&component, None), Ok(MoveOutcome::Moved));
        assert!(!component.base().is_attached());
        assert!(e1.components().is_empty());

        // Detaching a detached component changes nothing.
        assert_eq!(move_component(&component, None), Ok(MoveOutcome::Unchanged));
    }

    #[test]
    fn test_component_move_between_entities() {
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let e2: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let component = attach(&e1);

        assert_eq!(move_component(&component, Some(&e2)), Ok(MoveOutcome::Moved));
        assert!(e1.components().is_empty());
        assert!(e2.components().contains(&component));
        assert_eq!(
            component.base().entity().unwrap().base().ident(),
            e2.base().ident()
        );
    }

    #[test]
    fn test_rejecting_target_leaves_component_in_place() {
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let e2: Arc<dyn Entity> = Arc::new(Refuser::default());
        let component = attach(&e1);

        assert_eq!(move_component(&component, Some(&e2)), Ok(MoveOutcome::Rejected));
        assert!(e1.components().contains(&component));
        assert_eq!(
            component.base().entity().unwrap().base().ident(),
            e1.base().ident()
        );
    }

    #[test]
    fn test_admission_failure_after_prevalidation_rolls_back() {
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        // Budget 1: spent on pre-validation, so the actual admit refuses.
        let e2: Arc<dyn Entity> = Arc::new(Miser::with_budget(1));
        let component = attach(&e1);

        assert_eq!(move_component(&component, Some(&e2)), Ok(MoveOutcome::Rejected));
        assert!(e1.components().contains(&component));
        assert!(e2.components().is_empty());
    }

    #[test]
    fn test_failed_rollback_reports_ownerless() {
        // Old owner accepts exactly one admission (the original attach), so
        // the rollback re-add fails; the target spends its single
        // acceptance on pre-validation.
        let e1: Arc<dyn Entity> = Arc::new(Miser::with_budget(1));
        let e2: Arc<dyn Entity> = Arc::new(Miser::with_budget(1));
        let component = attach(&e1);

        let result = move_component(&component, Some(&e2));
        assert_eq!(
            result,
            Err(InvariantViolation::Ownerless {
                ident: component.base().ident()
            })
        );
        assert!(!component.base().is_attached());
    }

    /// Registry hooks that refuse all admissions when armed.
    #[derive(Default)]
    struct Gate {
        refuse_add: AtomicBool,
    }

    impl CollectiveHooks for Arc<Gate> {
        fn validate_add(&self, _entity: &Arc<dyn Entity>) -> bool {
            !self.refuse_add.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_entity_move_between_registries() {
        let a = EntityCollective::new();
        let b = EntityCollective::new();
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        assert!(a.add(&e1));
        let serial = e1.base().serial();

        assert_eq!(move_entity(&e1, Some(&b)), Ok(MoveOutcome::Moved));
        assert!(!a.contains(&e1));
        assert!(b.contains(&e1));
        // Sticky serial survives the move.
        assert_eq!(e1.base().serial(), serial);
    }

    #[test]
    fn test_entity_move_to_rejecting_registry_has_no_partial_state() {
        let a = EntityCollective::new();
        let gate = Arc::new(Gate::default());
        gate.refuse_add.store(true, Ordering::Relaxed);
        let b = EntityCollective::with_hooks(gate);

        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        assert!(a.add(&e1));
        let serial = e1.base().serial();

        assert_eq!(move_entity(&e1, Some(&b)), Ok(MoveOutcome::Rejected));
        assert!(a.contains(&e1));
        assert_eq!(e1.base().serial(), serial);
        assert!(b.is_empty());
    }

    #[test]
    fn test_entity_move_blocked_by_serial_collision() {
        let a = EntityCollective::new();
        let b = EntityCollective::new();
        let mover: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        let squatter: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        assert!(a.add(&mover));
        assert!(b.add(&squatter));
        // Both hold serial 1 in their own registries.
        assert_eq!(mover.base().serial(), squatter.base().serial());

        assert_eq!(move_entity(&mover, Some(&b)), Ok(MoveOutcome::Rejected));
        assert!(a.contains(&mover));
    }

    #[test]
    fn test_entity_move_to_same_registry_is_unchanged() {
        let a = EntityCollective::new();
        let e1: Arc<dyn Entity> = Arc::new(BaseEntity::default());
        assert!(a.add(&e1));
        assert_eq!(move_entity(&e1, Some(&a)), Ok(MoveOutcome::Unchanged));
        assert_eq!(a.len(), 1);
    }
}
