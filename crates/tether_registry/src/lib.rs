//! # tether_registry
//!
//! Entity/component ownership bookkeeping. Entities may hold an unordered
//! set of components; a registry holds a serial-keyed set of entities. Both
//! relationships are exclusive single-owner relationships, enforced through
//! non-forgeable back-references and a shared two-phase move protocol.
//!
//! This crate provides:
//!
//! - [`Component`] / [`Entity`] traits — the node contracts, with embedded
//!   [`ComponentBase`] / [`EntityBase`] state and per-entity hooks.
//! - [`ComponentSet`] — the per-entity component collection.
//! - [`EntityCollective`] — the serial-keyed entity registry, with
//!   [`CollectiveHooks`] as its extension seam.
//! - [`move_component`] / [`move_entity`] — cross-owner transfer with
//!   pre-validation and rollback.
//! - [`RegistryError`] / [`InvariantViolation`] — the recoverable and fatal
//!   failure taxonomies.

pub mod any;
pub mod collective;
pub mod component;
pub mod entity;
pub mod error;
pub mod relocate;
pub mod set;

pub use any::AsAny;
pub use collective::{CollectiveHooks, EntityCollective, EntityIter};
pub use component::{Component, ComponentBase};
pub use entity::{BaseEntity, Entity, EntityBase, EntityExt};
pub use error::{InvariantViolation, RegistryError};
pub use relocate::{move_component, move_entity, MoveOutcome};
pub use set::{ComponentIter, ComponentSet};

pub use tether_ident::{InstanceId, Serial, TypeCaps};
