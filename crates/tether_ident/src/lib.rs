//! # tether_ident
//!
//! Identity primitives for the entity/component ownership registry.
//!
//! This crate provides:
//!
//! - [`Serial`] — 32-bit per-registry identifiers with a reserved zero
//!   ("unassigned") sentinel.
//! - [`InstanceId`] — process-wide instance identity tags, assigned once at
//!   construction so equality and hashing never depend on addresses.
//! - [`TypeCaps`] and the capability cache — per-type flags that let
//!   type-filtered scans skip types that can never match.

pub mod caps;
pub mod ident;
pub mod serial;

pub use caps::{caps_of, note_component, note_entity, TypeCaps};
pub use ident::InstanceId;
pub use serial::Serial;
