//! Ownership demo — entities, components, and a cross-registry move.
//!
//! Walks the registry's public surface: admit an entity (serial allocated
//! on first admission), attach components through `get_or_create`, then
//! move the entity between two registries and show that its serial is
//! sticky. Run with `RUST_LOG=debug` to see the registry's own tracing
//! output alongside the demo's.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether_registry::{
    move_entity, BaseEntity, Component, ComponentBase, Entity, EntityCollective, EntityExt,
    MoveOutcome,
};

#[derive(Default)]
struct Health {
    base: ComponentBase,
    current: f32,
}

impl Component for Health {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ownership_demo=info".parse()?),
        )
        .init();

    let overworld = EntityCollective::new();
    let dungeon = EntityCollective::new();

    // Admit a fresh entity; serial zero means "assign me one".
    let hero: Arc<dyn Entity> = Arc::new(BaseEntity::default());
    assert!(overworld.add(&hero));
    info!(serial = %hero.base().serial(), "hero admitted to the overworld");

    // First access creates the component; the second returns the same one.
    let health = hero.components().get_or_create::<Health>()?;
    let again = hero.components().get_or_create::<Health>()?;
    assert_eq!(health.base().ident(), again.base().ident());
    info!(
        component = %health.base().ident(),
        current = health.current,
        "health component attached"
    );

    // Cross-registry move: validated on both ends before any mutation.
    let outcome = move_entity(&hero, Some(&dungeon))?;
    assert_eq!(outcome, MoveOutcome::Moved);
    info!(
        serial = %hero.base().serial(),
        overworld = overworld.len(),
        dungeon = dungeon.len(),
        "hero moved to the dungeon; serial is sticky"
    );

    // Components travel with the entity; they belong to it, not the registry.
    let handle: Arc<dyn Component> = health.clone();
    assert!(hero.components().contains(&handle));
    info!("done");
    Ok(())
}
