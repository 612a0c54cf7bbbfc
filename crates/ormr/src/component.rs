//! # Component — The Smallest Attachable Unit
//!
//! A [`Component`] is behavior and data attached to an
//! [`Entity`](crate::entity::Entity). The base trait is all lifecycle: hooks
//! fired by the entity/scene at well-defined points, an `update` run once per
//! simulation step, and a `render` run once per render pass. The base trait
//! has no side effects of its own — concrete components supply them.
//!
//! ## Hooks never call themselves
//!
//! Every hook is invoked by the owning entity or scene, never by the
//! component. While a hook (or `update`) runs, the component is *taken out*
//! of its pool slot — the extract/reinsert pattern — so it can receive
//! `&mut Entity` and `&mut Scene` without aliasing itself. That is what lets
//! gameplay code add, remove, and recycle objects from inside an active
//! simulation step without tripping iterator invalidation.

use std::any::Any;

use glam::Vec2;

use crate::collider::Collider;
use crate::entity::{ComponentSlot, Entity, EntityId};
use crate::render::Camera;
use crate::scene::Scene;

/// Lifecycle surface every component implements. All hooks default to no-ops;
/// a concrete component overrides the ones it cares about.
///
/// The two `as_any` methods power [`Entity::find`](crate::entity::Entity::find)
/// style downcasting; implement them as `self` returns:
///
/// ```ignore
/// impl Component for Sprite {
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
#[allow(unused_variables)]
pub trait Component: 'static {
    // ── Attachment hooks ─────────────────────────────────────────────

    /// Fired right after attachment to an entity. The entity may not be in a
    /// scene yet.
    fn added_to_entity(&mut self, entity: &mut Entity) {}

    /// Fired after the owning entity is inserted into a scene (or when the
    /// component is attached to an entity already inside one).
    fn added_to_scene(&mut self, entity: &mut Entity, scene: &mut Scene) {}

    /// Fired when detached from the entity.
    fn removed_from_entity(&mut self, entity: &mut Entity) {}

    /// Fired when the owning entity leaves a scene (or the component is
    /// detached while inside one).
    fn removed_from_scene(&mut self, entity: &mut Entity, scene: &mut Scene) {}

    // ── Entity lifecycle notifications ───────────────────────────────
    //
    // The entity itself is plain data; its lifecycle events are delivered to
    // each of its components in pool order.

    /// Fired once ever, on the entity's first scene insertion.
    fn created(&mut self, entity: &mut Entity) {}

    /// Fired on every scene insertion, after `created`.
    fn added(&mut self, entity: &mut Entity) {}

    /// Fired when the entity is removed from a scene (including as the first
    /// half of a recycle).
    fn removed(&mut self, entity: &mut Entity) {}

    /// Fired when the entity is parked in a recycle bucket instead of being
    /// discarded.
    fn recycled(&mut self, entity: &mut Entity) {}

    /// Fired on permanent teardown. After this the entity is unreachable from
    /// every index and cache.
    fn destroyed(&mut self, entity: &mut Entity) {}

    // ── Per-frame ────────────────────────────────────────────────────

    /// Runs once per simulation step, iff both this component and the owning
    /// entity are `active` and the entity's scene is the one being stepped.
    fn update(&mut self, ctx: &mut Context) {}

    /// Runs once per render pass, iff both this component and the owning
    /// entity are `visible`. A `None` camera means screen-space / default
    /// transform.
    fn render(&self, entity: &Entity, camera: Option<&Camera>) {}

    /// Diagnostic overlay pass; same filtering as `render`.
    fn debug_render(&self, entity: &Entity, camera: Option<&Camera>) {}

    // ── Flags and capabilities ───────────────────────────────────────

    /// Inactive components are skipped by the update pass.
    fn active(&self) -> bool {
        true
    }

    /// Invisible components are skipped by the render pass.
    fn visible(&self) -> bool {
        true
    }

    /// Local offset from the owning entity's position. The component's scene
    /// position is `entity.position + offset()`.
    fn offset(&self) -> Vec2 {
        Vec2::ZERO
    }

    /// The collider capability, if this component is one. Components that
    /// return `Some` here participate in the scene's tag-indexed collision
    /// queries.
    fn collider(&self) -> Option<&Collider> {
        None
    }

    /// Mutable collider capability.
    fn collider_mut(&mut self) -> Option<&mut Collider> {
        None
    }

    // ── Downcasting ──────────────────────────────────────────────────

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Everything a component can reach during its own `update`.
///
/// The component receiving the context has been extracted from its pool slot,
/// and its entity from the scene arena, so `scene` and `entity` are free to
/// borrow mutably. Structural operations that target the current entity or
/// component go through the methods here — they keep the scene's derived
/// indices in sync and stage what cannot be applied mid-pass.
pub struct Context<'a> {
    pub scene: &'a mut Scene,
    /// The owning entity, extracted from the scene arena for the duration of
    /// this update.
    pub entity: &'a mut Entity,
    /// Handle of the owning entity.
    pub entity_id: EntityId,
    /// Pool slot of the component currently updating.
    pub slot: ComponentSlot,
    /// Seconds elapsed since the previous simulation step, as injected by the
    /// host loop. Deterministic when driven by a fixed-step clock.
    pub delta: f32,
    /// Set when the current component removes itself; the update loop
    /// finalizes the detach instead of reinserting the component.
    pub(crate) detach_current: bool,
}

impl Context<'_> {
    // ── Groups (current entity) ──────────────────────────────────────

    /// Add a group label to the current entity, updating the scene's group
    /// index in the same motion.
    pub fn group(&mut self, label: impl Into<String>) {
        let label = label.into();
        if self.entity.groups.insert(label.clone()) {
            self.scene.index_group_insert(&label, self.entity_id);
        }
    }

    /// Remove a group label from the current entity and the scene's group
    /// index.
    pub fn ungroup(&mut self, label: &str) {
        if self.entity.groups.remove(label) {
            self.scene.index_group_remove(label, self.entity_id);
        }
    }

    // ── Collider tags ────────────────────────────────────────────────

    /// Add a tag to a collider owned by the current entity (typically the
    /// updating component's own collider), updating the scene's tag index
    /// symmetrically.
    pub fn tag(&mut self, collider: &mut Collider, tag: impl Into<String>) {
        let tag = tag.into();
        if collider.tags.insert(tag.clone()) {
            if let Some(binding) = collider.binding {
                self.scene.index_tag_insert(&tag, binding);
            }
        }
    }

    /// Remove a tag from a collider owned by the current entity, updating the
    /// scene's tag index symmetrically.
    pub fn untag(&mut self, collider: &mut Collider, tag: &str) {
        if collider.tags.remove(tag) {
            if let Some(binding) = collider.binding {
                self.scene.index_tag_remove(tag, binding);
            }
        }
    }

    // ── Components (current entity) ──────────────────────────────────

    /// Attach a component to the current entity mid-update. Hooks fire
    /// immediately and any collider registers into the tag index at once, so
    /// later collision checks in the same frame see it.
    pub fn add_component(&mut self, mut component: Box<dyn Component>) -> ComponentSlot {
        component.added_to_entity(self.entity);
        component.added_to_scene(self.entity, self.scene);
        let slot = self.entity.push_component(component);
        self.scene
            .bind_component(self.entity_id, slot, self.entity);
        slot
    }

    /// Detach a component from the current entity mid-update, firing its
    /// removal hooks and unregistering it from the tag index.
    ///
    /// Removing the currently-updating component returns `None` — its detach
    /// is finalized when its `update` call returns.
    pub fn remove_component(&mut self, slot: ComponentSlot) -> Option<Box<dyn Component>> {
        if slot == self.slot {
            self.detach_current = true;
            return None;
        }
        let mut component = self.entity.take_component(slot)?;
        self.scene.unbind_component(&mut component);
        component.removed_from_scene(self.entity, self.scene);
        component.removed_from_entity(self.entity);
        Some(component)
    }

    // ── Whole-entity lifecycle (staged) ──────────────────────────────
    //
    // The current entity is extracted from the arena, so these stage a
    // pending operation that the scene applies when this entity's update
    // pass finishes. Index entries are dropped immediately.

    /// Remove the current entity from the scene at the end of its update.
    pub fn remove_self(&mut self) {
        self.scene.remove(self.entity_id);
    }

    /// Recycle the current entity into `bucket` at the end of its update.
    pub fn recycle_self(&mut self, bucket: impl Into<String>) {
        self.scene.recycle(bucket, self.entity_id);
    }

    /// Destroy the current entity at the end of its update.
    pub fn destroy_self(&mut self) {
        self.scene.destroy(self.entity_id);
    }
}
