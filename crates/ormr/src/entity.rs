//! # Entity — Game Objects as Data Plus Handles
//!
//! An [`Entity`] owns an ordered pool of components and carries the state the
//! scene iterates on every frame: world position, active/visible flags, depth,
//! and group labels. It holds no back-pointers — once inserted into a
//! [`Scene`](crate::scene::Scene) it is addressed by an [`EntityId`], a
//! generational handle.
//!
//! ## Design: Generational Indices
//!
//! A naive approach would use an incrementing counter for entity IDs, but this
//! breaks when entities are destroyed and their slots recycled: a stored
//! handle would silently point at the wrong entity. Pairing each slot index
//! with a **generation** counter fixes that — the generation is bumped every
//! time a slot is freed, so stale handles fail lookups safely instead of
//! aliasing a stranger.
//!
//! ```text
//! EntityId { index: 5, generation: 0 }  ← original
//! EntityId { index: 5, generation: 1 }  ← after the slot is reused
//! ```
//!
//! Components live in an index-addressed pool inside their entity
//! (`Vec<Option<Box<dyn Component>>>`). Insertion order is update and render
//! order. Slots are never reused within one entity, so a [`ComponentSlot`]
//! stays valid for the component's whole lifetime.

use std::collections::HashSet;
use std::fmt;

use glam::Vec2;

use crate::component::Component;

/// A lightweight generational handle to an entity inside a
/// [`Scene`](crate::scene::Scene).
///
/// Only valid for the scene that issued it, and only while its generation
/// matches. Stale handles make lookups return `None` rather than aliasing a
/// recycled slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl EntityId {
    /// Raw slot index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation counter. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Index of a component inside its entity's pool.
///
/// Slots are not reused, so a `ComponentSlot` uniquely names one component for
/// the lifetime of its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentSlot(pub(crate) u32);

impl ComponentSlot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A game object: world position, iteration flags, depth ordering, group
/// labels, and an ordered pool of components.
///
/// Entities are built detached, then moved into a scene:
///
/// ```ignore
/// let mut e = Entity::new();
/// e.position = Vec2::new(32.0, 48.0);
/// e.add(Box::new(Sprite::new(...)));
/// let id = scene.add(e, None);
/// ```
///
/// Ownership enforces scene membership: an `Entity` value is either detached
/// (in your hands, or parked in a recycle bucket) or inside exactly one
/// scene's arena.
pub struct Entity {
    /// World position, in scene-local units.
    pub position: Vec2,
    /// Inactive entities are skipped by the update pass (their components'
    /// `update` never runs).
    pub active: bool,
    /// Invisible entities are skipped by the render pass.
    pub visible: bool,
    /// Whether `created` has ever fired. Set by the first scene insertion and
    /// never cleared, so re-adding (or recreating from a bucket) skips
    /// `created`.
    pub(crate) instantiated: bool,
    /// Depth controls scene iteration order (lower depth updates and renders
    /// first). Changing depth mid-frame goes through [`Entity::set_depth`],
    /// which stages the value; the scene applies it during its stable re-sort
    /// so iteration order never shifts mid-pass.
    depth: i32,
    next_depth: Option<i32>,
    /// Group labels, mirrored into the scene's group index while the entity
    /// is inside a scene.
    pub(crate) groups: HashSet<String>,
    /// Ordered component pool. `None` marks a removed component's slot.
    pub(crate) components: Vec<Option<Box<dyn Component>>>,
    /// True while inside a scene's arena. Guards the mutation paths that
    /// would leave the scene's indices stale.
    pub(crate) in_scene: bool,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            active: true,
            visible: true,
            instantiated: false,
            depth: 0,
            next_depth: None,
            groups: HashSet::new(),
            components: Vec::new(),
            in_scene: false,
        }
    }

    /// Create an entity at the given position.
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// Whether `created` has already fired for this entity.
    pub fn instantiated(&self) -> bool {
        self.instantiated
    }

    /// Current depth (the value iteration order is based on).
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Stage a depth change. The new value takes effect when the scene next
    /// re-sorts (at the end of `Scene::update`), never mid-pass.
    pub fn set_depth(&mut self, depth: i32) {
        if depth == self.depth {
            self.next_depth = None;
        } else {
            self.next_depth = Some(depth);
        }
    }

    /// Apply a staged depth change. Returns true if the depth changed.
    pub(crate) fn flush_depth(&mut self) -> bool {
        match self.next_depth.take() {
            Some(d) => {
                self.depth = d;
                true
            }
            None => false,
        }
    }

    // ── Components ───────────────────────────────────────────────────

    /// Attach a component, firing its `added_to_entity` hook. Returns the
    /// slot the component now occupies.
    ///
    /// # Panics
    ///
    /// Panics if the entity is inside a scene — attached entities add
    /// components through `Scene::add_component` or `Context::add_component`
    /// so the scene's collider index stays in sync.
    pub fn add(&mut self, mut component: Box<dyn Component>) -> ComponentSlot {
        assert!(
            !self.in_scene,
            "entity is inside a scene; add components through Scene::add_component or Context::add_component"
        );
        component.added_to_entity(self);
        self.push_component(component)
    }

    /// Detach the component in `slot`, firing its `removed_from_entity` hook,
    /// and return it. Returns `None` if the slot is already empty.
    ///
    /// # Panics
    ///
    /// Panics if the entity is inside a scene (see [`Entity::add`]).
    pub fn remove(&mut self, slot: ComponentSlot) -> Option<Box<dyn Component>> {
        assert!(
            !self.in_scene,
            "entity is inside a scene; remove components through Scene::remove_component or Context::remove_component"
        );
        let mut component = self.take_component(slot)?;
        component.removed_from_entity(self);
        Some(component)
    }

    /// Detach every component in current order, firing `removed_from_entity`
    /// for each. The slot list is snapshotted up front, so hooks that attach
    /// or detach further components don't disturb the walk.
    ///
    /// # Panics
    ///
    /// Panics if the entity is inside a scene (see [`Entity::add`]).
    pub fn remove_all(&mut self) {
        assert!(
            !self.in_scene,
            "entity is inside a scene; detach it first or remove components through the scene"
        );
        let slots: Vec<ComponentSlot> = (0..self.components.len() as u32)
            .map(ComponentSlot)
            .collect();
        for slot in slots {
            if let Some(mut component) = self.take_component(slot) {
                component.removed_from_entity(self);
            }
        }
    }

    /// Number of live (non-removed) components.
    pub fn component_count(&self) -> usize {
        self.components.iter().filter(|c| c.is_some()).count()
    }

    /// Shared access to the component in `slot`.
    pub fn component(&self, slot: ComponentSlot) -> Option<&dyn Component> {
        self.components
            .get(slot.index())?
            .as_ref()
            .map(|c| c.as_ref())
    }

    /// Mutable access to the component in `slot`.
    pub fn component_mut(&mut self, slot: ComponentSlot) -> Option<&mut Box<dyn Component>> {
        self.components.get_mut(slot.index())?.as_mut()
    }

    /// Find the first component of concrete type `T`, in insertion order.
    pub fn find<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .flatten()
            .find_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// Mutable variant of [`Entity::find`].
    pub fn find_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .flatten()
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// All components of concrete type `T`, in insertion order.
    pub fn find_all<T: Component>(&self) -> Vec<&T> {
        self.components
            .iter()
            .flatten()
            .filter_map(|c| c.as_any().downcast_ref::<T>())
            .collect()
    }

    /// Slot of the first component of concrete type `T`.
    pub fn slot_of<T: Component>(&self) -> Option<ComponentSlot> {
        self.components
            .iter()
            .enumerate()
            .find(|(_, c)| {
                c.as_ref()
                    .is_some_and(|c| c.as_any().downcast_ref::<T>().is_some())
            })
            .map(|(i, _)| ComponentSlot(i as u32))
    }

    /// Iterate live components with their slots, in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentSlot, &dyn Component)> {
        self.components
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ComponentSlot(i as u32), c.as_ref())))
    }

    // ── Groups ───────────────────────────────────────────────────────

    /// Add a group label. While the entity is inside a scene, go through
    /// `Scene::group` or `Context::group` instead so the scene's group index
    /// stays in sync.
    ///
    /// # Panics
    ///
    /// Panics if the entity is inside a scene.
    pub fn group(&mut self, label: impl Into<String>) {
        assert!(
            !self.in_scene,
            "entity is inside a scene; use Scene::group or Context::group"
        );
        self.groups.insert(label.into());
    }

    /// Remove a group label. Same scene caveat as [`Entity::group`].
    ///
    /// # Panics
    ///
    /// Panics if the entity is inside a scene.
    pub fn ungroup(&mut self, label: &str) {
        assert!(
            !self.in_scene,
            "entity is inside a scene; use Scene::ungroup or Context::ungroup"
        );
        self.groups.remove(label);
    }

    /// Whether the entity carries a group label.
    pub fn in_group(&self, label: &str) -> bool {
        self.groups.contains(label)
    }

    /// The entity's group labels.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|s| s.as_str())
    }

    // ── Internals shared with Scene ──────────────────────────────────

    /// Append a component without firing hooks (the caller fires them).
    pub(crate) fn push_component(&mut self, component: Box<dyn Component>) -> ComponentSlot {
        let slot = ComponentSlot(self.components.len() as u32);
        self.components.push(Some(component));
        slot
    }

    /// Take a component out of its slot without firing hooks.
    pub(crate) fn take_component(&mut self, slot: ComponentSlot) -> Option<Box<dyn Component>> {
        self.components.get_mut(slot.index())?.take()
    }

    /// Put a component back into a vacated slot. Does nothing if something
    /// else already occupies it.
    pub(crate) fn restore_component(&mut self, slot: ComponentSlot, component: Box<dyn Component>) {
        if let Some(cell) = self.components.get_mut(slot.index()) {
            if cell.is_none() {
                *cell = Some(component);
            }
        }
    }

    /// Run `f` over every live component, one at a time, with the component
    /// taken out of its pool for the duration of the call. This is what makes
    /// lifecycle hooks safe: the hook gets `&mut Entity` without aliasing the
    /// component it is called on.
    pub(crate) fn each_component(
        &mut self,
        mut f: impl FnMut(ComponentSlot, &mut Box<dyn Component>, &mut Entity),
    ) {
        for i in 0..self.components.len() {
            let slot = ComponentSlot(i as u32);
            if let Some(mut component) = self.take_component(slot) {
                f(slot, &mut component, self);
                self.restore_component(slot, component);
            }
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("position", &self.position)
            .field("active", &self.active)
            .field("visible", &self.visible)
            .field("depth", &self.depth)
            .field("components", &self.component_count())
            .field("groups", &self.groups)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Tick(u32);

    impl Component for Tick {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct Marker;

    impl Component for Marker {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn add_and_find() {
        let mut e = Entity::new();
        e.add(Box::new(Tick(7)));
        e.add(Box::new(Marker));

        assert_eq!(e.component_count(), 2);
        assert_eq!(e.find::<Tick>().unwrap().0, 7);
        assert!(e.find::<Marker>().is_some());

        e.find_mut::<Tick>().unwrap().0 = 9;
        assert_eq!(e.find::<Tick>().unwrap().0, 9);
    }

    #[test]
    fn remove_leaves_slot_vacant() {
        let mut e = Entity::new();
        let a = e.add(Box::new(Tick(1)));
        let b = e.add(Box::new(Tick(2)));

        assert!(e.remove(a).is_some());
        assert!(e.remove(a).is_none()); // already empty
        assert_eq!(e.component_count(), 1);
        assert_eq!(e.component(b).is_some(), true);

        // Slots are not reused: a fresh add lands in a new slot.
        let c = e.add(Box::new(Tick(3)));
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn find_all_in_insertion_order() {
        let mut e = Entity::new();
        e.add(Box::new(Tick(1)));
        e.add(Box::new(Marker));
        e.add(Box::new(Tick(2)));

        let ticks = e.find_all::<Tick>();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].0, 1);
        assert_eq!(ticks[1].0, 2);
    }

    #[test]
    fn remove_all_detaches_everything() {
        let mut e = Entity::new();
        e.add(Box::new(Tick(1)));
        e.add(Box::new(Marker));
        e.remove_all();
        assert_eq!(e.component_count(), 0);
    }

    #[test]
    fn depth_changes_are_staged() {
        let mut e = Entity::new();
        e.set_depth(5);
        assert_eq!(e.depth(), 0); // not applied yet
        assert!(e.flush_depth());
        assert_eq!(e.depth(), 5);
        assert!(!e.flush_depth()); // nothing staged
    }

    #[test]
    fn groups_locally() {
        let mut e = Entity::new();
        e.group("enemy");
        e.group("flying");
        assert!(e.in_group("enemy"));
        e.ungroup("enemy");
        assert!(!e.in_group("enemy"));
        assert!(e.in_group("flying"));
    }
}
