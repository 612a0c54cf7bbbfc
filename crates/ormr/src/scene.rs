//! # Scene — The Central Container
//!
//! The [`Scene`] owns every entity and drives the per-frame update and render
//! passes. It is the single source of truth for object lifetime.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Scene                                                    │
//! │                                                          │
//! │  slots: Vec<Slot>            arena of entities, keyed by │
//! │                              generational EntityId        │
//! │  order: Vec<EntityId>        depth-sorted iteration order │
//! │                                                          │
//! │  groups: label → {EntityId}        derived index          │
//! │  colliders: tag → {ColliderRef}    derived index          │
//! │                                                          │
//! │  cache: bucket → Vec<Entity>   recycled, detached         │
//! │  renderers: Vec<Renderer>      render-pass stages         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived indices
//!
//! The group and collider-tag maps are caches over the entity list, rebuilt
//! incrementally on every structural mutation. They are never the source of
//! truth — [`Scene::verify_indices`] recomputes both from a full scan and
//! panics on divergence. The payoff is that every lookup and broad-phase
//! collision query costs O(matches) instead of O(all entities).
//!
//! ## Mutation safety (extract/reinsert)
//!
//! `update` walks a snapshot of the iteration order. Each entity is taken
//! *out* of the arena while its components run, so gameplay code holds
//! `&mut Scene` and `&mut Entity` simultaneously without aliasing. Removing,
//! recycling, or destroying the entity that is currently updating stages the
//! operation on its vacated slot; the scene applies it when that entity's
//! pass finishes. Everything else — index changes, operations on *other*
//! entities, component add/remove — applies immediately and is visible to
//! later collision checks in the same frame.

use std::collections::{BTreeSet, HashMap};

use glam::Vec2;

use crate::collider::{overlaps, Collider, ColliderRef};
use crate::component::{Component, Context};
use crate::entity::{ComponentSlot, Entity, EntityId};
use crate::render::{Camera, Renderer};

/// Deferred lifecycle operation for an entity that was mid-update when the
/// operation was requested.
enum Pending {
    Remove,
    Recycle(String),
    Destroy,
}

enum SlotState {
    Free,
    Occupied(Entity),
    /// Extracted for its own update (or a scene operation); structural
    /// lifecycle requests against it park here until it is reinserted.
    Busy(Option<Pending>),
}

struct Slot {
    generation: u32,
    state: SlotState,
}

/// Owns all entities, maintains the derived lookup indices and the recycle
/// cache, and drives the per-frame update/render passes.
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Depth-sorted iteration order. Re-sorted (stably) at the end of every
    /// update, after staged depth changes are applied.
    order: Vec<EntityId>,
    groups: HashMap<String, BTreeSet<EntityId>>,
    colliders: HashMap<String, BTreeSet<ColliderRef>>,
    /// Recycled, detached entities awaiting reuse, LIFO per bucket.
    cache: HashMap<String, Vec<Entity>>,
    renderers: Vec<Renderer>,
}

impl Scene {
    /// A scene with a single default renderer that draws every visible
    /// entity in screen space.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            groups: HashMap::new(),
            colliders: HashMap::new(),
            cache: HashMap::new(),
            renderers: vec![Renderer::new()],
        }
    }

    // ── Entity lifecycle ─────────────────────────────────────────────

    /// Insert an entity. Fires `created` on first-ever insertion (re-adding
    /// an already-instantiated entity skips it), then `added`, then walks the
    /// components firing `added_to_scene` and registering colliders into the
    /// tag index and group labels into the group index.
    pub fn add(&mut self, mut entity: Entity, position: Option<Vec2>) -> EntityId {
        if let Some(p) = position {
            entity.position = p;
        }
        let id = self.alloc();
        self.order.push(id);

        // `in_scene` stays false until the hook walk finishes: insertion
        // hooks may still group/ungroup and attach components directly, and
        // everything they leave on the entity is registered below.
        let first = !entity.instantiated;
        entity.instantiated = true;
        if first {
            entity.each_component(|_, c, e| c.created(e));
        }
        entity.each_component(|_, c, e| c.added(e));

        // Per component: scene hook, then index registration, so each hook
        // observes the colliders processed before it. Length is re-read so
        // components attached by a hook get their own hook and binding.
        let mut i = 0;
        while i < entity.components.len() {
            let slot = ComponentSlot(i as u32);
            if let Some(mut component) = entity.take_component(slot) {
                component.added_to_scene(&mut entity, self);
                entity.restore_component(slot, component);
                self.bind_component(id, slot, &mut entity);
            }
            i += 1;
        }
        entity.in_scene = true;
        let labels: Vec<String> = entity.groups.iter().cloned().collect();
        for label in labels {
            self.index_group_insert(&label, id);
        }

        log::debug!("scene: added entity {id}");
        self.finish(id, entity);
        id
    }

    /// Remove an entity: unregister it from every index, fire `removed` and
    /// per-component `removed_from_scene`, detach it from the scene, and
    /// hand it back. Does not fire `destroyed`.
    ///
    /// If the entity is currently mid-update the removal is staged and
    /// applied when its update pass finishes; the entity value is then
    /// dropped and `None` is returned.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.take_out(id, Pending::Remove)
    }

    /// Remove the entity at `index` of the current iteration order.
    pub fn remove_at(&mut self, index: usize) -> Option<Entity> {
        let id = *self.order.get(index)?;
        self.remove(id)
    }

    /// Remove semantics plus `recycled`, parking the entity in `bucket` for
    /// later [`Scene::recreate`] instead of discarding it.
    pub fn recycle(&mut self, bucket: impl Into<String>, id: EntityId) {
        let bucket = bucket.into();
        if let Some(mut entity) = self.take_out(id, Pending::Recycle(bucket.clone())) {
            entity.each_component(|_, c, e| c.recycled(e));
            log::debug!("scene: recycled entity {id} into '{bucket}'");
            self.cache.entry(bucket).or_default().push(entity);
        }
    }

    /// Pop the most recently recycled entity for `bucket` (LIFO) and re-add
    /// it. `created` does not re-fire; `added` does. Returns `None` if the
    /// bucket is empty.
    pub fn recreate(&mut self, bucket: &str) -> Option<EntityId> {
        let entity = self.cache.get_mut(bucket)?.pop()?;
        if self.cache.get(bucket).is_some_and(|b| b.is_empty()) {
            self.cache.remove(bucket);
        }
        Some(self.add(entity, None))
    }

    /// Permanent teardown: remove semantics plus `destroyed`. Afterward the
    /// entity is unreachable from every index and cache.
    pub fn destroy(&mut self, id: EntityId) {
        if let Some(mut entity) = self.take_out(id, Pending::Destroy) {
            entity.each_component(|_, c, e| c.destroyed(e));
            log::debug!("scene: destroyed entity {id}");
        }
    }

    /// Number of recycled entities parked in `bucket`.
    pub fn cached(&self, bucket: &str) -> usize {
        self.cache.get(bucket).map_or(0, |b| b.len())
    }

    // ── Access ───────────────────────────────────────────────────────

    /// Shared access. `None` for stale handles and for the entity currently
    /// being updated (it is extracted; use the `Context` it was handed).
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &slot.state {
            SlotState::Occupied(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable access; same rules as [`Scene::get`].
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &mut slot.state {
            SlotState::Occupied(e) => Some(e),
            _ => None,
        }
    }

    /// Whether `id` refers to an entity in this scene (including one
    /// currently mid-update).
    pub fn contains(&self, id: EntityId) -> bool {
        self.order.contains(&id)
    }

    /// Number of entities in the scene.
    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// Iteration order as of now (depth-sorted as of the last update).
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    // ── Components on contained entities ─────────────────────────────

    /// Attach a component to a contained entity, firing `added_to_entity`
    /// and `added_to_scene` and registering any collider immediately.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not in this scene, or names the entity currently
    /// mid-update — that entity adds components through
    /// `Context::add_component`.
    pub fn add_component(&mut self, id: EntityId, mut component: Box<dyn Component>) -> ComponentSlot {
        let mut entity = self.begin(id).unwrap_or_else(|| {
            panic!("no entity {id:?} available (mid-update entities use Context::add_component)")
        });
        component.added_to_entity(&mut entity);
        component.added_to_scene(&mut entity, self);
        let slot = entity.push_component(component);
        self.bind_component(id, slot, &mut entity);
        self.finish(id, entity);
        slot
    }

    /// Detach a component from a contained entity, firing its removal hooks
    /// and unregistering it from the tag index. Returns `None` if the slot
    /// is already empty.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Scene::add_component`].
    pub fn remove_component(
        &mut self,
        id: EntityId,
        slot: ComponentSlot,
    ) -> Option<Box<dyn Component>> {
        let mut entity = self.begin(id).unwrap_or_else(|| {
            panic!("no entity {id:?} available (mid-update entities use Context::remove_component)")
        });
        let result = match entity.take_component(slot) {
            Some(mut component) => {
                self.unbind_component(&mut component);
                component.removed_from_scene(&mut entity, self);
                component.removed_from_entity(&mut entity);
                Some(component)
            }
            None => None,
        };
        self.finish(id, entity);
        result
    }

    // ── Groups ───────────────────────────────────────────────────────

    /// Add a group label to a contained entity, updating the group index in
    /// the same motion.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not available (mid-update entities group through
    /// `Context::group`).
    pub fn group(&mut self, id: EntityId, label: impl Into<String>) {
        let label = label.into();
        let inserted = match self.get_mut(id) {
            Some(e) => e.groups.insert(label.clone()),
            None => panic!("no entity {id:?} available (mid-update entities use Context::group)"),
        };
        if inserted {
            self.index_group_insert(&label, id);
        }
    }

    /// Remove a group label from a contained entity and the group index.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Scene::group`].
    pub fn ungroup(&mut self, id: EntityId, label: &str) {
        let removed = match self.get_mut(id) {
            Some(e) => e.groups.remove(label),
            None => panic!("no entity {id:?} available (mid-update entities use Context::ungroup)"),
        };
        if removed {
            self.index_group_remove(label, id);
        }
    }

    /// Lowest-id entity carrying `label`, straight from the group index.
    pub fn first_entity_in_group(&self, label: &str) -> Option<EntityId> {
        self.groups.get(label)?.iter().next().copied()
    }

    /// All entities carrying `label`, in id order. O(matches).
    pub fn entities_in_group(&self, label: &str) -> Vec<EntityId> {
        self.groups
            .get(label)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of entities carrying `label`.
    pub fn group_count(&self, label: &str) -> usize {
        self.groups.get(label).map_or(0, |s| s.len())
    }

    // ── Collider tags ────────────────────────────────────────────────

    /// Add a tag to a bound collider, updating the tag index symmetrically.
    ///
    /// # Panics
    ///
    /// Panics if the entity is unavailable, the slot holds no component, or
    /// the component has no collider — all caller bugs.
    pub fn tag(&mut self, r: ColliderRef, tag: impl Into<String>) {
        let tag = tag.into();
        let inserted = self.collider_tags_mut(r).insert(tag.clone());
        if inserted {
            self.index_tag_insert(&tag, r);
        }
    }

    /// Remove a tag from a bound collider and the tag index.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Scene::tag`].
    pub fn untag(&mut self, r: ColliderRef, tag: &str) {
        let removed = self.collider_tags_mut(r).remove(tag);
        if removed {
            self.index_tag_remove(tag, r);
        }
    }

    fn collider_tags_mut(&mut self, r: ColliderRef) -> &mut std::collections::HashSet<String> {
        let Some(entity) = self.get_mut(r.entity) else {
            panic!("no entity {:?} available (mid-update entities use Context::tag/untag)", r.entity)
        };
        let Some(component) = entity.component_mut(r.slot) else {
            panic!("no component in slot {:?} of entity {:?}", r.slot, r.entity)
        };
        match component.collider_mut() {
            Some(col) => &mut col.tags,
            None => panic!("component {r:?} has no collider"),
        }
    }

    /// Lowest-address collider carrying `tag`, straight from the tag index.
    pub fn first_collider_in_tag(&self, tag: &str) -> Option<ColliderRef> {
        self.colliders.get(tag)?.iter().next().copied()
    }

    /// All colliders carrying `tag`, in address order. O(matches).
    pub fn colliders_in_tag(&self, tag: &str) -> Vec<ColliderRef> {
        self.colliders
            .get(tag)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of colliders carrying `tag`.
    pub fn tag_count(&self, tag: &str) -> usize {
        self.colliders.get(tag).map_or(0, |s| s.len())
    }

    // ── Broad + narrow phase ─────────────────────────────────────────

    /// Walk every collider in `tag`'s index bucket, run the narrow-phase
    /// overlap test against `source` (virtually offset by `dx`, `dy`), and
    /// feed hits to `visit` until it returns `false`. The source's own index
    /// entry is skipped by identity.
    pub(crate) fn query_tag(
        &self,
        source: &Collider,
        origin: Vec2,
        tag: &str,
        dx: f32,
        dy: f32,
        mut visit: impl FnMut(ColliderRef) -> bool,
    ) {
        let Some(candidates) = self.colliders.get(tag) else {
            return;
        };
        for &candidate in candidates {
            if source.binding() == Some(candidate) {
                continue;
            }
            let Some((c_origin, collider)) = self.resolve_collider(candidate) else {
                continue;
            };
            if overlaps(source, origin, dx, dy, collider, c_origin) && !visit(candidate) {
                return;
            }
        }
    }

    /// Resolve an indexed collider to its entity position and shape.
    ///
    /// Returns `None` for the entity currently mid-update (its state is in
    /// the hands of whoever extracted it — usually the query source itself).
    /// A freed or stale index entry is an index-consistency violation, which
    /// is a programming error, so it fails loudly rather than being skipped.
    fn resolve_collider(&self, r: ColliderRef) -> Option<(Vec2, &Collider)> {
        let slot = self
            .slots
            .get(r.entity.index as usize)
            .unwrap_or_else(|| panic!("collider index holds unknown entity {:?}", r.entity));
        if slot.generation != r.entity.generation {
            panic!("collider index holds stale entity {:?}", r.entity);
        }
        match &slot.state {
            SlotState::Busy(_) => None,
            SlotState::Free => panic!("collider index holds freed entity {:?}", r.entity),
            SlotState::Occupied(entity) => {
                let component = entity
                    .component(r.slot)
                    .unwrap_or_else(|| panic!("collider index entry {r:?} has no component"));
                let collider = component
                    .collider()
                    .unwrap_or_else(|| panic!("collider index entry {r:?} has no collider"));
                Some((entity.position, collider))
            }
        }
    }

    // ── Renderers ────────────────────────────────────────────────────

    /// Append a render-pass stage; returns its index. Renderers run in list
    /// order, independent of entity depth.
    pub fn add_renderer(&mut self, renderer: Renderer) -> usize {
        self.renderers.push(renderer);
        self.renderers.len() - 1
    }

    pub fn renderers(&self) -> &[Renderer] {
        &self.renderers
    }

    pub fn renderers_mut(&mut self) -> &mut [Renderer] {
        &mut self.renderers
    }

    // ── Per-frame passes ─────────────────────────────────────────────

    /// One simulation step. Walks a snapshot of the depth-sorted entity
    /// list — entities added mid-pass start updating next frame, and
    /// removing or destroying any entity (including the one currently
    /// updating) neither skips nor duplicates its neighbors. Afterward,
    /// staged depth changes apply and the list re-sorts, stably: equal
    /// depths keep their relative order.
    pub fn update(&mut self, delta: f32) {
        let order = self.order.clone();
        for id in order {
            let Some(mut entity) = self.begin(id) else {
                continue; // removed earlier this frame
            };
            if entity.active {
                // Length is captured up front: components attached mid-pass
                // join the walk next frame.
                for i in 0..entity.components.len() {
                    let slot = ComponentSlot(i as u32);
                    let Some(mut component) = entity.take_component(slot) else {
                        continue;
                    };
                    let mut detach = false;
                    if entity.active && component.active() {
                        let mut ctx = Context {
                            scene: self,
                            entity: &mut entity,
                            entity_id: id,
                            slot,
                            delta,
                            detach_current: false,
                        };
                        component.update(&mut ctx);
                        detach = ctx.detach_current;
                    }
                    if detach {
                        // The component removed itself during its update.
                        self.unbind_component(&mut component);
                        component.removed_from_scene(&mut entity, self);
                        component.removed_from_entity(&mut entity);
                    } else {
                        entity.restore_component(slot, component);
                    }
                }
            }
            self.finish(id, entity);
        }
        self.flush_depth();
    }

    /// One render pass: each renderer walks the depth-ordered entity list,
    /// filtered by its group mask and by entity/component visibility, and
    /// invokes `Component::render` with that renderer's camera.
    pub fn render(&self) {
        self.render_with(|component, entity, camera| component.render(entity, camera));
    }

    /// The same walk as [`Scene::render`], but the caller observes each
    /// (component, camera) pair — this is the sequence handed to the
    /// external rendering collaborator.
    pub fn render_with(&self, mut f: impl FnMut(&dyn Component, &Entity, Option<&Camera>)) {
        for renderer in &self.renderers {
            if !renderer.visible {
                continue;
            }
            for &id in &self.order {
                let Some(entity) = self.get(id) else { continue };
                if !entity.visible || !renderer.accepts(&entity.groups) {
                    continue;
                }
                for (_, component) in entity.components() {
                    if component.visible() {
                        f(component, entity, renderer.camera.as_ref());
                    }
                }
            }
        }
    }

    /// Diagnostic overlay pass; same filtering as [`Scene::render`].
    pub fn debug_render(&self) {
        for renderer in &self.renderers {
            if !renderer.visible {
                continue;
            }
            for &id in &self.order {
                let Some(entity) = self.get(id) else { continue };
                if !entity.visible || !renderer.accepts(&entity.groups) {
                    continue;
                }
                for (_, component) in entity.components() {
                    if component.visible() {
                        component.debug_render(entity, renderer.camera.as_ref());
                    }
                }
            }
        }
    }

    // ── Invariant checking ───────────────────────────────────────────

    /// Recompute both derived indices from a full scan and panic on any
    /// divergence. Divergence means some mutation path bypassed the scene —
    /// a programming error, not a runtime condition.
    ///
    /// # Panics
    ///
    /// Panics on divergence, and if called while an entity is mid-update.
    pub fn verify_indices(&self) {
        let mut groups: HashMap<String, BTreeSet<EntityId>> = HashMap::new();
        let mut tags: HashMap<String, BTreeSet<ColliderRef>> = HashMap::new();
        let mut occupied = 0usize;

        for (i, slot) in self.slots.iter().enumerate() {
            match &slot.state {
                SlotState::Free => {}
                SlotState::Busy(_) => panic!("verify_indices called while an entity is mid-update"),
                SlotState::Occupied(entity) => {
                    occupied += 1;
                    let id = EntityId {
                        index: i as u32,
                        generation: slot.generation,
                    };
                    assert!(
                        self.order.contains(&id),
                        "entity {id:?} missing from the iteration order"
                    );
                    for label in &entity.groups {
                        groups.entry(label.clone()).or_default().insert(id);
                    }
                    for (cslot, component) in entity.components() {
                        if let Some(collider) = component.collider() {
                            let r = ColliderRef {
                                entity: id,
                                slot: cslot,
                            };
                            assert_eq!(
                                collider.binding(),
                                Some(r),
                                "collider {r:?} binding out of sync"
                            );
                            for tag in collider.tags() {
                                tags.entry(tag.to_string()).or_default().insert(r);
                            }
                        }
                    }
                }
            }
        }

        assert_eq!(occupied, self.order.len(), "iteration order out of sync");
        assert_eq!(&groups, &self.groups, "group index diverged from the entity list");
        assert_eq!(
            &tags, &self.colliders,
            "collider tag index diverged from the entity list"
        );
    }

    // ── Arena internals ──────────────────────────────────────────────

    fn alloc(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Busy(None);
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                state: SlotState::Busy(None),
            });
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Bump the generation so stale handles fail, and recycle the slot.
    fn free_slot(&mut self, id: EntityId) {
        let slot = &mut self.slots[id.index as usize];
        slot.generation += 1;
        slot.state = SlotState::Free;
        self.free.push(id.index);
    }

    /// Extract an entity for exclusive work, leaving its slot `Busy` so
    /// lifecycle requests against it stage instead of failing.
    fn begin(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match std::mem::replace(&mut slot.state, SlotState::Busy(None)) {
            SlotState::Occupied(entity) => Some(entity),
            other => {
                slot.state = other;
                None
            }
        }
    }

    /// Reinsert an extracted entity, applying any lifecycle operation staged
    /// against it while it was out.
    fn finish(&mut self, id: EntityId, mut entity: Entity) {
        let pending = match &mut self.slots[id.index as usize].state {
            SlotState::Busy(p) => p.take(),
            _ => None,
        };
        match pending {
            None => {
                self.slots[id.index as usize].state = SlotState::Occupied(entity);
            }
            Some(Pending::Remove) => {
                self.detach(id, &mut entity);
                self.free_slot(id);
            }
            Some(Pending::Recycle(bucket)) => {
                self.detach(id, &mut entity);
                entity.each_component(|_, c, e| c.recycled(e));
                self.free_slot(id);
                log::debug!("scene: recycled entity {id} into '{bucket}'");
                self.cache.entry(bucket).or_default().push(entity);
            }
            Some(Pending::Destroy) => {
                self.detach(id, &mut entity);
                entity.each_component(|_, c, e| c.destroyed(e));
                self.free_slot(id);
                log::debug!("scene: destroyed entity {id}");
            }
        }
    }

    /// Shared removal path. For a contained entity: detach and return it.
    /// For the one mid-update: drop its index entries and iteration-order
    /// entry now, stage `fate`, return `None`.
    fn take_out(&mut self, id: EntityId, fate: Pending) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &mut slot.state {
            SlotState::Free => None,
            SlotState::Busy(pending) => {
                *pending = Some(fate);
                self.unindex_by_id(id);
                self.order.retain(|&e| e != id);
                log::debug!("scene: staged teardown of mid-update entity {id}");
                None
            }
            SlotState::Occupied(_) => {
                let SlotState::Occupied(mut entity) =
                    std::mem::replace(&mut slot.state, SlotState::Free)
                else {
                    unreachable!()
                };
                self.detach(id, &mut entity);
                self.free_slot(id);
                Some(entity)
            }
        }
    }

    /// Symmetric teardown of an extracted entity: indices, bindings, hooks
    /// (`removed`, then per-component `removed_from_scene`), scene flag,
    /// iteration order. Idempotent against the immediate cleanup `take_out`
    /// does for staged operations.
    fn detach(&mut self, id: EntityId, entity: &mut Entity) {
        self.unindex_by_id(id);
        for cell in entity.components.iter_mut().flatten() {
            if let Some(collider) = cell.collider_mut() {
                collider.binding = None;
            }
        }
        // Flag drops before the hooks run: the entity is already unindexed,
        // so removal hooks may mutate groups and components directly.
        entity.in_scene = false;
        entity.each_component(|_, c, e| c.removed(e));
        entity.each_component(|_, c, e| c.removed_from_scene(e, self));
        self.order.retain(|&e| e != id);
        log::debug!("scene: removed entity {id}");
    }

    /// Apply staged depth changes, then stable-sort the iteration order.
    fn flush_depth(&mut self) {
        for slot in &mut self.slots {
            if let SlotState::Occupied(entity) = &mut slot.state {
                entity.flush_depth();
            }
        }
        let mut order = std::mem::take(&mut self.order);
        order.sort_by_key(|&id| self.get(id).map_or(i32::MAX, |e| e.depth()));
        self.order = order;
    }

    // ── Index maintenance ────────────────────────────────────────────
    //
    // These are the only paths that touch the derived maps. Empty buckets
    // are dropped so the maps never accumulate dead keys.

    pub(crate) fn index_group_insert(&mut self, label: &str, id: EntityId) {
        self.groups.entry(label.to_string()).or_default().insert(id);
    }

    pub(crate) fn index_group_remove(&mut self, label: &str, id: EntityId) {
        if let Some(set) = self.groups.get_mut(label) {
            set.remove(&id);
            if set.is_empty() {
                self.groups.remove(label);
            }
        }
    }

    pub(crate) fn index_tag_insert(&mut self, tag: &str, r: ColliderRef) {
        self.colliders.entry(tag.to_string()).or_default().insert(r);
    }

    pub(crate) fn index_tag_remove(&mut self, tag: &str, r: ColliderRef) {
        if let Some(set) = self.colliders.get_mut(tag) {
            set.remove(&r);
            if set.is_empty() {
                self.colliders.remove(tag);
            }
        }
    }

    /// Drop every index entry referring to `id`, without the entity in hand.
    /// Used when tearing down a mid-update entity whose data is extracted.
    fn unindex_by_id(&mut self, id: EntityId) {
        self.groups.retain(|_, set| {
            set.remove(&id);
            !set.is_empty()
        });
        self.colliders.retain(|_, set| {
            set.retain(|r| r.entity != id);
            !set.is_empty()
        });
    }

    /// Bind a component's collider (if any): set its scene address and
    /// register all its tags.
    pub(crate) fn bind_component(&mut self, id: EntityId, slot: ComponentSlot, entity: &mut Entity) {
        let Some(component) = entity.components.get_mut(slot.index()).and_then(|c| c.as_mut())
        else {
            return;
        };
        if let Some(collider) = component.collider_mut() {
            let r = ColliderRef { entity: id, slot };
            collider.binding = Some(r);
            let tags: Vec<String> = collider.tags.iter().cloned().collect();
            for tag in tags {
                self.index_tag_insert(&tag, r);
            }
        }
    }

    /// Unbind a detached component's collider: clear its scene address and
    /// unregister all its tags.
    pub(crate) fn unbind_component(&mut self, component: &mut Box<dyn Component>) {
        if let Some(collider) = component.collider_mut() {
            if let Some(r) = collider.binding.take() {
                let tags: Vec<String> = collider.tags.iter().cloned().collect();
                for tag in tags {
                    self.index_tag_remove(&tag, r);
                }
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
