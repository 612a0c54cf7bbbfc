//! # Collider — Tag-Indexed Collision Capability
//!
//! A [`Collider`] is the collision capability a component exposes through
//! [`Component::collider`](crate::component::Component::collider): a set of
//! tags (the broad phase — the scene indexes colliders by tag so queries only
//! touch candidates that matter) and a shape (the narrow phase — a precise
//! geometric overlap test).
//!
//! Shapes form a closed set, [`ColliderShape`]: an axis-aligned box
//! ([`Hitbox`]) or a tile-indexed solid/empty grid ([`Hitgrid`]). The
//! pairwise overlap test is a single exhaustive `match` over the variant
//! matrix, so adding a shape without covering every pairing is a compile
//! error.
//!
//! All box tests use half-open interval semantics: touching edges (exact
//! equality) do NOT count as overlapping. Grid-aligned movement depends on
//! this — a body stopped flush against a wall must be able to rest there
//! without registering a collision.

use std::collections::HashSet;

use glam::Vec2;

use crate::entity::{ComponentSlot, EntityId};
use crate::math::Rect;
use crate::scene::Scene;

/// Scene-wide address of a collider: the owning entity plus the component's
/// pool slot. This is what the scene's tag index stores and what collision
/// queries return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderRef {
    pub entity: EntityId,
    pub slot: ComponentSlot,
}

/// An axis-aligned box, placed relative to the owning entity's position.
///
/// `left`/`top` are the local offset; scene-space edges are always derived
/// from the entity's *current* position — they are never cached, so they can
/// never go stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Hitbox {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The box's scene-space rectangle given the owning entity's position.
    pub fn scene_rect(&self, origin: Vec2) -> Rect {
        Rect::new(
            origin.x + self.left,
            origin.y + self.top,
            self.width,
            self.height,
        )
    }
}

/// A sparse, unbounded grid of solid/empty tiles, anchored at the owning
/// entity's position. Tile (0, 0)'s top-left corner sits at the entity
/// position; negative tile coordinates are as valid as positive ones.
#[derive(Debug, Clone)]
pub struct Hitgrid {
    tile_width: f32,
    tile_height: f32,
    cells: HashSet<(i32, i32)>,
}

impl Hitgrid {
    /// # Panics
    ///
    /// Panics if either tile dimension is not strictly positive — that is a
    /// configuration bug, not a runtime condition.
    pub fn new(tile_width: f32, tile_height: f32) -> Self {
        assert!(
            tile_width > 0.0 && tile_height > 0.0,
            "hitgrid tile size must be positive (got {tile_width}x{tile_height})"
        );
        Self {
            tile_width,
            tile_height,
            cells: HashSet::new(),
        }
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }

    /// Write a rectangular block of occupancy: `columns` x `rows` tiles
    /// starting at (`tx`, `ty`). A non-positive block size is a no-op — the
    /// grid is sparse and unbounded, so there is nothing to clamp against.
    pub fn set(&mut self, solid: bool, tx: i32, ty: i32, columns: i32, rows: i32) {
        if columns <= 0 || rows <= 0 {
            return;
        }
        for x in tx..tx + columns {
            for y in ty..ty + rows {
                if solid {
                    self.cells.insert((x, y));
                } else {
                    self.cells.remove(&(x, y));
                }
            }
        }
    }

    /// Single-cell write.
    pub fn set_tile(&mut self, solid: bool, tx: i32, ty: i32) {
        self.set(solid, tx, ty, 1, 1);
    }

    /// Bulk read: true if any tile in the `columns` x `rows` block starting
    /// at (`tx`, `ty`) is solid. A non-positive block size reads empty.
    pub fn has(&self, tx: i32, ty: i32, columns: i32, rows: i32) -> bool {
        if columns <= 0 || rows <= 0 {
            return false;
        }
        for x in tx..tx + columns {
            for y in ty..ty + rows {
                if self.cells.contains(&(x, y)) {
                    return true;
                }
            }
        }
        false
    }

    /// Single-cell read.
    pub fn is_solid(&self, tx: i32, ty: i32) -> bool {
        self.cells.contains(&(tx, ty))
    }

    /// Number of solid tiles.
    pub fn solid_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate solid tile coordinates (arbitrary order).
    pub(crate) fn solid_tiles(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells.iter().copied()
    }

    /// Scene-space rect of one tile given the owning entity's position.
    fn tile_rect(&self, origin: Vec2, tx: i32, ty: i32) -> Rect {
        Rect::new(
            origin.x + tx as f32 * self.tile_width,
            origin.y + ty as f32 * self.tile_height,
            self.tile_width,
            self.tile_height,
        )
    }
}

/// The closed set of collider shapes.
#[derive(Debug, Clone)]
pub enum ColliderShape {
    Hitbox(Hitbox),
    Hitgrid(Hitgrid),
}

/// Tags plus shape plus scene binding. Embed one of these in a component and
/// return it from `Component::collider` to participate in collision queries.
///
/// While the owning entity is inside a scene the collider is *bound*: its
/// [`ColliderRef`] is set and every tag lives in the scene's tag index. Tag
/// mutations on a bound collider must go through
/// [`Scene::tag`]/[`Scene::untag`] (or `Context::tag`/`Context::untag` from
/// inside an update) so the index stays symmetric — that symmetry is the
/// invariant every collision query depends on.
#[derive(Debug)]
pub struct Collider {
    pub shape: ColliderShape,
    pub(crate) tags: HashSet<String>,
    pub(crate) binding: Option<ColliderRef>,
}

impl Collider {
    /// An axis-aligned box collider at a local offset from the entity.
    pub fn hitbox(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            shape: ColliderShape::Hitbox(Hitbox::new(left, top, width, height)),
            tags: HashSet::new(),
            binding: None,
        }
    }

    /// A tile-grid collider anchored at the entity position.
    pub fn hitgrid(tile_width: f32, tile_height: f32) -> Self {
        Self {
            shape: ColliderShape::Hitgrid(Hitgrid::new(tile_width, tile_height)),
            tags: HashSet::new(),
            binding: None,
        }
    }

    /// Builder-style tag, for detached colliders under construction.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add a tag.
    ///
    /// # Panics
    ///
    /// Panics if the collider is bound into a scene — use [`Scene::tag`] (or
    /// `Context::tag` mid-update) there, so the tag index stays in sync.
    pub fn tag(&mut self, tag: impl Into<String>) {
        assert!(
            self.binding.is_none(),
            "collider is inside a scene; use Scene::tag so the tag index stays in sync"
        );
        self.tags.insert(tag.into());
    }

    /// Remove a tag. Same binding rule as [`Collider::tag`].
    ///
    /// # Panics
    ///
    /// Panics if the collider is bound into a scene.
    pub fn untag(&mut self, tag: &str) {
        assert!(
            self.binding.is_none(),
            "collider is inside a scene; use Scene::untag so the tag index stays in sync"
        );
        self.tags.remove(tag);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|s| s.as_str())
    }

    /// Scene-wide address while bound, `None` while detached.
    pub fn binding(&self) -> Option<ColliderRef> {
        self.binding
    }

    /// Direct access to the hitbox shape, if this is a box collider.
    pub fn as_hitbox(&self) -> Option<&Hitbox> {
        match &self.shape {
            ColliderShape::Hitbox(hb) => Some(hb),
            ColliderShape::Hitgrid(_) => None,
        }
    }

    pub fn as_hitbox_mut(&mut self) -> Option<&mut Hitbox> {
        match &mut self.shape {
            ColliderShape::Hitbox(hb) => Some(hb),
            ColliderShape::Hitgrid(_) => None,
        }
    }

    /// Direct access to the grid shape, if this is a grid collider.
    pub fn as_hitgrid(&self) -> Option<&Hitgrid> {
        match &self.shape {
            ColliderShape::Hitgrid(g) => Some(g),
            ColliderShape::Hitbox(_) => None,
        }
    }

    pub fn as_hitgrid_mut(&mut self) -> Option<&mut Hitgrid> {
        match &mut self.shape {
            ColliderShape::Hitgrid(g) => Some(g),
            ColliderShape::Hitbox(_) => None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────
    //
    // `origin` is always the owning entity's current position; scene-space
    // placement is derived fresh on every call.

    /// True if this collider, virtually offset by (`dx`, `dy`), overlaps any
    /// collider carrying `tag` in the scene. A collider that is not bound
    /// into a scene has nothing to test against and reports `false`.
    pub fn check(&self, scene: &Scene, origin: Vec2, tag: &str, dx: f32, dy: f32) -> bool {
        self.collide(scene, origin, tag, dx, dy).is_some()
    }

    /// True if any tag in `tags` satisfies [`Collider::check`].
    pub fn checks<S: AsRef<str>>(
        &self,
        scene: &Scene,
        origin: Vec2,
        tags: &[S],
        dx: f32,
        dy: f32,
    ) -> bool {
        tags.iter()
            .any(|t| self.check(scene, origin, t.as_ref(), dx, dy))
    }

    /// First overlapping collider carrying `tag`, or `None`.
    pub fn collide(
        &self,
        scene: &Scene,
        origin: Vec2,
        tag: &str,
        dx: f32,
        dy: f32,
    ) -> Option<ColliderRef> {
        if self.binding.is_none() {
            return None;
        }
        let mut hit = None;
        scene.query_tag(self, origin, tag, dx, dy, |r| {
            hit = Some(r);
            false
        });
        hit
    }

    /// All overlapping colliders carrying `tag`.
    pub fn collide_all(
        &self,
        scene: &Scene,
        origin: Vec2,
        tag: &str,
        dx: f32,
        dy: f32,
    ) -> Vec<ColliderRef> {
        let mut hits = Vec::new();
        if self.binding.is_none() {
            return hits;
        }
        scene.query_tag(self, origin, tag, dx, dy, |r| {
            hits.push(r);
            true
        });
        hits
    }
}

// ── Narrow phase: pairwise shape dispatch ────────────────────────────────

/// Precise overlap test between two placed colliders, with `a` virtually
/// offset by (`dx`, `dy`). One exhaustive match over the shape matrix.
pub(crate) fn overlaps(
    a: &Collider,
    a_origin: Vec2,
    dx: f32,
    dy: f32,
    b: &Collider,
    b_origin: Vec2,
) -> bool {
    let a_origin = a_origin + Vec2::new(dx, dy);
    match (&a.shape, &b.shape) {
        (ColliderShape::Hitbox(ab), ColliderShape::Hitbox(bb)) => {
            ab.scene_rect(a_origin).overlaps(&bb.scene_rect(b_origin))
        }
        (ColliderShape::Hitbox(ab), ColliderShape::Hitgrid(bg)) => {
            box_vs_grid(ab.scene_rect(a_origin), bg, b_origin)
        }
        (ColliderShape::Hitgrid(ag), ColliderShape::Hitbox(bb)) => {
            box_vs_grid(bb.scene_rect(b_origin), ag, a_origin)
        }
        (ColliderShape::Hitgrid(ag), ColliderShape::Hitgrid(bg)) => {
            grid_vs_grid(ag, a_origin, bg, b_origin)
        }
    }
}

/// Map the box's scene bounds to the grid's candidate tile rectangle and test
/// occupancy of every covered cell. The candidate range from flooring the raw
/// edges can include a touching-but-not-overlapping boundary column or row,
/// so each solid candidate is confirmed with the strict [`Rect::overlaps`]
/// test — the half-open semantics stay exact at any coordinate magnitude,
/// with no epsilon to be swallowed by float spacing far from the origin.
fn box_vs_grid(rect: Rect, grid: &Hitgrid, grid_origin: Vec2) -> bool {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return false;
    }
    let x0 = ((rect.left() - grid_origin.x) / grid.tile_width()).floor() as i32;
    let x1 = ((rect.right() - grid_origin.x) / grid.tile_width()).floor() as i32;
    let y0 = ((rect.top() - grid_origin.y) / grid.tile_height()).floor() as i32;
    let y1 = ((rect.bottom() - grid_origin.y) / grid.tile_height()).floor() as i32;

    for tx in x0..=x1 {
        for ty in y0..=y1 {
            if grid.is_solid(tx, ty) && grid.tile_rect(grid_origin, tx, ty).overlaps(&rect) {
                return true;
            }
        }
    }
    false
}

/// Grid↔grid: every solid tile of `a` is a box; test each against `b`'s
/// occupancy. Sparse grids keep this proportional to `a`'s solid tiles.
fn grid_vs_grid(a: &Hitgrid, a_origin: Vec2, b: &Hitgrid, b_origin: Vec2) -> bool {
    a.solid_tiles()
        .any(|(tx, ty)| box_vs_grid(a.tile_rect(a_origin, tx, ty), b, b_origin))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes(a: Hitbox, ao: Vec2, dx: f32, dy: f32, b: Hitbox, bo: Vec2) -> bool {
        let a = Collider {
            shape: ColliderShape::Hitbox(a),
            tags: HashSet::new(),
            binding: None,
        };
        let b = Collider {
            shape: ColliderShape::Hitbox(b),
            tags: HashSet::new(),
            binding: None,
        };
        overlaps(&a, ao, dx, dy, &b, bo)
    }

    #[test]
    fn box_box_touching_is_not_overlap() {
        let a = Hitbox::new(0.0, 0.0, 8.0, 8.0);
        let b = Hitbox::new(0.0, 0.0, 8.0, 8.0);
        // b sits exactly to the right of a.
        assert!(!boxes(a, Vec2::ZERO, 0.0, 0.0, b, Vec2::new(8.0, 0.0)));
        // One unit of virtual offset pushes them into overlap.
        assert!(boxes(a, Vec2::ZERO, 1.0, 0.0, b, Vec2::new(8.0, 0.0)));
    }

    #[test]
    fn box_box_uses_current_origin() {
        let a = Hitbox::new(0.0, 0.0, 4.0, 4.0);
        let b = Hitbox::new(0.0, 0.0, 4.0, 4.0);
        assert!(boxes(a, Vec2::new(10.0, 0.0), 0.0, 0.0, b, Vec2::new(12.0, 0.0)));
        assert!(!boxes(a, Vec2::new(10.0, 0.0), 0.0, 0.0, b, Vec2::new(20.0, 0.0)));
    }

    #[test]
    fn grid_set_and_has_blocks() {
        let mut g = Hitgrid::new(8.0, 8.0);
        g.set(true, 1, 1, 3, 2);
        assert_eq!(g.solid_count(), 6);
        assert!(g.is_solid(3, 2));
        assert!(!g.is_solid(4, 1));
        assert!(g.has(0, 0, 2, 2)); // block touches (1,1)
        assert!(!g.has(0, 0, 1, 1));

        g.set(false, 1, 1, 3, 2);
        assert_eq!(g.solid_count(), 0);
    }

    #[test]
    fn grid_negative_coordinates_are_valid() {
        let mut g = Hitgrid::new(16.0, 16.0);
        g.set_tile(true, -2, -3);
        assert!(g.is_solid(-2, -3));
        assert!(g.has(-4, -4, 4, 4));
    }

    #[test]
    fn grid_degenerate_block_is_noop() {
        let mut g = Hitgrid::new(8.0, 8.0);
        g.set(true, 0, 0, 0, 5);
        g.set(true, 0, 0, 5, -1);
        assert_eq!(g.solid_count(), 0);
        assert!(!g.has(0, 0, 0, 0));
    }

    #[test]
    fn box_grid_boundary_to_boundary_is_not_overlap() {
        let mut grid = Hitgrid::new(8.0, 8.0);
        grid.set_tile(true, 1, 0); // solid tile spans x in [8, 16)
        let g = Collider {
            shape: ColliderShape::Hitgrid(grid),
            tags: HashSet::new(),
            binding: None,
        };
        let b = Collider {
            shape: ColliderShape::Hitbox(Hitbox::new(0.0, 0.0, 8.0, 8.0)),
            tags: HashSet::new(),
            binding: None,
        };
        // Box spans [0, 8): exactly touching the solid tile.
        assert!(!overlaps(&b, Vec2::ZERO, 0.0, 0.0, &g, Vec2::ZERO));
        // Shifted one unit in: overlap.
        assert!(overlaps(&b, Vec2::ZERO, 1.0, 0.0, &g, Vec2::ZERO));
        // Symmetric dispatch (grid as the probing side).
        assert!(!overlaps(&g, Vec2::ZERO, 0.0, 0.0, &b, Vec2::ZERO));
        assert!(overlaps(&g, Vec2::ZERO, -1.0, 0.0, &b, Vec2::ZERO));
    }

    #[test]
    fn box_grid_flush_contact_stays_exact_far_from_origin() {
        // At x ~ 8192 the f32 grid spacing is coarser than any small nudge
        // constant, so the boundary test must not depend on one.
        let mut grid = Hitgrid::new(8.0, 8.0);
        grid.set_tile(true, 1024, 0); // solid tile spans x in [8192, 8200)
        let g = Collider {
            shape: ColliderShape::Hitgrid(grid),
            tags: HashSet::new(),
            binding: None,
        };
        let b = Collider {
            shape: ColliderShape::Hitbox(Hitbox::new(0.0, 0.0, 8.0, 8.0)),
            tags: HashSet::new(),
            binding: None,
        };
        // Box spans [8184, 8192): flush against the tile, not overlapping.
        assert!(!overlaps(&b, Vec2::new(8184.0, 0.0), 0.0, 0.0, &g, Vec2::ZERO));
        // One unit further: overlap.
        assert!(overlaps(&b, Vec2::new(8184.0, 0.0), 1.0, 0.0, &g, Vec2::ZERO));
    }

    #[test]
    fn grid_grid_overlap() {
        let mut ga = Hitgrid::new(8.0, 8.0);
        ga.set_tile(true, 0, 0);
        let mut gb = Hitgrid::new(4.0, 4.0);
        gb.set_tile(true, 0, 0);
        let a = Collider {
            shape: ColliderShape::Hitgrid(ga),
            tags: HashSet::new(),
            binding: None,
        };
        let b = Collider {
            shape: ColliderShape::Hitgrid(gb),
            tags: HashSet::new(),
            binding: None,
        };
        // b's solid tile spans [12, 16) once offset by 12: clear of a's [0, 8).
        assert!(!overlaps(&a, Vec2::ZERO, 0.0, 0.0, &b, Vec2::new(12.0, 0.0)));
        // Offset b to [6, 10): overlaps a's tile.
        assert!(overlaps(&a, Vec2::ZERO, 0.0, 0.0, &b, Vec2::new(6.0, 0.0)));
        // Touching exactly at x = 8: no overlap.
        assert!(!overlaps(&a, Vec2::ZERO, 0.0, 0.0, &b, Vec2::new(8.0, 0.0)));
    }

    #[test]
    fn shape_accessors_match_the_constructor() {
        let mut boxed = Collider::hitbox(1.0, 2.0, 3.0, 4.0);
        assert_eq!(boxed.as_hitbox().map(|hb| hb.width), Some(3.0));
        assert!(boxed.as_hitgrid().is_none());
        boxed.as_hitbox_mut().unwrap().width = 5.0;
        assert_eq!(boxed.as_hitbox().map(|hb| hb.width), Some(5.0));

        let mut gridded = Collider::hitgrid(8.0, 8.0);
        assert!(gridded.as_hitbox_mut().is_none());
        gridded.as_hitgrid_mut().unwrap().set_tile(true, 0, 0);
        assert_eq!(gridded.as_hitgrid().map(|g| g.solid_count()), Some(1));
    }

    #[test]
    fn tag_mutation_detached() {
        let mut c = Collider::hitbox(0.0, 0.0, 8.0, 8.0).with_tag("solid");
        assert!(c.has_tag("solid"));
        c.tag("wall");
        c.untag("solid");
        assert!(c.has_tag("wall"));
        assert!(!c.has_tag("solid"));
    }
}
