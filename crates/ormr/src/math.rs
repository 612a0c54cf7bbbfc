//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The [`Rect`] type is a scene-space axis-aligned
//! rectangle used by collider bounds (y grows downward, so `top < bottom`).

pub use glam::{Mat4, Vec2};

/// A scene-space axis-aligned rectangle.
///
/// `min` is the top-left corner, `max` the bottom-right. The interval is
/// half-open on both axes: a point on the right or bottom edge is outside,
/// and two rects that merely touch edge-to-edge do not overlap. Grid-aligned
/// movement depends on that — a body resting flush against a wall must not
/// count as colliding with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Build a rect from its top-left corner and size.
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(left, top),
            max: Vec2::new(left + width, top + height),
        }
    }

    pub fn left(&self) -> f32 {
        self.min.x
    }

    pub fn right(&self) -> f32 {
        self.max.x
    }

    pub fn top(&self) -> f32 {
        self.min.y
    }

    pub fn bottom(&self) -> f32 {
        self.max.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Return a copy shifted by `offset`.
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Strict overlap test with half-open semantics: touching edges (exact
    /// equality) do not count as overlapping.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Whether a point is inside (half-open: min edge in, max edge out).
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_basic() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let right = Rect::new(10.0, 0.0, 10.0, 10.0);
        let below = Rect::new(0.0, 10.0, 10.0, 10.0);
        assert!(!a.overlaps(&right));
        assert!(!a.overlaps(&below));

        // One unit into the rect does overlap.
        let shifted = right.translated(Vec2::new(-1.0, 0.0));
        assert!(a.overlaps(&shifted));
    }

    #[test]
    fn translated_moves_both_corners() {
        let a = Rect::new(1.0, 2.0, 3.0, 4.0).translated(Vec2::new(10.0, 20.0));
        assert_eq!(a.left(), 11.0);
        assert_eq!(a.top(), 22.0);
        assert_eq!(a.width(), 3.0);
        assert_eq!(a.height(), 4.0);
    }

    #[test]
    fn contains_half_open() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.contains(Vec2::new(0.0, 0.0)));
        assert!(a.contains(Vec2::new(9.9, 9.9)));
        assert!(!a.contains(Vec2::new(10.0, 0.0)));
    }
}
