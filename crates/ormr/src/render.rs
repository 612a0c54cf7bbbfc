//! # Render Pass Plumbing — Cameras and Renderers
//!
//! The core does not draw. It hands the external rendering collaborator an
//! ordered, depth-sorted, visibility-filtered sequence of (component, camera)
//! pairs — see [`Scene::render_with`](crate::scene::Scene::render_with) — and
//! components implement
//! [`Component::render`](crate::component::Component::render) against
//! whatever backend the host wires up.
//!
//! A [`Renderer`] is one stage of that pass: a group mask selecting which
//! entities it draws, and an optional [`Camera`]. Renderers run in list
//! order; they are unrelated to depth, which orders entities *within* each
//! renderer's walk.

use std::collections::HashSet;

use glam::{Mat4, Vec2, Vec3};

/// A 2D camera transform: position, origin, scale, rotation.
///
/// Used to compute a component's screen-space position for rendering only —
/// physics operates purely in scene-local coordinates and never consults a
/// camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// The scene point that lands on `origin` in screen space.
    pub position: Vec2,
    /// Screen-space anchor (e.g. half the viewport for a centered camera).
    pub origin: Vec2,
    pub scale: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }

    /// Camera looking at `position` with default origin/scale/rotation.
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// The full view matrix: translate by `-position`, scale, rotate, then
    /// translate by `origin`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.origin.x, self.origin.y, 0.0))
            * Mat4::from_rotation_z(self.rotation)
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::from_translation(Vec3::new(-self.position.x, -self.position.y, 0.0))
    }

    /// Transform a scene-space point to screen space.
    pub fn apply(&self, point: Vec2) -> Vec2 {
        let v = self.matrix() * point.extend(0.0).extend(1.0);
        Vec2::new(v.x, v.y)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// One stage of the render pass.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    /// Group mask: `None` draws every entity, `Some` only entities carrying
    /// at least one of the listed groups.
    groups: Option<HashSet<String>>,
    /// Camera handed to each component's `render`. `None` means screen-space.
    pub camera: Option<Camera>,
    /// Invisible renderers are skipped wholesale.
    pub visible: bool,
}

impl Renderer {
    /// A renderer that draws every visible entity, screen-space.
    pub fn new() -> Self {
        Self {
            groups: None,
            camera: None,
            visible: true,
        }
    }

    /// Restrict to entities carrying at least one of `groups`.
    pub fn for_groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Attach a camera.
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Whether an entity with the given group labels passes this renderer's
    /// mask.
    pub fn accepts(&self, entity_groups: &HashSet<String>) -> bool {
        match &self.groups {
            None => true,
            Some(mask) => mask.iter().any(|g| entity_groups.contains(g)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_camera_passes_points_through() {
        let cam = Camera::new();
        let p = cam.apply(Vec2::new(5.0, -3.0));
        assert_relative_eq!(p.x, 5.0);
        assert_relative_eq!(p.y, -3.0);
    }

    #[test]
    fn camera_position_and_origin() {
        let mut cam = Camera::at(Vec2::new(100.0, 50.0));
        cam.origin = Vec2::new(160.0, 120.0); // center of a 320x240 view
        let p = cam.apply(Vec2::new(100.0, 50.0));
        assert_relative_eq!(p.x, 160.0);
        assert_relative_eq!(p.y, 120.0);
    }

    #[test]
    fn camera_scale() {
        let mut cam = Camera::new();
        cam.scale = Vec2::splat(2.0);
        let p = cam.apply(Vec2::new(3.0, 4.0));
        assert_relative_eq!(p.x, 6.0);
        assert_relative_eq!(p.y, 8.0);
    }

    #[test]
    fn renderer_group_mask() {
        let all = Renderer::new();
        let hud = Renderer::new().for_groups(["hud"]);

        let mut groups = HashSet::new();
        assert!(all.accepts(&groups));
        assert!(!hud.accepts(&groups));

        groups.insert("hud".to_string());
        assert!(hud.accepts(&groups));
    }
}
