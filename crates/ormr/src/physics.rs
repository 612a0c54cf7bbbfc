//! # Physics — Swept, Remainder-Accumulating Movement
//!
//! [`Physics`] is a hitbox collider that moves: velocity integration with
//! sub-unit precision, swept one-unit-at-a-time stepping against solid-tagged
//! colliders, and per-axis collision callbacks.
//!
//! ## Why remainders
//!
//! Positions advance in whole units so collision resolution is exact, but
//! speeds are rarely whole units per frame. The fractional part of each
//! frame's displacement is banked in `remainder` and carried to the next
//! frame, so a speed of 30 units/second at 60 fps (0.5 units/frame) still
//! covers exactly 30 units over a second — no drift, no lost motion.
//!
//! ## Why unit stepping
//!
//! Each axis advances one unit at a time, testing the solid tags after every
//! unit. Stepping the full distance and backing off could skip clean over a
//! one-unit-thick wall; unit stepping cannot tunnel. Axes resolve
//! independently and in a fixed order (X, then Y), which is observable:
//! diagonal motion into a corner resolves axis-by-axis, not as one diagonal
//! sweep.
//!
//! A blocked axis discards its unprocessed motion for the frame — blocked
//! movement is lost, not deferred — and reports [`AxisState::Blocked`] until
//! the next frame restarts the solver.

use std::any::Any;

use glam::Vec2;

use crate::collider::Collider;
use crate::component::{Component, Context};

/// Per-axis solver state for the most recent frame. Informational only; every
/// frame restarts the solver from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisState {
    /// No whole unit of motion was attempted this frame.
    #[default]
    Idle,
    /// Every unit of motion was committed.
    Moving,
    /// A solid stopped the axis; the rest of the frame's motion was dropped.
    Blocked,
}

/// Fired when an axis is blocked by a solid, after the overlap query has
/// completed — never from inside it. Receives the physics component itself
/// (temporarily taken out of its field so the borrow is clean) and the frame
/// context.
pub type CollideCallback = Box<dyn FnMut(&mut Physics, &mut Context)>;

enum Axis {
    X,
    Y,
}

/// A moving hitbox. Attach to an entity and give it solid tags to collide
/// against:
///
/// ```ignore
/// let body = Physics::new(0.0, 0.0, 8.0, 8.0)
///     .with_solid("solid")
///     .with_speed(Vec2::new(30.0, 0.0));
/// entity.add(Box::new(body));
/// ```
pub struct Physics {
    /// The swept hitbox. Tag it to make the body itself collidable.
    pub collider: Collider,
    /// Velocity in units per second.
    pub speed: Vec2,
    /// Banked sub-unit displacement per axis.
    remainder: Vec2,
    /// Tags treated as blocking.
    solids: Vec<String>,
    state_x: AxisState,
    state_y: AxisState,
    on_collide_x: Option<CollideCallback>,
    on_collide_y: Option<CollideCallback>,
}

impl Physics {
    /// A physics body with a hitbox at the given local offset and size.
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            collider: Collider::hitbox(left, top, width, height),
            speed: Vec2::ZERO,
            remainder: Vec2::ZERO,
            solids: Vec::new(),
            state_x: AxisState::Idle,
            state_y: AxisState::Idle,
            on_collide_x: None,
            on_collide_y: None,
        }
    }

    /// Builder: add a blocking tag.
    pub fn with_solid(mut self, tag: impl Into<String>) -> Self {
        self.add_solid(tag);
        self
    }

    /// Builder: initial velocity.
    pub fn with_speed(mut self, speed: Vec2) -> Self {
        self.speed = speed;
        self
    }

    /// Builder: tag the body's own hitbox.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.collider = self.collider.with_tag(tag);
        self
    }

    /// Add a tag to the set treated as blocking.
    pub fn add_solid(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.solids.contains(&tag) {
            self.solids.push(tag);
        }
    }

    /// Stop treating a tag as blocking.
    pub fn remove_solid(&mut self, tag: &str) {
        self.solids.retain(|t| t != tag);
    }

    /// The tags treated as blocking, in registration order.
    pub fn solids(&self) -> &[String] {
        &self.solids
    }

    /// Set the X-axis collision callback.
    pub fn on_collide_x(&mut self, callback: CollideCallback) {
        self.on_collide_x = Some(callback);
    }

    /// Set the Y-axis collision callback.
    pub fn on_collide_y(&mut self, callback: CollideCallback) {
        self.on_collide_y = Some(callback);
    }

    /// Banked sub-unit displacement.
    pub fn remainder(&self) -> Vec2 {
        self.remainder
    }

    /// X-axis solver state from the most recent frame.
    pub fn state_x(&self) -> AxisState {
        self.state_x
    }

    /// Y-axis solver state from the most recent frame.
    pub fn state_y(&self) -> AxisState {
        self.state_y
    }

    // ── Movement ─────────────────────────────────────────────────────

    /// Displace by `amount` (scene units), X axis first, then Y. Fractional
    /// parts bank into the remainder; whole units step-and-test against the
    /// solid tags. Returns the whole units actually committed per axis.
    ///
    /// A body whose collider is not bound into a scene has no solids to test
    /// against: the call is a no-op reporting zero movement.
    pub fn move_by(&mut self, ctx: &mut Context, amount: Vec2) -> Vec2 {
        if self.collider.binding().is_none() {
            self.state_x = AxisState::Idle;
            self.state_y = AxisState::Idle;
            return Vec2::ZERO;
        }
        let dx = self.move_axis(ctx, Axis::X, amount.x);
        let dy = self.move_axis(ctx, Axis::Y, amount.y);
        Vec2::new(dx, dy)
    }

    /// One-axis solver: bank the amount, extract whole units, advance one
    /// unit at a time until done or blocked.
    fn move_axis(&mut self, ctx: &mut Context, axis: Axis, amount: f32) -> f32 {
        let banked = match axis {
            Axis::X => &mut self.remainder.x,
            Axis::Y => &mut self.remainder.y,
        };
        *banked += amount;
        let whole = banked.trunc();
        *banked -= whole;

        let mut left = whole as i32;
        if left == 0 {
            // Idle: no collision test, no callback.
            self.set_state(&axis, AxisState::Idle);
            return 0.0;
        }

        let step = left.signum();
        let (sx, sy) = match axis {
            Axis::X => (step as f32, 0.0),
            Axis::Y => (0.0, step as f32),
        };

        self.set_state(&axis, AxisState::Moving);
        let mut moved = 0;
        while left != 0 {
            // Placement derives from the entity's current position on every
            // step; nothing is cached across commits.
            let origin = ctx.entity.position;
            if self
                .collider
                .checks(ctx.scene, origin, &self.solids, sx, sy)
            {
                // Blocked: the rest of this axis's motion is lost, not
                // deferred into the remainder.
                self.set_state(&axis, AxisState::Blocked);
                self.fire_callback(&axis, ctx);
                break;
            }
            ctx.entity.position.x += sx;
            ctx.entity.position.y += sy;
            moved += step;
            left -= step;
        }
        moved as f32
    }

    fn set_state(&mut self, axis: &Axis, state: AxisState) {
        match axis {
            Axis::X => self.state_x = state,
            Axis::Y => self.state_y = state,
        }
    }

    /// Invoke the axis callback once, outside the overlap query. The callback
    /// is taken out for the call so it can receive `&mut Physics`.
    fn fire_callback(&mut self, axis: &Axis, ctx: &mut Context) {
        let slot = match axis {
            Axis::X => &mut self.on_collide_x,
            Axis::Y => &mut self.on_collide_y,
        };
        if let Some(mut callback) = slot.take() {
            callback(self, ctx);
            let slot = match axis {
                Axis::X => &mut self.on_collide_x,
                Axis::Y => &mut self.on_collide_y,
            };
            // The callback may have installed a replacement; keep it if so.
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    // ── Velocity shaping ─────────────────────────────────────────────

    /// Move `speed` toward zero by `f * delta` per axis, clamped so friction
    /// alone can never flip the sign.
    pub fn friction(&mut self, fx: f32, fy: f32, delta: f32) {
        self.speed.x = approach(self.speed.x, fx * delta);
        self.speed.y = approach(self.speed.y, fy * delta);
    }

    /// Clamp `speed` componentwise to ±`mx` / ±`my`.
    pub fn maxspeed(&mut self, mx: f32, my: f32) {
        self.speed.x = self.speed.x.clamp(-mx, mx);
        self.speed.y = self.speed.y.clamp(-my, my);
    }

    /// Clamp the velocity vector's magnitude to `length`, preserving
    /// direction.
    pub fn circular_maxspeed(&mut self, length: f32) {
        let len = self.speed.length();
        if len > length && len > 0.0 {
            self.speed *= length / len;
        }
    }

    /// Zero speed and banked remainder on both axes.
    pub fn stop(&mut self) {
        self.speed = Vec2::ZERO;
        self.remainder = Vec2::ZERO;
    }
}

/// Move `value` toward zero by at most `amount`, never past it.
fn approach(value: f32, amount: f32) -> f32 {
    if value > 0.0 {
        (value - amount).max(0.0)
    } else if value < 0.0 {
        (value + amount).min(0.0)
    } else {
        value
    }
}

impl Component for Physics {
    fn update(&mut self, ctx: &mut Context) {
        let amount = self.speed * ctx.delta;
        self.move_by(ctx, amount);
    }

    fn collider(&self) -> Option<&Collider> {
        Some(&self.collider)
    }

    fn collider_mut(&mut self) -> Option<&mut Collider> {
        Some(&mut self.collider)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use approx::assert_relative_eq;

    use crate::entity::Entity;
    use crate::scene::Scene;

    /// A static solid: just a tagged hitbox.
    struct Block {
        collider: Collider,
    }

    impl Block {
        fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
            Self {
                collider: Collider::hitbox(left, top, width, height).with_tag("solid"),
            }
        }
    }

    impl Component for Block {
        fn collider(&self) -> Option<&Collider> {
            Some(&self.collider)
        }
        fn collider_mut(&mut self) -> Option<&mut Collider> {
            Some(&mut self.collider)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn scene_with_wall(wall_x: f32) -> Scene {
        let mut scene = Scene::new();
        let mut wall = Entity::at(Vec2::new(wall_x, 0.0));
        wall.add(Box::new(Block::new(0.0, 0.0, 8.0, 8.0)));
        scene.add(wall, None);
        scene
    }

    #[test]
    fn sixty_fixed_steps_cover_exactly_thirty_units() {
        let mut scene = Scene::new();
        let mut e = Entity::new();
        e.add(Box::new(
            Physics::new(0.0, 0.0, 8.0, 8.0)
                .with_solid("solid")
                .with_speed(Vec2::new(30.0, 0.0)),
        ));
        let id = scene.add(e, None);

        let delta = 1.0 / 60.0;
        for _ in 0..60 {
            scene.update(delta);
        }

        let entity = scene.get(id).unwrap();
        let body = entity.find::<Physics>().unwrap();
        // Committed whole units plus the banked remainder total exactly the
        // integrated displacement: nothing was lost to truncation.
        assert_relative_eq!(entity.position.x + body.remainder().x, 30.0, epsilon = 1e-3);
        // And the remainder itself is within one frame's fractional
        // contribution of zero.
        assert!(body.remainder().x.abs() < 30.0 * delta + 1e-3);
    }

    #[test]
    fn halts_flush_against_solid_without_tunneling() {
        let mut scene = scene_with_wall(10.0); // solid occupies x in [10, 18)

        let hits = Rc::new(Cell::new(0u32));
        let mut body = Physics::new(0.0, 0.0, 8.0, 8.0)
            .with_solid("solid")
            .with_speed(Vec2::new(1000.0, 0.0));
        let counter = Rc::clone(&hits);
        body.on_collide_x(Box::new(move |_, _| counter.set(counter.get() + 1)));

        let mut e = Entity::new();
        e.add(Box::new(body));
        let id = scene.add(e, None);

        scene.update(1.0);

        let entity = scene.get(id).unwrap();
        // Right edge exactly at the wall's left edge; never past it.
        assert_eq!(entity.position.x, 2.0);
        assert_eq!(hits.get(), 1);
        let body = entity.find::<Physics>().unwrap();
        assert_eq!(body.state_x(), AxisState::Blocked);
        // Blocked motion was dropped, not banked.
        assert!(body.remainder().x.abs() < 1.0);
    }

    #[test]
    fn resting_flush_can_move_away() {
        let mut scene = scene_with_wall(10.0);
        let mut e = Entity::at(Vec2::new(2.0, 0.0)); // right edge touching x=10
        e.add(Box::new(
            Physics::new(0.0, 0.0, 8.0, 8.0)
                .with_solid("solid")
                .with_speed(Vec2::new(-3.0, 0.0)),
        ));
        let id = scene.add(e, None);

        scene.update(1.0);
        assert_eq!(scene.get(id).unwrap().position.x, -1.0);
    }

    #[test]
    fn axes_resolve_independently_x_first() {
        // Wall blocks X only; Y motion still commits in the same frame.
        let mut scene = scene_with_wall(10.0);
        let mut e = Entity::new();
        e.add(Box::new(
            Physics::new(0.0, 0.0, 8.0, 8.0)
                .with_solid("solid")
                .with_speed(Vec2::new(100.0, 100.0)),
        ));
        let id = scene.add(e, None);

        scene.update(1.0);
        let entity = scene.get(id).unwrap();
        // X blocked after sliding down? No: X resolves first, while the body
        // is still level with the wall. It stops flush, then Y commits fully.
        assert_eq!(entity.position.x, 2.0);
        assert_eq!(entity.position.y, 100.0);
        let body = entity.find::<Physics>().unwrap();
        assert_eq!(body.state_x(), AxisState::Blocked);
        assert_eq!(body.state_y(), AxisState::Moving);
    }

    #[test]
    fn sub_unit_frames_are_idle_until_a_unit_accumulates() {
        let mut scene = Scene::new();
        let mut e = Entity::new();
        e.add(Box::new(
            Physics::new(0.0, 0.0, 8.0, 8.0)
                .with_solid("solid")
                .with_speed(Vec2::new(0.4, 0.0)),
        ));
        let id = scene.add(e, None);

        scene.update(1.0); // remainder 0.4
        scene.update(1.0); // remainder 0.8
        {
            let entity = scene.get(id).unwrap();
            assert_eq!(entity.position.x, 0.0);
            assert_eq!(entity.find::<Physics>().unwrap().state_x(), AxisState::Idle);
        }
        scene.update(1.0); // remainder 1.2 -> one unit commits
        let entity = scene.get(id).unwrap();
        assert_eq!(entity.position.x, 1.0);
        assert_eq!(entity.find::<Physics>().unwrap().state_x(), AxisState::Moving);
    }

    #[test]
    fn friction_clamps_at_zero() {
        let mut body = Physics::new(0.0, 0.0, 1.0, 1.0);
        body.speed = Vec2::new(5.0, -5.0);
        body.friction(3.0, 100.0, 1.0);
        assert_eq!(body.speed, Vec2::new(2.0, 0.0)); // y clamped, no sign flip
        body.friction(3.0, 0.0, 1.0);
        assert_eq!(body.speed.x, 0.0);
    }

    #[test]
    fn speed_clamps() {
        let mut body = Physics::new(0.0, 0.0, 1.0, 1.0);
        body.speed = Vec2::new(10.0, -10.0);
        body.maxspeed(4.0, 3.0);
        assert_eq!(body.speed, Vec2::new(4.0, -3.0));

        body.speed = Vec2::new(3.0, 4.0); // length 5
        body.circular_maxspeed(2.5);
        assert_relative_eq!(body.speed.x, 1.5);
        assert_relative_eq!(body.speed.y, 2.0);

        body.stop();
        assert_eq!(body.speed, Vec2::ZERO);
        assert_eq!(body.remainder(), Vec2::ZERO);
    }
}
