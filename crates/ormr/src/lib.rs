//! # Ormr — 2D Scene & Collision Runtime
//!
//! The simulation core of a 2D game: an [`Entity`](entity::Entity)/
//! [`Component`](component::Component) object model driven by a
//! [`Scene`](scene::Scene), tag-indexed collision queries over
//! [`Collider`](collider::Collider) shapes, and sub-pixel
//! [`Physics`](physics::Physics) movement that never tunnels through solids.
//!
//! Rendering, input, audio, and windowing live in the host application; this
//! crate hands the host a depth-ordered draw sequence through
//! [`Scene::render_with`](scene::Scene::render_with) and otherwise stays a
//! pure library. Start with `use ormr::prelude::*`, build a `Scene`, and
//! drive it with a [`Time`](time::Time) clock.

pub mod collider;
pub mod component;
pub mod entity;
pub mod math;
pub mod physics;
pub mod prelude;
pub mod render;
pub mod routine;
pub mod scene;
pub mod time;
