//! Convenience re-exports — `use ormr::prelude::*` for the common items.
//!
//! Types only — all functionality is discoverable through methods on types,
//! not free functions.

pub use crate::collider::{Collider, ColliderRef, ColliderShape, Hitbox, Hitgrid};
pub use crate::component::{Component, Context};
pub use crate::entity::{ComponentSlot, Entity, EntityId};
pub use crate::math::{Mat4, Rect, Vec2};
pub use crate::physics::{AxisState, Physics};
pub use crate::render::{Camera, Renderer};
pub use crate::routine::{Routine, Step};
pub use crate::scene::Scene;
pub use crate::time::Time;
