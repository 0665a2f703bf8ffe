//! Shared types for the placement workspace: identities, transforms,
//! bounding boxes and debug colors.

mod bounds;
mod types;

pub use bounds::Aabb;
pub use types::{Color, ComponentId, EntityId, Transform};
