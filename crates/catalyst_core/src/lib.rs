//! Shared engine types: spatial transforms and the per-frame camera view.

pub mod camera;
pub mod transform;

pub use camera::{Camera, HdCamera};
pub use transform::Transform;
