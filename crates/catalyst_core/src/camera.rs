use flecs_ecs::macros::Component;
use glam::Vec3;

use crate::transform::Transform;

/// Viewport state attached to a camera entity.
#[derive(Component, Clone, Debug)]
pub struct Camera {
    pub actual_width: u32,
    pub actual_height: u32,
    /// Global multiplier applied to every light's specular contribution.
    pub specular_global_dimmer: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            actual_width: 1920,
            actual_height: 1080,
            specular_global_dimmer: 1.0,
        }
    }
}

/// Per-frame view of a camera, snapshotted before lighting preparation.
#[derive(Clone, Debug)]
pub struct HdCamera {
    /// Position of the camera object in world space.
    pub position: Vec3,
    /// Origin of camera-relative rendering for the main view.
    pub world_space_camera_pos: Vec3,
    pub actual_width: u32,
    pub actual_height: u32,
    pub specular_global_dimmer: f32,
}

impl HdCamera {
    pub fn new(camera: &Camera, transform: &Transform) -> Self {
        Self {
            position: transform.position(),
            world_space_camera_pos: transform.position(),
            actual_width: camera.actual_width,
            actual_height: camera.actual_height,
            specular_global_dimmer: camera.specular_global_dimmer,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(&Camera::default(), &Transform::from_translation(position))
    }
}
