use glam::{UVec3, Vec3};

use crate::volume::LightVolume;

/// Cells per axis of the cluster grid.
pub const CLUSTER_RESOLUTION: UVec3 = UVec3::new(64, 64, 32);
pub const CLUSTER_CELL_COUNT: usize =
    (CLUSTER_RESOLUTION.x * CLUSTER_RESOLUTION.y * CLUSTER_RESOLUTION.z) as usize;

/// Reserved slots at the head of every cell, before the light indices.
pub const CELL_HEADER_SLOTS: usize = 4;

/// Number of `u32` slots in a cluster buffer holding `lights_per_cell`
/// indices per cell.
pub fn cluster_buffer_len(lights_per_cell: u32) -> usize {
    CLUSTER_CELL_COUNT * (lights_per_cell as usize + CELL_HEADER_SLOTS)
}

/// World-space bounds of the cluster grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterExtent {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub cell_size: Vec3,
    pub dimension: Vec3,
}

impl Default for ClusterExtent {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ClusterExtent {
    /// Inverted bounds that no point or volume can intersect.
    pub fn invalid() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(-f32::MAX),
            center: Vec3::ZERO,
            cell_size: Vec3::ZERO,
            dimension: Vec3::ZERO,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Bounds of `volumes` and the camera, clipped to `camera_cluster_range`
    /// around the camera on every axis.
    ///
    /// Callers invalidate instead of calling this when there are no volumes.
    pub fn evaluate(volumes: &[LightVolume], camera_position: Vec3, camera_cluster_range: f32) -> Self {
        let (lights_min, lights_max) = volumes.iter().fold(
            (camera_position, camera_position),
            |(min, max), volume| (min.min(volume.min()), max.max(volume.max())),
        );

        let range = Vec3::splat(camera_cluster_range);
        let min = lights_min.max(camera_position - range);
        let max = lights_max.min(camera_position + range);

        Self {
            min,
            max,
            center: (max + min) / 2.0,
            cell_size: (max - min) / CLUSTER_RESOLUTION.as_vec3(),
            dimension: max - min,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(position: Vec3, radius: f32) -> LightVolume {
        LightVolume {
            active: 1,
            shape: 0,
            position: position.to_array(),
            range: [radius; 3],
            light_type: 0,
            light_index: 0,
        }
    }

    #[test]
    fn invalid_extent_spans_no_space() {
        let extent = ClusterExtent::invalid();
        assert!(!extent.is_valid());
        assert!(!extent.contains(Vec3::ZERO));
        assert_eq!(extent.min, Vec3::splat(f32::MAX));
        assert_eq!(extent.max, Vec3::splat(-f32::MAX));
    }

    #[test]
    fn bounds_are_clamped_to_camera_range() {
        let volumes = [sphere(Vec3::ZERO, 100.0)];
        let extent = ClusterExtent::evaluate(&volumes, Vec3::new(5.0, 0.0, 0.0), 10.0);

        assert_eq!(extent.min, Vec3::new(-5.0, -10.0, -10.0));
        assert_eq!(extent.max, Vec3::new(15.0, 10.0, 10.0));
        assert_eq!(extent.center, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(extent.dimension, Vec3::splat(20.0));
        assert_eq!(extent.cell_size, Vec3::new(20.0 / 64.0, 20.0 / 64.0, 20.0 / 32.0));
    }

    #[test]
    fn small_lights_give_tight_bounds_around_camera() {
        let volumes = [sphere(Vec3::new(2.0, 0.0, 0.0), 1.0)];
        let extent = ClusterExtent::evaluate(&volumes, Vec3::ZERO, 10.0);

        assert_eq!(extent.min, Vec3::new(0.0, -1.0, -1.0));
        assert_eq!(extent.max, Vec3::new(3.0, 1.0, 1.0));
        assert!(extent.contains(Vec3::ZERO));
    }

    #[test]
    fn far_lights_never_invert_the_bounds() {
        let volumes = [sphere(Vec3::new(500.0, 0.0, 0.0), 1.0)];
        let camera = Vec3::new(0.0, 3.0, 0.0);
        let extent = ClusterExtent::evaluate(&volumes, camera, 10.0);

        assert!(extent.is_valid());
        assert!(extent.contains(camera));
        assert_eq!(extent.max.x, 10.0);
    }

    #[test]
    fn buffer_length_reserves_header_slots() {
        assert_eq!(cluster_buffer_len(0), 64 * 64 * 32 * 4);
        assert_eq!(cluster_buffer_len(10), 64 * 64 * 32 * 14);
    }
}
