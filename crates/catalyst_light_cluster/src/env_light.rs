//! Environment (reflection probe) records for the ray-tracing shaders.

use bytemuck::{Pod, Zeroable};
use catalyst_core::HdCamera;
use glam::Vec3;

use crate::{
    commands::CommandQueue,
    light::{InfluenceShape, SceneProbe},
    volume::VolumeShape,
};

// Mirrors the kernels' EnvLightData struct, field for field.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct EnvLightData {
    pub capture_position_rws: [f32; 3],
    pub influence_shape: u32,

    pub proxy_extents: [f32; 3],
    pub min_projection_distance: f32,

    pub proxy_position_rws: [f32; 3],
    pub proxy_forward: [f32; 3],
    pub proxy_up: [f32; 3],
    pub proxy_right: [f32; 3],

    pub influence_position_rws: [f32; 3],
    pub influence_forward: [f32; 3],
    pub influence_up: [f32; 3],
    pub influence_right: [f32; 3],

    pub influence_extents: [f32; 3],
    pub weight: f32,

    pub blend_distance_positive: [f32; 3],
    pub multiplier: f32,

    pub blend_distance_negative: [f32; 3],
    pub env_index: i32,
}

impl EnvLightData {
    /// Moves every stored position into camera-relative space.
    pub fn make_camera_relative(&mut self, camera_position: Vec3) {
        for position in [
            &mut self.capture_position_rws,
            &mut self.proxy_position_rws,
            &mut self.influence_position_rws,
        ] {
            *position = (Vec3::from_array(*position) - camera_position).to_array();
        }
    }
}

/// Fills probe-specific fields of an env light record. Positions must be
/// left in absolute world space.
pub trait ProbeDataProvider {
    fn env_light_data(
        &mut self,
        queue: &mut CommandQueue,
        camera: &HdCamera,
        probe: &SceneProbe,
    ) -> EnvLightData;
}

/// Derives records from the influence volume alone, for hosts without a
/// reflection probe cache. Probes project onto their influence volume and
/// have no cached cubemap (`env_index` is -1).
#[derive(Debug, Default)]
pub struct BasicProbeDataProvider;

impl ProbeDataProvider for BasicProbeDataProvider {
    fn env_light_data(
        &mut self,
        _queue: &mut CommandQueue,
        _camera: &HdCamera,
        scene_probe: &SceneProbe,
    ) -> EnvLightData {
        let probe = &scene_probe.probe;
        let transform = &scene_probe.transform;

        let position = transform.position().to_array();
        let forward = transform.forward().to_array();
        let up = transform.up().to_array();
        let right = transform.right().to_array();
        let extents = probe.influence_extents().to_array();
        let shape = match probe.influence {
            InfluenceShape::Sphere { .. } => VolumeShape::Sphere,
            InfluenceShape::Box { .. } => VolumeShape::Box,
        };
        let blend = [probe.blend_distance; 3];

        EnvLightData {
            capture_position_rws: position,
            influence_shape: shape as u32,
            proxy_extents: extents,
            min_projection_distance: 0.0,
            proxy_position_rws: position,
            proxy_forward: forward,
            proxy_up: up,
            proxy_right: right,
            influence_position_rws: position,
            influence_forward: forward,
            influence_up: up,
            influence_right: right,
            influence_extents: extents,
            weight: probe.weight,
            blend_distance_positive: blend,
            multiplier: probe.multiplier,
            blend_distance_negative: blend,
            env_index: -1,
        }
    }
}

/// Builds one record per probe, in order.
pub fn pack_env_lights(
    queue: &mut CommandQueue,
    probes: &[&SceneProbe],
    camera: &HdCamera,
    provider: &mut dyn ProbeDataProvider,
    camera_relative_rendering: bool,
) -> Vec<EnvLightData> {
    probes
        .iter()
        .map(|probe| {
            let mut data = provider.env_light_data(queue, camera, probe);
            // As late as possible: the provider works in absolute space.
            if camera_relative_rendering {
                data.make_camera_relative(camera.world_space_camera_pos);
            }
            data
        })
        .collect()
}
