//! Coarse bounding volumes fed to the culling and cluster kernels.

use bytemuck::{Pod, Zeroable};
use catalyst_core::HdCamera;
use glam::Vec3;

use crate::{
    light::{
        InfluenceShape, LightCategory, RayTracingLights, SceneLight, SceneProbe,
        UnsupportedLightLog,
    },
    light_data::light_distance_fade,
};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeShape {
    Sphere = 0,
    Box = 1,
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightVolumeType {
    Punctual = 0,
    Area = 1,
    Env = 2,
}

// Mirrors the kernels' LightVolume struct, field for field.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightVolume {
    pub active: u32,
    pub shape: u32,
    pub position: [f32; 3],
    /// Sphere radius on every axis, or box half extents.
    pub range: [f32; 3],
    pub light_type: u32,
    /// Index into the light data array, or the env light data array for
    /// env volumes.
    pub light_index: u32,
}

impl LightVolume {
    pub fn min(&self) -> Vec3 {
        Vec3::from_array(self.position) - Vec3::from_array(self.range)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::from_array(self.position) + Vec3::from_array(self.range)
    }
}

/// Output of [`build_light_volumes`]: the volumes plus the lights and probes
/// they were built from, in volume order.
#[derive(Debug, Default)]
pub struct LightVolumeSet<'a> {
    pub volumes: Vec<LightVolume>,
    pub lights: Vec<&'a SceneLight>,
    pub probes: Vec<&'a SceneProbe>,
    pub punctual_count: usize,
    pub area_count: usize,
    pub env_count: usize,
}

impl LightVolumeSet<'_> {
    pub fn total_count(&self) -> usize {
        self.punctual_count + self.area_count + self.env_count
    }
}

/// Builds one volume per usable light followed by one per probe.
///
/// Destroyed or disabled lights are skipped, and so are lights that would
/// contribute nothing after distance fade or that have no GPU type. The
/// same lights are later skipped by the light data packer, which keeps
/// `light_index` aligned with the packed records.
pub fn build_light_volumes<'a>(
    lights: &'a RayTracingLights,
    camera: &HdCamera,
    unsupported: &mut UnsupportedLightLog,
) -> LightVolumeSet<'a> {
    let mut set = LightVolumeSet::default();
    set.volumes
        .reserve(lights.lights.len() + lights.reflection_probes.len());

    for scene_light in lights.lights.iter().flatten() {
        let light = &scene_light.light;
        if !light.enabled {
            continue;
        }

        let category = match light.gpu_light_type() {
            Ok((_, category)) => category,
            Err(error) => {
                unsupported.report(&error);
                continue;
            }
        };

        if light_distance_fade(scene_light, camera).is_none() {
            continue;
        }

        let light_type = match category {
            LightCategory::Punctual => {
                set.punctual_count += 1;
                LightVolumeType::Punctual
            }
            LightCategory::Area => {
                set.area_count += 1;
                LightVolumeType::Area
            }
        };

        set.volumes.push(LightVolume {
            active: light.active_in_hierarchy as u32,
            shape: VolumeShape::Sphere as u32,
            position: scene_light.transform.position().to_array(),
            range: [light.range; 3],
            light_type: light_type as u32,
            light_index: set.lights.len() as u32,
        });
        set.lights.push(scene_light);
    }

    for scene_probe in lights.reflection_probes.iter().flatten() {
        let probe = &scene_probe.probe;
        let shape = match probe.influence {
            InfluenceShape::Sphere { .. } => VolumeShape::Sphere,
            InfluenceShape::Box { .. } => VolumeShape::Box,
        };

        set.volumes.push(LightVolume {
            active: probe.active_in_hierarchy as u32,
            shape: shape as u32,
            position: scene_probe.transform.position().to_array(),
            range: probe.influence_extents().to_array(),
            light_type: LightVolumeType::Env as u32,
            light_index: set.probes.len() as u32,
        });
        set.probes.push(scene_probe);
        set.env_count += 1;
    }

    set
}

#[cfg(test)]
mod tests {
    use catalyst_core::Transform;

    use super::*;
    use crate::light::{HdLight, LightType, LightTypeExtent, ReflectionProbe};

    #[test]
    fn volumes_skip_missing_and_disabled_lights() {
        let mut lights = RayTracingLights::default();
        lights.push_light(HdLight::point(5.0), Transform::from_xyz(1.0, 2.0, 3.0));
        lights.lights.push(None);
        lights.push_light(
            HdLight {
                enabled: false,
                ..HdLight::point(5.0)
            },
            Transform::default(),
        );
        lights.push_light(
            HdLight::area(LightTypeExtent::Rectangle, 1.0, 2.0, 4.0),
            Transform::default(),
        );

        let mut log = UnsupportedLightLog::default();
        let set = build_light_volumes(&lights, &HdCamera::at(Vec3::ZERO), &mut log);

        assert_eq!(set.punctual_count, 1);
        assert_eq!(set.area_count, 1);
        assert_eq!(set.env_count, 0);
        assert_eq!(set.volumes.len(), set.total_count());

        let point = set.volumes[0];
        assert_eq!(point.position, [1.0, 2.0, 3.0]);
        assert_eq!(point.range, [5.0; 3]);
        assert_eq!(point.light_type, LightVolumeType::Punctual as u32);
        assert_eq!(point.light_index, 0);

        let area = set.volumes[1];
        assert_eq!(area.light_type, LightVolumeType::Area as u32);
        assert_eq!(area.light_index, 1);
    }

    #[test]
    fn probes_use_shape_dependent_ranges() {
        let mut lights = RayTracingLights::default();
        lights.push_probe(ReflectionProbe::sphere(3.0), Transform::from_xyz(0.0, 1.0, 0.0));
        lights.push_probe(
            ReflectionProbe::boxed(Vec3::new(2.0, 4.0, 6.0)),
            Transform::default(),
        );

        let mut log = UnsupportedLightLog::default();
        let set = build_light_volumes(&lights, &HdCamera::at(Vec3::ZERO), &mut log);

        assert_eq!(set.env_count, 2);
        assert_eq!(set.volumes[0].shape, VolumeShape::Sphere as u32);
        assert_eq!(set.volumes[0].range, [3.0; 3]);
        assert_eq!(set.volumes[1].shape, VolumeShape::Box as u32);
        assert_eq!(set.volumes[1].range, [1.0, 2.0, 3.0]);
        assert_eq!(set.volumes[1].light_type, LightVolumeType::Env as u32);
        assert_eq!(set.volumes[1].light_index, 1);
    }

    #[test]
    fn inactive_objects_keep_their_volume_but_are_flagged() {
        let mut lights = RayTracingLights::default();
        lights.push_light(
            HdLight {
                active_in_hierarchy: false,
                ..HdLight::point(2.0)
            },
            Transform::default(),
        );

        let mut log = UnsupportedLightLog::default();
        let set = build_light_volumes(&lights, &HdCamera::at(Vec3::ZERO), &mut log);
        assert_eq!(set.volumes.len(), 1);
        assert_eq!(set.volumes[0].active, 0);
    }

    #[test]
    fn unsupported_and_faded_lights_are_skipped() {
        let mut lights = RayTracingLights::default();
        lights.push_light(
            HdLight {
                light_type: LightType::Rectangle,
                ..Default::default()
            },
            Transform::default(),
        );
        lights.push_light(
            HdLight {
                fade_distance: 10.0,
                ..HdLight::point(1.0)
            },
            Transform::from_xyz(100.0, 0.0, 0.0),
        );

        let mut log = UnsupportedLightLog::default();
        let set = build_light_volumes(&lights, &HdCamera::at(Vec3::ZERO), &mut log);
        assert_eq!(set.total_count(), 0);
        assert_eq!(log.reported_count(), 1);
    }
}
