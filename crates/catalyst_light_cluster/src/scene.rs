//! Gathers ray-traced lights, probes and the camera from a flecs world.

use catalyst_core::{Camera, HdCamera, Transform};
use flecs_ecs::prelude::*;

use crate::light::{HdLight, RayTracingLights, ReflectionProbe};

/// Snapshots every light and reflection probe entity of `world`.
pub fn collect_ray_tracing_lights(world: &World) -> RayTracingLights {
    let mut lights = RayTracingLights::default();

    world
        .query::<(&HdLight, &Transform)>()
        .build()
        .each(|(light, transform)| {
            lights.push_light(light.clone(), *transform);
        });

    world
        .query::<(&ReflectionProbe, &Transform)>()
        .build()
        .each(|(probe, transform)| {
            lights.push_probe(probe.clone(), *transform);
        });

    lights
}

/// Per-frame view of the first camera entity, if any.
pub fn collect_camera(world: &World) -> Option<HdCamera> {
    let mut hd_camera = None;
    world
        .query::<(&Camera, &Transform)>()
        .build()
        .each(|(camera, transform)| {
            if hd_camera.is_none() {
                hd_camera = Some(HdCamera::new(camera, transform));
            }
        });
    hd_camera
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn gathers_lights_probes_and_camera() {
        let world = World::new();
        world
            .entity()
            .set(HdLight::point(4.0))
            .set(Transform::from_xyz(1.0, 0.0, 0.0));
        world
            .entity()
            .set(HdLight::directional())
            .set(Transform::default());
        world
            .entity()
            .set(ReflectionProbe::sphere(2.0))
            .set(Transform::default());
        // No transform, not part of the scene.
        world.entity().set(HdLight::point(1.0));
        world
            .entity()
            .set(Camera::default())
            .set(Transform::from_xyz(0.0, 2.0, 5.0));

        let lights = collect_ray_tracing_lights(&world);
        assert_eq!(lights.lights.len(), 2);
        assert_eq!(lights.reflection_probes.len(), 1);

        let camera = collect_camera(&world).unwrap();
        assert_eq!(camera.position, Vec3::new(0.0, 2.0, 5.0));
        assert_eq!(camera.actual_width, 1920);
    }

    #[test]
    fn world_without_camera_has_no_view() {
        let world = World::new();
        assert!(collect_camera(&world).is_none());
    }
}
