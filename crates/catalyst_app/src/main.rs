use std::collections::HashMap;

use catalyst_core::{Camera, Transform};
use catalyst_light_cluster::{
    BasicProbeDataProvider, ClusterStatus, CommandExecutor, CommandQueue, ComputeShader,
    CookieCache, CookieKind, FrameContext, HdLight, LightClusterSettings, LightTypeExtent,
    RayTracingLightCluster, RayTracingResources, ReflectionProbe, RenderCommand, ShaderConfig,
    SpotLightShape, TextureHandle, collect_camera, collect_ray_tracing_lights, shader_ids,
};
use flecs_ecs::prelude::*;
use glam::{Quat, Vec3};
use log::{error, info, warn};

const FRAME_COUNT: u32 = 4;

/// Hands out cookie slots per texture array, first come first served.
#[derive(Default)]
struct CookieAtlas {
    slots: HashMap<(CookieKind, TextureHandle), i32>,
    next_slot: HashMap<CookieKind, i32>,
}

impl CookieAtlas {
    const SLOTS_PER_KIND: i32 = 16;
}

impl CookieCache for CookieAtlas {
    fn fetch_slice(
        &mut self,
        _queue: &mut CommandQueue,
        kind: CookieKind,
        texture: TextureHandle,
    ) -> i32 {
        if let Some(slot) = self.slots.get(&(kind, texture)) {
            return *slot;
        }

        let next = self.next_slot.entry(kind).or_insert(0);
        if *next >= Self::SLOTS_PER_KIND {
            warn!("{kind:?} cookie atlas is full");
            return -1;
        }
        let slot = *next;
        *next += 1;
        self.slots.insert((kind, texture), slot);
        slot
    }
}

/// Stands in for a graphics backend: tallies what it was asked to do.
#[derive(Default)]
struct LoggingExecutor {
    dispatches: usize,
    uploaded_bytes: usize,
    allocations: usize,
}

impl CommandExecutor for LoggingExecutor {
    fn execute(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Dispatch { groups, .. } => {
                self.dispatches += 1;
                log::debug!("dispatch {groups:?}");
            }
            RenderCommand::UploadBuffer { data, .. } => self.uploaded_bytes += data.len(),
            RenderCommand::AllocateBuffer { label, buffer } => {
                self.allocations += 1;
                log::debug!("allocate '{label}' x{}", buffer.count);
            }
            _ => {}
        }
    }
}

fn setup_scene(world: &World) {
    world
        .entity_named("key_light")
        .set(HdLight::point(8.0))
        .set(Transform::from_xyz(2.0, 4.0, 0.0));

    world
        .entity_named("projector")
        .set(HdLight {
            cookie: Some(TextureHandle::new()),
            ..HdLight::spot(SpotLightShape::Pyramid, 50.0, 12.0)
        })
        .set(Transform::from_xyz(-3.0, 3.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y));

    world
        .entity_named("window_panel")
        .set(HdLight::area(LightTypeExtent::Rectangle, 2.0, 1.5, 6.0))
        .set(Transform::from_xyz(0.0, 2.0, -5.0));

    world
        .entity_named("room_probe")
        .set(ReflectionProbe::boxed(Vec3::new(12.0, 5.0, 12.0)))
        .set(Transform::from_xyz(0.0, 2.5, 0.0));

    world
        .entity_named("main_camera")
        .set(Camera::default())
        .set(Transform::from_xyz(0.0, 1.7, 6.0).looking_at(Vec3::ZERO, Vec3::Y));
}

fn main() {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => match LightClusterSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load light cluster settings from '{path}': {e}");
                LightClusterSettings::default()
            }
        },
        None => LightClusterSettings::default(),
    };
    info!("Light cluster settings: {settings:?}");

    let world = World::new();
    setup_scene(&world);

    world
        .system_named::<&mut Transform>("orbit_camera")
        .with(Camera::id())
        .each(|transform| {
            let orbit = Quat::from_rotation_y(0.25);
            transform.translation = orbit * transform.translation;
            *transform = transform.looking_at(Vec3::ZERO, Vec3::Y);
        });

    let mut queue = CommandQueue::new();
    let mut cluster = RayTracingLightCluster::initialize(
        &mut queue,
        RayTracingResources {
            light_cluster_build: Some(ComputeShader::new(
                "RaytracingLightCluster",
                &[shader_ids::LIGHT_CLUSTER_KERNEL, shader_ids::LIGHT_CULL_KERNEL],
            )),
            light_cluster_debug: Some(ComputeShader::new(
                "DebugLightCluster",
                &[shader_ids::DEBUG_LIGHT_CLUSTER_KERNEL],
            )),
            color_gradient: Some(TextureHandle::new()),
            depth_stencil: TextureHandle::new(),
        },
        ShaderConfig::default(),
    );

    let mut cookies = CookieAtlas::default();
    let mut probes = BasicProbeDataProvider;
    let mut executor = LoggingExecutor::default();

    for frame in 0..FRAME_COUNT {
        world.progress();

        let Some(camera) = collect_camera(&world) else {
            error!("No camera in the scene");
            break;
        };
        let lights = collect_ray_tracing_lights(&world);

        let mut ctx = FrameContext {
            camera: &camera,
            settings: Some(&settings),
            cookies: &mut cookies,
            probes: &mut probes,
        };
        match cluster.evaluate_light_clusters(&mut queue, &mut ctx, &lights) {
            Ok(ClusterStatus::Built) => {}
            Ok(ClusterStatus::Invalidated(reason)) => {
                warn!("Frame {frame}: cluster invalidated ({reason:?})")
            }
            Err(e) => {
                error!("Frame {frame}: {e}");
                break;
            }
        }
        cluster.bind_light_cluster_data(&mut queue);
        queue.submit(&mut executor);

        info!(
            "Frame {frame}: {} lights in {:?}..{:?}, cell size {:?}",
            cluster.total_light_count(),
            cluster.min_cluster_pos(),
            cluster.max_cluster_pos(),
            cluster.cluster_cell_size(),
        );
    }

    cluster.release_resources(&mut queue);
    queue.submit(&mut executor);

    info!(
        "{} dispatches, {} buffer allocations, {} bytes uploaded",
        executor.dispatches, executor.allocations, executor.uploaded_bytes
    );
}
