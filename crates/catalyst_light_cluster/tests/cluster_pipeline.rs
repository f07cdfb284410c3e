use catalyst_core::{HdCamera, Transform};
use catalyst_light_cluster::{
    BasicProbeDataProvider, ClusterError, ClusterStatus, CommandQueue, ComputeShader, CookieCache,
    CookieKind, FrameContext, HdLight, InvalidationReason, LightClusterSettings, LightTypeExtent,
    RayTracingLightCluster, RayTracingLights, RayTracingResources, ReflectionProbe, RenderCommand,
    ShaderConfig, SpotLightShape, TextureHandle,
    extent::cluster_buffer_len,
    gpu::as_float,
    shader_ids,
};
use glam::{Vec3, Vec4};

/// Hands out consecutive slots and remembers what was asked for.
#[derive(Default)]
struct SlotCookies {
    requests: Vec<(CookieKind, TextureHandle)>,
}

impl CookieCache for SlotCookies {
    fn fetch_slice(
        &mut self,
        _queue: &mut CommandQueue,
        kind: CookieKind,
        texture: TextureHandle,
    ) -> i32 {
        self.requests.push((kind, texture));
        self.requests.len() as i32 - 1
    }
}

fn build_shader() -> ComputeShader {
    ComputeShader::new(
        "RaytracingLightCluster",
        &[shader_ids::LIGHT_CLUSTER_KERNEL, shader_ids::LIGHT_CULL_KERNEL],
    )
}

fn resources(with_debug: bool) -> RayTracingResources {
    RayTracingResources {
        light_cluster_build: Some(build_shader()),
        light_cluster_debug: with_debug.then(|| {
            ComputeShader::new("DebugLightCluster", &[shader_ids::DEBUG_LIGHT_CLUSTER_KERNEL])
        }),
        color_gradient: with_debug.then(TextureHandle::new),
        depth_stencil: TextureHandle::new(),
    }
}

struct Harness {
    queue: CommandQueue,
    cluster: RayTracingLightCluster,
    camera: HdCamera,
    settings: Option<LightClusterSettings>,
    cookies: SlotCookies,
    probes: BasicProbeDataProvider,
}

impl Harness {
    fn new(resources: RayTracingResources) -> Self {
        let mut queue = CommandQueue::new();
        let cluster = RayTracingLightCluster::initialize(&mut queue, resources, ShaderConfig::default());
        // Only the frame's own commands matter to the tests.
        queue.submit(&mut Vec::<RenderCommand>::new());
        Self {
            queue,
            cluster,
            camera: HdCamera::at(Vec3::ZERO),
            settings: Some(LightClusterSettings::default()),
            cookies: SlotCookies::default(),
            probes: BasicProbeDataProvider,
        }
    }

    fn evaluate(&mut self, lights: &RayTracingLights) -> Result<ClusterStatus, ClusterError> {
        self.queue.submit(&mut Vec::<RenderCommand>::new());
        let mut ctx = FrameContext {
            camera: &self.camera,
            settings: self.settings.as_ref(),
            cookies: &mut self.cookies,
            probes: &mut self.probes,
        };
        self.cluster
            .evaluate_light_clusters(&mut self.queue, &mut ctx, lights)
    }
}

fn mixed_scene() -> RayTracingLights {
    let mut lights = RayTracingLights::default();
    lights
        .push_light(HdLight::point(3.0), Transform::from_xyz(2.0, 0.0, 0.0))
        .push_light(
            HdLight::spot(SpotLightShape::Cone, 45.0, 6.0),
            Transform::from_xyz(-4.0, 1.0, 0.0),
        )
        .push_light(
            HdLight::area(LightTypeExtent::Rectangle, 2.0, 1.0, 5.0),
            Transform::from_xyz(0.0, 3.0, 0.0),
        )
        .push_probe(
            ReflectionProbe::boxed(Vec3::new(8.0, 4.0, 8.0)),
            Transform::default(),
        );
    lights
}

fn position_of<F>(commands: &[RenderCommand], predicate: F) -> usize
where
    F: Fn(&RenderCommand) -> bool,
{
    commands
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("command not recorded"))
}

#[test]
fn empty_scene_leaves_sentinel_state() {
    let mut harness = Harness::new(resources(false));

    let status = harness.evaluate(&RayTracingLights::default()).unwrap();
    assert_eq!(status, ClusterStatus::Invalidated(InvalidationReason::NoLights));

    let cluster = &harness.cluster;
    assert_eq!(cluster.cluster().count(), 1);
    assert_eq!(cluster.light_datas().count(), 1);
    assert_eq!(cluster.env_light_datas().count(), 1);
    assert_eq!(cluster.min_cluster_pos(), Vec3::splat(f32::MAX));
    assert_eq!(cluster.max_cluster_pos(), Vec3::splat(-f32::MAX));
    assert_eq!(cluster.total_light_count(), 0);
}

#[test]
fn missing_build_shader_invalidates() {
    let mut harness = Harness::new(RayTracingResources {
        light_cluster_build: None,
        ..resources(false)
    });

    let status = harness.evaluate(&mixed_scene()).unwrap();
    assert_eq!(status, ClusterStatus::Invalidated(InvalidationReason::NoShader));
    assert_eq!(harness.cluster.cluster().count(), 1);
}

#[test]
fn missing_kernel_is_an_error() {
    let mut harness = Harness::new(RayTracingResources {
        light_cluster_build: Some(ComputeShader::new(
            "Broken",
            &[shader_ids::LIGHT_CLUSTER_KERNEL],
        )),
        ..resources(false)
    });

    let error = harness.evaluate(&mixed_scene()).unwrap_err();
    assert!(matches!(
        error,
        ClusterError::MissingKernel {
            kernel: shader_ids::LIGHT_CULL_KERNEL,
            ..
        }
    ));
    assert!(harness.queue.is_empty());
}

#[test]
fn empty_scene_with_broken_shader_still_invalidates() {
    let mut harness = Harness::new(RayTracingResources {
        light_cluster_build: Some(ComputeShader::new("Broken", &[])),
        ..resources(false)
    });

    let status = harness.evaluate(&RayTracingLights::default()).unwrap();
    assert_eq!(status, ClusterStatus::Invalidated(InvalidationReason::NoLights));

    let mut faded = RayTracingLights::default();
    faded.push_light(
        HdLight {
            fade_distance: 5.0,
            ..HdLight::point(1.0)
        },
        Transform::from_xyz(20.0, 0.0, 0.0),
    );
    let status = harness.evaluate(&faded).unwrap();
    assert_eq!(
        status,
        ClusterStatus::Invalidated(InvalidationReason::NoActiveLights)
    );
    assert_eq!(harness.cluster.cluster().count(), 1);
}

#[test]
fn debug_shader_without_kernel_skips_the_debug_view() {
    let mut harness = Harness::new(RayTracingResources {
        light_cluster_debug: Some(ComputeShader::new("DebugLightCluster", &[])),
        ..resources(true)
    });

    for _ in 0..2 {
        let status = harness.evaluate(&mixed_scene()).unwrap();
        assert_eq!(status, ClusterStatus::Built);

        let dispatches: Vec<[u32; 3]> = harness
            .queue
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Dispatch { groups, .. } => Some(*groups),
                _ => None,
            })
            .collect();
        assert_eq!(dispatches, vec![[1, 1, 1], [8, 8, 4]]);
    }
    assert_eq!(harness.cluster.total_light_count(), 4);
    assert_eq!(harness.cluster.cluster().count(), cluster_buffer_len(10));
}

#[test]
fn counts_add_up_and_buffers_match() {
    let mut harness = Harness::new(resources(false));
    let status = harness.evaluate(&mixed_scene()).unwrap();
    assert_eq!(status, ClusterStatus::Built);

    let cluster = &harness.cluster;
    assert_eq!(cluster.punctual_light_count(), 2);
    assert_eq!(cluster.area_light_count(), 1);
    assert_eq!(cluster.env_light_count(), 1);
    assert_eq!(
        cluster.total_light_count(),
        cluster.punctual_light_count() + cluster.area_light_count() + cluster.env_light_count()
    );
    assert_eq!(cluster.light_datas().count(), 3);
    assert_eq!(cluster.env_light_datas().count(), 1);
    assert_eq!(cluster.cluster().count(), cluster_buffer_len(10));

    // Each light volume points at its own packed record.
    for (index, volume) in cluster.light_volumes()[..3].iter().enumerate() {
        assert_eq!(volume.light_index as usize, index);
    }
}

#[test]
fn camera_always_lies_inside_the_cluster() {
    let mut harness = Harness::new(resources(false));
    harness.camera = HdCamera::at(Vec3::new(30.0, -2.0, 7.0));

    harness.evaluate(&mixed_scene()).unwrap();

    let extent = harness.cluster.extent();
    assert!(extent.is_valid());
    assert!(extent.contains(harness.camera.position));
    let range = Vec3::splat(LightClusterSettings::default().camera_cluster_range);
    assert!(extent.min.cmpge(harness.camera.position - range).all());
    assert!(extent.max.cmple(harness.camera.position + range).all());
}

#[test]
fn passes_are_recorded_in_dependency_order() {
    let mut harness = Harness::new(resources(true));
    harness.evaluate(&mixed_scene()).unwrap();

    let commands = harness.queue.commands();
    let volume_count = harness.cluster.light_volumes().len();
    assert_eq!(volume_count, 4);

    let cull = position_of(commands, |c| {
        matches!(c, RenderCommand::BeginSample { name } if *name == "Cull Light Cluster")
    });
    let build = position_of(commands, |c| {
        matches!(c, RenderCommand::BeginSample { name } if *name == "Build Light Cluster")
    });
    let light_data_upload = position_of(commands, |c| {
        matches!(c, RenderCommand::UploadBuffer { buffer, .. }
            if *buffer == harness.cluster.light_datas().handle())
    });
    let env_upload = position_of(commands, |c| {
        matches!(c, RenderCommand::UploadBuffer { buffer, .. }
            if *buffer == harness.cluster.env_light_datas().handle())
    });
    let debug_texture = harness.cluster.debug_texture();
    let debug = position_of(commands, |c| {
        matches!(c, RenderCommand::SetComputeTexture { texture, .. } if *texture == debug_texture)
    });

    assert!(cull < build);
    assert!(build < light_data_upload);
    assert!(light_data_upload < env_upload);
    assert!(env_upload < debug);

    let dispatches: Vec<[u32; 3]> = commands
        .iter()
        .filter_map(|c| match c {
            RenderCommand::Dispatch { groups, .. } => Some(*groups),
            _ => None,
        })
        .collect();
    assert_eq!(dispatches, vec![[1, 1, 1], [8, 8, 4], [240, 135, 1]]);
}

#[test]
fn cull_pass_receives_cluster_shape() {
    let mut harness = Harness::new(resources(false));
    harness.evaluate(&mixed_scene()).unwrap();

    let extent = *harness.cluster.extent();
    let commands = harness.queue.commands();
    assert!(commands.contains(&RenderCommand::SetComputeVector {
        shader: build_shader_handle(&harness),
        name: shader_ids::CLUSTER_CENTER_POSITION,
        value: extent.center.extend(0.0),
    }));
    assert!(commands.iter().any(|c| matches!(
        c,
        RenderCommand::SetComputeFloat { name, value, .. }
            if *name == shader_ids::LIGHT_VOLUME_COUNT && value.to_bits() == as_float(4).to_bits()
    )));
}

fn build_shader_handle(harness: &Harness) -> catalyst_light_cluster::gpu::ShaderHandle {
    harness
        .queue
        .commands()
        .iter()
        .find_map(|c| match c {
            RenderCommand::Dispatch { shader, .. } => Some(*shader),
            _ => None,
        })
        .unwrap()
}

#[test]
fn debug_view_is_skipped_without_gradient() {
    let mut harness = Harness::new(RayTracingResources {
        color_gradient: None,
        ..resources(true)
    });
    harness.evaluate(&mixed_scene()).unwrap();

    let dispatch_count = harness
        .queue
        .commands()
        .iter()
        .filter(|c| matches!(c, RenderCommand::Dispatch { .. }))
        .count();
    assert_eq!(dispatch_count, 2);
}

#[test]
fn bind_publishes_every_input() {
    let mut harness = Harness::new(resources(false));
    harness.evaluate(&mixed_scene()).unwrap();
    harness.queue.submit(&mut Vec::<RenderCommand>::new());

    harness.cluster.bind_light_cluster_data(&mut harness.queue);
    let cluster = &harness.cluster;

    assert_eq!(
        harness.queue.commands(),
        &[
            RenderCommand::SetGlobalBuffer {
                name: shader_ids::RAYTRACING_LIGHT_CLUSTER,
                buffer: cluster.cluster().handle(),
            },
            RenderCommand::SetGlobalBuffer {
                name: shader_ids::LIGHT_DATAS_RT,
                buffer: cluster.light_datas().handle(),
            },
            RenderCommand::SetGlobalBuffer {
                name: shader_ids::ENV_LIGHT_DATAS_RT,
                buffer: cluster.env_light_datas().handle(),
            },
            RenderCommand::SetGlobalVector {
                name: shader_ids::MIN_CLUSTER_POS,
                value: Vec4::from((cluster.min_cluster_pos(), 0.0)),
            },
            RenderCommand::SetGlobalVector {
                name: shader_ids::MAX_CLUSTER_POS,
                value: Vec4::from((cluster.max_cluster_pos(), 0.0)),
            },
            RenderCommand::SetGlobalInt {
                name: shader_ids::LIGHT_PER_CELL_COUNT,
                value: 10,
            },
            RenderCommand::SetGlobalInt {
                name: shader_ids::PUNCTUAL_LIGHT_COUNT_RT,
                value: 2,
            },
            RenderCommand::SetGlobalInt {
                name: shader_ids::AREA_LIGHT_COUNT_RT,
                value: 1,
            },
            RenderCommand::SetGlobalInt {
                name: shader_ids::ENV_LIGHT_COUNT_RT,
                value: 1,
            },
        ]
    );
}

#[test]
fn resized_buffers_get_new_handles() {
    let mut harness = Harness::new(resources(false));
    let placeholder = harness.cluster.cluster().handle();

    harness.evaluate(&mixed_scene()).unwrap();
    let built = harness.cluster.cluster().handle();
    assert_ne!(placeholder.id, built.id);

    // Same settings, same size: the allocation is kept.
    harness.evaluate(&mixed_scene()).unwrap();
    assert_eq!(harness.cluster.cluster().handle(), built);

    harness.settings = Some(LightClusterSettings {
        max_num_lights_per_cell: 24,
        ..Default::default()
    });
    harness.evaluate(&mixed_scene()).unwrap();
    assert_ne!(harness.cluster.cluster().handle().id, built.id);
    assert_eq!(harness.cluster.cluster().count(), cluster_buffer_len(24));

    // Dropping back to an empty scene shrinks everything to one element.
    harness.evaluate(&RayTracingLights::default()).unwrap();
    assert_eq!(harness.cluster.cluster().count(), 1);
    assert_eq!(harness.cluster.light_datas().count(), 1);
    assert_eq!(harness.cluster.env_light_datas().count(), 1);
}

#[test]
fn light_records_are_camera_relative_and_use_cookies() {
    let mut harness = Harness::new(resources(false));
    harness.camera = HdCamera::at(Vec3::new(1.0, 1.0, 1.0));

    let cookie = TextureHandle::new();
    let mut lights = RayTracingLights::default();
    lights.push_light(
        HdLight {
            cookie: Some(cookie),
            ..HdLight::spot(SpotLightShape::Cone, 60.0, 8.0)
        },
        Transform::from_xyz(3.0, 1.0, 1.0),
    );

    harness.evaluate(&lights).unwrap();

    let record = harness.cluster.light_data_records()[0];
    assert_eq!(record.position_rws, [2.0, 0.0, 0.0]);
    assert_eq!(record.cookie_index, 0);
    assert_eq!(harness.cookies.requests, vec![(CookieKind::Spot, cookie)]);
}

#[test]
fn faded_out_lights_are_not_clustered() {
    let mut harness = Harness::new(resources(false));
    let mut lights = RayTracingLights::default();
    lights.push_light(
        HdLight {
            fade_distance: 5.0,
            ..HdLight::point(1.0)
        },
        Transform::from_xyz(20.0, 0.0, 0.0),
    );

    let status = harness.evaluate(&lights).unwrap();
    assert_eq!(
        status,
        ClusterStatus::Invalidated(InvalidationReason::NoActiveLights)
    );
    assert_eq!(harness.cluster.light_datas().count(), 1);
}
