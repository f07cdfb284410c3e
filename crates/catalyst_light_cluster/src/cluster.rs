//! Per-frame ray-tracing light cluster.

use bytemuck::Pod;
use catalyst_core::HdCamera;
use glam::Vec3;
use log::{debug, info, warn};

use crate::{
    commands::{CommandQueue, RenderCommand},
    env_light::{EnvLightData, ProbeDataProvider, pack_env_lights},
    error::ClusterResult,
    extent::{ClusterExtent, cluster_buffer_len},
    gpu::{BufferHandle, ComputeShader, GpuBuffer, KernelId, ShaderHandle, TextureHandle, as_float},
    light::{RayTracingLights, UnsupportedLightLog},
    light_data::{CookieCache, LightData, pack_light},
    settings::LightClusterSettings,
    shader_ids,
    volume::{LightVolume, LightVolumeSet, build_light_volumes},
};

/// Lights handled by one culling thread group.
pub const LIGHTS_PER_CULL_GROUP: usize = 16;
/// Thread groups of the cluster build kernel, 8x8x8 threads each.
pub const CLUSTER_BUILD_GROUPS: [u32; 3] = [8, 8, 4];
/// Screen tile edge of the debug kernel.
pub const DEBUG_TILE_SIZE: u32 = 8;

/// Kernels of the light cluster build shader, resolved once per frame.
struct BuildKernels {
    shader: ShaderHandle,
    cull: KernelId,
    cluster: KernelId,
}

/// Resizes an existing buffer, or allocates it on first use.
fn resized<T: Pod>(
    buffer: Option<GpuBuffer<T>>,
    queue: &mut CommandQueue,
    label: &'static str,
    count: usize,
) -> GpuBuffer<T> {
    match buffer {
        Some(mut buffer) => {
            buffer.ensure_capacity(queue, count);
            buffer
        }
        None => GpuBuffer::new(queue, label, count),
    }
}

/// Shaders and textures the cluster consumes but does not own.
#[derive(Clone, Debug)]
pub struct RayTracingResources {
    pub light_cluster_build: Option<ComputeShader>,
    pub light_cluster_debug: Option<ComputeShader>,
    pub color_gradient: Option<TextureHandle>,
    pub depth_stencil: TextureHandle,
}

/// Shader compile-time switches that change the packed data.
#[derive(Clone, Copy, Debug)]
pub struct ShaderConfig {
    pub camera_relative_rendering: bool,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            camera_relative_rendering: true,
        }
    }
}

/// Everything a frame evaluation reads from the rest of the pipeline.
pub struct FrameContext<'a> {
    pub camera: &'a HdCamera,
    /// Settings of the active ray-tracing environment, `None` when ray
    /// tracing has no environment for this camera.
    pub settings: Option<&'a LightClusterSettings>,
    pub cookies: &'a mut dyn CookieCache,
    pub probes: &'a mut dyn ProbeDataProvider,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidationReason {
    NoEnvironment,
    NoShader,
    NoLights,
    NoActiveLights,
}

/// Outcome of [`RayTracingLightCluster::evaluate_light_clusters`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterStatus {
    Built,
    Invalidated(InvalidationReason),
}

pub struct RayTracingLightCluster {
    resources: RayTracingResources,
    shader_config: ShaderConfig,

    light_volumes: Vec<LightVolume>,
    light_volume_buffer: Option<GpuBuffer<LightVolume>>,
    light_cull_result: Option<GpuBuffer<u32>>,
    light_cluster: GpuBuffer<u32>,

    light_datas: Vec<LightData>,
    light_data_buffer: GpuBuffer<LightData>,
    env_light_datas: Vec<EnvLightData>,
    env_light_data_buffer: GpuBuffer<EnvLightData>,

    debug_light_cluster_texture: TextureHandle,

    extent: ClusterExtent,
    punctual_light_count: usize,
    area_light_count: usize,
    env_light_count: usize,
    total_light_count: usize,
    num_lights_per_cell: u32,

    unsupported: UnsupportedLightLog,
    debug_kernel_reported: bool,
}

impl RayTracingLightCluster {
    /// Records allocation of the debug texture and of placeholder buffers,
    /// so every accessor returns a bindable buffer from the first frame on.
    pub fn initialize(
        queue: &mut CommandQueue,
        resources: RayTracingResources,
        shader_config: ShaderConfig,
    ) -> Self {
        let debug_light_cluster_texture = TextureHandle::new();
        queue.push(RenderCommand::AllocateTexture {
            label: "DebugLightClusterTexture",
            texture: debug_light_cluster_texture,
        });

        info!("Ray tracing light cluster initialized");

        Self {
            resources,
            shader_config,
            light_volumes: Vec::new(),
            light_volume_buffer: None,
            light_cull_result: None,
            light_cluster: GpuBuffer::new(queue, "LightCluster", 1),
            light_datas: Vec::new(),
            light_data_buffer: GpuBuffer::new(queue, "LightDatas", 1),
            env_light_datas: Vec::new(),
            env_light_data_buffer: GpuBuffer::new(queue, "EnvLightDatas", 1),
            debug_light_cluster_texture,
            extent: ClusterExtent::invalid(),
            punctual_light_count: 0,
            area_light_count: 0,
            env_light_count: 0,
            total_light_count: 0,
            num_lights_per_cell: 0,
            unsupported: UnsupportedLightLog::default(),
            debug_kernel_reported: false,
        }
    }

    pub fn release_resources(self, queue: &mut CommandQueue) {
        queue.push(RenderCommand::ReleaseTexture {
            texture: self.debug_light_cluster_texture,
        });
        if let Some(buffer) = self.light_volume_buffer {
            buffer.release(queue);
        }
        if let Some(buffer) = self.light_cull_result {
            buffer.release(queue);
        }
        self.light_cluster.release(queue);
        self.light_data_buffer.release(queue);
        self.env_light_data_buffer.release(queue);
    }

    /// Builds this frame's cluster and light data.
    ///
    /// Commands are recorded in dependency order: volumes, culling, cluster,
    /// light data, env light data, debug view. When there is nothing to
    /// cluster the cluster is invalidated instead and the reason returned.
    pub fn evaluate_light_clusters(
        &mut self,
        queue: &mut CommandQueue,
        ctx: &mut FrameContext<'_>,
        lights: &RayTracingLights,
    ) -> ClusterResult<ClusterStatus> {
        let Some(settings) = ctx.settings else {
            return Ok(self.invalidate(queue, InvalidationReason::NoEnvironment));
        };
        if self.resources.light_cluster_build.is_none() {
            return Ok(self.invalidate(queue, InvalidationReason::NoShader));
        }
        if lights.is_empty() {
            return Ok(self.invalidate(queue, InvalidationReason::NoLights));
        }

        let volume_set = build_light_volumes(lights, ctx.camera, &mut self.unsupported);
        if volume_set.total_count() == 0 {
            return Ok(self.invalidate(queue, InvalidationReason::NoActiveLights));
        }
        let Some(kernels) = self.build_kernels()? else {
            return Ok(self.invalidate(queue, InvalidationReason::NoShader));
        };

        let volumes = self.upload_light_volumes(queue, &volume_set);

        self.extent = ClusterExtent::evaluate(
            &self.light_volumes,
            ctx.camera.position,
            settings.camera_cluster_range,
        );

        let cull_result = self.cull_lights(queue, &kernels, volumes);
        self.build_light_cluster(queue, &kernels, settings, volumes, cull_result);
        self.build_light_data(queue, ctx, &volume_set);
        self.build_env_light_data(queue, ctx, &volume_set);
        self.evaluate_debug_view(queue, ctx.camera);

        debug!(
            "Light cluster built: {} punctual, {} area, {} env lights",
            self.punctual_light_count, self.area_light_count, self.env_light_count
        );
        Ok(ClusterStatus::Built)
    }

    /// Resolves both kernels of the build shader before any pass is recorded.
    fn build_kernels(&self) -> ClusterResult<Option<BuildKernels>> {
        let Some(shader) = &self.resources.light_cluster_build else {
            return Ok(None);
        };
        Ok(Some(BuildKernels {
            shader: shader.handle,
            cull: shader.find_kernel(shader_ids::LIGHT_CULL_KERNEL)?,
            cluster: shader.find_kernel(shader_ids::LIGHT_CLUSTER_KERNEL)?,
        }))
    }

    fn upload_light_volumes(
        &mut self,
        queue: &mut CommandQueue,
        volume_set: &LightVolumeSet<'_>,
    ) -> BufferHandle {
        self.punctual_light_count = volume_set.punctual_count;
        self.area_light_count = volume_set.area_count;
        self.env_light_count = volume_set.env_count;
        self.total_light_count = volume_set.total_count();

        self.light_volumes.clear();
        self.light_volumes.extend_from_slice(&volume_set.volumes);

        let buffer = resized(
            self.light_volume_buffer.take(),
            queue,
            "LightVolumes",
            self.total_light_count,
        );
        let buffer = self.light_volume_buffer.insert(buffer);
        buffer.upload(queue, &self.light_volumes);
        buffer.handle()
    }

    /// Marks which volumes overlap the cluster extent.
    fn cull_lights(
        &mut self,
        queue: &mut CommandQueue,
        kernels: &BuildKernels,
        volumes: BufferHandle,
    ) -> BufferHandle {
        queue.begin_sample("Cull Light Cluster");

        let total = self.total_light_count;
        let cull_result = resized(self.light_cull_result.take(), queue, "LightCullResult", total);
        let cull_result = self.light_cull_result.insert(cull_result).handle();

        let (h, kernel) = (kernels.shader, kernels.cull);
        queue.set_compute_vector(h, shader_ids::CLUSTER_CENTER_POSITION, self.extent.center);
        queue.set_compute_vector(h, shader_ids::CLUSTER_DIMENSION, self.extent.dimension);
        queue.set_compute_float(h, shader_ids::LIGHT_VOLUME_COUNT, as_float(total as u32));
        queue.set_compute_buffer(h, kernel, shader_ids::LIGHT_VOLUMES, volumes);
        queue.set_compute_buffer(h, kernel, shader_ids::RAYTRACING_LIGHT_CULL_RESULT, cull_result);

        let groups = total.div_ceil(LIGHTS_PER_CULL_GROUP) as u32;
        queue.dispatch(h, kernel, [groups, 1, 1]);

        queue.end_sample("Cull Light Cluster");
        cull_result
    }

    fn build_light_cluster(
        &mut self,
        queue: &mut CommandQueue,
        kernels: &BuildKernels,
        settings: &LightClusterSettings,
        volumes: BufferHandle,
        cull_result: BufferHandle,
    ) {
        queue.begin_sample("Build Light Cluster");

        self.num_lights_per_cell = settings.max_num_lights_per_cell;
        self.light_cluster
            .ensure_capacity(queue, cluster_buffer_len(self.num_lights_per_cell));

        let (h, kernel) = (kernels.shader, kernels.cluster);
        queue.set_compute_buffer(
            h,
            kernel,
            shader_ids::RAYTRACING_LIGHT_CLUSTER,
            self.light_cluster.handle(),
        );
        queue.set_compute_vector(h, shader_ids::MIN_CLUSTER_POS, self.extent.min);
        queue.set_compute_vector(h, shader_ids::MAX_CLUSTER_POS, self.extent.max);
        queue.set_compute_vector(h, shader_ids::CLUSTER_CELL_SIZE, self.extent.cell_size);
        queue.set_compute_float(
            h,
            shader_ids::LIGHT_PER_CELL_COUNT,
            as_float(self.num_lights_per_cell),
        );
        queue.set_compute_buffer(h, kernel, shader_ids::LIGHT_VOLUMES, volumes);
        queue.set_compute_float(
            h,
            shader_ids::LIGHT_VOLUME_COUNT,
            as_float(self.total_light_count as u32),
        );
        queue.set_compute_buffer(h, kernel, shader_ids::RAYTRACING_LIGHT_CULL_RESULT, cull_result);

        queue.dispatch(h, kernel, CLUSTER_BUILD_GROUPS);

        queue.end_sample("Build Light Cluster");
    }

    fn build_light_data(
        &mut self,
        queue: &mut CommandQueue,
        ctx: &mut FrameContext<'_>,
        volume_set: &LightVolumeSet<'_>,
    ) {
        self.light_datas.clear();
        for scene_light in &volume_set.lights {
            if let Some(data) = pack_light(
                queue,
                scene_light,
                ctx.camera,
                &mut *ctx.cookies,
                self.shader_config.camera_relative_rendering,
            ) {
                self.light_datas.push(data);
            }
        }
        debug_assert_eq!(self.light_datas.len(), volume_set.lights.len());

        self.light_data_buffer
            .ensure_capacity(queue, self.light_datas.len());
        if !self.light_datas.is_empty() {
            self.light_data_buffer.upload(queue, &self.light_datas);
        }
    }

    fn build_env_light_data(
        &mut self,
        queue: &mut CommandQueue,
        ctx: &mut FrameContext<'_>,
        volume_set: &LightVolumeSet<'_>,
    ) {
        self.env_light_datas = pack_env_lights(
            queue,
            &volume_set.probes,
            ctx.camera,
            &mut *ctx.probes,
            self.shader_config.camera_relative_rendering,
        );

        self.env_light_data_buffer
            .ensure_capacity(queue, self.env_light_datas.len());
        if !self.env_light_datas.is_empty() {
            self.env_light_data_buffer
                .upload(queue, &self.env_light_datas);
        }
    }

    /// Records the cluster visualisation pass. Skipped when the debug
    /// shader, its kernel or the gradient texture is missing.
    fn evaluate_debug_view(&mut self, queue: &mut CommandQueue, camera: &HdCamera) {
        let (Some(shader), Some(gradient)) = (
            &self.resources.light_cluster_debug,
            self.resources.color_gradient,
        ) else {
            return;
        };
        let kernel = match shader.find_kernel(shader_ids::DEBUG_LIGHT_CLUSTER_KERNEL) {
            Ok(kernel) => kernel,
            Err(error) => {
                if !self.debug_kernel_reported {
                    warn!("{error}, light cluster debug view skipped");
                    self.debug_kernel_reported = true;
                }
                return;
            }
        };

        let h = shader.handle;
        queue.set_compute_buffer(
            h,
            kernel,
            shader_ids::RAYTRACING_LIGHT_CLUSTER,
            self.light_cluster.handle(),
        );
        queue.set_compute_vector(h, shader_ids::MIN_CLUSTER_POS, self.extent.min);
        queue.set_compute_vector(h, shader_ids::MAX_CLUSTER_POS, self.extent.max);
        queue.set_compute_vector(h, shader_ids::CLUSTER_CELL_SIZE, self.extent.cell_size);
        queue.set_compute_float(
            h,
            shader_ids::LIGHT_PER_CELL_COUNT,
            as_float(self.num_lights_per_cell),
        );
        queue.set_compute_texture(h, kernel, shader_ids::DEBUG_COLOR_GRADIENT_TEXTURE, gradient);
        queue.set_compute_texture(
            h,
            kernel,
            shader_ids::CAMERA_DEPTH_TEXTURE,
            self.resources.depth_stencil,
        );
        queue.set_compute_texture(
            h,
            kernel,
            shader_ids::DEBUG_LIGHT_CLUSTER_TEXTURE,
            self.debug_light_cluster_texture,
        );

        let tiles_x = camera.actual_width.div_ceil(DEBUG_TILE_SIZE);
        let tiles_y = camera.actual_height.div_ceil(DEBUG_TILE_SIZE);
        queue.dispatch(h, kernel, [tiles_x, tiles_y, 1]);
    }

    /// Resets the cluster to its "nothing valid this frame" state: inverted
    /// bounds, zero counts and single-element buffers.
    fn invalidate(&mut self, queue: &mut CommandQueue, reason: InvalidationReason) -> ClusterStatus {
        debug!("Light cluster invalidated: {reason:?}");

        self.extent = ClusterExtent::invalid();
        self.punctual_light_count = 0;
        self.area_light_count = 0;
        self.env_light_count = 0;
        self.total_light_count = 0;
        self.light_volumes.clear();
        self.light_datas.clear();
        self.env_light_datas.clear();

        self.light_cluster.ensure_capacity(queue, 1);
        self.light_data_buffer.ensure_capacity(queue, 1);
        self.env_light_data_buffer.ensure_capacity(queue, 1);

        ClusterStatus::Invalidated(reason)
    }

    /// Publishes the cluster and light data as global shader inputs.
    pub fn bind_light_cluster_data(&self, queue: &mut CommandQueue) {
        queue.set_global_buffer(shader_ids::RAYTRACING_LIGHT_CLUSTER, self.light_cluster.handle());
        queue.set_global_buffer(shader_ids::LIGHT_DATAS_RT, self.light_data_buffer.handle());
        queue.set_global_buffer(shader_ids::ENV_LIGHT_DATAS_RT, self.env_light_data_buffer.handle());
        queue.set_global_vector(shader_ids::MIN_CLUSTER_POS, self.extent.min);
        queue.set_global_vector(shader_ids::MAX_CLUSTER_POS, self.extent.max);
        queue.set_global_int(shader_ids::LIGHT_PER_CELL_COUNT, self.num_lights_per_cell as i32);
        queue.set_global_int(shader_ids::PUNCTUAL_LIGHT_COUNT_RT, self.punctual_light_count as i32);
        queue.set_global_int(shader_ids::AREA_LIGHT_COUNT_RT, self.area_light_count as i32);
        queue.set_global_int(shader_ids::ENV_LIGHT_COUNT_RT, self.env_light_count as i32);
    }

    pub fn cluster(&self) -> &GpuBuffer<u32> {
        &self.light_cluster
    }

    pub fn light_datas(&self) -> &GpuBuffer<LightData> {
        &self.light_data_buffer
    }

    pub fn env_light_datas(&self) -> &GpuBuffer<EnvLightData> {
        &self.env_light_data_buffer
    }

    /// Host copy of the light records uploaded this frame.
    pub fn light_data_records(&self) -> &[LightData] {
        &self.light_datas
    }

    pub fn env_light_data_records(&self) -> &[EnvLightData] {
        &self.env_light_datas
    }

    pub fn light_volumes(&self) -> &[LightVolume] {
        &self.light_volumes
    }

    pub fn extent(&self) -> &ClusterExtent {
        &self.extent
    }

    pub fn min_cluster_pos(&self) -> Vec3 {
        self.extent.min
    }

    pub fn max_cluster_pos(&self) -> Vec3 {
        self.extent.max
    }

    pub fn cluster_cell_size(&self) -> Vec3 {
        self.extent.cell_size
    }

    pub fn punctual_light_count(&self) -> usize {
        self.punctual_light_count
    }

    pub fn area_light_count(&self) -> usize {
        self.area_light_count
    }

    pub fn env_light_count(&self) -> usize {
        self.env_light_count
    }

    pub fn total_light_count(&self) -> usize {
        self.total_light_count
    }

    pub fn num_lights_per_cell(&self) -> u32 {
        self.num_lights_per_cell
    }

    pub fn debug_texture(&self) -> TextureHandle {
        self.debug_light_cluster_texture
    }
}
