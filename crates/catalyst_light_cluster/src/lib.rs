//! Light clustering for ray-traced lighting.
//!
//! Every frame the scene's lights and reflection probes are reduced to
//! bounding volumes, the volumes are culled against a camera-centred
//! 64x64x32 grid, and a compute kernel writes per-cell light lists. Packed
//! light and env light records are uploaded alongside so ray-tracing
//! shaders can shade a hit with the lights of its cell.
//!
//! No graphics API is touched here. All GPU work is recorded into a
//! [`CommandQueue`] and executed by the host renderer.

pub mod cluster;
pub mod color;
pub mod commands;
pub mod env_light;
pub mod error;
pub mod extent;
pub mod gpu;
pub mod light;
pub mod light_data;
pub mod scene;
pub mod settings;
pub mod shader_ids;
pub mod volume;

pub use cluster::{
    ClusterStatus, FrameContext, InvalidationReason, RayTracingLightCluster, RayTracingResources,
    ShaderConfig,
};
pub use commands::{CommandExecutor, CommandQueue, RenderCommand};
pub use env_light::{BasicProbeDataProvider, EnvLightData, ProbeDataProvider};
pub use error::{ClusterError, ClusterResult};
pub use extent::{CLUSTER_RESOLUTION, ClusterExtent};
pub use gpu::{BufferHandle, ComputeShader, GpuBuffer, TextureHandle};
pub use light::{HdLight, LightType, LightTypeExtent, RayTracingLights, ReflectionProbe, SpotLightShape};
pub use light_data::{CookieCache, CookieKind, LightData};
pub use scene::{collect_camera, collect_ray_tracing_lights};
pub use settings::LightClusterSettings;
pub use volume::LightVolume;
