//! Shader property and kernel names shared with the ray-tracing kernels.

pub const LIGHT_CLUSTER_KERNEL: &str = "RaytracingLightCluster";
pub const LIGHT_CULL_KERNEL: &str = "RaytracingLightCull";
pub const DEBUG_LIGHT_CLUSTER_KERNEL: &str = "DebugLightCluster";

pub const CLUSTER_CELL_SIZE: &str = "_ClusterCellSize";
pub const LIGHT_VOLUMES: &str = "_LightVolumes";
pub const LIGHT_VOLUME_COUNT: &str = "_LightVolumeCount";
pub const DEBUG_COLOR_GRADIENT_TEXTURE: &str = "_DebugColorGradientTexture";
pub const DEBUG_LIGHT_CLUSTER_TEXTURE: &str = "_DebutLightClusterTexture";
pub const RAYTRACING_LIGHT_CULL_RESULT: &str = "_RaytracingLightCullResult";
pub const CLUSTER_CENTER_POSITION: &str = "_ClusterCenterPosition";
pub const CLUSTER_DIMENSION: &str = "_ClusterDimension";
pub const CAMERA_DEPTH_TEXTURE: &str = "_CameraDepthTexture";

pub const RAYTRACING_LIGHT_CLUSTER: &str = "_RaytracingLightCluster";
pub const MIN_CLUSTER_POS: &str = "_MinClusterPos";
pub const MAX_CLUSTER_POS: &str = "_MaxClusterPos";
pub const LIGHT_PER_CELL_COUNT: &str = "_LightPerCellCount";
pub const LIGHT_DATAS_RT: &str = "_LightDatasRT";
pub const ENV_LIGHT_DATAS_RT: &str = "_EnvLightDatasRT";
pub const PUNCTUAL_LIGHT_COUNT_RT: &str = "_PunctualLightCountRT";
pub const AREA_LIGHT_COUNT_RT: &str = "_AreaLightCountRT";
pub const ENV_LIGHT_COUNT_RT: &str = "_EnvLightCountRT";
