//! Scene-side description of lights and reflection probes.

use std::collections::HashSet;

use catalyst_core::Transform;
use flecs_ecs::macros::Component;
use glam::Vec3;
use log::warn;

use crate::{error::ClusterError, gpu::TextureHandle};

/// Base light type, as authored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightType {
    Spot,
    Directional,
    Point,
    /// Baked-only rectangle. Realtime area lights use [`LightTypeExtent`].
    Rectangle,
    /// Baked-only disc.
    Disc,
}

/// Selects between punctual lights and realtime area lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightTypeExtent {
    Punctual,
    Rectangle,
    Tube,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpotLightShape {
    Cone,
    Pyramid,
    Box,
}

/// Light type as the ray-tracing shaders see it.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuLightType {
    Directional = 0,
    Point = 1,
    Spot = 2,
    ProjectorPyramid = 3,
    ProjectorBox = 4,
    Tube = 5,
    Rectangle = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightCategory {
    Punctual,
    Area,
}

#[derive(Component, Clone, Debug)]
pub struct HdLight {
    pub light_type: LightType,
    pub extent: LightTypeExtent,
    pub spot_shape: SpotLightShape,

    /// Component toggle. Disabled lights are ignored entirely.
    pub enabled: bool,
    pub active_in_hierarchy: bool,

    pub range: f32,
    /// sRGB color, converted to linear when packed.
    pub color: Vec3,
    pub intensity: f32,
    pub use_color_temperature: bool,
    /// Kelvin
    pub color_temperature: f32,

    /// Full cone angle in degrees.
    pub spot_angle: f32,
    /// Inner cone as a fraction of the outer one, in [0, 1].
    pub inner_spot_percent01: f32,
    pub aspect_ratio: f32,
    pub shape_width: f32,
    pub shape_height: f32,
    pub shape_radius: f32,

    pub light_dimmer: f32,
    pub volumetric_dimmer: f32,
    pub affect_diffuse: bool,
    pub affect_specular: bool,
    pub fade_distance: f32,
    pub apply_range_attenuation: bool,

    pub cookie: Option<TextureHandle>,
    pub area_light_cookie: Option<TextureHandle>,
    pub shadow_index: i32,
    pub max_smoothness: f32,
    pub light_layers: u32,
}

impl Default for HdLight {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            extent: LightTypeExtent::Punctual,
            spot_shape: SpotLightShape::Cone,
            enabled: true,
            active_in_hierarchy: true,
            range: 10.0,
            color: Vec3::ONE,
            intensity: 1.0,
            use_color_temperature: false,
            color_temperature: 6570.0,
            spot_angle: 30.0,
            inner_spot_percent01: 0.0,
            aspect_ratio: 1.0,
            shape_width: 0.5,
            shape_height: 0.5,
            shape_radius: 0.025,
            light_dimmer: 1.0,
            volumetric_dimmer: 1.0,
            affect_diffuse: true,
            affect_specular: true,
            fade_distance: 10000.0,
            apply_range_attenuation: true,
            cookie: None,
            area_light_cookie: None,
            shadow_index: -1,
            max_smoothness: 0.99,
            light_layers: 1,
        }
    }
}

impl HdLight {
    pub fn point(range: f32) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn spot(shape: SpotLightShape, spot_angle: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            spot_shape: shape,
            spot_angle,
            range,
            ..Default::default()
        }
    }

    pub fn directional() -> Self {
        Self {
            light_type: LightType::Directional,
            ..Default::default()
        }
    }

    pub fn area(extent: LightTypeExtent, width: f32, height: f32, range: f32) -> Self {
        Self {
            extent,
            shape_width: width,
            shape_height: height,
            range,
            ..Default::default()
        }
    }

    /// Maps the authored type onto the GPU light type and its category.
    pub fn gpu_light_type(&self) -> Result<(GpuLightType, LightCategory), ClusterError> {
        let gpu_type = match (self.extent, self.light_type) {
            (LightTypeExtent::Punctual, LightType::Spot) => match self.spot_shape {
                SpotLightShape::Cone => GpuLightType::Spot,
                SpotLightShape::Pyramid => GpuLightType::ProjectorPyramid,
                SpotLightShape::Box => GpuLightType::ProjectorBox,
            },
            (LightTypeExtent::Punctual, LightType::Directional) => GpuLightType::Directional,
            (LightTypeExtent::Punctual, LightType::Point) => GpuLightType::Point,
            (LightTypeExtent::Punctual, LightType::Rectangle | LightType::Disc) => {
                return Err(ClusterError::UnsupportedLight {
                    light_type: self.light_type,
                    extent: self.extent,
                });
            }
            (LightTypeExtent::Rectangle, _) => GpuLightType::Rectangle,
            (LightTypeExtent::Tube, _) => GpuLightType::Tube,
        };

        let category = match self.extent {
            LightTypeExtent::Punctual => LightCategory::Punctual,
            LightTypeExtent::Rectangle | LightTypeExtent::Tube => LightCategory::Area,
        };

        Ok((gpu_type, category))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InfluenceShape {
    Sphere { radius: f32 },
    /// Full box size, not half extents.
    Box { size: Vec3 },
}

#[derive(Component, Clone, Debug)]
pub struct ReflectionProbe {
    pub influence: InfluenceShape,
    pub active_in_hierarchy: bool,
    pub weight: f32,
    pub multiplier: f32,
    /// Fade-in band inside the influence volume, in world units.
    pub blend_distance: f32,
}

impl Default for ReflectionProbe {
    fn default() -> Self {
        Self {
            influence: InfluenceShape::Box {
                size: Vec3::splat(10.0),
            },
            active_in_hierarchy: true,
            weight: 1.0,
            multiplier: 1.0,
            blend_distance: 1.0,
        }
    }
}

impl ReflectionProbe {
    pub fn sphere(radius: f32) -> Self {
        Self {
            influence: InfluenceShape::Sphere { radius },
            ..Default::default()
        }
    }

    pub fn boxed(size: Vec3) -> Self {
        Self {
            influence: InfluenceShape::Box { size },
            ..Default::default()
        }
    }

    /// Per-axis half extents of the influence volume.
    pub fn influence_extents(&self) -> Vec3 {
        match self.influence {
            InfluenceShape::Sphere { radius } => Vec3::splat(radius),
            InfluenceShape::Box { size } => size / 2.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneLight {
    pub light: HdLight,
    pub transform: Transform,
}

#[derive(Clone, Debug)]
pub struct SceneProbe {
    pub probe: ReflectionProbe,
    pub transform: Transform,
}

/// Lights and probes visible to ray tracing this frame, in scene order.
///
/// `None` entries stand for objects destroyed since the list was gathered.
#[derive(Clone, Debug, Default)]
pub struct RayTracingLights {
    pub lights: Vec<Option<SceneLight>>,
    pub reflection_probes: Vec<Option<SceneProbe>>,
}

impl RayTracingLights {
    pub fn push_light(&mut self, light: HdLight, transform: Transform) -> &mut Self {
        self.lights.push(Some(SceneLight { light, transform }));
        self
    }

    pub fn push_probe(&mut self, probe: ReflectionProbe, transform: Transform) -> &mut Self {
        self.reflection_probes.push(Some(SceneProbe { probe, transform }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty() && self.reflection_probes.is_empty()
    }
}

/// Logs each distinct unsupported light configuration a single time.
#[derive(Debug, Default)]
pub struct UnsupportedLightLog {
    reported: HashSet<(LightType, LightTypeExtent)>,
}

impl UnsupportedLightLog {
    pub fn report(&mut self, error: &ClusterError) {
        if let ClusterError::UnsupportedLight { light_type, extent } = error {
            if self.reported.insert((*light_type, *extent)) {
                warn!("{error}, light skipped");
            }
        }
    }

    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }
}
