//! Packs scene lights into the records the ray-tracing shaders read.

use bytemuck::{Pod, Zeroable};
use catalyst_core::HdCamera;
use glam::Vec2;

use crate::{
    color::{correlated_color_temperature_to_rgb, srgb_to_linear},
    commands::CommandQueue,
    gpu::TextureHandle,
    light::{GpuLightType, LightType, LightTypeExtent, SceneLight, SpotLightShape},
};

/// Attenuation value at the light's position when range attenuation is off.
pub const HUGE_VALUE: f32 = 16777216.0;
/// `sqrt(HUGE_VALUE)`
pub const SQRT_HUGE: f32 = 4096.0;

/// Texture arrays a cookie can live in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CookieKind {
    Spot,
    Cube,
    Area,
}

/// Shared texture cache handing out cookie slots.
pub trait CookieCache {
    /// Returns the slot holding `texture`, uploading it first if needed.
    /// A negative slot means the texture could not be cached.
    fn fetch_slice(
        &mut self,
        queue: &mut CommandQueue,
        kind: CookieKind,
        texture: TextureHandle,
    ) -> i32;
}

// Mirrors the kernels' LightData struct, field for field.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub position_rws: [f32; 3],
    pub light_layers: u32,

    pub light_dimmer: f32,
    pub volumetric_light_dimmer: f32,
    pub angle_scale: f32,
    pub angle_offset: f32,

    pub forward: [f32; 3],
    pub light_type: u32,

    pub right: [f32; 3],
    pub range: f32,

    pub up: [f32; 3],
    pub range_attenuation_scale: f32,

    pub color: [f32; 3],
    pub range_attenuation_bias: f32,

    pub cookie_index: i32,
    pub shadow_index: i32,
    pub contact_shadow_mask: u32,
    pub screen_space_shadow_index: i32,

    pub shadow_dimmer: f32,
    pub volumetric_shadow_dimmer: f32,
    pub non_light_mapped_only: i32,
    pub min_roughness: f32,

    pub shadow_mask_selector: [f32; 4],

    pub diffuse_dimmer: f32,
    pub specular_dimmer: f32,
    pub size: [f32; 2],
}

/// Linear fade from 90% of `fade_distance` down to zero at `fade_distance`.
pub fn compute_linear_distance_fade(distance_to_camera: f32, fade_distance: f32) -> f32 {
    let fade_near = 0.9 * fade_distance;
    1.0 - ((distance_to_camera - fade_near) / (fade_distance - fade_near)).clamp(0.0, 1.0)
}

/// Distance fade of `scene_light` for `camera`, or `None` when the light
/// ends up contributing nothing.
///
/// Both positions are absolute world space.
pub fn light_distance_fade(scene_light: &SceneLight, camera: &HdCamera) -> Option<f32> {
    let light = &scene_light.light;
    let distance_to_camera = (scene_light.transform.position() - camera.position).length();
    let fade = compute_linear_distance_fade(distance_to_camera, light.fade_distance);

    let contributes = ((light.light_dimmer > 0.0) && (light.affect_diffuse || light.affect_specular))
        || (light.volumetric_dimmer > 0.0);

    (contributes && fade > 0.0).then_some(fade)
}

/// Range attenuation `(scale, bias)` for the shaders' `bias - (scale * x)^2`
/// falloff, `x` being the squared normalized distance.
pub fn range_attenuation(gpu_type: GpuLightType, range: f32, apply_attenuation: bool) -> (f32, f32) {
    let apply = apply_attenuation && gpu_type != GpuLightType::ProjectorBox;

    // Rectangle lights attenuate over the normalized [0, 1] range instead
    // of [0, r].
    if apply {
        let scale = if gpu_type == GpuLightType::Rectangle {
            1.0
        } else {
            1.0 / (range * range)
        };
        (scale, 1.0)
    } else {
        // Step at range: f(0) = huge gives b = huge, f(1) = 0 gives a = sqrt(huge).
        let scale = if gpu_type == GpuLightType::Rectangle {
            SQRT_HUGE
        } else {
            SQRT_HUGE / (range * range)
        };
        (scale, HUGE_VALUE)
    }
}

/// Builds the record for one light, or `None` when the light is skipped.
///
/// Every distance and orientation computation uses absolute world space;
/// the position is made camera-relative as the very last step.
pub fn pack_light(
    queue: &mut CommandQueue,
    scene_light: &SceneLight,
    camera: &HdCamera,
    cookies: &mut dyn CookieCache,
    camera_relative_rendering: bool,
) -> Option<LightData> {
    let light = &scene_light.light;
    let transform = &scene_light.transform;

    let fade = light_distance_fade(scene_light, camera)?;
    let (gpu_type, _) = light.gpu_light_type().ok()?;

    let mut data = LightData::zeroed();
    data.light_layers = light.light_layers;
    data.light_type = gpu_type as u32;
    data.range = light.range;

    let (scale, bias) = range_attenuation(gpu_type, light.range, light.apply_range_attenuation);
    data.range_attenuation_scale = scale;
    data.range_attenuation_bias = bias;

    let mut color = srgb_to_linear(light.color) * light.intensity;
    if light.use_color_temperature {
        color *= correlated_color_temperature_to_rgb(light.color_temperature);
    }
    data.color = color.to_array();

    let forward = transform.forward();
    let mut up = transform.up();
    let mut right = transform.right();

    match gpu_type {
        GpuLightType::ProjectorBox => {
            // Rescale for cookies and windowing.
            right *= 2.0 / light.shape_width.max(0.001);
            up *= 2.0 / light.shape_height.max(0.001);
        }
        GpuLightType::ProjectorPyramid => {
            let (frustum_width, frustum_height) =
                pyramid_frustum_size(light.spot_angle, light.aspect_ratio);
            right *= 2.0 / frustum_width;
            up *= 2.0 / frustum_height;
        }
        _ => {}
    }

    if gpu_type == GpuLightType::Spot {
        let half_angle = (light.spot_angle * 0.5).to_radians();
        let cos_outer = half_angle.cos().clamp(0.0, 1.0);
        let sin_outer = (1.0 - cos_outer * cos_outer).sqrt();
        let cos_inner = (half_angle * light.inner_spot_percent01).cos().clamp(0.0, 1.0);

        data.angle_scale = 1.0 / (cos_inner - cos_outer).max(0.0001);
        data.angle_offset = -cos_outer * data.angle_scale;

        let cot_outer = cos_outer / sin_outer;
        up *= cot_outer;
        right *= cot_outer;
    } else {
        // Neutral values, the shaders' angle attenuation evaluates to 1.
        data.angle_scale = 0.0;
        data.angle_offset = 1.0;
    }

    data.forward = forward.to_array();
    data.up = up.to_array();
    data.right = right.to_array();

    let size = match gpu_type {
        GpuLightType::Rectangle | GpuLightType::Tube => {
            Vec2::new(light.shape_width, light.shape_height)
        }
        GpuLightType::Directional | GpuLightType::ProjectorBox => Vec2::ZERO,
        // Squared radius simulates a fill light.
        _ => Vec2::new(light.shape_radius * light.shape_radius, 0.0),
    };
    data.size = size.to_array();

    data.light_dimmer = fade * light.light_dimmer;
    data.diffuse_dimmer = if light.affect_diffuse {
        fade * light.light_dimmer
    } else {
        0.0
    };
    data.specular_dimmer = if light.affect_specular {
        fade * light.light_dimmer * camera.specular_global_dimmer
    } else {
        0.0
    };
    data.volumetric_light_dimmer = fade * light.volumetric_dimmer;

    data.contact_shadow_mask = 0;
    data.cookie_index = cookie_slot(queue, scene_light, gpu_type, cookies);
    data.shadow_index = light.shadow_index;
    data.screen_space_shadow_index = -1;
    data.shadow_dimmer = 1.0;
    data.volumetric_shadow_dimmer = 1.0;

    // Max smoothness is perceptual, the shaders want roughness.
    let perceptual_roughness = 1.0 - light.max_smoothness;
    data.min_roughness = perceptual_roughness * perceptual_roughness;

    // -1 disables the shadow mask
    data.shadow_mask_selector = [-1.0, 0.0, 0.0, 0.0];
    data.non_light_mapped_only = 0;

    let mut position = transform.position();
    if camera_relative_rendering {
        position -= camera.world_space_camera_pos;
    }
    data.position_rws = position.to_array();

    Some(data)
}

/// Width and height of a pyramid projector's frustum at unit distance.
fn pyramid_frustum_size(spot_angle: f32, aspect_ratio: f32) -> (f32, f32) {
    let extent = 2.0 * (spot_angle * 0.5).to_radians().tan();
    if aspect_ratio >= 1.0 {
        (extent * aspect_ratio, extent)
    } else {
        (extent, extent / aspect_ratio)
    }
}

fn cookie_slot(
    queue: &mut CommandQueue,
    scene_light: &SceneLight,
    gpu_type: GpuLightType,
    cookies: &mut dyn CookieCache,
) -> i32 {
    let light = &scene_light.light;
    let punctual = light.extent == LightTypeExtent::Punctual;

    match (light.cookie, light.area_light_cookie) {
        (Some(cookie), _) if punctual => match light.light_type {
            LightType::Spot => cookies.fetch_slice(queue, CookieKind::Spot, cookie),
            LightType::Point => cookies.fetch_slice(queue, CookieKind::Cube, cookie),
            _ => -1,
        },
        // Projectors always sample a cookie, white when none is assigned.
        _ if punctual
            && light.light_type == LightType::Spot
            && light.spot_shape != SpotLightShape::Cone =>
        {
            cookies.fetch_slice(queue, CookieKind::Spot, TextureHandle::WHITE)
        }
        (_, Some(area_cookie)) if gpu_type == GpuLightType::Rectangle => {
            cookies.fetch_slice(queue, CookieKind::Area, area_cookie)
        }
        _ => -1,
    }
}
