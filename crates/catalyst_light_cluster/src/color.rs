use glam::Vec3;

pub const MIN_COLOR_TEMPERATURE: f32 = 1000.0;
pub const MAX_COLOR_TEMPERATURE: f32 = 20000.0;

/// sRGB transfer function, per channel.
pub fn srgb_to_linear(color: Vec3) -> Vec3 {
    fn channel(c: f32) -> f32 {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    Vec3::new(channel(color.x), channel(color.y), channel(color.z))
}

/// Linear sRGB tint of a black body at `kelvin`, normalised so the
/// brightest channel is 1.
///
/// Uses Krystek's rational fit of the Planckian locus in CIE 1960 UCS.
pub fn correlated_color_temperature_to_rgb(kelvin: f32) -> Vec3 {
    let t = kelvin.clamp(MIN_COLOR_TEMPERATURE, MAX_COLOR_TEMPERATURE) as f64;
    let t2 = t * t;

    let u = (0.860117757 + 1.54118254e-4 * t + 1.28641212e-7 * t2)
        / (1.0 + 8.42420235e-4 * t + 7.08145163e-7 * t2);
    let v = (0.317398726 + 4.22806245e-5 * t + 4.20481691e-8 * t2)
        / (1.0 - 2.89741816e-5 * t + 1.61456053e-7 * t2);

    let d = 2.0 * u - 8.0 * v + 4.0;
    let x = 3.0 * u / d;
    let y = 2.0 * v / d;

    // XYZ with Y = 1
    let cx = x / y;
    let cz = (1.0 - x - y) / y;

    let r = 3.2404542 * cx - 1.5371385 - 0.4985314 * cz;
    let g = -0.9692660 * cx + 1.8760108 + 0.0415560 * cz;
    let b = 0.0556434 * cx - 0.2040259 + 1.0572252 * cz;

    let rgb = Vec3::new(r as f32, g as f32, b as f32).max(Vec3::ZERO);
    let max = rgb.max_element();
    if max > 0.0 { rgb / max } else { Vec3::ONE }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints_are_preserved() {
        assert_eq!(srgb_to_linear(Vec3::ZERO), Vec3::ZERO);
        assert!(srgb_to_linear(Vec3::ONE).abs_diff_eq(Vec3::ONE, 1e-5));
        assert!((srgb_to_linear(Vec3::splat(0.5)).x - 0.214).abs() < 1e-3);
    }

    #[test]
    fn warm_temperatures_are_red_and_daylight_is_near_white() {
        let warm = correlated_color_temperature_to_rgb(2000.0);
        assert_eq!(warm.x, 1.0);
        assert!(warm.z < warm.y);

        let daylight = correlated_color_temperature_to_rgb(6500.0);
        assert!(daylight.min_element() > 0.85);
    }

    #[test]
    fn hot_temperatures_are_blue() {
        let cold = correlated_color_temperature_to_rgb(15000.0);
        assert_eq!(cold.z, 1.0);
        assert!(cold.x < 1.0);
    }
}
