//! Photoshop-style blend modes for layer mode.
//!
//! Channels are blended in 0.0-1.0 with `base` as the bottom layer, then mixed
//! with the base by `opacity`.

use super::texture::to_u8;
use crate::effects::BlendMode;
use image::RgbImage;

fn blend_channel(mode: BlendMode, a: f32, b: f32) -> f32 {
    match mode {
        BlendMode::Normal => b,
        BlendMode::Multiply => a * b,
        BlendMode::Screen => 1.0 - (1.0 - a) * (1.0 - b),
        BlendMode::Overlay => {
            if a < 0.5 {
                2.0 * a * b
            } else {
                1.0 - 2.0 * (1.0 - a) * (1.0 - b)
            }
        }
        BlendMode::SoftLight => {
            if b < 0.5 {
                2.0 * a * b + a * a * (1.0 - 2.0 * b)
            } else {
                2.0 * a * (1.0 - b) + a.sqrt() * (2.0 * b - 1.0)
            }
        }
        BlendMode::HardLight => {
            if b < 0.5 {
                2.0 * a * b
            } else {
                1.0 - 2.0 * (1.0 - a) * (1.0 - b)
            }
        }
        BlendMode::ColorDodge => {
            if b >= 1.0 {
                1.0
            } else {
                (a / (1.0 - b)).min(1.0)
            }
        }
        BlendMode::ColorBurn => {
            if b <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - a) / b).min(1.0)
            }
        }
        BlendMode::Darken => a.min(b),
        BlendMode::Lighten => a.max(b),
        BlendMode::Difference => (a - b).abs(),
        BlendMode::Exclusion => a + b - 2.0 * a * b,
    }
}

/// Blend `overlay` onto `base`. Frames of different sizes leave `base` as is.
pub fn blend(base: &RgbImage, overlay: &RgbImage, mode: BlendMode, opacity: f32) -> RgbImage {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || base.dimensions() != overlay.dimensions() {
        return base.clone();
    }

    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(overlay.pixels()) {
        for c in 0..3 {
            let a = dst[c] as f32 / 255.0;
            let b = src[c] as f32 / 255.0;
            let blended = blend_channel(mode, a, b).clamp(0.0, 1.0);
            dst[c] = to_u8((blended * opacity + a * (1.0 - opacity)) * 255.0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_normal_full_opacity_is_overlay() {
        let base = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let top = RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]));
        assert_eq!(blend(&base, &top, BlendMode::Normal, 1.0), top);
        assert_eq!(blend(&base, &top, BlendMode::Normal, 0.0), base);
    }

    #[test]
    fn test_identical_layers_are_stable_for_neutral_modes() {
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 90]));
        for mode in [BlendMode::Normal, BlendMode::Darken, BlendMode::Lighten] {
            assert_eq!(blend(&img, &img, mode, 0.7), img);
        }
    }

    #[test]
    fn test_formulas() {
        assert!((blend_channel(BlendMode::Multiply, 0.5, 0.5) - 0.25).abs() < 1e-6);
        assert!((blend_channel(BlendMode::Screen, 0.5, 0.5) - 0.75).abs() < 1e-6);
        assert!((blend_channel(BlendMode::Difference, 0.2, 0.9) - 0.7).abs() < 1e-6);
        assert!((blend_channel(BlendMode::Exclusion, 1.0, 1.0)).abs() < 1e-6);
        assert_eq!(blend_channel(BlendMode::ColorDodge, 0.3, 1.0), 1.0);
        assert_eq!(blend_channel(BlendMode::ColorBurn, 0.3, 0.0), 0.0);
    }

    #[test]
    fn test_all_modes_stay_in_range() {
        for mode in BlendMode::ALL {
            for a in [0.0, 0.25, 0.5, 0.75, 1.0] {
                for b in [0.0, 0.25, 0.5, 0.75, 1.0] {
                    let v = blend_channel(mode, a, b);
                    assert!((0.0..=1.0).contains(&v), "{mode:?} {a} {b} -> {v}");
                }
            }
        }
    }
}
