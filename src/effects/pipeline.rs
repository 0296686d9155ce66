use super::config::{BasicEffectParams, EffectMode, ReactivityConfig};
use super::mixer::FrameIntensitySnapshot;
use super::{EffectCategory, EffectId};
use crate::graphics::{artistic, blend, blur, color, corruption, geometric, retro, stylize};
use image::RgbImage;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Applies the enabled effects of a frame, category by category.
///
/// Categories run in [`EffectCategory::ALL`] order and effects within a
/// category in declaration order. An effect with intensity 0 is skipped, so an
/// idle snapshot returns the input frame pixel for pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectPipeline;

impl EffectPipeline {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        frame: &RgbImage,
        snapshot: &FrameIntensitySnapshot,
        config: &ReactivityConfig,
    ) -> RgbImage {
        let mut current = frame.clone();
        let mut transformed = None;
        let mut effected = false;

        for category in EffectCategory::ALL {
            for effect in category.effects() {
                let intensity = snapshot.get(effect);
                if intensity <= 0.0 || !config.is_enabled(effect) {
                    continue;
                }
                let mut rng = effect_rng(config.seed, snapshot.frame_index, effect);
                current = apply_effect(effect, &current, intensity, &config.basic, &mut rng);
                if category != EffectCategory::Geometric {
                    effected = true;
                }
            }
            if category == EffectCategory::Geometric {
                transformed = Some(current.clone());
            }
        }

        match (config.blend.mode, transformed) {
            (EffectMode::Layer, Some(base)) if effected => blend::blend(
                &base,
                &current,
                config.blend.blend_mode,
                config.blend.opacity,
            ),
            _ => current,
        }
    }
}

/// Generator for one effect of one frame, independent of which other effects
/// ran before it.
fn effect_rng(seed: u64, frame_index: usize, effect: EffectId) -> ChaCha8Rng {
    let frame_key = (frame_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ frame_key);
    rng.set_stream(effect.index() as u64);
    rng
}

/// Run a single effect at `intensity` (0.0-1.0).
pub fn apply_effect(
    effect: EffectId,
    frame: &RgbImage,
    intensity: f32,
    basic: &BasicEffectParams,
    rng: &mut ChaCha8Rng,
) -> RgbImage {
    let i = intensity.clamp(0.0, 1.0);
    if i <= 0.0 {
        return frame.clone();
    }

    match effect {
        EffectId::Zoom => geometric::zoom(frame, 1.0 + (basic.zoom_factor - 1.0) * i),
        EffectId::Rotation => geometric::rotate(frame, basic.rotation_angle * i),
        EffectId::ColorGrade => {
            color::color_grade(frame, basic.hue_shift_max * i, 1.0 + 0.3 * i, 1.0)
        }
        EffectId::Brightness => color::brightness(frame, i),
        EffectId::PixelSort => artistic::pixel_sort(frame, i, rng),
        EffectId::Kaleidoscope => artistic::kaleidoscope(frame, i),
        EffectId::WaveDistortion => artistic::wave_distortion(frame, i, rng),
        EffectId::Glitch => corruption::glitch(frame, i, rng),
        EffectId::DataCorruption => corruption::data_corruption(frame, i, rng),
        EffectId::Artifacts => corruption::artifacts(frame, i, rng),
        EffectId::Posterization => stylize::posterize(frame, i),
        EffectId::EdgeDetection => stylize::edge_overlay(frame, i),
        EffectId::Vhs => retro::vhs(frame, i, rng),
        EffectId::ScanLines => retro::scan_lines(frame, i),
        EffectId::Blur => blur::gaussian_blur(frame, i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::BlendMode;
    use image::Rgb;

    fn noise(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = ((x * 53 + y * 97 + x * y) % 251) as u8;
            Rgb([v, v.wrapping_mul(7), 255 - v])
        })
    }

    fn all_enabled() -> ReactivityConfig {
        let mut config = ReactivityConfig::default();
        config.enable_all();
        config
    }

    #[test]
    fn test_idle_snapshot_is_identity() {
        let frame = noise(48, 36);
        let config = all_enabled();
        let out = EffectPipeline::new().apply(&frame, &FrameIntensitySnapshot::idle(3, 0.1), &config);
        assert_eq!(out, frame);
    }

    #[test]
    fn test_every_effect_is_identity_at_zero() {
        let frame = noise(40, 30);
        let basic = BasicEffectParams::default();
        for effect in EffectId::ALL {
            let mut rng = effect_rng(42, 0, effect);
            assert_eq!(apply_effect(effect, &frame, 0.0, &basic, &mut rng), frame, "{effect}");
        }
    }

    #[test]
    fn test_every_effect_changes_frame_at_full_intensity() {
        let frame = noise(48, 48);
        let basic = BasicEffectParams::default();
        for effect in EffectId::ALL {
            let mut rng = effect_rng(42, 0, effect);
            assert_ne!(apply_effect(effect, &frame, 1.0, &basic, &mut rng), frame, "{effect}");
        }
    }

    #[test]
    fn test_disabled_effect_ignores_intensity() {
        let frame = noise(32, 32);
        let config = ReactivityConfig::default();
        assert!(!config.is_enabled(EffectId::Posterization));
        let mut snapshot = FrameIntensitySnapshot::idle(0, 0.0);
        snapshot.set(EffectId::Posterization, 1.0);
        assert_eq!(EffectPipeline::new().apply(&frame, &snapshot, &config), frame);
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let frame = noise(48, 48);
        let mut config = all_enabled();
        let mut snapshot = FrameIntensitySnapshot::idle(12, 0.4);
        snapshot.set(EffectId::DataCorruption, 0.9);
        snapshot.set(EffectId::Glitch, 0.8);

        let pipeline = EffectPipeline::new();
        let a = pipeline.apply(&frame, &snapshot, &config);
        let b = pipeline.apply(&frame, &snapshot, &config);
        assert_eq!(a, b);

        config.seed = 7;
        assert_ne!(pipeline.apply(&frame, &snapshot, &config), a);
    }

    #[test]
    fn test_layer_mode_blends_over_transformed_original() {
        let frame = RgbImage::from_pixel(8, 8, Rgb([100, 150, 200]));
        let mut config = all_enabled();
        config.blend.mode = EffectMode::Layer;
        config.blend.blend_mode = BlendMode::Difference;
        config.blend.opacity = 1.0;

        let mut snapshot = FrameIntensitySnapshot::idle(0, 0.0);
        snapshot.set(EffectId::Posterization, 1.0);
        let out = EffectPipeline::new().apply(&frame, &snapshot, &config);
        // Two levels: 100 -> 0, 150 -> 128, 200 -> 128.
        assert_eq!(*out.get_pixel(3, 3), Rgb([100, 22, 72]));

        let idle = FrameIntensitySnapshot::idle(0, 0.0);
        assert_eq!(EffectPipeline::new().apply(&frame, &idle, &config), frame);
    }
}
