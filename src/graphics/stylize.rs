use super::texture::{luma, mix, pixel_at, BorderMode};
use image::{Rgb, RgbImage};

/// Gradient magnitude above which a pixel counts as an edge.
const EDGE_THRESHOLD: f32 = 100.0;

/// Color levels per channel, from 256 at intensity 0 down to 2 at intensity 1.
pub fn posterize_levels(intensity: f32) -> u32 {
    let i = intensity.clamp(0.0, 1.0);
    256f32.powf(1.0 - i).round().clamp(2.0, 256.0) as u32
}

pub fn posterize(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let levels = posterize_levels(intensity);
    if levels >= 256 {
        return frame.clone();
    }

    let step = 256.0 / levels as f32;
    let mut out = frame.clone();
    for value in out.iter_mut() {
        *value = ((*value as f32 / step).floor() * step).min(255.0) as u8;
    }
    out
}

/// Dark outlines over the frame, blended at up to 40%.
pub fn edge_overlay(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let lum = |x: i64, y: i64| luma(&pixel_at(frame, x, y, BorderMode::Replicate));

    let edges = RgbImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let gx = (lum(x + 1, y - 1) + 2.0 * lum(x + 1, y) + lum(x + 1, y + 1))
            - (lum(x - 1, y - 1) + 2.0 * lum(x - 1, y) + lum(x - 1, y + 1));
        let gy = (lum(x - 1, y + 1) + 2.0 * lum(x, y + 1) + lum(x + 1, y + 1))
            - (lum(x - 1, y - 1) + 2.0 * lum(x, y - 1) + lum(x + 1, y - 1));
        if (gx * gx + gy * gy).sqrt() >= EDGE_THRESHOLD {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });

    mix(frame, &edges, intensity.min(1.0) * 0.4)
}
