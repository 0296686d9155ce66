use super::texture::{remap, BorderMode};
use image::RgbImage;

/// Centre zoom by `factor`; 1.0 or less leaves the frame untouched.
pub fn zoom(frame: &RgbImage, factor: f32) -> RgbImage {
    if factor <= 1.0 || !factor.is_finite() {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;

    remap(frame, BorderMode::Replicate, |x, y| {
        let sx = (x as f32 + 0.5 - cx) / factor + cx - 0.5;
        let sy = (y as f32 + 0.5 - cy) / factor + cy - 0.5;
        (sx, sy)
    })
}

/// Rotate counter-clockwise by `degrees` about the frame centre, mirroring
/// content into the uncovered corners.
pub fn rotate(frame: &RgbImage, degrees: f32) -> RgbImage {
    if degrees.abs() < 0.01 || !degrees.is_finite() {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let (sin, cos) = degrees.to_radians().sin_cos();

    remap(frame, BorderMode::Reflect, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        (cx + cos * dx - sin * dy, cy + sin * dx + cos * dy)
    })
}
