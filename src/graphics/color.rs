use super::texture::{hsv_to_rgb, rgb_to_hsv, to_pixel};
use image::RgbImage;

/// Hue rotation (degrees) plus saturation and value multipliers in HSV.
pub fn color_grade(
    frame: &RgbImage,
    hue_shift: f32,
    saturation_mult: f32,
    value_mult: f32,
) -> RgbImage {
    if hue_shift == 0.0 && saturation_mult == 1.0 && value_mult == 1.0 {
        return frame.clone();
    }

    let mut out = frame.clone();
    for pixel in out.pixels_mut() {
        let rgb = [
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
        ];
        let (h, s, v) = rgb_to_hsv(rgb);
        let graded = hsv_to_rgb(
            h + hue_shift,
            (s * saturation_mult).clamp(0.0, 1.0),
            (v * value_mult).clamp(0.0, 1.0),
        );
        *pixel = to_pixel(graded.map(|c| c * 255.0));
    }
    out
}

/// Brighten by up to 2x at full intensity.
pub fn brightness(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    color_grade(frame, 0.0, 1.0, 1.0 + intensity.min(1.0))
}
