use image::{imageops, RgbImage};

/// Sigma at full intensity.
pub const MAX_SIGMA: f32 = 4.0;

/// Gaussian blur with sigma `4 * intensity`. Sigmas too small to move a pixel
/// value are skipped.
pub fn gaussian_blur(frame: &RgbImage, intensity: f32) -> RgbImage {
    let sigma = MAX_SIGMA * intensity.clamp(0.0, 1.0);
    if sigma < 0.25 {
        return frame.clone();
    }
    imageops::blur(frame, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_blur_softens_hard_edge() {
        let img = RgbImage::from_fn(32, 8, |x, _| {
            if x < 16 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        assert_eq!(gaussian_blur(&img, 0.0), img);

        let blurred = gaussian_blur(&img, 1.0);
        let edge = blurred.get_pixel(16, 4)[0];
        assert!(edge > 0 && edge < 255);
    }
}
