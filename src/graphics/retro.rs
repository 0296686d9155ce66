use super::color::color_grade;
use super::texture::{remap, shift_channel, to_u8, BorderMode};
use image::RgbImage;
use rand::Rng;
use rand_distr::{Distribution, Normal};

fn scale_rows(img: &mut RgbImage, start: u32, end: u32, factor: f32) {
    let (w, h) = img.dimensions();
    for y in start..end.min(h) {
        for x in 0..w {
            let p = img.get_pixel_mut(x, y);
            for c in 0..3 {
                p[c] = to_u8(p[c] as f32 * factor);
            }
        }
    }
}

/// Analog tape look: tracking lines, color bleed, tape noise and faded color.
pub fn vhs<R: Rng>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    let mut out = frame.clone();
    if intensity <= 0.0 {
        return out;
    }
    let i = intensity.min(1.0);
    let (_, h) = frame.dimensions();

    if i > 0.2 {
        let lines = (2.0 + i * 15.0) as u32;
        let spacing = h / (lines + 1);
        let thickness = ((i * 3.0) as u32).max(1);
        if spacing > 0 {
            for n in 1..=lines {
                let y = n * spacing;
                scale_rows(&mut out, y, y + thickness, 0.6);
            }
        }
    }

    if i > 0.3 {
        let bleed = (i * 8.0) as i64;
        shift_channel(&mut out, 0, bleed);
        shift_channel(&mut out, 2, -bleed);
    }

    if i > 0.4 {
        if let Ok(normal) = Normal::new(0.0f32, i * 20.0) {
            for value in out.iter_mut() {
                *value = to_u8(*value as f32 + normal.sample(rng));
            }
        }
    }

    if i > 0.5 {
        out = color_grade(&out, 0.0, 1.0 - i * 0.3, 1.0);
    }

    out
}

/// CRT scan lines, with barrel curvature above half intensity.
pub fn scan_lines(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let i = intensity.min(1.0);
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();

    let spacing = ((3.0 - i * 2.0) as u32).max(2);
    let darken = 0.7 - i * 0.3;
    let mut y = 0;
    while y < h {
        scale_rows(&mut out, y, y + spacing, darken);
        y += spacing * 2;
    }

    if i > 0.5 {
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let max_r = (cx * cx + cy * cy).sqrt().max(1.0);
        let curved = remap(&out, BorderMode::Replicate, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let r = (dx * dx + dy * dy).sqrt() / max_r;
            let distortion = 1.0 + i * 0.1 * r * r;
            (dx / distortion + cx, dy / distortion + cy)
        });
        out = curved;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_intensity_is_identity() {
        let img = RgbImage::from_fn(30, 20, |x, y| Rgb([(x * 8) as u8, (y * 12) as u8, 77]));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert_eq!(vhs(&img, 0.0, &mut rng), img);
        assert_eq!(scan_lines(&img, 0.0), img);
    }

    #[test]
    fn test_scan_lines_darken_alternate_bands() {
        let img = RgbImage::from_pixel(8, 12, Rgb([200, 200, 200]));
        let out = scan_lines(&img, 0.4);
        // spacing 2: rows 0-1 dark, 2-3 untouched
        assert!(out.get_pixel(4, 0)[0] < 200);
        assert_eq!(out.get_pixel(4, 2)[0], 200);
    }

    #[test]
    fn test_vhs_reproducible() {
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        let a = vhs(&img, 0.9, &mut ChaCha8Rng::seed_from_u64(8));
        let b = vhs(&img, 0.9, &mut ChaCha8Rng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, img);
    }
}
