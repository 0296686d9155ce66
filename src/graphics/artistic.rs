use super::texture::{mix, remap, BorderMode};
use image::{Rgb, RgbImage};
use rand::seq::index;
use rand::Rng;
use std::f32::consts::PI;

/// Mirror segments for a kaleidoscope intensity, 2-8 and non-decreasing.
pub fn kaleidoscope_segments(intensity: f32) -> u32 {
    let i = intensity.clamp(0.0, 1.0);
    (2.0 + (6.0 * i).floor()).clamp(2.0, 8.0) as u32
}

fn brightness_key(p: &Rgb<u8>) -> u8 {
    p[0].max(p[1]).max(p[2])
}

/// Sort strips of pixels by brightness, along rows or columns.
pub fn pixel_sort<R: Rng>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let i = intensity.min(1.0);
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();
    if w == 0 || h == 0 {
        return out;
    }

    let strips = if i < 0.3 {
        ((i * 5.0) as u32).max(1)
    } else {
        ((i * 15.0) as u32).max(1)
    };
    let coverage = (i * 3.0).min(1.0);
    let sort_columns = rng.gen_bool(0.5);

    // Along columns: each horizontal strip has its columns sorted top to bottom.
    let (strip_axis_len, line_count) = if sort_columns { (h, w) } else { (w, h) };
    let strip_len = strip_axis_len / strips;
    if strip_len < 2 {
        return out;
    }
    let lines_to_sort = ((line_count as f32 * coverage) as usize).clamp(1, line_count as usize);

    for s in 0..strips {
        let start = s * strip_len;
        let end = ((s + 1) * strip_len).min(strip_axis_len);
        let chosen = index::sample(rng, line_count as usize, lines_to_sort);

        for line in chosen.iter() {
            let line = line as u32;
            let mut pixels: Vec<Rgb<u8>> = (start..end)
                .map(|p| {
                    if sort_columns {
                        *frame.get_pixel(line, p)
                    } else {
                        *frame.get_pixel(p, line)
                    }
                })
                .collect();
            pixels.sort_by_key(brightness_key);
            for (p, pixel) in (start..end).zip(pixels) {
                if sort_columns {
                    out.put_pixel(line, p, pixel);
                } else {
                    out.put_pixel(p, line, pixel);
                }
            }
        }
    }

    out
}

/// Radial mirror around the centre, blended over the frame at `0.7 * intensity`.
pub fn kaleidoscope(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let i = intensity.min(1.0);
    let (w, h) = frame.dimensions();
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let segment = 2.0 * PI / kaleidoscope_segments(i) as f32;

    let mirrored = remap(frame, BorderMode::Replicate, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let radius = (dx * dx + dy * dy).sqrt();
        let angle = dy.atan2(dx).rem_euclid(2.0 * PI);
        let index = (angle / segment).floor();
        let mut local = angle - index * segment;
        if index as i64 % 2 == 1 {
            local = segment - local;
        }
        (cx + radius * local.cos(), cy + radius * local.sin())
    });

    mix(frame, &mirrored, i * 0.7)
}

/// Sine displacement of up to 30 px horizontally and 15 px vertically.
pub fn wave_distortion<R: Rng>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let i = intensity.min(1.0);
    let amplitude = i * 30.0;
    let frequency = 0.02 + i * 0.05;
    let phase_x = rng.gen::<f32>() * PI;
    let phase_y = rng.gen::<f32>() * PI;

    remap(frame, BorderMode::Replicate, |x, y| {
        let sx = x as f32 + amplitude * (y as f32 * frequency + phase_x).sin();
        let sy = y as f32 + amplitude * 0.5 * (x as f32 * frequency + phase_y).cos();
        (sx, sy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn noise(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = ((x * 37 + y * 91) % 251) as u8;
            Rgb([v, v.wrapping_mul(3), 255 - v])
        })
    }

    #[test]
    fn test_segments_monotonic_and_bounded() {
        let mut last = 0;
        for step in 0..=100 {
            let s = kaleidoscope_segments(step as f32 / 100.0);
            assert!((2..=8).contains(&s));
            assert!(s >= last);
            last = s;
        }
        assert_eq!(kaleidoscope_segments(0.0), 2);
        assert_eq!(kaleidoscope_segments(1.0), 8);
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let img = noise(24, 16);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(pixel_sort(&img, 0.0, &mut rng), img);
        assert_eq!(kaleidoscope(&img, 0.0), img);
        assert_eq!(wave_distortion(&img, 0.0, &mut rng), img);
    }

    #[test]
    fn test_pixel_sort_keeps_pixel_multiset() {
        let img = noise(32, 32);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sorted = pixel_sort(&img, 1.0, &mut rng);
        assert_ne!(sorted, img);
        let mut before: Vec<[u8; 3]> = img.pixels().map(|p| p.0).collect();
        let mut after: Vec<[u8; 3]> = sorted.pixels().map(|p| p.0).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_seeded_effects_are_reproducible() {
        let img = noise(20, 20);
        let a = wave_distortion(&img, 0.8, &mut ChaCha8Rng::seed_from_u64(3));
        let b = wave_distortion(&img, 0.8, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
