use super::texture::{shift_channel, to_u8};
use image::{Rgb, RgbImage};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Copy a `bw x bh` block from `(sx, sy)` to `(dx, dy)`, clipped to the frame.
fn copy_block(img: &mut RgbImage, sx: u32, sy: u32, dx: u32, dy: u32, bw: u32, bh: u32) {
    let (w, h) = img.dimensions();
    let source = img.clone();
    for y in 0..bh {
        for x in 0..bw {
            let (src_x, src_y, dst_x, dst_y) = (sx + x, sy + y, dx + x, dy + y);
            if src_x < w && src_y < h && dst_x < w && dst_y < h {
                img.put_pixel(dst_x, dst_y, *source.get_pixel(src_x, src_y));
            }
        }
    }
}

/// Channel splits and displaced horizontal slices.
///
/// Below 0.3 the frame is unchanged; the red split, slice displacement and
/// chromatic aberration switch on at 0.3, 0.5 and 0.4.
pub fn glitch<R: Rng>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    let mut out = frame.clone();
    if intensity <= 0.0 {
        return out;
    }
    let i = intensity.min(1.0);
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return out;
    }

    if i > 0.3 {
        let shift = (i * 20.0) as i64;
        shift_channel(&mut out, 0, rng.gen_range(-shift..=shift));
    }

    if i > 0.5 {
        let slices = (i * 10.0) as u32;
        let max_height = (i * 20.0) as u32 + 1;
        for _ in 0..slices {
            let y = rng.gen_range(0..h);
            let height = rng.gen_range(1..=max_height);
            let x = rng.gen_range(0..w.saturating_sub(50).max(1));
            let width = rng.gen_range(10..50);
            let offset: i64 = rng.gen_range(-20..=20);
            let src_x = x as i64 + offset;
            if src_x >= 0 && src_x + (width as i64) < w as i64 {
                copy_block(&mut out, src_x as u32, y, x, y, width, height);
            }
        }
    }

    if i > 0.4 {
        let aberration = (i * 5.0) as i64;
        shift_channel(&mut out, 1, -aberration);
        shift_channel(&mut out, 2, aberration);
    }

    out
}

/// Noise blocks, displaced blocks, channel swaps and torn scan lines.
pub fn data_corruption<R: Rng>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    let mut out = frame.clone();
    if intensity <= 0.1 {
        return out;
    }
    let i = intensity.min(1.0);
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return out;
    }

    let blocks = ((i * 20.0) as u32).max(1);
    let size = (10.0 + i * 40.0) as u32;
    for _ in 0..blocks {
        let x = rng.gen_range(0..w.saturating_sub(size).max(1));
        let y = rng.gen_range(0..h.saturating_sub(size).max(1));
        let kind: f32 = rng.gen();

        if kind < 0.3 {
            for py in y..(y + size).min(h) {
                for px in x..(x + size).min(w) {
                    out.put_pixel(px, py, Rgb([rng.gen(), rng.gen(), rng.gen()]));
                }
            }
        } else if kind < 0.6 {
            let span = size as i64;
            let src_x = (x as i64 + rng.gen_range(-span..span)).clamp(0, w.saturating_sub(size) as i64);
            let src_y = (y as i64 + rng.gen_range(-span..span)).clamp(0, h.saturating_sub(size) as i64);
            copy_block(&mut out, src_x as u32, src_y as u32, x, y, size, size);
        } else {
            let mut order = [0usize, 1, 2];
            order.shuffle(rng);
            for py in y..(y + size).min(h) {
                for px in x..(x + size).min(w) {
                    let p = *out.get_pixel(px, py);
                    out.put_pixel(px, py, Rgb([p[order[0]], p[order[1]], p[order[2]]]));
                }
            }
        }
    }

    if i > 0.4 {
        let lines = (2.0 + i * 8.0) as u32;
        let line_height = ((i * 15.0) as u32).max(1);
        for _ in 0..lines {
            let y = rng.gen_range(0..h);
            let width = rng.gen_range((w / 4).max(1)..=w);
            let x = rng.gen_range(0..(w - width).max(1));
            let src_x = (x as i64 + rng.gen_range(-50..=50)).clamp(0, (w - width) as i64);
            copy_block(&mut out, src_x as u32, y, x, y, width, line_height);
        }
    }

    out
}

/// Compression-style damage: quantized blocks, noise, banding and pixelation.
pub fn artifacts<R: Rng>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let i = intensity.min(1.0);
    let (w, h) = frame.dimensions();
    let mut values: Vec<f32> = frame.as_raw().iter().map(|&v| v as f32).collect();
    let stride = w as usize * 3;

    if i > 0.2 {
        let block = (4.0 + i * 12.0) as u32;
        let probability = (0.2 + i * 0.6) as f64;
        let levels = ((256.0 / (1.0 + i * 15.0)) as u32).max(2);
        let step = 256.0 / levels as f32;
        for by in (0..h).step_by(block as usize) {
            for bx in (0..w).step_by(block as usize) {
                if !rng.gen_bool(probability) {
                    continue;
                }
                for y in by..(by + block).min(h) {
                    let row = y as usize * stride;
                    for x in bx..(bx + block).min(w) {
                        for c in 0..3 {
                            let v = &mut values[row + x as usize * 3 + c];
                            *v = (*v / step).floor() * step;
                        }
                    }
                }
            }
        }
    }

    if i > 0.15 {
        if let Ok(normal) = Normal::new(0.0f32, i * 25.0) {
            for v in values.iter_mut() {
                *v = (*v + normal.sample(rng)).clamp(0.0, 255.0);
            }
        }
    }

    if i > 0.3 {
        let lines = (2.0 + i * 8.0) as u32;
        for _ in 0..lines {
            let y = rng.gen_range(0..h.saturating_sub(3).max(1));
            let height = rng.gen_range(1..4u32);
            let factor = if rng.gen_bool(0.5) { 0.7 } else { 1.3 };
            for row in y..(y + height).min(h) {
                let start = row as usize * stride;
                for v in &mut values[start..start + stride] {
                    *v = (*v * factor).min(255.0);
                }
            }
        }
    }

    if i > 0.4 {
        let levels = ((256.0 / (1.0 + i * 8.0)) as u32).max(8);
        let step = 256.0 / levels as f32;
        for v in values.iter_mut() {
            *v = (*v / step).floor() * step;
        }
    }

    let bytes: Vec<u8> = values.into_iter().map(to_u8).collect();
    let mut out = RgbImage::from_raw(w, h, bytes).unwrap_or_else(|| frame.clone());

    if i > 0.7 {
        let cell = (2.0 + (i - 0.7) * 2.0) as u32;
        let source = out.clone();
        for y in 0..h {
            for x in 0..w {
                out.put_pixel(x, y, *source.get_pixel(x - x % cell, y - y % cell));
            }
        }
    }

    out
}
