//! Pixel sampling and color helpers shared by the effect transforms.

use image::{Rgb, RgbImage};

/// How coordinates outside the frame are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Repeat the edge pixel.
    Replicate,
    /// Mirror the frame, edge pixel included (`cba|abc|cba`).
    Reflect,
}

fn resolve(coord: i64, len: u32, border: BorderMode) -> u32 {
    let len = len as i64;
    match border {
        BorderMode::Replicate => coord.clamp(0, len - 1) as u32,
        BorderMode::Reflect => {
            let period = 2 * len;
            let c = coord.rem_euclid(period);
            (if c < len { c } else { period - 1 - c }) as u32
        }
    }
}

pub fn pixel_at(img: &RgbImage, x: i64, y: i64, border: BorderMode) -> Rgb<u8> {
    let (w, h) = img.dimensions();
    *img.get_pixel(resolve(x, w, border), resolve(y, h, border))
}

/// Bilinear sample at a sub-pixel position, channels in 0.0-255.0.
pub fn sample_bilinear(img: &RgbImage, x: f32, y: f32, border: BorderMode) -> [f32; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = pixel_at(img, x0, y0, border);
    let p10 = pixel_at(img, x0 + 1, y0, border);
    let p01 = pixel_at(img, x0, y0 + 1, border);
    let p11 = pixel_at(img, x0 + 1, y0 + 1, border);

    let mut out = [0.0f32; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        *value = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Build a new frame by sampling `img` at the source position returned for
/// every destination pixel.
pub fn remap<F>(img: &RgbImage, border: BorderMode, source_of: F) -> RgbImage
where
    F: Fn(u32, u32) -> (f32, f32),
{
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let (sx, sy) = source_of(x, y);
        to_pixel(sample_bilinear(img, sx, sy, border))
    })
}

pub fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

pub fn to_pixel(rgb: [f32; 3]) -> Rgb<u8> {
    Rgb([to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2])])
}

/// `a * (1 - t) + b * t`, per channel.
pub fn mix(a: &RgbImage, b: &RgbImage, t: f32) -> RgbImage {
    let mut out = a.clone();
    for (dst, src) in out.pixels_mut().zip(b.pixels()) {
        for c in 0..3 {
            dst[c] = to_u8(dst[c] as f32 * (1.0 - t) + src[c] as f32 * t);
        }
    }
    out
}

/// Move one channel horizontally by `dx` pixels, replicating the edge.
pub fn shift_channel(img: &mut RgbImage, channel: usize, dx: i64) {
    if dx == 0 {
        return;
    }
    let source = img.clone();
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            let p = pixel_at(&source, x as i64 - dx, y as i64, BorderMode::Replicate);
            img.get_pixel_mut(x, y)[channel] = p[channel];
        }
    }
}

/// Rec. 601 luma, 0.0-255.0.
pub fn luma(p: &Rgb<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

/// RGB in 0.0-1.0 to (hue degrees, saturation, value).
pub fn rgb_to_hsv(rgb: [f32; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= 0.0 { 0.0 } else { delta / max };
    (hue, saturation, max)
}

pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}
