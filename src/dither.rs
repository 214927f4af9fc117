use std::str::FromStr;

use crate::error::Error;
use crate::palette::{ColorMetric, Palette};
use crate::remap::remap_pixels;

/// Dithering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// No dithering — nearest color only.
    #[default]
    None,
    /// Serpentine Floyd-Steinberg error diffusion.
    FloydSteinberg,
    /// 4x4 ordered dither. Stateless per pixel.
    Bayer,
    /// Serpentine Atkinson diffusion; a quarter of the error is dropped.
    Atkinson,
}

impl FromStr for DitherMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "floyd" | "floyd-steinberg" | "floydsteinberg" => Ok(Self::FloydSteinberg),
            "bayer" => Ok(Self::Bayer),
            "atkinson" => Ok(Self::Atkinson),
            _ => Err(Error::UnknownDither(s.to_string())),
        }
    }
}

/// One error diffusion tap: (dx, dy, weight). `dx` is mirrored on right-to-left rows.
type Tap = (isize, usize, f32);

const FLOYD_STEINBERG: &[Tap] = &[
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

// Six taps of 1/8: only 3/4 of the error is propagated.
const ATKINSON: &[Tap] = &[
    (1, 0, 1.0 / 8.0),
    (2, 0, 1.0 / 8.0),
    (-1, 1, 1.0 / 8.0),
    (0, 1, 1.0 / 8.0),
    (1, 1, 1.0 / 8.0),
    (0, 2, 1.0 / 8.0),
];

const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Threshold amplitude in 0..=255 units. One step of a 2-bit channel is 85,
/// so the offset stays within one palette level for 64-color palettes.
const BAYER_SPREAD: f32 = 64.0;

/// Ordered-dither offset for pixel (x, y), centered on zero.
#[inline]
pub fn bayer_offset(x: usize, y: usize) -> f32 {
    let m = BAYER_4X4[y & 3][x & 3] as f32;
    ((m + 0.5) / 16.0 - 0.5) * BAYER_SPREAD
}

/// Quantize pixels to palette indices with the given dither mode.
///
/// Pixels set in `transparent` get a plain nearest match and are excluded
/// from error diffusion in both directions.
pub fn dither_image(
    pixels: &[rgb::RGBA<u8>],
    width: usize,
    height: usize,
    palette: &Palette,
    metric: ColorMetric,
    mode: DitherMode,
    transparent: &[bool],
) -> Vec<u8> {
    match mode {
        DitherMode::None => remap_pixels(pixels, palette, metric),
        DitherMode::Bayer => ordered_dither(pixels, width, palette, metric, transparent),
        DitherMode::FloydSteinberg => {
            diffuse(pixels, width, height, palette, metric, transparent, FLOYD_STEINBERG)
        }
        DitherMode::Atkinson => {
            diffuse(pixels, width, height, palette, metric, transparent, ATKINSON)
        }
    }
}

fn ordered_dither(
    pixels: &[rgb::RGBA<u8>],
    width: usize,
    palette: &Palette,
    metric: ColorMetric,
    transparent: &[bool],
) -> Vec<u8> {
    pixels
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let off = if transparent[i] { 0.0 } else { bayer_offset(i % width, i / width) };
            let color = [
                (p.r as f32 + off).clamp(0.0, 255.0),
                (p.g as f32 + off).clamp(0.0, 255.0),
                (p.b as f32 + off).clamp(0.0, 255.0),
            ];
            palette.nearest(color, metric)
        })
        .collect()
}

/// Serpentine error diffusion with an arbitrary kernel.
fn diffuse(
    pixels: &[rgb::RGBA<u8>],
    width: usize,
    height: usize,
    palette: &Palette,
    metric: ColorMetric,
    transparent: &[bool],
    kernel: &[Tap],
) -> Vec<u8> {
    let entries = palette.entries_rgba();

    // Working buffer, error accumulates into it
    let mut work: Vec<[f32; 3]> = pixels
        .iter()
        .map(|p| [p.r as f32, p.g as f32, p.b as f32])
        .collect();

    let mut indices = vec![0u8; pixels.len()];

    for y in 0..height {
        let rtl = y % 2 == 1;
        for step in 0..width {
            let x = if rtl { width - 1 - step } else { step };
            let idx = y * width + x;

            if transparent[idx] {
                let p = pixels[idx];
                indices[idx] = palette.nearest([p.r as f32, p.g as f32, p.b as f32], metric);
                continue;
            }

            let current = [
                work[idx][0].clamp(0.0, 255.0),
                work[idx][1].clamp(0.0, 255.0),
                work[idx][2].clamp(0.0, 255.0),
            ];
            let chosen = palette.nearest(current, metric);
            indices[idx] = chosen;

            let e = entries[chosen as usize];
            let err = [
                current[0] - e[0] as f32,
                current[1] - e[1] as f32,
                current[2] - e[2] as f32,
            ];

            for &(dx, dy, weight) in kernel {
                let dx = if rtl { -dx } else { dx };
                let tx = x as isize + dx;
                let ty = y + dy;
                if tx < 0 || tx as usize >= width || ty >= height {
                    continue;
                }
                let ti = ty * width + tx as usize;
                if transparent[ti] {
                    continue;
                }
                work[ti][0] += err[0] * weight;
                work[ti][1] += err[1] * weight;
                work[ti][2] += err[2] * weight;
            }
        }
    }

    indices
}
