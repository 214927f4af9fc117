use crate::palette::{ColorMetric, Palette};

/// Source color that marks a pixel as transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparentKey {
    pub rgb: [u8; 3],
}

impl TransparentKey {
    #[inline]
    pub fn matches(&self, p: &rgb::RGBA<u8>) -> bool {
        p.r == self.rgb[0] && p.g == self.rgb[1] && p.b == self.rgb[2]
    }
}

/// Pixels that come out fully transparent: alpha 0 in the source, or the key color.
///
/// Transparency is tracked beside the indices, never as a palette entry, so a
/// full 256-color palette still accepts a key.
pub fn transparency_mask(pixels: &[rgb::RGBA<u8>], key: Option<TransparentKey>) -> Vec<bool> {
    pixels
        .iter()
        .map(|p| p.a == 0 || key.is_some_and(|k| k.matches(p)))
        .collect()
}

/// Output alpha per pixel: 0 where masked, the source alpha elsewhere.
pub fn output_alpha(pixels: &[rgb::RGBA<u8>], transparent: &[bool]) -> Vec<u8> {
    pixels
        .iter()
        .zip(transparent)
        .map(|(p, &t)| if t { 0 } else { p.a })
        .collect()
}

/// Map pixels to their nearest palette index under `metric`, without dithering.
pub fn remap_pixels(pixels: &[rgb::RGBA<u8>], palette: &Palette, metric: ColorMetric) -> Vec<u8> {
    pixels
        .iter()
        .map(|p| palette.nearest([p.r as f32, p.g as f32, p.b as f32], metric))
        .collect()
}

/// Count the number of runs in an index stream.
pub fn count_runs(indices: &[u8]) -> usize {
    if indices.is_empty() {
        return 0;
    }
    1 + indices.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Average run length.
pub fn average_run_length(indices: &[u8]) -> f32 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.len() as f32 / count_runs(indices) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_palette() -> Palette {
        Palette::from_rgb(&[[0, 0, 0], [85, 85, 85], [170, 170, 170], [255, 255, 255]]).unwrap()
    }

    fn px(v: u8) -> rgb::RGBA<u8> {
        rgb::RGBA { r: v, g: v, b: v, a: 255 }
    }

    #[test]
    fn snaps_to_nearest_grey() {
        let palette = grey_palette();
        let indices = remap_pixels(&[px(0), px(80), px(200), px(250)], &palette, ColorMetric::Rgb);
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn key_and_zero_alpha_are_masked() {
        let key = TransparentKey { rgb: [255, 0, 255] };
        let pixels = [
            rgb::RGBA { r: 255, g: 0, b: 255, a: 255 },
            rgb::RGBA { r: 255, g: 255, b: 255, a: 0 },
            rgb::RGBA { r: 255, g: 255, b: 255, a: 100 },
            px(255),
        ];
        let mask = transparency_mask(&pixels, Some(key));
        assert_eq!(mask, vec![true, true, false, false]);
        assert_eq!(output_alpha(&pixels, &mask), vec![0, 0, 100, 255]);
        assert_eq!(transparency_mask(&pixels, None), vec![false, true, false, false]);
    }

    #[test]
    fn count_runs_basic() {
        assert_eq!(count_runs(&[]), 0);
        assert_eq!(count_runs(&[1]), 1);
        assert_eq!(count_runs(&[1, 1, 1]), 1);
        assert_eq!(count_runs(&[1, 2, 3]), 3);
        assert_eq!(count_runs(&[1, 1, 2, 2, 3, 3]), 3);
        assert_eq!(average_run_length(&[1, 1, 2, 2]), 2.0);
    }
}
