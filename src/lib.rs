#![forbid(unsafe_code)]

pub mod agm;
pub mod colorspace;
pub mod convert;
pub mod delta;
pub mod dither;
pub mod error;
pub mod palette;
pub mod pixel;
pub mod remap;
pub mod rle;
pub mod source;
pub mod video;

pub use convert::{
    convert_to_palette, img_to_rgba2, img_to_rgba8, process_mp4, rgba2_to_img, rgba8_to_img,
};
pub use dither::DitherMode;
pub use error::{Error, Result};
pub use palette::{ColorMetric, Palette};
pub use pixel::{Frame, PixelFormat};
pub use rle::{decode as rle_decode, encode as rle_encode};
pub use video::{PipelineConfig, PipelineStats, Player, VideoPipeline};

use std::str::FromStr;

use pixel::pack_pixel_rgba2;
use remap::TransparentKey;

/// Quantization method as named on the command line.
///
/// The first three pick a distance metric for plain nearest-color snapping.
/// The last three dither on top of RGB nearest-color search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Rgb,
    Hsv,
    Cmyk,
    Floyd,
    Bayer,
    Atkinson,
}

impl Method {
    pub fn metric(self) -> ColorMetric {
        match self {
            Self::Hsv => ColorMetric::Hsv,
            Self::Cmyk => ColorMetric::Cmyk,
            Self::Rgb | Self::Floyd | Self::Bayer | Self::Atkinson => ColorMetric::Rgb,
        }
    }

    pub fn dither(self) -> DitherMode {
        match self {
            Self::Floyd => DitherMode::FloydSteinberg,
            Self::Bayer => DitherMode::Bayer,
            Self::Atkinson => DitherMode::Atkinson,
            Self::Rgb | Self::Hsv | Self::Cmyk => DitherMode::None,
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "hsv" => Ok(Self::Hsv),
            "cmyk" => Ok(Self::Cmyk),
            "floyd" => Ok(Self::Floyd),
            "bayer" => Ok(Self::Bayer),
            "atkinson" => Ok(Self::Atkinson),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

/// Configuration for palette quantization.
#[derive(Debug, Clone, Default)]
pub struct QuantizeConfig {
    /// Distance metric for nearest-color search.
    pub metric: ColorMetric,
    /// Dithering mode.
    pub dither: DitherMode,
    /// Transparency key. Ignored unless its alpha is nonzero. Pixels of this
    /// RGB come out with alpha 0, as do source pixels that already have alpha 0.
    pub transparent: Option<[u8; 4]>,
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_method(method: Method) -> Self {
        Self::new().metric(method.metric()).dither(method.dither())
    }

    pub fn metric(mut self, metric: ColorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn dither(mut self, mode: DitherMode) -> Self {
        self.dither = mode;
        self
    }

    pub fn transparent(mut self, key: Option<[u8; 4]>) -> Self {
        self.transparent = key;
        self
    }

    fn active_key(&self) -> Option<TransparentKey> {
        self.transparent
            .filter(|k| k[3] > 0)
            .map(|k| TransparentKey { rgb: [k[0], k[1], k[2]] })
    }
}

/// Palette indices for one image, with the alpha each pixel keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width: usize,
    height: usize,
    indices: Vec<u8>,
    alpha: Vec<u8>,
}

impl IndexedImage {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the palette index for each pixel.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Per-pixel alpha: source alpha, or 0 for transparent pixels.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Expand to an RGBA32 buffer: palette RGB with the pixel's alpha.
    pub fn to_rgba32(&self, palette: &Palette) -> Vec<u8> {
        let entries = palette.entries_rgba();
        self.indices
            .iter()
            .zip(&self.alpha)
            .flat_map(|(&i, &a)| {
                let e = entries[i as usize];
                [e[0], e[1], e[2], a]
            })
            .collect()
    }

    /// Pack straight to RGBA2.
    pub fn to_rgba2(&self, palette: &Palette) -> Vec<u8> {
        let entries = palette.entries_rgba();
        self.indices
            .iter()
            .zip(&self.alpha)
            .map(|(&i, &a)| {
                let e = entries[i as usize];
                pack_pixel_rgba2(e[0], e[1], e[2], a)
            })
            .collect()
    }
}

/// A palette prepared for repeated quantization under one configuration.
#[derive(Debug, Clone)]
pub struct Quantizer {
    palette: Palette,
    config: QuantizeConfig,
    key: Option<TransparentKey>,
}

impl Quantizer {
    pub fn new(palette: &Palette, config: QuantizeConfig) -> Result<Self> {
        Ok(Self {
            palette: palette.clone(),
            key: config.active_key(),
            config,
        })
    }

    /// The palette indices refer to.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn config(&self) -> &QuantizeConfig {
        &self.config
    }

    /// Quantize an RGBA image to palette indices.
    pub fn quantize(
        &self,
        pixels: &[rgb::RGBA<u8>],
        width: usize,
        height: usize,
    ) -> Result<IndexedImage> {
        validate_inputs(pixels.len(), width, height)?;

        let transparent = remap::transparency_mask(pixels, self.key);
        let indices = dither::dither_image(
            pixels,
            width,
            height,
            &self.palette,
            self.config.metric,
            self.config.dither,
            &transparent,
        );

        Ok(IndexedImage {
            width,
            height,
            indices,
            alpha: remap::output_alpha(pixels, &transparent),
        })
    }

    /// Quantize a raw RGBA32 byte buffer.
    pub fn quantize_bytes(&self, rgba32: &[u8], width: usize, height: usize) -> Result<IndexedImage> {
        PixelFormat::Rgba32.check_len(rgba32.len(), width, height)?;
        self.quantize(&rgba_pixels(rgba32), width, height)
    }

    /// Quantize and return the palette-snapped RGBA32 preview.
    pub fn quantize_to_rgba32(&self, rgba32: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
        Ok(self.quantize_bytes(rgba32, width, height)?.to_rgba32(&self.palette))
    }
}

/// Quantization result: indices plus the palette they refer to.
#[derive(Debug, Clone)]
pub struct QuantizeResult {
    palette: Palette,
    image: IndexedImage,
}

impl QuantizeResult {
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn image(&self) -> &IndexedImage {
        &self.image
    }

    /// Get the palette index for each pixel.
    pub fn indices(&self) -> &[u8] {
        self.image.indices()
    }

    /// Per-pixel alpha; 0 marks a transparent pixel.
    pub fn alpha(&self) -> &[u8] {
        self.image.alpha()
    }

    /// Palette-snapped RGBA32 preview.
    pub fn to_rgba32(&self) -> Vec<u8> {
        self.image.to_rgba32(&self.palette)
    }
}

/// Quantize an RGBA image against `palette` in one call.
pub fn quantize(
    pixels: &[rgb::RGBA<u8>],
    width: usize,
    height: usize,
    palette: &Palette,
    config: &QuantizeConfig,
) -> Result<QuantizeResult> {
    let quantizer = Quantizer::new(palette, config.clone())?;
    let image = quantizer.quantize(pixels, width, height)?;
    Ok(QuantizeResult {
        palette: quantizer.palette,
        image,
    })
}

/// View an RGBA32 byte buffer as pixels.
pub fn rgba_pixels(rgba32: &[u8]) -> Vec<rgb::RGBA<u8>> {
    rgba32
        .chunks_exact(4)
        .map(|c| rgb::RGBA {
            r: c[0],
            g: c[1],
            b: c[2],
            a: c[3],
        })
        .collect()
}

fn validate_inputs(pixel_count: usize, width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::ZeroDimension);
    }
    if pixel_count != width * height {
        return Err(Error::BufferLength {
            format: "pixel",
            len: pixel_count,
            width,
            height,
            expected: width * height,
        });
    }
    Ok(())
}
