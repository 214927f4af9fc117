//! File-level entry points: still images in and out of packed formats, and
//! video files into `.agm` movies.

use std::path::Path;

use tracing::info;

use crate::dither::DitherMode;
use crate::error::{Error, Result};
use crate::palette::{ColorMetric, Palette};
use crate::pixel::{self, PixelFormat};
use crate::source::FfmpegSource;
use crate::video::{self, PipelineConfig, PipelineStats};
use crate::{Method, QuantizeConfig, Quantizer};

/// Decode any supported image into RGBA32 bytes and its dimensions.
pub fn load_rgba32(path: impl AsRef<Path>) -> Result<(Vec<u8>, usize, usize)> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    Ok((img.into_raw(), w, h))
}

/// Encode RGBA32 bytes as an image, format chosen by extension.
pub fn save_rgba32(path: impl AsRef<Path>, rgba32: &[u8], width: usize, height: usize) -> Result<()> {
    let path = path.as_ref();
    PixelFormat::Rgba32.check_len(rgba32.len(), width, height)?;
    image::save_buffer(
        path,
        rgba32,
        width as u32,
        height as u32,
        image::ExtendedColorType::Rgba8,
    )
    .map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })
}

fn quantize_file(
    src: &Path,
    palette_file: &Path,
    method: Method,
    transparent: Option<[u8; 4]>,
) -> Result<(Vec<u8>, usize, usize)> {
    let palette = Palette::load(palette_file)?;
    let (rgba, w, h) = load_rgba32(src)?;
    let quantizer = Quantizer::new(&palette, QuantizeConfig::from_method(method).transparent(transparent))?;
    let snapped = quantizer.quantize_to_rgba32(&rgba, w, h)?;
    Ok((snapped, w, h))
}

/// Quantize an image to a palette and write the palette-snapped image.
pub fn convert_to_palette(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    palette_file: impl AsRef<Path>,
    method: Method,
    transparent: Option<[u8; 4]>,
) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    let (snapped, w, h) = quantize_file(src, palette_file.as_ref(), method, transparent)?;
    save_rgba32(dst, &snapped, w, h)?;
    info!(src = %src.display(), dst = %dst.display(), ?method, "converted to palette");
    Ok(())
}

fn img_to_packed(
    src: &Path,
    dst: &Path,
    palette_file: &Path,
    method: Method,
    transparent: Option<[u8; 4]>,
    format: PixelFormat,
) -> Result<(usize, usize)> {
    let (snapped, w, h) = quantize_file(src, palette_file, method, transparent)?;
    let packed = match format {
        PixelFormat::Rgba2 => pixel::rgba32_to_rgba2(&snapped, w, h)?,
        PixelFormat::Rgba8 => pixel::rgba32_to_rgba8(&snapped, w, h)?,
        PixelFormat::Rgba32 => snapped,
    };
    std::fs::write(dst, &packed)?;
    info!(src = %src.display(), dst = %dst.display(), width = w, height = h, format = format.name(), "packed image");
    Ok((w, h))
}

/// Quantize an image and write raw RGBA2 bytes. Returns the dimensions,
/// which the headerless output does not record.
pub fn img_to_rgba2(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    palette_file: impl AsRef<Path>,
    method: Method,
    transparent: Option<[u8; 4]>,
) -> Result<(usize, usize)> {
    img_to_packed(
        src.as_ref(),
        dst.as_ref(),
        palette_file.as_ref(),
        method,
        transparent,
        PixelFormat::Rgba2,
    )
}

/// Quantize an image and write raw RGBA8 bytes.
pub fn img_to_rgba8(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    palette_file: impl AsRef<Path>,
    method: Method,
    transparent: Option<[u8; 4]>,
) -> Result<(usize, usize)> {
    img_to_packed(
        src.as_ref(),
        dst.as_ref(),
        palette_file.as_ref(),
        method,
        transparent,
        PixelFormat::Rgba8,
    )
}

fn packed_to_img(src: &Path, dst: &Path, width: usize, height: usize, format: PixelFormat) -> Result<()> {
    let packed = std::fs::read(src)?;
    let rgba = match format {
        PixelFormat::Rgba2 => pixel::rgba2_to_rgba32(&packed, width, height)?,
        PixelFormat::Rgba8 => pixel::rgba8_to_rgba32(&packed, width, height)?,
        PixelFormat::Rgba32 => {
            PixelFormat::Rgba32.check_len(packed.len(), width, height)?;
            packed
        }
    };
    save_rgba32(dst, &rgba, width, height)
}

/// Expand a raw RGBA2 file into an image.
pub fn rgba2_to_img(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    width: usize,
    height: usize,
) -> Result<()> {
    packed_to_img(src.as_ref(), dst.as_ref(), width, height, PixelFormat::Rgba2)
}

/// Expand a raw RGBA8 file into an image.
pub fn rgba8_to_img(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    width: usize,
    height: usize,
) -> Result<()> {
    packed_to_img(src.as_ref(), dst.as_ref(), width, height, PixelFormat::Rgba8)
}

/// Convert a video into an `.agm` movie.
///
/// The palette is loaded before the decoder starts, so an unusable palette
/// fails without any decoding work.
#[allow(clippy::too_many_arguments)]
pub fn process_mp4(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    width: usize,
    height: usize,
    palette_file: impl AsRef<Path>,
    base: ColorMetric,
    dither: DitherMode,
    lookback: usize,
    transparent: Option<[u8; 4]>,
) -> Result<PipelineStats> {
    let palette = Palette::load(palette_file)?;
    let config = PipelineConfig::new(width, height)
        .metric(base)
        .dither(dither)
        .lookback(lookback)
        .transparent(transparent);
    let mut source = FfmpegSource::open(src, width, height)?;
    video::process(&mut source, dst, &palette, config)
}
