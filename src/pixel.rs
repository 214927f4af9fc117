//! Packed pixel formats understood by the VDP.
//!
//! `RGBA2` stores one pixel per byte as `AABBGGRR`: red in bits 1..0, green in
//! 3..2, blue in 5..4 and alpha in 7..6. Channels are reduced with `v >> 6`
//! and expanded with `v * 85`, so every packed value survives a round trip.
//!
//! `RGBA8` is the VDP's RGBA8888 bitmap layout: four bytes per pixel in R, G,
//! B, A order. The packer binarizes alpha, and a transparent pixel is stored
//! as four zero bytes.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Unpacked 8-bit RGBA.
    Rgba32,
    /// 2 bits per channel, one byte per pixel.
    Rgba2,
    /// RGBA8888 with binary alpha.
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba32 | Self::Rgba8 => 4,
            Self::Rgba2 => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgba32 => "RGBA32",
            Self::Rgba2 => "RGBA2",
            Self::Rgba8 => "RGBA8",
        }
    }

    /// Check that `len` is exactly `width * height * bytes_per_pixel`.
    pub fn check_len(self, len: usize, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension);
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(self.bytes_per_pixel()))
            .unwrap_or(usize::MAX);
        if len != expected {
            return Err(Error::BufferLength {
                format: self.name(),
                len,
                width,
                height,
                expected,
            });
        }
        Ok(())
    }
}

/// A raster whose buffer length always matches its dimensions and format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        format.check_len(data.len(), width, height)?;
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Re-encode into another format, going through RGBA32.
    pub fn convert(&self, format: PixelFormat) -> Frame {
        if format == self.format {
            return self.clone();
        }
        let rgba32 = match self.format {
            PixelFormat::Rgba32 => self.data.clone(),
            PixelFormat::Rgba2 => expand_rgba2(&self.data),
            PixelFormat::Rgba8 => self.data.clone(),
        };
        let data = match format {
            PixelFormat::Rgba32 => rgba32,
            PixelFormat::Rgba2 => pack_rgba2(&rgba32),
            PixelFormat::Rgba8 => pack_rgba8(&rgba32),
        };
        Frame {
            width: self.width,
            height: self.height,
            format,
            data,
        }
    }
}

#[inline]
fn reduce2(v: u8) -> u8 {
    v >> 6
}

/// Pack one RGBA pixel into an `AABBGGRR` byte.
#[inline]
pub fn pack_pixel_rgba2(r: u8, g: u8, b: u8, a: u8) -> u8 {
    (reduce2(a) << 6) | (reduce2(b) << 4) | (reduce2(g) << 2) | reduce2(r)
}

/// Expand one `AABBGGRR` byte to RGBA.
#[inline]
pub fn unpack_pixel_rgba2(v: u8) -> [u8; 4] {
    [
        (v & 0x03) * 85,
        ((v >> 2) & 0x03) * 85,
        ((v >> 4) & 0x03) * 85,
        ((v >> 6) & 0x03) * 85,
    ]
}

fn pack_rgba2(rgba32: &[u8]) -> Vec<u8> {
    rgba32
        .chunks_exact(4)
        .map(|p| pack_pixel_rgba2(p[0], p[1], p[2], p[3]))
        .collect()
}

fn expand_rgba2(packed: &[u8]) -> Vec<u8> {
    packed.iter().flat_map(|&v| unpack_pixel_rgba2(v)).collect()
}

fn pack_rgba8(rgba32: &[u8]) -> Vec<u8> {
    rgba32
        .chunks_exact(4)
        .flat_map(|p| {
            if p[3] >= 128 {
                [p[0], p[1], p[2], 255]
            } else {
                [0, 0, 0, 0]
            }
        })
        .collect()
}

pub fn rgba32_to_rgba2(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    PixelFormat::Rgba32.check_len(buf.len(), width, height)?;
    Ok(pack_rgba2(buf))
}

pub fn rgba2_to_rgba32(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    PixelFormat::Rgba2.check_len(buf.len(), width, height)?;
    Ok(expand_rgba2(buf))
}

pub fn rgba32_to_rgba8(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    PixelFormat::Rgba32.check_len(buf.len(), width, height)?;
    Ok(pack_rgba8(buf))
}

pub fn rgba8_to_rgba32(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    PixelFormat::Rgba8.check_len(buf.len(), width, height)?;
    Ok(buf.to_vec())
}
