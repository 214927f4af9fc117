use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("{format} buffer length {len} does not match dimensions {width}x{height} (expected {expected})")]
    BufferLength {
        format: &'static str,
        len: usize,
        width: usize,
        height: usize,
        expected: usize,
    },

    #[error("frame buffers differ in length: {current} vs {previous}")]
    FrameLengthMismatch { current: usize, previous: usize },

    #[error("{path}: missing `GIMP Palette` header")]
    PaletteHeader { path: String },

    #[error("palette contains no colors")]
    EmptyPalette,

    #[error("palette has {0} entries, at most 256 are addressable")]
    PaletteTooLarge(usize),

    #[error("unknown quantization method `{0}`")]
    UnknownMethod(String),

    #[error("unknown dither mode `{0}`")]
    UnknownDither(String),

    #[error("rle stream truncated at offset {offset}")]
    RleTruncated { offset: usize },

    #[error("movie record truncated after {frames} complete frames")]
    Truncated { frames: u64 },

    #[error("frame payload of {0} bytes does not fit a u32 length prefix")]
    FrameTooLarge(usize),

    #[error("external decoder `{tool}` failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("conversion cancelled after {frames} frames")]
    Cancelled { frames: u64 },

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
