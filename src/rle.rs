//! Byte run-length codec used for `.agm` frame payloads.
//!
//! The stream is a sequence of packets, each led by a control byte:
//!
//! - `0x00..=0x7F`: `n + 1` literal bytes follow.
//! - `0x80..=0xFF`: the single following byte repeats `(n & 0x7F) + 3` times.
//!
//! Runs shorter than three bytes are cheaper as literals, so they never get a
//! repeat packet. Worst case overhead is one byte per 128 input bytes.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, Result};

const MAX_LITERAL: usize = 128;
const MIN_RUN: usize = 3;
const MAX_RUN: usize = 0x7F + MIN_RUN;
const REPEAT_FLAG: u8 = 0x80;

/// Compress `data`.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + 2);
    let mut literal_start = 0;
    let mut i = 0;

    while i < data.len() {
        let value = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == value && run < MAX_RUN {
            run += 1;
        }

        if run >= MIN_RUN {
            flush_literals(&mut out, &data[literal_start..i]);
            out.push(REPEAT_FLAG | (run - MIN_RUN) as u8);
            out.push(value);
            i += run;
            literal_start = i;
        } else {
            i += run;
        }
    }
    flush_literals(&mut out, &data[literal_start..]);

    out
}

fn flush_literals(out: &mut Vec<u8>, mut literals: &[u8]) {
    while !literals.is_empty() {
        let n = literals.len().min(MAX_LITERAL);
        out.push((n - 1) as u8);
        out.extend_from_slice(&literals[..n]);
        literals = &literals[n..];
    }
}

/// Decompress a stream produced by [`encode`].
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let control = data[i];
        i += 1;
        if control & REPEAT_FLAG != 0 {
            let value = *data.get(i).ok_or(Error::RleTruncated { offset: i })?;
            let run = (control & !REPEAT_FLAG) as usize + MIN_RUN;
            out.resize(out.len() + run, value);
            i += 1;
        } else {
            let n = control as usize + 1;
            let literals = data
                .get(i..i + n)
                .ok_or(Error::RleTruncated { offset: data.len() })?;
            out.extend_from_slice(literals);
            i += n;
        }
    }

    Ok(out)
}

/// A frame payload compressor.
///
/// `.agm` files always use [`Rle`]; other implementations exist to compare
/// compression ratios on the same frames.
pub trait Compressor {
    fn name(&self) -> &'static str;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Rle;

impl Compressor for Rle {
    fn name(&self) -> &'static str {
        "rle"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(encode(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        decode(data)
    }
}

/// zlib stream, for comparison against [`Rle`].
#[derive(Debug, Clone, Copy)]
pub struct Deflate {
    pub level: u32,
}

impl Default for Deflate {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Compressor for Deflate {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}
