//! Temporal XOR delta for RGBA2 frames.
//!
//! The two alpha bits of every delta byte are forced on, so unchanged pixels
//! encode as a constant `0xC0` and a delta byte is never zero. Alpha does not
//! survive the transform: decoded pixels are always opaque.

use crate::error::{Error, Result};

/// Bits forced on in every delta byte.
pub const DELTA_MASK: u8 = 0xC0;

fn check_lengths(current: usize, previous: usize) -> Result<()> {
    if current != previous {
        return Err(Error::FrameLengthMismatch { current, previous });
    }
    Ok(())
}

/// `(curr ^ prev) | 0xC0`, byte by byte.
pub fn delta(curr: &[u8], prev: &[u8]) -> Result<Vec<u8>> {
    check_lengths(curr.len(), prev.len())?;
    Ok(curr
        .iter()
        .zip(prev)
        .map(|(&c, &p)| (c ^ p) | DELTA_MASK)
        .collect())
}

/// Rebuild a frame from its delta against `prev`. Alpha bits come back set.
pub fn undelta(delta: &[u8], prev: &[u8]) -> Result<Vec<u8>> {
    check_lengths(delta.len(), prev.len())?;
    Ok(delta
        .iter()
        .zip(prev)
        .map(|(&d, &p)| ((d ^ p) & !DELTA_MASK) | DELTA_MASK)
        .collect())
}

/// The synthetic predecessor of the first frame in a stream.
pub fn initial_frame(len: usize) -> Vec<u8> {
    vec![DELTA_MASK; len]
}

/// Stateful encoder holding the previous packed frame.
#[derive(Debug, Clone)]
pub struct DeltaEncoder {
    prev: Vec<u8>,
}

impl DeltaEncoder {
    pub fn new(frame_len: usize) -> Self {
        Self {
            prev: initial_frame(frame_len),
        }
    }

    pub fn encode(&mut self, curr: &[u8]) -> Result<Vec<u8>> {
        let out = delta(curr, &self.prev)?;
        self.prev.copy_from_slice(curr);
        Ok(out)
    }
}

/// Stateful decoder holding the last reconstructed frame.
#[derive(Debug, Clone)]
pub struct DeltaDecoder {
    prev: Vec<u8>,
}

impl DeltaDecoder {
    pub fn new(frame_len: usize) -> Self {
        Self {
            prev: initial_frame(frame_len),
        }
    }

    pub fn decode(&mut self, delta: &[u8]) -> Result<&[u8]> {
        let frame = undelta(delta, &self.prev)?;
        self.prev = frame;
        Ok(&self.prev)
    }
}
