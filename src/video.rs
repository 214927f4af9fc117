//! Frame-by-frame video conversion into `.agm` movies, and playback.
//!
//! Per frame: quantize (or reuse an earlier identical frame's indices) →
//! pack RGBA2 → XOR delta against the previous packed frame → compress →
//! append a length-prefixed record. Only the lookback window and one
//! previous packed frame are kept between iterations.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::agm::{MovieReader, MovieWriter};
use crate::delta::{DeltaDecoder, DeltaEncoder};
use crate::dither::DitherMode;
use crate::error::{Error, Result};
use crate::palette::{ColorMetric, Palette};
use crate::pixel::{Frame, PixelFormat};
use crate::remap::average_run_length;
use crate::rle::{Compressor, Rle};
use crate::source::FrameSource;
use crate::{IndexedImage, QuantizeConfig, Quantizer};

/// Configuration for one video conversion.
#[derive(Clone)]
pub struct PipelineConfig {
    pub width: usize,
    pub height: usize,
    pub metric: ColorMetric,
    pub dither: DitherMode,
    /// Number of recent frames whose quantization may be reused. 0 disables reuse.
    pub lookback: usize,
    pub transparent: Option<[u8; 4]>,
    /// XOR each packed frame against its predecessor before compression.
    pub delta: bool,
    /// Write to a temporary file and rename into place on success.
    pub atomic: bool,
    pub compressor: Arc<dyn Compressor + Send + Sync>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("metric", &self.metric)
            .field("dither", &self.dither)
            .field("lookback", &self.lookback)
            .field("transparent", &self.transparent)
            .field("delta", &self.delta)
            .field("atomic", &self.atomic)
            .field("compressor", &self.compressor.name())
            .finish_non_exhaustive()
    }
}

impl PipelineConfig {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            metric: ColorMetric::Rgb,
            dither: DitherMode::None,
            lookback: 0,
            transparent: None,
            delta: true,
            atomic: true,
            compressor: Arc::new(Rle),
            cancel: None,
        }
    }

    pub fn metric(mut self, metric: ColorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn dither(mut self, mode: DitherMode) -> Self {
        self.dither = mode;
        self
    }

    pub fn lookback(mut self, frames: usize) -> Self {
        self.lookback = frames;
        self
    }

    pub fn transparent(mut self, key: Option<[u8; 4]>) -> Self {
        self.transparent = key;
        self
    }

    pub fn delta(mut self, enabled: bool) -> Self {
        self.delta = enabled;
        self
    }

    pub fn atomic(mut self, enabled: bool) -> Self {
        self.atomic = enabled;
        self
    }

    pub fn compressor(mut self, compressor: Arc<dyn Compressor + Send + Sync>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Flag checked between frames; setting it stops the conversion.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn quantize_config(&self) -> QuantizeConfig {
        QuantizeConfig::new()
            .metric(self.metric)
            .dither(self.dither)
            .transparent(self.transparent)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: u64,
    /// Frames whose quantization came from the lookback window.
    pub reused: u64,
    /// Packed RGBA2 bytes before compression.
    pub packed_bytes: u64,
    /// Bytes written to the movie, length prefixes included.
    pub written_bytes: u64,
}

struct LookbackEntry {
    fingerprint: u32,
    raster: Vec<u8>,
    indices: IndexedImage,
}

/// The last N quantized frames, keyed by their source raster.
pub struct LookbackWindow {
    capacity: usize,
    entries: VecDeque<LookbackEntry>,
}

impl LookbackWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices stored for a raster identical to `raster`, newest first.
    ///
    /// A hit becomes the most recent entry, so a frame that keeps recurring
    /// stays in the window.
    pub fn lookup(&mut self, raster: &[u8]) -> Option<&IndexedImage> {
        if self.capacity == 0 {
            return None;
        }
        let fingerprint = crc32fast::hash(raster);
        let pos = self
            .entries
            .iter()
            .rposition(|e| e.fingerprint == fingerprint && e.raster == raster)?;
        let hit = self.entries.remove(pos)?;
        self.entries.push_back(hit);
        self.entries.back().map(|e| &e.indices)
    }

    pub fn insert(&mut self, raster: Vec<u8>, indices: IndexedImage) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LookbackEntry {
            fingerprint: crc32fast::hash(&raster),
            raster,
            indices,
        });
    }
}

/// Turns RGBA32 frames into `.agm` records.
pub struct VideoPipeline {
    config: PipelineConfig,
    quantizer: Quantizer,
    window: LookbackWindow,
    delta: Option<DeltaEncoder>,
    stats: PipelineStats,
}

impl VideoPipeline {
    pub fn new(palette: &Palette, config: PipelineConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(Error::ZeroDimension);
        }
        let quantizer = Quantizer::new(palette, config.quantize_config())?;
        if config.delta && config.transparent.is_some_and(|k| k[3] > 0) {
            warn!("delta frames force alpha on; transparent pixels will play back opaque");
        }
        let frame_len = config.width * config.height;
        Ok(Self {
            window: LookbackWindow::new(config.lookback),
            delta: config.delta.then(|| DeltaEncoder::new(frame_len)),
            quantizer,
            config,
            stats: PipelineStats::default(),
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Convert one RGBA32 frame into a compressed record payload.
    pub fn encode_frame(&mut self, raster: &[u8]) -> Result<Vec<u8>> {
        let (w, h) = (self.config.width, self.config.height);
        PixelFormat::Rgba32.check_len(raster.len(), w, h)?;

        let indices = match self.window.lookup(raster).cloned() {
            Some(stored) => {
                self.stats.reused += 1;
                stored
            }
            None => {
                let fresh = self.quantizer.quantize_bytes(raster, w, h)?;
                self.window.insert(raster.to_vec(), fresh.clone());
                fresh
            }
        };

        let packed = indices.to_rgba2(self.quantizer.palette());

        let body = match self.delta.as_mut() {
            Some(encoder) => encoder.encode(&packed)?,
            None => packed,
        };
        let payload = self.config.compressor.compress(&body)?;

        debug!(
            frame = self.stats.frames,
            packed = body.len(),
            compressed = payload.len(),
            avg_run = average_run_length(&body),
            "encoded frame"
        );
        self.stats.frames += 1;
        self.stats.packed_bytes += body.len() as u64;
        Ok(payload)
    }

    /// Drain `source` into `writer`, one frame at a time.
    pub fn run<S, W>(&mut self, source: &mut S, writer: &mut MovieWriter<W>) -> Result<PipelineStats>
    where
        S: FrameSource + ?Sized,
        W: Write,
    {
        if source.width() != self.config.width || source.height() != self.config.height {
            return Err(Error::BufferLength {
                format: "source",
                len: source.width() * source.height(),
                width: self.config.width,
                height: self.config.height,
                expected: self.config.width * self.config.height,
            });
        }

        while let Some(raster) = source.next_frame()? {
            if let Some(flag) = &self.config.cancel {
                if flag.load(Ordering::Relaxed) {
                    return Err(Error::Cancelled {
                        frames: self.stats.frames,
                    });
                }
            }
            let payload = self.encode_frame(&raster)?;
            writer.write_frame(&payload)?;
        }

        self.stats.written_bytes = writer.bytes_written();
        Ok(self.stats)
    }
}

/// Run a whole conversion from `source` into the movie file at `out`.
pub fn process<S: FrameSource + ?Sized>(
    source: &mut S,
    out: impl AsRef<Path>,
    palette: &Palette,
    config: PipelineConfig,
) -> Result<PipelineStats> {
    let out = out.as_ref();
    let atomic = config.atomic;
    let mut pipeline = VideoPipeline::new(palette, config)?;

    let stats = if atomic {
        let dir = match out.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        let mut writer = MovieWriter::new(std::io::BufWriter::new(tmp));
        let stats = pipeline.run(source, &mut writer)?;
        let tmp = writer
            .finish()?
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        tmp.persist(out).map_err(|e| Error::Io(e.error))?;
        stats
    } else {
        let mut writer = MovieWriter::create(out)?;
        let stats = pipeline.run(source, &mut writer)?;
        writer.finish()?;
        stats
    };

    info!(
        out = %out.display(),
        frames = stats.frames,
        reused = stats.reused,
        packed = stats.packed_bytes,
        written = stats.written_bytes,
        "movie written"
    );
    Ok(stats)
}

/// Decodes `.agm` records back into RGBA2 frames.
pub struct Player<R: Read> {
    reader: MovieReader<R>,
    width: usize,
    height: usize,
    delta: Option<DeltaDecoder>,
    compressor: Arc<dyn Compressor + Send + Sync>,
}

impl Player<std::io::BufReader<std::fs::File>> {
    pub fn open(path: impl AsRef<Path>, width: usize, height: usize, delta: bool) -> Result<Self> {
        Self::new(MovieReader::open(path)?, width, height, delta)
    }
}

impl<R: Read> Player<R> {
    pub fn new(reader: MovieReader<R>, width: usize, height: usize, delta: bool) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(Self {
            reader,
            width,
            height,
            delta: delta.then(|| DeltaDecoder::new(width * height)),
            compressor: Arc::new(Rle),
        })
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor + Send + Sync>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Next absolute RGBA2 frame.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(payload) = self.reader.next_frame()? else {
            return Ok(None);
        };
        let body = self.compressor.decompress(&payload)?;
        PixelFormat::Rgba2.check_len(body.len(), self.width, self.height)?;
        let data = match self.delta.as_mut() {
            Some(decoder) => decoder.decode(&body)?.to_vec(),
            None => body,
        };
        Frame::new(self.width, self.height, PixelFormat::Rgba2, data).map(Some)
    }

    /// Next frame expanded to RGBA32.
    pub fn next_rgba32(&mut self) -> Result<Option<Frame>> {
        Ok(self.next_frame()?.map(|f| f.convert(PixelFormat::Rgba32)))
    }
}

impl<R: Read> Iterator for Player<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}
