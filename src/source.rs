//! Decoded-frame sources for the video pipeline.
//!
//! Container demuxing, decoding and scaling happen outside this crate. A
//! source hands over one RGBA32 raster at a time, already at the target size.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pixel::PixelFormat;

pub trait FrameSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Next RGBA32 frame in presentation order, `None` once the stream ends.
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Frames held in memory. Used for stills and tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    width: usize,
    height: usize,
    frames: VecDeque<Vec<u8>>,
}

impl MemorySource {
    pub fn new(width: usize, height: usize, frames: Vec<Vec<u8>>) -> Result<Self> {
        for f in &frames {
            PixelFormat::Rgba32.check_len(f.len(), width, height)?;
        }
        Ok(Self {
            width,
            height,
            frames: frames.into(),
        })
    }
}

impl FrameSource for MemorySource {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.frames.pop_front())
    }
}

/// Decodes a video file through an `ffmpeg` child process.
///
/// ffmpeg scales the source to cover `width`x`height`, center-crops, and
/// writes raw RGBA frames to its stdout, which is read one frame at a time.
/// Its stderr is drained on a separate thread so a chatty decoder cannot
/// block on a full pipe while frames are being read.
pub struct FfmpegSource {
    program: String,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    width: usize,
    height: usize,
    finished: bool,
}

impl FfmpegSource {
    pub const DEFAULT_PROGRAM: &'static str = "ffmpeg";

    pub fn open(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self> {
        Self::open_with(Self::DEFAULT_PROGRAM, path, width, height)
    }

    /// Like [`FfmpegSource::open`] with an explicit ffmpeg binary.
    pub fn open_with(
        program: &str,
        path: impl AsRef<Path>,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension);
        }
        let path = path.as_ref();
        let filter = format!(
            "scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height}"
        );

        debug!(program, path = %path.display(), %filter, "spawning decoder");
        let mut child = Command::new(program)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-vf", &filter, "-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ExternalTool {
                tool: program.to_string(),
                message: format!("failed to start: {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Error::ExternalTool {
            tool: program.to_string(),
            message: "stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        Ok(Self {
            program: program.to_string(),
            child,
            stdout,
            stderr,
            width,
            height,
            finished: false,
        })
    }

    /// Reap the child and turn a nonzero exit into an error.
    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let stderr = self.collect_stderr();
        if !status.success() {
            return Err(Error::ExternalTool {
                tool: self.program.clone(),
                message: format!("{status}: {}", stderr.trim()),
            });
        }
        Ok(())
    }

    fn collect_stderr(&mut self) -> String {
        match self.stderr.take().map(JoinHandle::join) {
            Some(Ok(text)) => text,
            Some(Err(_)) => {
                warn!(program = %self.program, "stderr reader panicked");
                String::new()
            }
            None => String::new(),
        }
    }
}

impl FrameSource for FfmpegSource {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }

        let mut frame = vec![0u8; self.width * self.height * PixelFormat::Rgba32.bytes_per_pixel()];
        let mut filled = 0;
        while filled < frame.len() {
            match self.stdout.read(&mut frame[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if filled == frame.len() {
            return Ok(Some(frame));
        }
        self.finish()?;
        if filled == 0 {
            Ok(None)
        } else {
            Err(Error::ExternalTool {
                tool: self.program.clone(),
                message: format!("stream ended mid-frame ({filled} of {} bytes)", frame.len()),
            })
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.child.kill() {
                warn!(program = %self.program, "failed to stop decoder: {e}");
            }
            let _ = self.child.wait();
            self.collect_stderr();
        }
    }
}
