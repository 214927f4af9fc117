use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use agonquant::{ColorMetric, DitherMode, Method};

#[derive(Parser)]
#[command(name = "agonquant")]
#[command(version, about = "Palette quantization and .agm movie tool for the Agon VDP", long_about = None)]
pub struct Cli {
    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Quantize an image to a palette and write the snapped image
    Convert {
        src: PathBuf,
        dst: PathBuf,
        #[command(flatten)]
        quant: QuantArgs,
    },

    /// Quantize an image and write headerless packed pixels
    Pack {
        src: PathBuf,
        dst: PathBuf,
        #[arg(short, long, value_enum, default_value_t = PackedFormat::Rgba2)]
        format: PackedFormat,
        #[command(flatten)]
        quant: QuantArgs,
    },

    /// Expand headerless packed pixels into an image
    Unpack {
        src: PathBuf,
        dst: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        #[arg(short, long, value_enum, default_value_t = PackedFormat::Rgba2)]
        format: PackedFormat,
    },

    /// Convert a video into an .agm movie (decoded through ffmpeg)
    Encode {
        src: PathBuf,
        dst: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// GIMP palette file
        #[arg(short, long)]
        palette: PathBuf,
        /// Nearest-color metric
        #[arg(long, default_value = "rgb", value_parser = parse_metric)]
        base: ColorMetric,
        /// Dithering applied on top of the metric
        #[arg(long, default_value = "none", value_parser = parse_dither)]
        dither: DitherMode,
        /// Recent frames whose quantization may be reused
        #[arg(long, default_value_t = 0)]
        lookback: usize,
        /// Transparency key as R,G,B,A (ignored when A is 0)
        #[arg(long, value_parser = parse_rgba)]
        transparent: Option<[u8; 4]>,
        /// Store absolute frames instead of XOR deltas
        #[arg(long)]
        no_delta: bool,
        /// Payload compressor (rle is the only one the player hardware reads)
        #[arg(long, value_enum, default_value_t = Codec::Rle)]
        codec: Codec,
        /// ffmpeg binary to decode with
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,
    },

    /// Decode an .agm movie into numbered PNG frames
    Play {
        src: PathBuf,
        /// Output directory
        out_dir: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// The movie holds absolute frames
        #[arg(long)]
        no_delta: bool,
        #[arg(long, value_enum, default_value_t = Codec::Rle)]
        codec: Codec,
    },

    /// Run-length encode or decode a file
    Rle {
        #[arg(value_enum)]
        direction: Direction,
        src: PathBuf,
        dst: PathBuf,
    },

    /// Inspect or relabel a GIMP palette
    Palette {
        src: PathBuf,
        /// Rewrite the palette here, naming entries after the nearest color in --names
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Palette whose entry names label the output
        #[arg(long)]
        names: Option<PathBuf>,
        /// Name header for the rewritten palette
        #[arg(long)]
        name: Option<String>,
        /// Columns header for the rewritten palette
        #[arg(long)]
        columns: Option<u32>,
    },
}

#[derive(Args)]
pub struct QuantArgs {
    /// GIMP palette file
    #[arg(short, long)]
    pub palette: PathBuf,
    /// rgb, hsv, cmyk, floyd, bayer or atkinson
    #[arg(short, long, default_value = "rgb", value_parser = parse_method)]
    pub method: Method,
    /// Transparency key as R,G,B,A (ignored when A is 0)
    #[arg(long, value_parser = parse_rgba)]
    pub transparent: Option<[u8; 4]>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PackedFormat {
    Rgba2,
    Rgba8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Codec {
    Rle,
    Deflate,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Direction {
    Encode,
    Decode,
}

fn parse_method(s: &str) -> Result<Method, String> {
    s.parse().map_err(|e: agonquant::Error| e.to_string())
}

fn parse_metric(s: &str) -> Result<ColorMetric, String> {
    s.parse().map_err(|e: agonquant::Error| e.to_string())
}

fn parse_dither(s: &str) -> Result<DitherMode, String> {
    s.parse().map_err(|e: agonquant::Error| e.to_string())
}

/// `R,G,B,A` with decimal components.
pub fn parse_rgba(s: &str) -> Result<[u8; 4], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected R,G,B,A, got `{s}`"));
    }
    let mut out = [0u8; 4];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("`{part}` is not a value in 0..=255"))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_keys() {
        assert_eq!(parse_rgba("255, 0,255,255"), Ok([255, 0, 255, 255]));
        assert!(parse_rgba("1,2,3").is_err());
        assert!(parse_rgba("1,2,3,256").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
