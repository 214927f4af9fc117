mod args;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::util::SubscriberInitExt;

use agonquant::agm::MovieReader;
use agonquant::convert::save_rgba32;
use agonquant::rle::{Compressor, Deflate, Rle};
use agonquant::source::FfmpegSource;
use agonquant::{Palette, PipelineConfig, Player, video};

use crate::args::{Cli, Codec, Commands, Direction, PackedFormat};

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

fn compressor(codec: Codec) -> Arc<dyn Compressor + Send + Sync> {
    match codec {
        Codec::Rle => Arc::new(Rle),
        Codec::Deflate => Arc::new(Deflate::default()),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert { src, dst, quant } => {
            agonquant::convert_to_palette(&src, &dst, &quant.palette, quant.method, quant.transparent)
                .with_context(|| format!("converting {}", src.display()))?;
        }

        Commands::Pack {
            src,
            dst,
            format,
            quant,
        } => {
            let (w, h) = match format {
                PackedFormat::Rgba2 => {
                    agonquant::img_to_rgba2(&src, &dst, &quant.palette, quant.method, quant.transparent)
                }
                PackedFormat::Rgba8 => {
                    agonquant::img_to_rgba8(&src, &dst, &quant.palette, quant.method, quant.transparent)
                }
            }
            .with_context(|| format!("packing {}", src.display()))?;
            println!("{} {w}x{h}", dst.display());
        }

        Commands::Unpack {
            src,
            dst,
            width,
            height,
            format,
        } => {
            match format {
                PackedFormat::Rgba2 => agonquant::rgba2_to_img(&src, &dst, width, height),
                PackedFormat::Rgba8 => agonquant::rgba8_to_img(&src, &dst, width, height),
            }
            .with_context(|| format!("unpacking {}", src.display()))?;
        }

        Commands::Encode {
            src,
            dst,
            width,
            height,
            palette,
            base,
            dither,
            lookback,
            transparent,
            no_delta,
            codec,
            ffmpeg,
        } => {
            let palette = Palette::load(&palette)
                .with_context(|| format!("loading palette {}", palette.display()))?;
            let config = PipelineConfig::new(width, height)
                .metric(base)
                .dither(dither)
                .lookback(lookback)
                .transparent(transparent)
                .delta(!no_delta)
                .compressor(compressor(codec));
            let mut source = FfmpegSource::open_with(&ffmpeg, &src, width, height)
                .with_context(|| format!("opening {}", src.display()))?;
            let stats = video::process(&mut source, &dst, &palette, config)
                .with_context(|| format!("encoding {}", src.display()))?;
            println!(
                "{} frames ({} reused), {} packed bytes -> {} bytes",
                stats.frames, stats.reused, stats.packed_bytes, stats.written_bytes
            );
        }

        Commands::Play {
            src,
            out_dir,
            width,
            height,
            no_delta,
            codec,
        } => {
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            let reader = MovieReader::open(&src).with_context(|| format!("opening {}", src.display()))?;
            let mut player = Player::new(reader, width, height, !no_delta)?.with_compressor(compressor(codec));
            let mut count = 0usize;
            while let Some(frame) = player
                .next_rgba32()
                .with_context(|| format!("decoding frame {count}"))?
            {
                let path = out_dir.join(format!("frame_{count:05}.png"));
                save_rgba32(&path, frame.data(), width, height)?;
                count += 1;
            }
            info!(frames = count, "playback written");
            println!("{count} frames");
        }

        Commands::Rle { direction, src, dst } => {
            let data = std::fs::read(&src).with_context(|| format!("reading {}", src.display()))?;
            let out = match direction {
                Direction::Encode => agonquant::rle_encode(&data),
                Direction::Decode => agonquant::rle_decode(&data)?,
            };
            std::fs::write(&dst, &out).with_context(|| format!("writing {}", dst.display()))?;
            println!("{} -> {} bytes", data.len(), out.len());
        }

        Commands::Palette {
            src,
            output,
            names,
            name,
            columns,
        } => {
            let palette = Palette::load(&src).with_context(|| format!("loading {}", src.display()))?;
            match output {
                Some(out) => {
                    let names = names
                        .as_deref()
                        .map(Palette::load)
                        .transpose()
                        .context("loading names palette")?;
                    let name = name
                        .or_else(|| palette.name().map(str::to_string))
                        .unwrap_or_else(|| stem(&out));
                    let columns = columns.or(palette.columns()).unwrap_or(16);
                    palette.save(&out, &name, columns, names.as_ref())?;
                }
                None => {
                    if names.is_some() {
                        bail!("--names only applies when rewriting with --output");
                    }
                    println!("name:    {}", palette.name().unwrap_or("-"));
                    println!("columns: {}", agonquant::palette::get_columns(&src)?.map_or("-".to_string(), |c| c.to_string()));
                    println!("colors:  {}", palette.len());
                    for (i, e) in palette.entries().iter().enumerate() {
                        println!("{i:3}: {:3} {:3} {:3}  {}", e[0], e[1], e[2], palette.entry_name(i).unwrap_or(""));
                    }
                }
            }
        }
    }
    Ok(())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Palette".to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
