//! huh - Convert images to and from the HUH container format
//!
//! A command-line tool for converting between HUH containers and common
//! raster formats, and for inspecting container files.

use clap::{Parser, Subcommand};
use huh::{decode_container, decode_with, encode_with, EncodeOptions, Metadata, Progress};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const HUH_EXTENSION: &str = "huh";
const JPEG_QUALITY: u8 = 90;
const PROGRESS_BAR_WIDTH: usize = 50;

#[derive(Parser)]
#[command(name = "huh")]
#[command(version)]
#[command(about = "Convert images to and from the HUH container format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between image formats and HUH, chosen by file extension
    Convert {
        /// Input file (.huh, PNG, JPEG, GIF, WebP)
        input: PathBuf,

        /// Output file (.huh, .png, .jpg, .jpeg, .gif, .webp)
        output: PathBuf,

        /// Extra metadata stored in a .huh output (repeatable)
        #[arg(short, long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,

        /// DEFLATE level for .huh output (0-9)
        #[arg(short, long, default_value = "9")]
        level: u32,

        /// Do not draw a progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the layout, dimensions and metadata of a .huh file
    Info {
        /// Input .huh file
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            meta,
            level,
            quiet,
        } => {
            let from_huh = is_huh(&input);
            let to_huh = is_huh(&output);
            eprintln!("Converting '{}' to '{}'", input.display(), output.display());

            match (from_huh, to_huh) {
                (true, true) => return Err("cannot convert from HUH to HUH".into()),
                (false, true) => convert_to_huh(&input, &output, meta, level, quiet)?,
                (true, false) => {
                    let mut bar = ProgressBar::new(quiet);
                    let (img, _) = decode_with(&input, &mut |p: Progress| bar.draw(p))
                        .map_err(|e| format!("Failed to decode '{}': {}", input.display(), e))?;
                    save_raster(img, &output)?;
                }
                (false, false) => {
                    let img = image::open(&input)
                        .map_err(|e| format!("Failed to open '{}': {}", input.display(), e))?;
                    save_raster(img.to_rgba8(), &output)?;
                }
            }

            eprintln!(
                "Successfully converted '{}' to '{}'",
                input.display(),
                output.display()
            );
        }

        Commands::Info { input } => {
            let file = File::open(&input)
                .map_err(|e| format!("Failed to open '{}': {}", input.display(), e))?;
            let container = decode_container(BufReader::new(file), &mut huh::NoProgress)
                .map_err(|e| format!("Failed to decode '{}': {}", input.display(), e))?;

            let mut stdout = io::stdout().lock();
            writeln!(stdout, "File:       {}", input.display())?;
            writeln!(stdout, "Version:    {}", container.version.as_u8())?;
            writeln!(
                stdout,
                "Dimensions: {}x{}",
                container.width, container.height
            )?;
            if container.metadata.is_empty() {
                writeln!(stdout, "Metadata:   (none)")?;
            } else {
                writeln!(stdout, "Metadata:")?;
                for (key, value) in &container.metadata {
                    writeln!(stdout, "  - {key}: {value}")?;
                }
            }
        }
    }

    Ok(())
}

fn convert_to_huh(
    input: &Path,
    output: &Path,
    meta: Vec<(String, String)>,
    level: u32,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let img = image::open(input)
        .map_err(|e| format!("Failed to open '{}': {}", input.display(), e))?;

    let mut metadata = Metadata::new();
    if let Some(name) = input.file_name() {
        metadata.insert("source_file".into(), name.to_string_lossy().into());
    }
    metadata.extend(meta);

    let opts = EncodeOptions {
        compression_level: level.min(9),
    };
    let mut bar = ProgressBar::new(quiet);
    encode_with(&img, &metadata, output, &opts, &mut |p: Progress| bar.draw(p))
        .map_err(|e| format!("Failed to encode '{}': {}", output.display(), e))?;
    Ok(())
}

fn is_huh(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(HUH_EXTENSION))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Writes `img` in the raster format implied by `path`'s extension.
fn save_raster(img: RgbaImage, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| format!("unsupported output format: '{}'", path.display()))?;

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(img).into_rgb8();
            let writer = BufWriter::new(File::create(path)?);
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, JPEG_QUALITY))?;
        }
        ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP => {
            img.save_with_format(path, format)?;
        }
        other => return Err(format!("unsupported output format: {other:?}").into()),
    }
    Ok(())
}

/// Progress bar drawn on stderr.
struct ProgressBar {
    quiet: bool,
}

impl ProgressBar {
    fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn draw(&mut self, progress: Progress) {
        // Tiny images finish before a bar would be readable
        if self.quiet || progress.total <= 100 {
            return;
        }
        let fraction = progress.fraction();
        let filled = ((fraction * PROGRESS_BAR_WIDTH as f32) as usize).min(PROGRESS_BAR_WIDTH);
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r[{}{}] {:5.1}%",
            "█".repeat(filled),
            " ".repeat(PROGRESS_BAR_WIDTH - filled),
            fraction * 100.0
        );
        if progress.is_complete() {
            let _ = writeln!(stderr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_huh() {
        assert!(is_huh(Path::new("a.huh")));
        assert!(is_huh(Path::new("dir/A.HUH")));
        assert!(!is_huh(Path::new("a.png")));
        assert!(!is_huh(Path::new("huh")));
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("author=me=you").unwrap(),
            ("author".to_string(), "me=you".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_parses_convert() {
        let cli = Cli::try_parse_from([
            "huh", "convert", "in.png", "out.huh", "-m", "a=b", "--meta", "c=d", "-l", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert { meta, level, quiet, .. } => {
                assert_eq!(meta.len(), 2);
                assert_eq!(level, 3);
                assert!(!quiet);
            }
            Commands::Info { .. } => panic!("expected convert"),
        }
    }

    #[test]
    fn test_encode_error_names_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        RgbaImage::new(2, 2).save(&input).unwrap();
        let output = dir.path().join("missing").join("out.huh");

        let err = convert_to_huh(&input, &output, Vec::new(), 9, true).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Failed to encode"), "{message}");
        assert!(message.contains(&output.display().to_string()), "{message}");
        assert!(!output.exists());
    }

    #[test]
    fn test_unsupported_raster_extension() {
        let dir = std::env::temp_dir().join("huh_cli_unsupported_ext");
        let err = save_raster(RgbaImage::new(1, 1), &dir.with_extension("xyz")).unwrap_err();
        assert!(err.to_string().contains("unsupported output format"));
    }
}
