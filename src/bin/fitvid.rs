//! Command-line front end over the compression library.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use fitvid::error::MediaError;
use fitvid::{CancelToken, CompressionOptions, probe_video};

#[derive(Parser)]
#[command(name = "fitvid", version, about = "Compress videos into a byte-size budget")]
struct Cli {
    /// Emit results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print duration, dimensions, and byte size of a video.
    Probe { input: PathBuf },

    /// Re-encode a video until it fits the size budget.
    Compress {
        input: PathBuf,

        /// Destination file; extension is replaced to match the chosen codec.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Size budget in MB.
        #[arg(long, default_value_t = 10.0)]
        max_size_mb: f64,

        /// Ceiling on the longest output dimension.
        #[arg(long, default_value_t = 1920)]
        max_dimension: u32,
    },

    /// Extract a JPEG thumbnail as a base64 data URL.
    Thumbnail {
        input: PathBuf,

        /// Capture position in seconds.
        #[arg(long, default_value_t = 2.0)]
        time: f64,

        /// Write the raw JPEG here instead of printing the data URL.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<(), MediaError> {
    match cli.command {
        Commands::Probe { input } => {
            let meta = probe_video(&input)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&meta).map_err(|e| MediaError::from(e.to_string()))?);
            } else {
                println!(
                    "{}x{}, {:.2}s, {} bytes, audio: {}",
                    meta.width,
                    meta.height,
                    meta.duration,
                    meta.size,
                    if meta.has_audio { "yes" } else { "no" }
                );
            }
            Ok(())
        }
        Commands::Compress {
            input,
            output,
            max_size_mb,
            max_dimension,
        } => {
            let options = CompressionOptions {
                max_size_mb,
                max_width_or_height: max_dimension,
            };
            let progress: Arc<dyn Fn(f64) + Send + Sync> = Arc::new(|p| {
                log::info!(target: "fitvid::cli", "progress: {:.0}%", p * 100.0);
            });
            let compressed = fitvid::compress::compress_video_with_progress(
                &input,
                &options,
                &CancelToken::new(),
                Some(progress),
            )?;

            let dest = match output {
                Some(path) => path.with_extension(compressed.extension),
                None => input.with_file_name(format!(
                    "{}-compressed.{}",
                    input
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("video"),
                    compressed.extension
                )),
            };
            let compressed = compressed.persist(&dest)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&compressed).map_err(|e| MediaError::from(e.to_string()))?);
            } else {
                println!(
                    "{} ({:.1}MB, {})",
                    compressed.path.display(),
                    compressed.size_bytes as f64 / (1024.0 * 1024.0),
                    compressed.mime_type
                );
            }
            Ok(())
        }
        Commands::Thumbnail { input, time, output } => {
            let data_url = fitvid::generate_thumbnail(&input, time)?;
            match output {
                Some(path) => {
                    let bytes = fitvid::storage::decode_data_url(&data_url)?;
                    std::fs::write(&path, bytes)?;
                    println!("{}", path.display());
                }
                None => println!("{}", data_url),
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
