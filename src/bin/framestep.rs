use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framestep::{
    Direction, FfmpegLogLevel, FrameOutputOptions, FrameSource, FrameStepper, PixelFormat,
    ProgressCallback, ProgressInfo, StepOutcome, StepperOptions, VideoFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framestep info input.mp4 --exact --json\n  framestep index input.mp4 --json > frames.json\n  framestep dump input.mp4 --out frames --every 5 --progress\n  framestep dump input.mp4 --out frames --start 100 --end 50 --reverse\n  framestep frame input.mp4 --number 42 --out frame_42.png\n  framestep completions zsh > _framestep";

#[derive(Debug, Parser)]
#[command(
    name = "framestep",
    version,
    about = "Step through video files one decoded frame at a time",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show progress for long scans and dumps.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Pixel format of saved frames (rgb8, rgba8, gray8).
    #[arg(long, global = true)]
    pixel_format: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print video stream information.
    #[command(
        visible_alias = "probe",
        after_help = "Examples:\n  framestep info input.mp4\n  framestep info input.mp4 --exact --json"
    )]
    Info {
        /// Input video path.
        input: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Also count frames by stepping through the whole stream.
        #[arg(long)]
        exact: bool,
    },

    /// Build the frame table and print the time of every frame.
    Index {
        /// Input video path.
        input: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Step through a range of frames and save them as images.
    #[command(
        after_help = "Examples:\n  framestep dump input.mp4 --out frames\n  framestep dump input.mp4 --out frames --start 10 --end 20 --ext jpg"
    )]
    Dump {
        /// Input video path.
        input: PathBuf,
        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,
        /// First frame of the range (inclusive).
        #[arg(long)]
        start: Option<u64>,
        /// Last frame of the range (inclusive). Defaults to the last frame.
        #[arg(long)]
        end: Option<u64>,
        /// Save every Nth frame of the range.
        #[arg(long, default_value_t = 1)]
        every: u64,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
        /// Walk the range from its last frame to its first.
        #[arg(long)]
        reverse: bool,
        /// Build the frame table before stepping.
        #[arg(long)]
        precalc: bool,
    },

    /// Save a single frame by number.
    Frame {
        /// Input video path.
        input: PathBuf,
        /// Zero-based frame number.
        #[arg(long)]
        number: u64,
        /// Output image path.
        #[arg(long)]
        out: PathBuf,
        /// Build the frame table before seeking.
        #[arg(long)]
        precalc: bool,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_pixel_format(value: &str) -> Option<PixelFormat> {
    match value.to_ascii_lowercase().as_str() {
        "rgb8" | "rgb" => Some(PixelFormat::Rgb8),
        "rgba8" | "rgba" => Some(PixelFormat::Rgba8),
        "gray8" | "gray" | "greyscale" | "grayscale" => Some(PixelFormat::Gray8),
        _ => None,
    }
}

fn parse_image_extension(value: &str) -> Option<String> {
    let clean = value.trim_start_matches('.').to_ascii_lowercase();
    match clean.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "tiff" | "tif" => Some(clean),
        _ => None,
    }
}

/// Whether `frame_number` is one of the frames a dump of `start..` saves.
fn is_selected(frame_number: u64, start: u64, every: u64) -> bool {
    frame_number.abs_diff(start) % every.max(1) == 0
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        framestep::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn open_stepper(
    input: &Path,
    global: &GlobalOptions,
) -> Result<FrameStepper<VideoFile>, Box<dyn std::error::Error>> {
    let mut output = FrameOutputOptions::default();
    if let Some(pixel_str) = &global.pixel_format {
        let pixel = parse_pixel_format(pixel_str)
            .ok_or(format!("unsupported --pixel-format: {pixel_str}"))?;
        output = output.with_pixel_format(pixel);
    }

    let mut options = StepperOptions::new();
    if global.progress {
        options = options
            .with_progress(Arc::new(TerminalProgress))
            .with_batch_size(250);
    }

    let video = VideoFile::open_with_options(input, output)?;
    Ok(FrameStepper::with_options(video, options)?)
}

/// Fail on a decoder error, pass positions and boundaries through.
fn checked(outcome: StepOutcome) -> Result<StepOutcome, Box<dyn std::error::Error>> {
    Ok(outcome.into_result()?)
}

/// Position on the last frame of a reverse dump. An end past the last frame
/// clamps to it.
fn goto_range_end<S: FrameSource>(
    stepper: &mut FrameStepper<S>,
    end: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(end) = end else {
        checked(stepper.goto_last_frame())?;
        return Ok(());
    };

    // Scanning stops on the last frame by itself; a table lookup does not move.
    let landed = checked(stepper.goto_frame(end))?;
    if !landed.is_positioned() && stepper.is_precalculated() {
        checked(stepper.goto_last_frame())?;
    }
    Ok(())
}

struct TerminalProgress;

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match info.total {
            Some(total) => eprintln!(
                "{} {:?} {}/{}",
                "scan".cyan().bold(),
                info.operation,
                info.current,
                total
            ),
            None => eprintln!(
                "{} {:?} {} frames",
                "scan".cyan().bold(),
                info.operation,
                info.current
            ),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn dump_frames(
    stepper: &mut FrameStepper<VideoFile>,
    out: &Path,
    start: u64,
    end: Option<u64>,
    every: u64,
    ext: &str,
    reverse: bool,
    global: &GlobalOptions,
) -> Result<u64, Box<dyn std::error::Error>> {
    let (to, direction) = if reverse {
        goto_range_end(stepper, end)?;
        if stepper.current_frame_number() < start {
            return Err(format!(
                "--start {start} is past the last frame ({})",
                stepper.current_frame_number()
            )
            .into());
        }
        (Some(start), Direction::Backward)
    } else {
        if !checked(stepper.goto_frame(start))?.is_positioned() {
            return Err(format!("--start {start} is past the last frame").into());
        }
        (end, Direction::Forward)
    };
    let first = stepper.current_frame_number();

    let progress_bar = if global.progress {
        let pb = match to {
            Some(to) => ProgressBar::new(first.abs_diff(to) + 1),
            None => ProgressBar::new_spinner(),
        };
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut saved = 0_u64;
    loop {
        let frame_number = stepper.current_frame_number();
        if is_selected(frame_number, first, every) {
            let output_path = out.join(format!("frame_{frame_number:06}.{ext}"));
            ensure_writable_path(&output_path, global.overwrite)?;
            stepper.read()?.save(&output_path)?;
            saved += 1;

            if global.verbose {
                eprintln!(
                    "saved frame {} ({:.3}s) -> {}",
                    frame_number,
                    stepper.current_timestamp().as_secs_f64(),
                    output_path.display()
                );
            }
        }

        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }

        if to == Some(frame_number) {
            break;
        }
        if !checked(stepper.step(direction))?.is_positioned() {
            break;
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }
    Ok(saved)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Info { input, json, exact } => {
            let mut stepper = open_stepper(&input, &cli.global)?;
            let exact_count = if exact {
                Some(stepper.frame_count()?)
            } else {
                None
            };
            let metadata = stepper.source().metadata().clone();

            if json {
                let payload = json!({
                    "path": input.display().to_string(),
                    "format": metadata.format,
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "frames_per_second": metadata.frames_per_second,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "time_base": metadata.time_base.to_string(),
                    "stream_index": metadata.stream_index,
                    "indexed_frame_count": metadata.indexed_frame_count,
                    "frame_count": exact_count,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "file:".bold(), input.display());
                println!("format: {}", metadata.format);
                println!(
                    "video: {}x{} {} @ {:.3} fps",
                    metadata.width, metadata.height, metadata.codec, metadata.frames_per_second
                );
                println!("duration: {:.3}s", metadata.duration.as_secs_f64());
                println!("time base: {}", metadata.time_base);
                println!("indexed frames: {}", metadata.indexed_frame_count);
                if let Some(count) = exact_count {
                    println!("stepped frames: {count}");
                }
            }
        }
        Commands::Index { input, json } => {
            let mut stepper = open_stepper(&input, &cli.global)?;
            let frame_count = stepper.precalc_frame_times()?;
            let time_base = stepper.source().time_base();
            let table = stepper
                .frame_table()
                .ok_or("frame table missing after precalculation")?;

            if json {
                let frames: Vec<_> = table
                    .iter()
                    .map(|(frame_number, time)| {
                        json!({
                            "frame": frame_number,
                            "ticks": time.ticks(),
                            "seconds": time.to_seconds(time_base),
                        })
                    })
                    .collect();
                let payload = json!({
                    "time_base": time_base.to_string(),
                    "frame_count": frame_count,
                    "frames": frames,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (frame_number, time) in table.iter() {
                    println!(
                        "{frame_number:>8} {:>12} {:>12.6}",
                        time.ticks(),
                        time.to_seconds(time_base)
                    );
                }
                eprintln!(
                    "{} {}",
                    "success:".green().bold(),
                    format!("{frame_count} frame(s) indexed").green()
                );
            }
        }
        Commands::Dump {
            input,
            out,
            start,
            end,
            every,
            ext,
            reverse,
            precalc,
        } => {
            if every == 0 {
                return Err("--every must be greater than zero".into());
            }
            let start = start.unwrap_or(0);
            if end.is_some_and(|end| end < start) {
                return Err("--start must be <= --end".into());
            }
            let ext = parse_image_extension(&ext).ok_or(format!("unsupported --ext: {ext}"))?;

            fs::create_dir_all(&out)?;
            let mut stepper = open_stepper(&input, &cli.global)?;
            if precalc {
                stepper.precalc_frame_times()?;
            }

            let saved = dump_frames(
                &mut stepper,
                &out,
                start,
                end,
                every,
                &ext,
                reverse,
                &cli.global,
            )?;

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Saved {saved} frame(s) to {}", out.display()).green()
            );
        }
        Commands::Frame {
            input,
            number,
            out,
            precalc,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let mut stepper = open_stepper(&input, &cli.global)?;
            if precalc {
                stepper.precalc_frame_times()?;
            }

            let outcome = checked(stepper.goto_frame(number))?;
            if stepper.current_frame_number() != number || !outcome.is_positioned() {
                return Err(format!(
                    "frame {number} is out of range (last reachable frame is {})",
                    stepper.current_frame_number()
                )
                .into());
            }

            stepper.read()?.save(&out)?;
            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Saved frame {number} ({:.3}s) to {}",
                    stepper.current_timestamp().as_secs_f64(),
                    out.display()
                )
                .green()
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framestep", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
