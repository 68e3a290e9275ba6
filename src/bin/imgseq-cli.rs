use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use imgseq::{
    BuildReport, EncoderOptions, FailurePolicy, FfmpegLogLevel, FrameDuration, ProgressCallback,
    ProgressInfo, SequenceBuilder, SequenceOptions, VideoCodec,
};

const CLI_AFTER_HELP: &str = "Frames are ordered by the lexicographic order of the image paths, not the order given.\n\nExamples:\n  imgseq movie.mov shot*.png\n  imgseq movie.mov frames/*.png --frame-duration 1/24 --progress\n  imgseq movie.mp4 *.jpg --codec h264 --crf 20 --on-error skip\n  imgseq --completions zsh > _imgseq";

#[derive(Debug, Parser)]
#[command(
    name = "imgseq",
    version,
    about = "Build a movie from a sequence of still images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Output movie path; the container follows the extension (.mov, .mp4, .mkv, .avi).
    #[arg(required_unless_present = "completions")]
    output: Option<PathBuf>,

    /// Input images, one frame each.
    #[arg(required_unless_present = "completions")]
    images: Vec<PathBuf>,

    /// Display time of each frame as value/scale seconds.
    #[arg(long, default_value = "1/15", conflicts_with = "fps")]
    frame_duration: FrameDuration,

    /// Frames per second (shorthand for --frame-duration 1/FPS).
    #[arg(long)]
    fps: Option<u32>,

    /// Video codec (mpeg4, h264, h265, mjpeg).
    #[arg(long, default_value = "mpeg4")]
    codec: VideoCodec,

    /// Constant Rate Factor for h264/h265 (0-51, lower is better).
    #[arg(long)]
    crf: Option<u32>,

    /// Target bitrate in bits per second.
    #[arg(long)]
    bitrate: Option<usize>,

    /// Output resolution as WIDTHxHEIGHT (default: size of the first image).
    #[arg(long)]
    resolution: Option<String>,

    /// What to do with a bad image: keep (stop, keep partial movie), remove (stop, delete it), skip.
    #[arg(long, default_value = "keep")]
    on_error: FailurePolicy,

    /// Read every image header before creating the movie.
    #[arg(long)]
    preflight: bool,

    /// Ignore input paths that do not exist.
    #[arg(long)]
    skip_missing: bool,

    /// Refuse to replace an existing output file.
    #[arg(long)]
    no_clobber: bool,

    /// Delete the input images that made it into the movie.
    #[arg(long)]
    remove_inputs: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,

    /// Print the build report as JSON.
    #[arg(long)]
    json: bool,

    /// Generate a shell completion script and exit.
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

fn parse_resolution(value: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (width, height) = value
        .trim()
        .to_ascii_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
        .ok_or_else(|| format!("invalid --resolution {value:?} (expected WIDTHxHEIGHT)"))?;
    Ok((width.parse()?, height.parse()?))
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
                "output already exists: {} (drop --no-clobber to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn encoder_options(cli: &Cli) -> Result<EncoderOptions, Box<dyn std::error::Error>> {
    let mut options = EncoderOptions::default().codec(cli.codec);
    if let Some(crf) = cli.crf {
        options = options.crf(crf);
    }
    if let Some(bitrate) = cli.bitrate {
        options = options.bitrate(bitrate);
    }
    if let Some(resolution) = &cli.resolution {
        let (width, height) = parse_resolution(resolution)?;
        options = options.resolution(width, height);
    }
    Ok(options)
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        // Missing inputs may have been dropped before the build started.
        self.bar.set_length(info.total);
        self.bar.set_position(info.current);
        if let Some(name) = info.current_path.as_deref().and_then(Path::file_name) {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
    }
}

fn remove_inputs(images: &[PathBuf], report: &BuildReport) {
    for image in images {
        if report.skipped.contains(image) || report.missing.contains(image) {
            continue;
        }
        if let Err(error) = fs::remove_file(image) {
            log::warn!("Could not remove {}: {error}", image.display());
        }
    }
}

fn print_report(report: &BuildReport, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "output": report.output.display().to_string(),
            "frames_written": report.frames_written,
            "frame_duration": report.frame_duration.to_string(),
            "total_duration_seconds": report.total_duration.as_secs_f64(),
            "skipped": report.skipped.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "missing": report.missing.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for path in &report.skipped {
        eprintln!("{} skipped {}", "warning:".yellow().bold(), path.display());
    }
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Wrote {} frame(s) to {} ({:.3}s at {} s/frame)",
            report.frames_written,
            report.output.display(),
            report.total_duration.as_secs_f64(),
            report.frame_duration,
        )
        .green()
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "imgseq", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    imgseq::set_ffmpeg_log_level(cli.log_level.unwrap_or(FfmpegLogLevel::Error));

    let output = cli.output.clone().ok_or("missing output path")?;
    ensure_writable_path(&output, !cli.no_clobber)?;

    let frame_duration = match cli.fps {
        Some(fps) => FrameDuration::from_fps(fps)?,
        None => cli.frame_duration,
    };

    let mut options = SequenceOptions::new()
        .with_frame_duration(frame_duration)
        .with_encoder(encoder_options(&cli)?)
        .with_failure_policy(cli.on_error)
        .with_preflight(cli.preflight)
        .with_skip_missing(cli.skip_missing);

    let progress = if cli.progress {
        let progress = Arc::new(TerminalProgress::new(cli.images.len() as u64)?);
        options = options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    let result = SequenceBuilder::new(options).build(&output, cli.images.iter().cloned());

    if let Some(progress) = progress {
        match &result {
            Ok(_) => progress.bar.finish_with_message("done"),
            Err(_) => progress.bar.abandon(),
        }
    }

    let report = result?;
    if cli.remove_inputs {
        remove_inputs(&cli.images, &report);
    }
    print_report(&report, cli.json)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::{Cli, ensure_writable_path, parse_resolution, remove_inputs};
    use clap::Parser;
    use imgseq::{BuildReport, FailurePolicy, FrameDuration, VideoCodec};

    #[test]
    fn parse_resolution_formats() {
        assert_eq!(parse_resolution("640x480").unwrap(), (640, 480));
        assert_eq!(parse_resolution(" 1920 X 1080 ").unwrap(), (1920, 1080));
        assert!(parse_resolution("640").is_err());
        assert!(parse_resolution("wide x tall").is_err());
    }

    #[test]
    fn positional_output_then_images() {
        let cli = Cli::try_parse_from(["imgseq", "out.mov", "b.png", "a.png"]).unwrap();
        assert_eq!(cli.output.unwrap().to_str(), Some("out.mov"));
        assert_eq!(cli.images.len(), 2);
        assert_eq!(cli.frame_duration.to_string(), "1/15");
        assert_eq!(cli.codec, VideoCodec::Mpeg4);
        assert_eq!(cli.on_error, FailurePolicy::KeepPartial);
    }

    #[test]
    fn images_are_required() {
        assert!(Cli::try_parse_from(["imgseq", "out.mov"]).is_err());
        assert!(Cli::try_parse_from(["imgseq", "--completions", "bash"]).is_ok());
    }

    #[test]
    fn fps_conflicts_with_frame_duration() {
        let result = Cli::try_parse_from([
            "imgseq", "out.mov", "a.png", "--fps", "24", "--frame-duration", "1/24",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn typed_flags_parse() {
        let cli = Cli::try_parse_from([
            "imgseq", "out.mp4", "a.png", "--codec", "h264", "--on-error", "skip",
            "--frame-duration", "20/600",
        ])
        .unwrap();
        assert_eq!(cli.codec, VideoCodec::H264);
        assert_eq!(cli.on_error, FailurePolicy::SkipFrame);
        assert_eq!(cli.frame_duration.scale(), 600);
    }

    #[test]
    fn no_clobber_refuses_existing_output() {
        let directory = tempfile::tempdir().unwrap();
        let existing = directory.path().join("movie.mov");
        fs::write(&existing, b"old movie").unwrap();

        let refused = ensure_writable_path(&existing, false).unwrap_err();
        assert!(refused.to_string().contains("already exists"), "{refused}");
        assert!(ensure_writable_path(&existing, true).is_ok());
        assert!(ensure_writable_path(&directory.path().join("new.mov"), false).is_ok());
        assert_eq!(fs::read(&existing).unwrap(), b"old movie");
    }

    #[test]
    fn remove_inputs_keeps_images_left_out_of_the_movie() {
        let directory = tempfile::tempdir().unwrap();
        let written = directory.path().join("0.png");
        let skipped = directory.path().join("1.png");
        let missing = directory.path().join("2.png");
        fs::write(&written, b"frame").unwrap();
        fs::write(&skipped, b"broken").unwrap();

        let report = BuildReport {
            output: directory.path().join("movie.mov"),
            frames_written: 1,
            skipped: vec![skipped.clone()],
            missing: vec![missing.clone()],
            frame_duration: FrameDuration::default(),
            total_duration: Duration::from_millis(66),
        };
        remove_inputs(&[written.clone(), skipped.clone(), missing.clone()], &report);

        assert!(!written.exists());
        assert!(skipped.exists());
        assert!(!missing.exists());
    }
}
