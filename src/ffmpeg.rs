//! FFmpeg runtime setup and console verbosity.
//!
//! FFmpeg keeps process-wide state: registered codecs and muxers, and its own
//! log level. [`initialize`] prepares the former on first use and is called
//! by [`FfmpegMovieWriter::create`](crate::FfmpegMovieWriter::create);
//! [`set_ffmpeg_log_level`] tunes the latter.
//!
//! FFmpeg's console output is separate from the Rust-side diagnostics emitted
//! through the [`log`](https://crates.io/crates/log) crate.
//!
//! # Example
//!
//! ```no_run
//! use imgseq::FfmpegLogLevel;
//!
//! // Only let FFmpeg print errors.
//! imgseq::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::str::FromStr;
use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use crate::error::ImageSequenceError;

static INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize FFmpeg for the lifetime of the process.
///
/// Safe to call repeatedly; only the first call does any work and its
/// outcome is remembered.
pub fn initialize() -> Result<(), ImageSequenceError> {
    INITIALIZED
        .get_or_init(|| ffmpeg_next::init().map_err(|error| error.to_string()))
        .clone()
        .map_err(ImageSequenceError::FfmpegError)
}

/// FFmpeg internal log verbosity level.
///
/// Ordered from quietest to most verbose. Setting a level suppresses every
/// FFmpeg message below that severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "panic" => Ok(FfmpegLogLevel::Panic),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "verbose" => Ok(FfmpegLogLevel::Verbose),
            "debug" => Ok(FfmpegLogLevel::Debug),
            "trace" => Ok(FfmpegLogLevel::Trace),
            other => Err(format!("unknown FFmpeg log level: {other}")),
        }
    }
}

/// Set FFmpeg's console log level.
///
/// Does not affect Rust-side `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
