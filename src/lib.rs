//! # imgseq
//!
//! Build a movie from a sequence of still images.
//!
//! Every input image becomes exactly one frame, shown for a fixed
//! [`FrameDuration`]. Frames are ordered by the lexicographic order of their
//! paths, so zero-padded snapshot names (`shot0000.png`, `shot0001.png`, ...)
//! play back in capture order no matter how they were passed in. Encoding and
//! container writing are done by FFmpeg through the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; images are
//! decoded with the [`image`](https://crates.io/crates/image) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use imgseq::{FrameDuration, ImageSequenceError};
//!
//! let report = imgseq::build_sequence(
//!     "movie.mov",
//!     ["shot0001.png", "shot0000.png", "shot0002.png"],
//!     FrameDuration::new(1, 15)?,
//! )?;
//! println!("{} frames, {:?}", report.frames_written, report.total_duration);
//! # Ok::<(), ImageSequenceError>(())
//! ```
//!
//! ### Choosing what happens on a bad image
//!
//! ```no_run
//! use imgseq::{FailurePolicy, SequenceBuilder, SequenceOptions};
//!
//! let options = SequenceOptions::new()
//!     .with_failure_policy(FailurePolicy::SkipFrame)
//!     .with_preflight(true);
//! let report = SequenceBuilder::new(options)
//!     .build("movie.mov", ["a.png", "b.png"])
//!     .unwrap();
//! for path in &report.skipped {
//!     eprintln!("left out {}", path.display());
//! }
//! ```
//!
//! ## Behavior
//!
//! - The output is created before any image is decoded; a creation failure
//!   aborts the build with [`ImageSequenceError::Creation`].
//! - The container is flushed after every frame. `.mov` and `.mp4` outputs
//!   are fragmented, one fragment per frame, so an interrupted run leaves a
//!   playable movie of the frames flushed so far.
//! - The writer is finalized on every exit path, including failures. What
//!   happens to a partial file is decided by [`FailurePolicy`]. With
//!   preflight on, [`FailurePolicy::SkipFrame`] leaves unreadable images out
//!   before the output is created.
//! - An empty image list fails with [`ImageSequenceError::EmptySequence`]
//!   without creating a file.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Preflight reads image headers in parallel |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod builder;
pub mod configuration;
mod conversion;
pub mod duration;
pub mod error;
pub mod ffmpeg;
pub mod progress;
pub mod sequence;
pub mod validation;
pub mod writer;

pub use builder::{BuildReport, SequenceBuilder, build_sequence};
pub use configuration::{FailurePolicy, SequenceOptions};
pub use duration::FrameDuration;
pub use error::ImageSequenceError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use sequence::ImageSequence;
pub use validation::{ValidationReport, preflight};
pub use writer::{EncoderOptions, FfmpegMovieWriter, MovieWriter, VideoCodec};
