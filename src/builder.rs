//! The image-sequence builder.
//!
//! [`SequenceBuilder`] turns a set of still images into one movie: it sorts
//! the paths, creates the output, then decodes, appends and flushes one
//! frame at a time. [`build_sequence`] is the one-call shorthand.
//!
//! # Example
//!
//! ```no_run
//! use imgseq::{FrameDuration, ImageSequenceError};
//!
//! let report = imgseq::build_sequence(
//!     "movie.mov",
//!     ["b.png", "a.png", "c.png"],
//!     FrameDuration::new(1, 15)?,
//! )?;
//! assert_eq!(report.frames_written, 3);
//! # Ok::<(), ImageSequenceError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, ImageReader};

use crate::configuration::{FailurePolicy, SequenceOptions};
use crate::duration::FrameDuration;
use crate::error::ImageSequenceError;
use crate::progress::ProgressTracker;
use crate::sequence::ImageSequence;
use crate::validation::preflight;
use crate::writer::{EncoderOptions, FfmpegMovieWriter, MovieWriter};

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// The movie that was written.
    pub output: PathBuf,
    /// Frames in the movie.
    pub frames_written: u64,
    /// Images left out under [`FailurePolicy::SkipFrame`].
    pub skipped: Vec<PathBuf>,
    /// Input paths dropped because they did not exist.
    pub missing: Vec<PathBuf>,
    /// Display time of each frame.
    pub frame_duration: FrameDuration,
    /// Nominal playback length of the movie.
    pub total_duration: Duration,
}

/// Builds movies from image sequences.
#[derive(Debug, Clone, Default)]
pub struct SequenceBuilder {
    options: SequenceOptions,
}

impl SequenceBuilder {
    /// Create a builder with the given options.
    pub fn new(options: SequenceOptions) -> Self {
        Self { options }
    }

    /// The options this builder runs with.
    pub fn options(&self) -> &SequenceOptions {
        &self.options
    }

    /// Write `images` to the movie at `output` using FFmpeg.
    ///
    /// The container format follows the output extension. An existing file
    /// at `output` is replaced.
    ///
    /// # Errors
    ///
    /// - [`ImageSequenceError::EmptySequence`] when there is nothing to
    ///   write; no file is created.
    /// - [`ImageSequenceError::Decode`] from preflight, before the output is
    ///   created. Under [`FailurePolicy::SkipFrame`] unreadable images are
    ///   left out instead.
    /// - [`ImageSequenceError::Creation`] when the output cannot be opened;
    ///   no image has been decoded at that point.
    /// - [`ImageSequenceError::Decode`], [`ImageSequenceError::Append`],
    ///   [`ImageSequenceError::InputNotFound`] or
    ///   [`ImageSequenceError::Cancelled`] when a frame fails, after the
    ///   output has been finalized (and removed under
    ///   [`FailurePolicy::RemovePartial`]).
    /// - [`ImageSequenceError::EncoderSetup`] when the encoder cannot be
    ///   configured from the first frame. This is never skipped.
    /// - Any error from finalizing the movie, with the failure policy
    ///   applied to the output.
    pub fn build<P, I, Q>(&self, output: P, images: I) -> Result<BuildReport, ImageSequenceError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Q>,
        Q: Into<PathBuf>,
    {
        self.build_with(output, images, |path, encoder| {
            FfmpegMovieWriter::create(path, encoder)
        })
    }

    /// Like [`build`](SequenceBuilder::build), but with a custom writer.
    ///
    /// `open` is called exactly once, after the inputs have been sorted (and
    /// preflighted, if enabled) and before any image is decoded.
    pub fn build_with<P, I, Q, W, F>(
        &self,
        output: P,
        images: I,
        open: F,
    ) -> Result<BuildReport, ImageSequenceError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Q>,
        Q: Into<PathBuf>,
        W: MovieWriter,
        F: FnOnce(&Path, &EncoderOptions) -> Result<W, ImageSequenceError>,
    {
        let output = output.as_ref();
        let mut sequence = ImageSequence::new(images);

        let missing = if self.options.skip_missing {
            let missing = sequence.retain_existing();
            for path in &missing {
                log::warn!("Skipping missing image {}", path.display());
            }
            missing
        } else {
            Vec::new()
        };

        if sequence.is_empty() {
            return Err(ImageSequenceError::EmptySequence);
        }

        let mut skipped = Vec::new();
        if self.options.preflight {
            let mut report = preflight(&sequence);
            if self.options.failure_policy == FailurePolicy::SkipFrame {
                for (path, reason) in report.failures.drain(..) {
                    log::warn!("Skipping unreadable image {}: {reason}", path.display());
                    sequence.retain(|candidate| candidate != path.as_path());
                    skipped.push(path);
                }
                if sequence.is_empty() {
                    return Err(ImageSequenceError::EmptySequence);
                }
            }
            let report = report.into_result()?;
            for warning in &report.warnings {
                log::warn!("{warning}");
            }
        }

        log::info!(
            "Building {:?} from {} image(s) at {} s/frame",
            output,
            sequence.len(),
            self.options.frame_duration,
        );

        let mut writer = open(output, &self.options.encoder)?;
        let mut tracker = ProgressTracker::new(self.options.progress.clone(), sequence.len() as u64);

        for path in &sequence {
            if self.options.is_cancelled() {
                log::info!("Build of {output:?} cancelled");
                return Err(self.abandon(&mut writer, output, ImageSequenceError::Cancelled));
            }

            match self.append(&mut writer, path) {
                Ok(()) => tracker.appended(path),
                Err(error)
                    if error.is_frame_error()
                        && self.options.failure_policy == FailurePolicy::SkipFrame =>
                {
                    log::warn!("Skipping frame: {error}");
                    skipped.push(path.clone());
                    tracker.skipped(path);
                    continue;
                }
                Err(error) => return Err(self.abandon(&mut writer, output, error)),
            }

            if let Err(error) = writer.flush() {
                let error = ImageSequenceError::Append {
                    path: path.clone(),
                    reason: format!("flush failed: {error}"),
                };
                return Err(self.abandon(&mut writer, output, error));
            }
        }

        let frames_written = writer.frames_written();
        if frames_written == 0 {
            log::warn!("Every image was skipped; removing {output:?}");
            finish_quietly(&mut writer, output);
            remove_quietly(output);
            return Err(ImageSequenceError::EmptySequence);
        }

        if let Err(error) = writer.finish() {
            return Err(self.abandon(&mut writer, output, error));
        }

        Ok(BuildReport {
            output: output.to_path_buf(),
            frames_written,
            skipped,
            missing,
            frame_duration: self.options.frame_duration,
            total_duration: self.options.frame_duration.total_for(frames_written),
        })
    }

    /// Decode one image and append it as the next frame.
    fn append<W: MovieWriter>(&self, writer: &mut W, path: &Path) -> Result<(), ImageSequenceError> {
        let image = decode(path)?;
        log::debug!(
            "Appending {} ({}x{})",
            path.display(),
            image.width(),
            image.height(),
        );
        writer
            .append_frame(&image, self.options.frame_duration)
            .map_err(|error| match error {
                // Run-level failures are not tied to this image.
                ImageSequenceError::EncoderSetup(_) | ImageSequenceError::Cancelled => error,
                other => ImageSequenceError::Append {
                    path: path.to_path_buf(),
                    reason: other.to_string(),
                },
            })
    }

    /// Finalize the writer after a failure and apply the failure policy.
    fn abandon<W: MovieWriter>(
        &self,
        writer: &mut W,
        output: &Path,
        error: ImageSequenceError,
    ) -> ImageSequenceError {
        finish_quietly(writer, output);
        match self.options.failure_policy {
            FailurePolicy::RemovePartial => remove_quietly(output),
            FailurePolicy::KeepPartial | FailurePolicy::SkipFrame => log::warn!(
                "Left partial movie {:?} with {} frame(s)",
                output,
                writer.frames_written(),
            ),
        }
        error
    }
}

/// Decode the image at `path`, detecting the format from its content.
fn decode(path: &Path) -> Result<DynamicImage, ImageSequenceError> {
    if !path.exists() {
        return Err(ImageSequenceError::InputNotFound(path.to_path_buf()));
    }
    let failed = |reason: String| ImageSequenceError::Decode {
        path: path.to_path_buf(),
        reason,
    };
    ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|error| failed(error.to_string()))?
        .decode()
        .map_err(|error| failed(error.to_string()))
}

fn finish_quietly<W: MovieWriter>(writer: &mut W, output: &Path) {
    if let Err(error) = writer.finish() {
        log::warn!("Could not finalize {output:?}: {error}");
    }
}

fn remove_quietly(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => log::info!("Removed partial movie {output:?}"),
        Err(error) => log::warn!("Could not remove {output:?}: {error}"),
    }
}

/// Build a movie at `output_path` from `image_paths`, one frame per image,
/// each shown for `frame_duration`.
///
/// Frames follow the lexicographic order of the paths, not the order given.
/// Uses default encoder settings and aborts on the first bad image, keeping
/// the frames already written. Use [`SequenceBuilder`] for anything else.
pub fn build_sequence<P, I, Q>(
    output_path: P,
    image_paths: I,
    frame_duration: FrameDuration,
) -> Result<BuildReport, ImageSequenceError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Q>,
    Q: Into<PathBuf>,
{
    SequenceBuilder::new(SequenceOptions::new().with_frame_duration(frame_duration))
        .build(output_path, image_paths)
}
