//! Error types for the `imgseq` crate.
//!
//! This module defines [`ImageSequenceError`], the unified error type returned
//! by all fallible operations in the crate. Errors name the file that caused
//! them so a failed run can be diagnosed from the message alone.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `imgseq` operations.
///
/// Every public method that can fail returns `Result<T, ImageSequenceError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImageSequenceError {
    /// The output movie container could not be opened for writing.
    ///
    /// Raised before any image is decoded.
    #[error("Failed to create movie at {path}: {reason}")]
    Creation {
        /// Destination path that could not be created.
        path: PathBuf,
        /// Underlying reason the creation failed.
        reason: String,
    },

    /// An input image could not be read or is not a supported image format.
    #[error("Failed to decode image {path}: {reason}")]
    Decode {
        /// The offending input image.
        path: PathBuf,
        /// Underlying decoder message.
        reason: String,
    },

    /// A decoded image could not be encoded or written into the movie.
    #[error("Failed to append frame from {path}: {reason}")]
    Append {
        /// The input image whose frame failed.
        path: PathBuf,
        /// Underlying encoder or muxer message.
        reason: String,
    },

    /// The video stream or encoder could not be set up from the first frame.
    ///
    /// This concerns the whole movie, not one image, so it is never skipped.
    #[error("Failed to set up the video encoder: {0}")]
    EncoderSetup(String),

    /// No frames were available to write.
    #[error("Image sequence is empty: at least one input image is required")]
    EmptySequence,

    /// A frame duration with a zero or out-of-range part was given.
    #[error("Invalid frame duration {value}/{scale}: both parts must be in 1..=2147483647")]
    InvalidFrameDuration {
        /// Time value (numerator).
        value: u32,
        /// Timescale (denominator).
        scale: u32,
    },

    /// Frame duration text could not be parsed.
    #[error("Cannot parse frame duration {0:?} (expected value/scale, e.g. 1/15)")]
    FrameDurationSyntax(String),

    /// An input image path does not exist.
    #[error("Input image not found: {0}")]
    InputNotFound(PathBuf),

    /// A requested output resolution is unusable.
    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The build was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for ImageSequenceError {
    fn from(error: FfmpegError) -> Self {
        ImageSequenceError::FfmpegError(error.to_string())
    }
}

impl ImageSequenceError {
    /// Whether this error concerns a single frame rather than the whole run.
    ///
    /// Frame-level errors are the ones a [`FailurePolicy`](crate::FailurePolicy)
    /// may skip over.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            ImageSequenceError::Decode { .. }
                | ImageSequenceError::Append { .. }
                | ImageSequenceError::InputNotFound(_)
        )
    }
}
