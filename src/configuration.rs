//! Build configuration.
//!
//! [`SequenceOptions`] is a builder that carries the frame duration, encoder
//! settings, failure handling and progress hooks into
//! [`SequenceBuilder`](crate::SequenceBuilder) without widening every
//! signature.
//!
//! # Example
//!
//! ```
//! use imgseq::{EncoderOptions, FailurePolicy, FrameDuration, SequenceOptions, VideoCodec};
//!
//! let options = SequenceOptions::new()
//!     .with_frame_duration(FrameDuration::new(1, 24)?)
//!     .with_encoder(EncoderOptions::default().codec(VideoCodec::Mjpeg))
//!     .with_failure_policy(FailurePolicy::SkipFrame)
//!     .with_preflight(true);
//! assert_eq!(options.frame_duration().scale(), 24);
//! # Ok::<(), imgseq::ImageSequenceError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use crate::duration::FrameDuration;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::writer::EncoderOptions;

/// What to do when an image cannot be decoded or appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the build. Frames appended so far stay in the finalized output.
    #[default]
    KeepPartial,
    /// Stop the build and delete the partial output file.
    RemovePartial,
    /// Log a warning, leave the image out and carry on.
    SkipFrame,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "keep" | "keep-partial" | "abort" => Ok(FailurePolicy::KeepPartial),
            "remove" | "remove-partial" | "clean" => Ok(FailurePolicy::RemovePartial),
            "skip" | "skip-frame" => Ok(FailurePolicy::SkipFrame),
            other => Err(format!("unknown failure policy: {other} (keep|remove|skip)")),
        }
    }
}

/// Settings for one image-sequence build.
///
/// A default-constructed value reproduces the classic behavior: 1/15 s per
/// frame, MPEG-4 frames, abort on the first bad image keeping what was
/// written, no preflight.
#[derive(Clone)]
pub struct SequenceOptions {
    pub(crate) frame_duration: FrameDuration,
    pub(crate) encoder: EncoderOptions,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) preflight: bool,
    pub(crate) skip_missing: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for SequenceOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SequenceOptions")
            .field("frame_duration", &self.frame_duration)
            .field("encoder", &self.encoder)
            .field("failure_policy", &self.failure_policy)
            .field("preflight", &self.preflight)
            .field("skip_missing", &self.skip_missing)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            frame_duration: FrameDuration::default(),
            encoder: EncoderOptions::default(),
            failure_policy: FailurePolicy::default(),
            preflight: false,
            skip_missing: false,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Set the display duration applied to every frame.
    #[must_use]
    pub fn with_frame_duration(mut self, duration: FrameDuration) -> Self {
        self.frame_duration = duration;
        self
    }

    /// Set the codec and quality attributes applied to every frame.
    #[must_use]
    pub fn with_encoder(mut self, encoder: EncoderOptions) -> Self {
        self.encoder = encoder;
        self
    }

    /// Choose how bad images are handled.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Check every image header before the output file is created.
    ///
    /// With preflight on, an unreadable input fails the build without
    /// touching the output path.
    #[must_use]
    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// Silently drop input paths that do not exist (a warning is logged).
    #[must_use]
    pub fn with_skip_missing(mut self, skip: bool) -> Self {
        self.skip_missing = skip;
        self
    }

    /// Attach a progress callback, invoked after every image.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before every image.
    ///
    /// A cancelled build ends with
    /// [`ImageSequenceError::Cancelled`](crate::ImageSequenceError::Cancelled)
    /// and leaves the output according to the failure policy.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The configured frame duration.
    pub fn frame_duration(&self) -> FrameDuration {
        self.frame_duration
    }

    /// The configured encoder settings.
    pub fn encoder(&self) -> &EncoderOptions {
        &self.encoder
    }

    /// The configured failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
