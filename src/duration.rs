//! Per-frame display duration.
//!
//! A [`FrameDuration`] is a rational number of seconds, stored as an integer
//! time value over an integer timescale. `1/15` shows each frame for one
//! fifteenth of a second, which is the default.
//!
//! # Example
//!
//! ```
//! use imgseq::FrameDuration;
//!
//! let duration: FrameDuration = "2/30".parse()?;
//! assert_eq!(duration.frames_per_second(), 15.0);
//! assert_eq!(duration.total_for(3).as_millis(), 200);
//! # Ok::<(), imgseq::ImageSequenceError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use ffmpeg_next::Rational;

use crate::error::ImageSequenceError;

/// Playback time of one frame, as `value / scale` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDuration {
    value: u32,
    scale: u32,
}

impl Default for FrameDuration {
    fn default() -> Self {
        Self { value: 1, scale: 15 }
    }
}

impl FrameDuration {
    /// Create a duration of `value / scale` seconds.
    ///
    /// # Errors
    ///
    /// [`ImageSequenceError::InvalidFrameDuration`] if either part is zero
    /// or does not fit FFmpeg's signed 32-bit rationals.
    pub fn new(value: u32, scale: u32) -> Result<Self, ImageSequenceError> {
        let limit = i32::MAX as u32;
        if value == 0 || scale == 0 || value > limit || scale > limit {
            return Err(ImageSequenceError::InvalidFrameDuration { value, scale });
        }
        Ok(Self { value, scale })
    }

    /// Duration of one frame at `fps` frames per second (`1 / fps`).
    pub fn from_fps(fps: u32) -> Result<Self, ImageSequenceError> {
        Self::new(1, fps)
    }

    /// Time value (numerator), in units of `1 / scale` seconds.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Timescale (denominator): units per second.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Equivalent frame rate (`scale / value`).
    pub fn frames_per_second(&self) -> f64 {
        self.scale as f64 / self.value as f64
    }

    /// The timescale as an FFmpeg time base (`1 / scale`).
    pub(crate) fn time_base(&self) -> Rational {
        Rational::new(1, self.scale as i32)
    }

    /// The frame rate as an FFmpeg rational (`scale / value`).
    pub(crate) fn frame_rate(&self) -> Rational {
        Rational::new(self.scale as i32, self.value as i32)
    }

    /// Wall-clock length of a single frame.
    pub fn as_duration(&self) -> Duration {
        self.total_for(1)
    }

    /// Nominal playback length of `frames` frames.
    pub fn total_for(&self, frames: u64) -> Duration {
        let units = frames as u128 * self.value as u128;
        let nanos = units * 1_000_000_000 / self.scale as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

impl Display for FrameDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.value, self.scale)
    }
}

impl FromStr for FrameDuration {
    type Err = ImageSequenceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let syntax = || ImageSequenceError::FrameDurationSyntax(trimmed.to_string());

        let (value, scale) = match trimmed.split_once('/') {
            Some((value, scale)) => (value.trim(), scale.trim()),
            None => (trimmed, "1"),
        };
        let value = value.parse::<u32>().map_err(|_| syntax())?;
        let scale = scale.parse::<u32>().map_err(|_| syntax())?;

        Self::new(value, scale)
    }
}
