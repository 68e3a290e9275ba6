//! Preflight checks for input images.
//!
//! [`preflight`] reads the header of every image in a sequence, without
//! decoding pixel data, and returns a [`ValidationReport`]. The builder runs
//! it before creating the output when
//! [`SequenceOptions::with_preflight`](crate::SequenceOptions::with_preflight)
//! is on.
//!
//! # Example
//!
//! ```no_run
//! use imgseq::ImageSequence;
//!
//! let sequence = ImageSequence::new(["frame0001.png", "frame0000.png"]);
//! let report = imgseq::preflight(&sequence);
//! if !report.is_valid() {
//!     print!("{report}");
//! }
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use image::ImageReader;

use crate::error::ImageSequenceError;
use crate::sequence::ImageSequence;

/// Outcome of checking a sequence's images.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Size of the first readable image, if any.
    pub dimensions: Option<(u32, u32)>,
    /// Non-fatal notes, such as images that will be resized.
    pub warnings: Vec<String>,
    /// Images whose headers could not be read, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl ValidationReport {
    /// Returns `true` if every image was readable.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert the first failure (in frame order) into a decode error.
    pub fn into_result(self) -> Result<Self, ImageSequenceError> {
        match self.failures.first() {
            Some((path, reason)) => Err(ImageSequenceError::Decode {
                path: path.clone(),
                reason: reason.clone(),
            }),
            None => Ok(self),
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some((width, height)) = self.dimensions {
            writeln!(f, "[INFO] frame size {width}x{height}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for (path, reason) in &self.failures {
            writeln!(f, "[ERROR] {}: {reason}", path.display())?;
        }
        if self.warnings.is_empty() && self.failures.is_empty() {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Read the size from the image header, detecting the format from content.
fn probe(path: &Path) -> Result<(u32, u32), String> {
    ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|error| error.to_string())?
        .into_dimensions()
        .map_err(|error| error.to_string())
}

#[cfg(not(feature = "rayon"))]
fn probe_all(sequence: &ImageSequence) -> Vec<Result<(u32, u32), String>> {
    sequence.iter().map(|path| probe(path)).collect()
}

#[cfg(feature = "rayon")]
fn probe_all(sequence: &ImageSequence) -> Vec<Result<(u32, u32), String>> {
    use rayon::prelude::*;

    sequence.paths().par_iter().map(|path| probe(path)).collect()
}

/// Read every image header in `sequence`.
///
/// With the `rayon` feature the headers are read in parallel; results are
/// always reported in frame order.
pub fn preflight(sequence: &ImageSequence) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (path, probed) in sequence.iter().zip(probe_all(sequence)) {
        match probed {
            Ok(size) => match report.dimensions {
                None => report.dimensions = Some(size),
                Some(first) if first != size => report.warnings.push(format!(
                    "{} is {}x{}, will be resized to {}x{}",
                    path.display(),
                    size.0,
                    size.1,
                    first.0,
                    first.1,
                )),
                Some(_) => {}
            },
            Err(reason) => report.failures.push((path.clone(), reason)),
        }
    }

    log::debug!(
        "Preflight of {} image(s): {} warning(s), {} failure(s)",
        sequence.len(),
        report.warnings.len(),
        report.failures.len(),
    );
    report
}
