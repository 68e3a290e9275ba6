//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes a build frame by frame, [`CancellationToken`]
//! stops it between frames, and [`ProgressInfo`] is the snapshot handed to the
//! callback after every processed image.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use imgseq::{ImageSequenceError, ProgressCallback, ProgressInfo, SequenceBuilder, SequenceOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{} frames ({:.0}%)", info.current, info.total, info.percentage);
//!     }
//! }
//!
//! let options = SequenceOptions::new().with_progress(Arc::new(PrintProgress));
//! SequenceBuilder::new(options).build("movie.mov", ["0001.png", "0000.png"])?;
//! # Ok::<(), ImageSequenceError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of build progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Images processed so far, appended or skipped.
    pub current: u64,
    /// Images in the sequence.
    pub total: u64,
    /// Images skipped under [`FailurePolicy::SkipFrame`](crate::FailurePolicy::SkipFrame).
    pub skipped: u64,
    /// Completion percentage (0.0 - 100.0).
    pub percentage: f32,
    /// Wall-clock time since the first frame was started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// The image that was just processed.
    pub current_path: Option<PathBuf>,
}

/// Trait for receiving progress updates during a build.
///
/// Callbacks observe but cannot halt the build. Use [`CancellationToken`]
/// for that.
pub trait ProgressCallback: Send + Sync {
    /// Called after each image has been appended or skipped.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards every notification. Used when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state; cancelling any clone cancels them all. The builder
/// checks the token before each frame.
///
/// ```
/// use imgseq::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing for one build and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    skipped: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            skipped: 0,
            start_time: Instant::now(),
        }
    }

    /// Record an appended frame.
    pub(crate) fn appended(&mut self, path: &Path) {
        self.current += 1;
        self.report(path);
    }

    /// Record a skipped image.
    pub(crate) fn skipped(&mut self, path: &Path) {
        self.current += 1;
        self.skipped += 1;
        self.report(path);
    }

    fn report(&self, path: &Path) {
        let elapsed = self.start_time.elapsed();

        let percentage = if self.total > 0 {
            (self.current as f32 / self.total as f32) * 100.0
        } else {
            100.0
        };

        let estimated_remaining = (self.current > 0).then(|| {
            let remaining = self.total.saturating_sub(self.current);
            elapsed.mul_f64(remaining as f64 / self.current as f64)
        });

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            skipped: self.skipped,
            percentage,
            elapsed,
            estimated_remaining,
            current_path: Some(path.to_path_buf()),
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        infos: Mutex<Vec<ProgressInfo>>,
    }

    impl ProgressCallback for Recording {
        fn on_progress(&self, info: &ProgressInfo) {
            self.infos.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn tracker_counts_appended_and_skipped() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone(), 4);

        tracker.appended(Path::new("a.png"));
        tracker.skipped(Path::new("b.png"));

        let infos = recording.infos.lock().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].current, 2);
        assert_eq!(infos[1].skipped, 1);
        assert_eq!(infos[1].percentage, 50.0);
        assert_eq!(infos[1].current_path.as_deref(), Some(Path::new("b.png")));
        assert!(infos[1].estimated_remaining.is_some());
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::default();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
