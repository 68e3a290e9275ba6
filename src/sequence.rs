//! Ordered input image lists.
//!
//! Frame order in the output movie is decided here and nowhere else: an
//! [`ImageSequence`] sorts its paths by their raw textual value, so
//! `frame10.png` sorts before `frame9.png`. Zero-padded names
//! (`snapshot0000.png`, `snapshot0001.png`, ...) play back in numeric order.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::slice::Iter;

/// Input image paths in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
}

impl ImageSequence {
    /// Build a sequence from paths in any order.
    ///
    /// Duplicate paths are kept; each occurrence becomes one frame.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        paths.sort_by(|left, right| compare_paths(left, right));
        Self { paths }
    }

    /// Drop paths that do not exist on disk.
    ///
    /// Returns the paths that were removed, in sorted order.
    pub fn retain_existing(&mut self) -> Vec<PathBuf> {
        let (existing, missing) = self
            .paths
            .drain(..)
            .partition::<Vec<_>, _>(|path| path.exists());
        self.paths = existing;
        missing
    }

    /// Keep only the paths for which `keep` returns `true`. Order is preserved.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Path) -> bool,
    {
        self.paths.retain(|path| keep(path));
    }

    /// Sorted paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of images (and therefore frames).
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the sequence holds no images.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over the paths in frame order.
    pub fn iter(&self) -> Iter<'_, PathBuf> {
        self.paths.iter()
    }
}

impl<'a> IntoIterator for &'a ImageSequence {
    type Item = &'a PathBuf;
    type IntoIter = Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ImageSequence {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Compare two paths by their textual value rather than component-wise.
///
/// `Path`'s own ordering treats separators specially (`a/b` < `a-b`); the
/// frame order must follow the plain string instead.
pub fn compare_paths(left: &Path, right: &Path) -> Ordering {
    left.as_os_str().cmp(right.as_os_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_path_text() {
        let sequence = ImageSequence::new(["b.png", "a.png", "c.png"]);
        let names: Vec<_> = sequence.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn unpadded_numbers_sort_as_text() {
        let sequence = ImageSequence::new(["frame9.png", "frame10.png", "frame1.png"]);
        let names: Vec<_> = sequence.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, ["frame1.png", "frame10.png", "frame9.png"]);
    }

    #[test]
    fn separators_compare_as_characters() {
        // '-' (0x2d) sorts before '/' (0x2f).
        let sequence = ImageSequence::new(["a/b.png", "a-b.png"]);
        let names: Vec<_> = sequence.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, ["a-b.png", "a/b.png"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let sequence: ImageSequence = ["x.png", "x.png"].into_iter().collect();
        assert_eq!(sequence.len(), 2);
    }

    #[test]
    fn retain_keeps_order() {
        let mut sequence = ImageSequence::new(["c.png", "bad.png", "a.png"]);
        sequence.retain(|path| path != Path::new("bad.png"));
        let names: Vec<_> = sequence.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, ["a.png", "c.png"]);
    }

    #[test]
    fn retain_existing_reports_missing() {
        let directory = tempfile::tempdir().unwrap();
        let present = directory.path().join("present.png");
        std::fs::write(&present, b"").unwrap();
        let absent = directory.path().join("absent.png");

        let mut sequence = ImageSequence::new([absent.clone(), present.clone()]);
        let missing = sequence.retain_existing();

        assert_eq!(missing, vec![absent]);
        assert_eq!(sequence.paths(), &[present]);
    }
}
