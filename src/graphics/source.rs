//! Input frame providers for the renderer.

use crate::error::{ReactiveError, Result};
use image::RgbImage;
use log::info;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Random-access source of input frames, shared between render workers.
pub trait FrameSource: Sync {
    /// Number of frames available, or `None` when every index is valid.
    fn frame_count(&self) -> Option<usize>;

    fn frame(&self, index: usize) -> Result<RgbImage>;
}

fn missing(index: usize, count: usize) -> ReactiveError {
    ReactiveError::CorruptFrame(format!(
        "no input frame {index}, source has {count} frames"
    ))
}

/// One image repeated for every frame (image-to-video mode).
#[derive(Debug, Clone)]
pub struct StillImageSource {
    image: RgbImage,
}

impl StillImageSource {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path.as_ref())?.to_rgb8();
        info!(
            "Loaded still image {} ({}x{})",
            path.as_ref().display(),
            image.width(),
            image.height()
        );
        Ok(Self::new(image))
    }
}

impl FrameSource for StillImageSource {
    fn frame_count(&self) -> Option<usize> {
        None
    }

    fn frame(&self, _index: usize) -> Result<RgbImage> {
        Ok(self.image.clone())
    }
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    frames: Vec<RgbImage>,
}

impl FrameSequence {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: RgbImage) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameSequence {
    fn frame_count(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn frame(&self, index: usize) -> Result<RgbImage> {
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| missing(index, self.frames.len()))
    }
}

/// Numbered image files in a directory (`frame_0001.png`, ...), decoded on
/// demand in frame-number order.
#[derive(Debug, Clone)]
pub struct ImageDirectorySource {
    paths: Vec<PathBuf>,
}

impl ImageDirectorySource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(ReactiveError::InvalidConfig(format!(
                "no image files in {}",
                dir.display()
            )));
        }

        paths.sort_by(|a, b| {
            frame_number(a)
                .cmp(&frame_number(b))
                .then_with(|| a.cmp(b))
        });
        info!("Found {} input frames in {}", paths.len(), dir.display());
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageDirectorySource {
    fn frame_count(&self) -> Option<usize> {
        Some(self.paths.len())
    }

    fn frame(&self, index: usize) -> Result<RgbImage> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| missing(index, self.paths.len()))?;
        let image = image::open(path).map_err(|e| {
            ReactiveError::CorruptFrame(format!("{}: {}", path.display(), e))
        })?;
        Ok(image.to_rgb8())
    }
}

/// Trailing number of a file stem; files without one sort last.
fn frame_number(path: &Path) -> u64 {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_number_ordering() {
        assert_eq!(frame_number(Path::new("frame_0009.png")), 9);
        assert_eq!(frame_number(Path::new("frame_10.png")), 10);
        assert_eq!(frame_number(Path::new("cover.png")), u64::MAX);
    }

    #[test]
    fn test_sequence_bounds() {
        let seq = FrameSequence::new(vec![RgbImage::new(2, 2)]);
        assert_eq!(seq.frame_count(), Some(1));
        assert!(seq.frame(0).is_ok());
        assert!(matches!(seq.frame(1), Err(ReactiveError::CorruptFrame(_))));
    }

    #[test]
    fn test_directory_source_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for (n, shade) in [(10u32, 200u8), (2, 20), (1, 10)] {
            let img = RgbImage::from_pixel(3, 3, Rgb([shade, shade, shade]));
            img.save(dir.path().join(format!("frame_{n}.png"))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = ImageDirectorySource::open(dir.path()).unwrap();
        assert_eq!(source.frame_count(), Some(3));
        assert_eq!(source.frame(0).unwrap().get_pixel(0, 0)[0], 10);
        assert_eq!(source.frame(1).unwrap().get_pixel(0, 0)[0], 20);
        assert_eq!(source.frame(2).unwrap().get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageDirectorySource::open(dir.path()).is_err());
    }
}
