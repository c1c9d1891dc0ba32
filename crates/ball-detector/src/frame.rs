//! Decoded frames and frame sources.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use drs_common::error::{DrsError, DrsResult};
use image::RgbImage;

/// One decoded video frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub index: u64,
    pub timestamp_ms: f64,
    pub image: RgbImage,
}

impl VideoFrame {
    pub fn new(index: u64, timestamp_ms: f64, image: RgbImage) -> Self {
        Self {
            index,
            timestamp_ms,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Ordered producer of decoded frames.
pub trait FrameSource: Send {
    /// Next frame in presentation order, or `None` at end of stream.
    fn next_frame(&mut self) -> DrsResult<Option<VideoFrame>>;

    /// Total frame count when known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Frames held in memory.
pub struct VecFrameSource {
    frames: VecDeque<VideoFrame>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Wrap bare images, assigning indices and timestamps from `frame_rate`.
    pub fn from_images(images: Vec<RgbImage>, frame_rate: f64) -> Self {
        let frames = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| VideoFrame::new(i as u64, frame_time_ms(i as u64, frame_rate), image))
            .collect();
        Self::new(frames)
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> DrsResult<Option<VideoFrame>> {
        Ok(self.frames.pop_front())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }
}

/// A directory of PNG/JPEG frames, ordered by file name.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    frame_rate: f64,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, frame_rate: f64) -> DrsResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DrsError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(DrsError::config(format!(
                "frame rate must be positive (got {frame_rate})"
            )));
        }

        let mut paths = vec![];
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if is_frame_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        tracing::debug!(dir = %dir.display(), frames = paths.len(), "Opened image sequence");

        Ok(Self {
            paths,
            next: 0,
            frame_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> DrsResult<Option<VideoFrame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;
        self.next += 1;

        let image = image::open(path)
            .map_err(|e| DrsError::detection(format!("failed to decode {}: {e}", path.display())))?
            .to_rgb8();

        Ok(Some(VideoFrame::new(
            index,
            frame_time_ms(index, self.frame_rate),
            image,
        )))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.paths.len() - self.next)
    }
}

/// Presentation time of frame `index` in milliseconds.
pub fn frame_time_ms(index: u64, frame_rate: f64) -> f64 {
    index as f64 * 1000.0 / frame_rate
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_vec_source_assigns_timestamps() {
        let images = vec![RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])); 3];
        let mut source = VecFrameSource::from_images(images, 50.0);
        assert_eq!(source.len_hint(), Some(3));

        let f0 = source.next_frame().unwrap().unwrap();
        let f1 = source.next_frame().unwrap().unwrap();
        assert_eq!(f0.index, 0);
        assert_eq!(f1.index, 1);
        assert!((f1.timestamp_ms - 20.0).abs() < 1e-9);
        source.next_frame().unwrap().unwrap();
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_reads_sorted_pngs() {
        let dir = std::env::temp_dir().join("drs_test_image_sequence");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        for (name, shade) in [("frame_0002.png", 20u8), ("frame_0001.png", 10u8)] {
            RgbImage::from_pixel(2, 2, Rgb([shade, 0, 0]))
                .save(dir.join(name))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(&dir, 60.0).unwrap();
        assert_eq!(source.len(), 2);
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.image.get_pixel(0, 0)[0], 10);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert!(source.next_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_directory() {
        let result = ImageSequenceSource::open("/nonexistent/drs/frames", 60.0);
        assert!(matches!(result, Err(DrsError::FileNotFound { .. })));
    }
}
