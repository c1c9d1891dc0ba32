//! Colour-blob detector.

use image::{GrayImage, Luma, Rgb};
use imageproc::region_labelling::{connected_components, Connectivity};

use drs_delivery_model::Position;

use super::color_distance;
use crate::{BallDetector, Candidate, DetectionContext, VideoFrame};

/// Fill ratio of a disc inside its bounding box.
const DISC_FILL: f64 = std::f64::consts::FRAC_PI_4;

/// Colour-blob detector parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBlobConfig {
    /// Expected ball colour.
    pub target: Rgb<u8>,

    /// Largest RGB distance still counted as ball-coloured.
    pub color_tolerance: f64,

    /// Accepted apparent radius range in pixels.
    pub min_radius: f64,
    pub max_radius: f64,

    /// Minimum blob area over bounding-box area.
    pub min_fill_ratio: f64,

    /// Maximum bounding-box aspect ratio; longer blobs are motion-blurred.
    pub max_elongation: f64,

    /// Fastest plausible ball movement (pixels/s) for the continuity prior.
    pub max_ball_speed: f64,

    /// Extra pixels of reach granted by the continuity prior.
    pub continuity_slack: f64,
}

impl Default for ColorBlobConfig {
    fn default() -> Self {
        Self {
            target: Rgb([200, 30, 30]),
            color_tolerance: 90.0,
            min_radius: 2.0,
            max_radius: 15.0,
            min_fill_ratio: 0.5,
            max_elongation: 2.5,
            max_ball_speed: 3000.0,
            continuity_slack: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Blob {
    area: u32,
    sum_x: f64,
    sum_y: f64,
    sum_dist: f64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Blob {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_dist: 0.0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32, dist: f64) {
        self.area += 1;
        self.sum_x += x as f64;
        self.sum_y += y as f64;
        self.sum_dist += dist;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn centroid(&self) -> Position {
        let n = self.area as f64;
        Position::new(self.sum_x / n, self.sum_y / n)
    }

    fn bbox(&self) -> (f64, f64) {
        (
            (self.max_x - self.min_x + 1) as f64,
            (self.max_y - self.min_y + 1) as f64,
        )
    }

    fn radius(&self) -> f64 {
        (self.area as f64 / std::f64::consts::PI).sqrt()
    }

    fn fill_ratio(&self) -> f64 {
        let (w, h) = self.bbox();
        self.area as f64 / (w * h)
    }

    fn elongation(&self) -> f64 {
        let (w, h) = self.bbox();
        w.max(h) / w.min(h)
    }
}

/// Finds a single blob of the ball colour that looks like a ball.
pub struct ColorBlobDetector {
    config: ColorBlobConfig,
}

impl ColorBlobDetector {
    pub fn new(config: ColorBlobConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ColorBlobConfig {
        &self.config
    }

    fn mask(&self, frame: &VideoFrame) -> GrayImage {
        let tol = self.config.color_tolerance;
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            if color_distance(frame.image.get_pixel(x, y), &self.config.target) <= tol {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    fn blobs(&self, frame: &VideoFrame) -> Vec<Blob> {
        let labels = connected_components(&self.mask(frame), Connectivity::Eight, Luma([0u8]));

        let mut blobs: Vec<Option<Blob>> = vec![];
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if blobs.len() < label {
                blobs.resize(label, None);
            }
            let dist = color_distance(frame.image.get_pixel(x, y), &self.config.target);
            blobs[label - 1]
                .get_or_insert_with(|| Blob::new(x, y))
                .add(x, y, dist);
        }

        blobs.into_iter().flatten().collect()
    }

    fn is_ball_shaped(&self, blob: &Blob) -> bool {
        let r = blob.radius();
        r >= self.config.min_radius
            && r <= self.config.max_radius
            && blob.fill_ratio() >= self.config.min_fill_ratio
            && blob.elongation() <= self.config.max_elongation
    }

    fn confidence(&self, blob: &Blob) -> f64 {
        let mean_dist = blob.sum_dist / blob.area as f64;
        let color = 1.0 - (mean_dist / self.config.color_tolerance).clamp(0.0, 1.0);
        let shape = (blob.fill_ratio() / DISC_FILL).min(1.0) / blob.elongation();
        ((0.5 + 0.5 * color) * shape).clamp(0.0, 1.0)
    }
}

impl BallDetector for ColorBlobDetector {
    fn detect(&self, frame: &VideoFrame, context: &DetectionContext) -> Option<Candidate> {
        let survivors: Vec<Blob> = self
            .blobs(frame)
            .into_iter()
            .filter(|b| self.is_ball_shaped(b))
            .filter(|b| {
                context.allows(
                    &b.centroid(),
                    self.config.max_ball_speed,
                    self.config.continuity_slack,
                )
            })
            .collect();

        match survivors.as_slice() {
            [blob] => Some(Candidate {
                position: blob.centroid(),
                confidence: self.confidence(blob),
                radius: blob.radius(),
            }),
            [] => None,
            many => {
                tracing::debug!(
                    frame = frame.index,
                    candidates = many.len(),
                    "Ambiguous frame, no candidate"
                );
                None
            }
        }
    }

    fn name(&self) -> &str {
        "color-blob"
    }
}
