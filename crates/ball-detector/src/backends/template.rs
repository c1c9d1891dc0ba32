//! Template-matching detector.

use std::path::Path;

use drs_common::error::{DrsError, DrsResult};
use drs_delivery_model::Position;
use image::{GrayImage, Luma, Rgb};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::template_matching::{match_template, MatchTemplateMethod};

use super::color_distance;
use crate::{BallDetector, Candidate, DetectionContext, VideoFrame};

/// Template detector parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateConfig {
    /// Minimum normalized correlation for a match.
    pub min_score: f32,

    /// A second peak this close to the best one makes the frame ambiguous.
    pub ambiguity_margin: f32,

    /// Peaks within this many pixels of the best one belong to it.
    /// Defaults to the template size when `None`.
    pub suppression_radius: Option<f64>,

    /// Match against closeness to this colour instead of luminance.
    pub target: Option<Rgb<u8>>,

    /// RGB distance at which colour closeness drops to zero.
    pub color_tolerance: f64,

    /// Fastest plausible ball movement (pixels/s) for the continuity prior.
    pub max_ball_speed: f64,

    pub continuity_slack: f64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            min_score: 0.85,
            ambiguity_margin: 0.05,
            suppression_radius: None,
            target: None,
            color_tolerance: 90.0,
            max_ball_speed: 3000.0,
            continuity_slack: 20.0,
        }
    }
}

/// Finds the best normalized cross-correlation match of a ball template.
pub struct TemplateDetector {
    template: GrayImage,
    config: TemplateConfig,
}

impl TemplateDetector {
    pub fn new(template: GrayImage, config: TemplateConfig) -> DrsResult<Self> {
        if template.width() == 0 || template.height() == 0 {
            return Err(DrsError::config("ball template is empty"));
        }
        Ok(Self { template, config })
    }

    /// Load a template image from disk (converted to grayscale).
    pub fn from_path(path: &Path, config: TemplateConfig) -> DrsResult<Self> {
        if !path.exists() {
            return Err(DrsError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let template = image::open(path)
            .map_err(|e| DrsError::config(format!("failed to read template {}: {e}", path.display())))?
            .to_luma8();
        Self::new(template, config)
    }

    /// A bright disc of `radius` pixels on a dark square.
    pub fn disc(radius: u32, config: TemplateConfig) -> Self {
        let size = radius * 2 + 3;
        let mut template = GrayImage::from_pixel(size, size, Luma([0]));
        let c = (size / 2) as i32;
        draw_filled_circle_mut(&mut template, (c, c), radius as i32, Luma([255]));
        Self { template, config }
    }

    pub fn boxed(self) -> Box<dyn BallDetector> {
        Box::new(self)
    }

    fn prepare(&self, frame: &VideoFrame) -> GrayImage {
        match self.config.target {
            Some(target) => {
                let tol = self.config.color_tolerance;
                GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
                    let d = color_distance(frame.image.get_pixel(x, y), &target);
                    Luma([(255.0 * (1.0 - d / tol).clamp(0.0, 1.0)) as u8])
                })
            }
            None => image::imageops::grayscale(&frame.image),
        }
    }

    fn suppression_radius(&self) -> f64 {
        self.config
            .suppression_radius
            .unwrap_or_else(|| self.template.width().max(self.template.height()) as f64)
    }
}

impl BallDetector for TemplateDetector {
    fn detect(&self, frame: &VideoFrame, context: &DetectionContext) -> Option<Candidate> {
        if frame.width() < self.template.width() || frame.height() < self.template.height() {
            return None;
        }

        let scores = match_template(
            &self.prepare(frame),
            &self.template,
            MatchTemplateMethod::CrossCorrelationNormalized,
        );

        let half_w = self.template.width() as f64 / 2.0;
        let half_h = self.template.height() as f64 / 2.0;
        let centre = |x: u32, y: u32| Position::new(x as f64 + half_w - 0.5, y as f64 + half_h - 0.5);

        // Best peak that the continuity prior allows. Flat regions divide
        // by zero and come back as NaN; those never win a comparison.
        let mut best: Option<(f32, Position)> = None;
        for (x, y, s) in scores.enumerate_pixels() {
            let score = s[0];
            if !score.is_finite() || best.is_some_and(|(b, _)| score <= b) {
                continue;
            }
            let p = centre(x, y);
            if context.allows(&p, self.config.max_ball_speed, self.config.continuity_slack) {
                best = Some((score, p));
            }
        }

        let (best_score, position) = best?;
        if best_score < self.config.min_score {
            return None;
        }

        let radius = self.suppression_radius();
        let rival = scores
            .enumerate_pixels()
            .filter(|(x, y, _)| centre(*x, *y).distance_to(&position) > radius)
            .map(|(_, _, s)| s[0])
            .filter(|s| s.is_finite())
            .fold(f32::NEG_INFINITY, f32::max);

        if rival >= best_score - self.config.ambiguity_margin {
            tracing::debug!(
                frame = frame.index,
                best = best_score,
                rival,
                "Competing template peaks, no candidate"
            );
            return None;
        }

        Some(Candidate {
            position,
            confidence: (best_score as f64).clamp(0.0, 1.0),
            radius: half_w.min(half_h),
        })
    }

    fn name(&self) -> &str {
        "template"
    }
}
