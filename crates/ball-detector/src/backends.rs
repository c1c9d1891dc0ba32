//! Ball detector backends.
//!
//! Each backend turns one frame into at most one [`Candidate`](crate::Candidate).

mod color_blob;
mod template;

use std::path::Path;

use drs_common::error::{DrsError, DrsResult};
use image::Rgb;

pub use color_blob::{ColorBlobConfig, ColorBlobDetector};
pub use template::{TemplateConfig, TemplateDetector};

use crate::BallDetector;

/// Selectable detector backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorKind {
    #[default]
    ColorBlob,
    Template,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::ColorBlob => "color-blob",
            DetectorKind::Template => "template",
        }
    }
}

impl std::str::FromStr for DetectorKind {
    type Err = DrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" | "color-blob" => Ok(DetectorKind::ColorBlob),
            "template" => Ok(DetectorKind::Template),
            other => Err(DrsError::config(format!("unknown detector '{other}'"))),
        }
    }
}

/// Build a detector for `kind`.
///
/// The template backend loads `template_path` when given and otherwise
/// uses a disc of the expected ball radius.
pub fn build_detector(
    kind: DetectorKind,
    ball_color: Rgb<u8>,
    template_path: Option<&Path>,
) -> DrsResult<Box<dyn BallDetector>> {
    let detector: Box<dyn BallDetector> = match kind {
        DetectorKind::ColorBlob => Box::new(ColorBlobDetector::new(ColorBlobConfig {
            target: ball_color,
            ..ColorBlobConfig::default()
        })),
        DetectorKind::Template => {
            let config = TemplateConfig {
                target: Some(ball_color),
                ..TemplateConfig::default()
            };
            match template_path {
                Some(path) => TemplateDetector::from_path(path, config)?,
                None => TemplateDetector::disc(5, config),
            }
            .boxed()
        }
    };

    tracing::info!(backend = detector.name(), "Ball detector ready");
    Ok(detector)
}

/// Euclidean RGB distance.
pub(crate) fn color_distance(a: &Rgb<u8>, b: &Rgb<u8>) -> f64 {
    let d = |i: usize| a[i] as f64 - b[i] as f64;
    (d(0).powi(2) + d(1).powi(2) + d(2).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_kind_parsing() {
        assert_eq!("blob".parse::<DetectorKind>().unwrap(), DetectorKind::ColorBlob);
        assert_eq!(
            "template".parse::<DetectorKind>().unwrap(),
            DetectorKind::Template
        );
        assert!("hough".parse::<DetectorKind>().is_err());
    }

    #[test]
    fn test_build_detector_names() {
        let red = Rgb([200, 30, 30]);
        let blob = build_detector(DetectorKind::ColorBlob, red, None).unwrap();
        assert_eq!(blob.name(), "color-blob");
        let template = build_detector(DetectorKind::Template, red, None).unwrap();
        assert_eq!(template.name(), "template");
    }

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance(&Rgb([0, 0, 0]), &Rgb([3, 4, 0])), 5.0);
    }
}
