//! Synthetic delivery rendering.
//!
//! Produces a side-on view of a delivery matching the default calibration:
//! ball released on the left, travelling right, bouncing once on the
//! pitch and passing the stumps on the right. Used by the `synth` command
//! and by end-to-end tests.

use drs_delivery_model::Position;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use crate::frame::{frame_time_ms, VideoFrame};

pub const GRASS: Rgb<u8> = Rgb([40, 110, 50]);
pub const PITCH_STRIP: Rgb<u8> = Rgb([190, 170, 120]);
pub const STUMPS: Rgb<u8> = Rgb([235, 230, 215]);
pub const BALL: Rgb<u8> = Rgb([200, 30, 30]);

/// Gravity in pixels/s^2 at the default scale of 0.0359 m/px.
const GRAVITY_PX: f64 = 273.0;

/// Parameters of a synthetic delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDelivery {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub frame_rate: f64,

    /// Frame at which the ball touches the ground.
    pub bounce_frame: u32,

    /// Release point (pixels).
    pub release: Position,

    /// Horizontal speed (pixels/s).
    pub speed: f64,

    /// Ball-centre height of the ground contact (image y).
    pub ground_y: f64,

    /// Fraction of vertical speed kept through the bounce.
    pub restitution: f64,

    pub ball_radius: u32,

    /// Frames in which the ball is hidden.
    pub occluded: Vec<u32>,
}

impl Default for SyntheticDelivery {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            frames: 60,
            frame_rate: 60.0,
            bounce_frame: 36,
            release: Position::new(40.0, 150.0),
            speed: 700.0,
            ground_y: 358.0,
            restitution: 0.2,
            ball_radius: 5,
            occluded: vec![],
        }
    }
}

impl SyntheticDelivery {
    /// True ball centre at `frame`.
    pub fn ball_position(&self, frame: u32) -> Position {
        let t = frame as f64 / self.frame_rate;
        let t_bounce = self.bounce_frame as f64 / self.frame_rate;
        let x = self.release.x + self.speed * t;

        // Initial descent chosen so the ball lands exactly at the bounce frame.
        let drop = self.ground_y - self.release.y;
        let vy0 = if t_bounce > 0.0 {
            (drop - 0.5 * GRAVITY_PX * t_bounce * t_bounce) / t_bounce
        } else {
            0.0
        };

        let y = if t <= t_bounce {
            self.release.y + vy0 * t + 0.5 * GRAVITY_PX * t * t
        } else {
            let impact_vy = vy0 + GRAVITY_PX * t_bounce;
            let dt = t - t_bounce;
            self.ground_y - self.restitution * impact_vy * dt + 0.5 * GRAVITY_PX * dt * dt
        };

        Position::new(x, y.min(self.ground_y))
    }

    /// Empty scene: grass, pitch strip and stumps.
    pub fn background(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, GRASS);
        let strip_top = (self.ground_y as i32 - 20).max(0);
        let strip_h = self.height.saturating_sub(strip_top as u32).max(1);
        draw_filled_rect_mut(
            &mut img,
            Rect::at(0, strip_top).of_size(self.width, strip_h),
            PITCH_STRIP,
        );
        draw_filled_rect_mut(&mut img, Rect::at(616, 340).of_size(8, 20), STUMPS);
        img
    }

    pub fn render_frame(&self, frame: u32) -> VideoFrame {
        let mut img = self.background();
        if !self.occluded.contains(&frame) {
            let p = self.ball_position(frame);
            draw_filled_circle_mut(
                &mut img,
                (p.x.round() as i32, p.y.round() as i32),
                self.ball_radius as i32,
                BALL,
            );
        }
        VideoFrame::new(frame as u64, frame_time_ms(frame as u64, self.frame_rate), img)
    }

    pub fn render(&self) -> Vec<VideoFrame> {
        (0..self.frames).map(|f| self.render_frame(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_lands_on_bounce_frame() {
        let d = SyntheticDelivery::default();
        let p = d.ball_position(d.bounce_frame);
        assert!((p.y - d.ground_y).abs() < 1e-9);
        assert!(d.ball_position(d.bounce_frame - 1).y < d.ground_y);
        assert!(d.ball_position(d.bounce_frame + 1).y < d.ground_y);
    }

    #[test]
    fn test_ball_descends_then_rises() {
        let d = SyntheticDelivery::default();
        let before = d.ball_position(10).y - d.ball_position(9).y;
        let after = d.ball_position(d.bounce_frame + 2).y - d.ball_position(d.bounce_frame + 1).y;
        assert!(before > 0.0);
        assert!(after < 0.0);
    }

    #[test]
    fn test_occluded_frame_has_no_ball() {
        let d = SyntheticDelivery {
            occluded: vec![5],
            ..SyntheticDelivery::default()
        };
        let frame = d.render_frame(5);
        let p = d.ball_position(5);
        assert_eq!(*frame.image.get_pixel(p.x as u32, p.y as u32), GRASS);
        let visible = d.render_frame(6);
        let q = d.ball_position(6);
        assert_eq!(
            *visible.image.get_pixel(q.x.round() as u32, q.y.round() as u32),
            BALL
        );
    }
}
