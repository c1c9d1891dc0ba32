//! Playback clock for slow-motion review of a tracked delivery.
//!
//! The clock owns a cursor over an analyzed frame sequence and advances it
//! at `frame_rate * speed`. It never reads the system time itself: callers
//! pass a monotonic nanosecond timestamp to [`PlaybackClock::tick`], so a
//! renderer, a test, or a CLI loop can all drive it the same way.

use crate::error::{DrsError, DrsResult};

/// Playback speed presets offered by the review player.
pub const PLAYBACK_SPEEDS: [f64; 5] = [0.1, 0.25, 0.5, 1.0, 2.0];

/// Speed a freshly created clock plays at.
pub const DEFAULT_PLAYBACK_SPEED: f64 = 0.25;

/// State of a playback clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Cursor is held in place.
    Paused,
    /// Cursor advances on each due tick.
    Playing,
    /// Cursor reached the last frame while playing.
    Ended,
    /// Clock was cancelled; every operation is a no-op from here on.
    Cancelled,
}

/// Cancellable frame cursor driven by caller-supplied time.
#[derive(Debug)]
pub struct PlaybackClock {
    frame_count: usize,
    frame_rate: f64,
    speed: f64,
    cursor: usize,
    state: PlaybackState,
    rate: RateController,
}

impl PlaybackClock {
    /// Create a paused clock over `frame_count` frames recorded at `frame_rate`.
    pub fn new(frame_count: usize, frame_rate: f64) -> DrsResult<Self> {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(DrsError::config(format!(
                "Playback frame rate must be positive, got {frame_rate}"
            )));
        }

        Ok(Self {
            frame_count,
            frame_rate,
            speed: DEFAULT_PLAYBACK_SPEED,
            cursor: 0,
            state: PlaybackState::Paused,
            rate: RateController::with_interval_ns(interval_ns(frame_rate, DEFAULT_PLAYBACK_SPEED)),
        })
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current playback speed multiplier.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Number of frames the clock walks over.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Begin playing from the current cursor. The first frame advance
    /// happens one interval after `now_ns`.
    pub fn start(&mut self, now_ns: u64) {
        match self.state {
            PlaybackState::Cancelled | PlaybackState::Playing => {}
            _ if self.frame_count == 0 || self.cursor + 1 >= self.frame_count => {
                self.state = PlaybackState::Ended;
            }
            _ => {
                self.rate.reset_at(now_ns);
                self.state = PlaybackState::Playing;
            }
        }
    }

    /// Hold the cursor.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Advance the cursor if a frame interval has elapsed.
    ///
    /// Returns the new cursor when it moved.
    pub fn tick(&mut self, now_ns: u64) -> Option<usize> {
        if self.state != PlaybackState::Playing || !self.rate.should_tick(now_ns) {
            return None;
        }

        self.cursor += 1;
        if self.cursor + 1 >= self.frame_count {
            self.cursor = self.frame_count.saturating_sub(1);
            self.state = PlaybackState::Ended;
        }
        Some(self.cursor)
    }

    /// Move the cursor to `frame`, clamped to the sequence.
    pub fn seek(&mut self, frame: usize) {
        if self.state == PlaybackState::Cancelled {
            return;
        }
        self.cursor = frame.min(self.frame_count.saturating_sub(1));
        if self.state == PlaybackState::Ended && self.cursor + 1 < self.frame_count {
            self.state = PlaybackState::Paused;
        }
    }

    /// Step one frame forward.
    pub fn step_forward(&mut self) {
        self.seek(self.cursor.saturating_add(1));
    }

    /// Step one frame backward.
    pub fn step_backward(&mut self) {
        self.seek(self.cursor.saturating_sub(1));
    }

    /// Return to the first frame and stop playing.
    pub fn rewind(&mut self) {
        if self.state == PlaybackState::Cancelled {
            return;
        }
        self.cursor = 0;
        self.state = PlaybackState::Paused;
    }

    /// Jump to the last frame.
    pub fn jump_to_end(&mut self) {
        self.seek(self.frame_count.saturating_sub(1));
    }

    /// Change the playback speed; takes effect from the next interval.
    pub fn set_speed(&mut self, speed: f64) -> DrsResult<()> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(DrsError::config(format!(
                "Playback speed must be positive, got {speed}"
            )));
        }
        self.speed = speed;
        self.rate.set_interval_ns(interval_ns(self.frame_rate, speed));
        Ok(())
    }

    /// Stop the clock for good.
    pub fn cancel(&mut self) {
        self.state = PlaybackState::Cancelled;
    }

    /// Wall-clock interval between frame advances at the current speed.
    pub fn interval_ns(&self) -> u64 {
        self.rate.interval_ns()
    }
}

fn interval_ns(frame_rate: f64, speed: f64) -> u64 {
    (1_000_000_000.0 / (frame_rate * speed)).round().max(1.0) as u64
}

/// Fixed-interval tick gate.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller with an explicit interval.
    pub fn with_interval_ns(interval_ns: u64) -> Self {
        Self {
            target_interval_ns: interval_ns.max(1),
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Treat `current_ns` as the last tick, so the next one is a full interval away.
    pub fn reset_at(&mut self, current_ns: u64) {
        self.last_tick_ns = Some(current_ns);
    }

    /// Replace the interval without losing the last tick time.
    pub fn set_interval_ns(&mut self, interval_ns: u64) {
        self.target_interval_ns = interval_ns.max(1);
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::with_interval_ns(16_666_667);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(MS)); // 1ms later, too soon
        assert!(ctrl.should_tick(17 * MS)); // ~17ms later, should fire (60Hz ~ 16.67ms)
    }

    #[test]
    fn test_default_speed_is_quarter() {
        let clock = PlaybackClock::new(60, 60.0).unwrap();
        assert_eq!(clock.speed(), 0.25);
        // 60fps at 0.25x → one frame every ~66.7ms
        assert_eq!(clock.interval_ns(), 66_666_667);
    }

    #[test]
    fn test_start_does_not_advance_immediately() {
        let mut clock = PlaybackClock::new(10, 60.0).unwrap();
        clock.set_speed(1.0).unwrap();
        clock.start(0);
        assert_eq!(clock.tick(0), None);
        assert_eq!(clock.tick(10 * MS), None);
        assert_eq!(clock.tick(17 * MS), Some(1));
    }

    #[test]
    fn test_playback_stops_at_last_frame() {
        let mut clock = PlaybackClock::new(3, 60.0).unwrap();
        clock.set_speed(1.0).unwrap();
        clock.start(0);
        assert_eq!(clock.tick(20 * MS), Some(1));
        assert_eq!(clock.tick(40 * MS), Some(2));
        assert_eq!(clock.state(), PlaybackState::Ended);
        assert_eq!(clock.tick(60 * MS), None);
        assert_eq!(clock.cursor(), 2);
    }

    #[test]
    fn test_pause_holds_cursor() {
        let mut clock = PlaybackClock::new(10, 60.0).unwrap();
        clock.set_speed(2.0).unwrap();
        clock.start(0);
        assert_eq!(clock.tick(9 * MS), Some(1));
        clock.pause();
        assert_eq!(clock.tick(100 * MS), None);
        assert_eq!(clock.cursor(), 1);
    }

    #[test]
    fn test_seek_and_steps_clamp() {
        let mut clock = PlaybackClock::new(5, 60.0).unwrap();
        clock.seek(99);
        assert_eq!(clock.cursor(), 4);
        clock.step_forward();
        assert_eq!(clock.cursor(), 4);
        clock.rewind();
        clock.step_backward();
        assert_eq!(clock.cursor(), 0);
        clock.jump_to_end();
        assert_eq!(clock.cursor(), 4);
    }

    #[test]
    fn test_seek_back_after_end_allows_replay() {
        let mut clock = PlaybackClock::new(2, 60.0).unwrap();
        clock.set_speed(1.0).unwrap();
        clock.start(0);
        assert_eq!(clock.tick(20 * MS), Some(1));
        assert_eq!(clock.state(), PlaybackState::Ended);
        clock.seek(0);
        assert_eq!(clock.state(), PlaybackState::Paused);
        clock.start(30 * MS);
        assert_eq!(clock.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut clock = PlaybackClock::new(10, 60.0).unwrap();
        clock.start(0);
        clock.cancel();
        clock.start(0);
        clock.seek(3);
        assert_eq!(clock.state(), PlaybackState::Cancelled);
        assert_eq!(clock.tick(1_000 * MS), None);
        assert_eq!(clock.cursor(), 0);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let mut clock = PlaybackClock::new(10, 60.0).unwrap();
        assert!(clock.set_speed(0.0).is_err());
        assert!(clock.set_speed(f64::NAN).is_err());
        assert!(PlaybackClock::new(10, 0.0).is_err());
    }

    #[test]
    fn test_empty_sequence_ends_on_start() {
        let mut clock = PlaybackClock::new(0, 60.0).unwrap();
        clock.start(0);
        assert_eq!(clock.state(), PlaybackState::Ended);
    }
}
