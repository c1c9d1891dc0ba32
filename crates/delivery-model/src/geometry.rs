//! Planar geometry types.
//!
//! Positions are in the coordinate system of the analyzed frames: image
//! pixels, or meters if the frames were rectified beforehand. The
//! calibration record says which, via its metric scale.

use serde::{Deserialize, Serialize};

/// A point in the analysis plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A rate of change of position, in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Displacement from `self` to `other`.
    pub fn delta_to(&self, other: &Position) -> Velocity {
        Velocity::new(other.x - self.x, other.y - self.y)
    }

    /// Move by `v` for `secs` seconds.
    pub fn advanced(&self, v: &Velocity, secs: f64) -> Position {
        Position::new(self.x + v.vx * secs, self.y + v.vy * secs)
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Position, b: &Position, t: f64) -> Position {
        let t = t.clamp(0.0, 1.0);
        Position {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0 };

    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    pub fn dot(&self, other: &Velocity) -> f64 {
        self.vx * other.vx + self.vy * other.vy
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Velocity) -> f64 {
        self.vx * other.vy - self.vy * other.vx
    }

    pub fn scaled(&self, factor: f64) -> Velocity {
        Velocity::new(self.vx * factor, self.vy * factor)
    }

    /// Unit vector in the same direction, or `None` for a zero vector.
    pub fn normalized(&self) -> Option<Velocity> {
        let m = self.magnitude();
        (m > f64::EPSILON && m.is_finite()).then(|| self.scaled(1.0 / m))
    }

    /// Counter-clockwise rotation by `radians`.
    pub fn rotated(&self, radians: f64) -> Velocity {
        let (s, c) = radians.sin_cos();
        Velocity::new(self.vx * c - self.vy * s, self.vx * s + self.vy * c)
    }

    /// Signed angle from `self` to `other` in radians, in `(-π, π]`.
    pub fn angle_to(&self, other: &Velocity) -> f64 {
        self.cross(other).atan2(self.dot(other))
    }

    /// Component-wise mean; `None` for an empty iterator.
    pub fn mean<'a, I: IntoIterator<Item = &'a Velocity>>(items: I) -> Option<Velocity> {
        let (sum, n) = items
            .into_iter()
            .fold((Velocity::ZERO, 0usize), |(acc, n), v| {
                (Velocity::new(acc.vx + v.vx, acc.vy + v.vy), n + 1)
            });
        (n > 0).then(|| sum.scaled(1.0 / n as f64))
    }
}

/// An axis-aligned rectangle in the analysis plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Whether the rectangle has positive area.
    pub fn is_proper(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// Closed containment test.
    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Strict interior test.
    pub fn contains_strictly(&self, p: &Position) -> bool {
        p.x > self.min_x && p.x < self.max_x && p.y > self.min_y && p.y < self.max_y
    }

    /// Signed distance from `p` to the rectangle boundary: positive inside
    /// (distance to the nearest edge), negative outside (distance to the
    /// rectangle), zero on the boundary.
    pub fn signed_margin(&self, p: &Position) -> f64 {
        let dx_out = (self.min_x - p.x).max(p.x - self.max_x);
        let dy_out = (self.min_y - p.y).max(p.y - self.max_y);

        if dx_out <= 0.0 && dy_out <= 0.0 {
            // Inside: the least negative of the two is the nearest edge
            -dx_out.max(dy_out)
        } else {
            -(dx_out.max(0.0).hypot(dy_out.max(0.0)))
        }
    }

    /// Half of the shorter side.
    pub fn min_half_extent(&self) -> f64 {
        self.width().min(self.height()) / 2.0
    }
}
