//! Constant-acceleration Kalman filter over planar position.
//!
//! State is `[px, py, vx, vy, ax, ay]`; the measurement is position.

use drs_delivery_model::{Position, Velocity};
use nalgebra::{Matrix2, Matrix2x6, Matrix6, Vector2, Vector6};

const POS_X: usize = 0;
const VEL_X: usize = 2;
const ACC_X: usize = 4;

#[derive(Debug, Clone)]
pub(crate) struct MotionFilter {
    x: Vector6<f64>,
    p: Matrix6<f64>,
    jerk_noise: f64,
}

/// Result of testing a measurement against the filter's prediction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Innovation {
    residual: Vector2<f64>,
    s_inv: Matrix2<f64>,
    /// Squared Mahalanobis distance.
    pub distance_sq: f64,
}

impl MotionFilter {
    pub fn new(
        position: Position,
        velocity: Velocity,
        variances: [f64; 3],
        jerk_noise: f64,
    ) -> Self {
        let x = Vector6::new(position.x, position.y, velocity.vx, velocity.vy, 0.0, 0.0);
        let [pos_var, vel_var, acc_var] = variances;
        let p = Matrix6::from_diagonal(&Vector6::new(
            pos_var, pos_var, vel_var, vel_var, acc_var, acc_var,
        ));
        Self { x, p, jerk_noise }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x[POS_X], self.x[POS_X + 1])
    }

    pub fn velocity(&self) -> Velocity {
        Velocity::new(self.x[VEL_X], self.x[VEL_X + 1])
    }

    /// Advance the state by `dt` seconds.
    pub fn predict(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let f = transition(dt);
        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + process_noise(self.jerk_noise, dt);
    }

    /// Compare a measurement with measurement variance `r` to the current
    /// prediction. `None` if the innovation covariance is singular.
    pub fn innovation(&self, z: &Position, r: f64) -> Option<Innovation> {
        let h = observation();
        let residual = Vector2::new(z.x, z.y) - h * self.x;
        let s = h * self.p * h.transpose() + Matrix2::identity() * r;
        let s_inv = s.try_inverse()?;
        let distance_sq = (residual.transpose() * s_inv * residual)[(0, 0)];
        distance_sq.is_finite().then_some(Innovation {
            residual,
            s_inv,
            distance_sq,
        })
    }

    /// Apply a measurement previously tested with [`Self::innovation`].
    pub fn correct(&mut self, innovation: &Innovation) {
        let h = observation();
        let k = self.p * h.transpose() * innovation.s_inv;
        self.x += k * innovation.residual;
        self.p = (Matrix6::identity() - k * h) * self.p;
        // Keep P symmetric against round-off.
        self.p = (self.p + self.p.transpose()) * 0.5;
    }

    /// Widen velocity and acceleration uncertainty by `factor`.
    pub fn inflate_dynamics(&mut self, factor: f64) {
        for i in VEL_X..6 {
            self.p[(i, i)] *= factor;
        }
    }
}

fn transition(dt: f64) -> Matrix6<f64> {
    let mut f = Matrix6::identity();
    for axis in 0..2 {
        f[(POS_X + axis, VEL_X + axis)] = dt;
        f[(POS_X + axis, ACC_X + axis)] = 0.5 * dt * dt;
        f[(VEL_X + axis, ACC_X + axis)] = dt;
    }
    f
}

/// Discrete white-jerk process noise.
fn process_noise(q: f64, dt: f64) -> Matrix6<f64> {
    let block = [
        [dt.powi(5) / 20.0, dt.powi(4) / 8.0, dt.powi(3) / 6.0],
        [dt.powi(4) / 8.0, dt.powi(3) / 3.0, dt.powi(2) / 2.0],
        [dt.powi(3) / 6.0, dt.powi(2) / 2.0, dt],
    ];
    let mut m = Matrix6::zeros();
    for axis in 0..2 {
        let idx = [POS_X + axis, VEL_X + axis, ACC_X + axis];
        for (i, row) in block.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                m[(idx[i], idx[j])] = q * v;
            }
        }
    }
    m
}

fn observation() -> Matrix2x6<f64> {
    let mut h = Matrix2x6::zeros();
    h[(0, POS_X)] = 1.0;
    h[(1, POS_X + 1)] = 1.0;
    h
}
