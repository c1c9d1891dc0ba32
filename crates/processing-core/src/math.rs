//! Small numeric helpers.

use nalgebra as na;

/// Least-squares fit of `y = a x^2 + b x + c`, returned as `[a, b, c]`.
///
/// Solves the normal equations by QR. Returns `None` when the system is
/// singular (fewer than three distinct `x`).
pub fn quadratic_ls(x: &na::DVector<f64>, y: &na::DVector<f64>) -> Option<na::Vector3<f64>> {
    if x.len() < 3 || x.len() != y.len() {
        return None;
    }

    let n = x.len() as f64;
    let s_x1 = x.sum();
    let x2 = x.map(|v| v * v);
    let s_x2 = x2.sum();
    let x3 = x2.zip_map(x, |a, b| a * b);
    let s_x3 = x3.sum();
    let s_x4 = x3.zip_map(x, |a, b| a * b).sum();
    let s_x2y = x2.zip_map(y, |a, b| a * b).sum();
    let s_xy = x.zip_map(y, |a, b| a * b).sum();
    let s_y = y.sum();

    let a = na::Matrix3::new(s_x4, s_x3, s_x2, s_x3, s_x2, s_x1, s_x2, s_x1, n);
    let b = na::Vector3::new(s_x2y, s_xy, s_y);

    let qr = a.qr();
    let qty = qr.q().transpose() * b;
    let r = qr.r();

    // A near-zero pivot means the points do not pin down a parabola.
    let scale = r.diagonal().amax().max(f64::MIN_POSITIVE);
    if r.diagonal().iter().any(|d| d.abs() <= scale * 1e-12) {
        return None;
    }

    r.solve_upper_triangular(&qty)
        .filter(|beta| beta.iter().all(|v| v.is_finite()))
}

/// Algebraic sigmoid `0.5 + 0.5 x / (1 + |x|)`, mapping the real line
/// onto (0, 1).
///
/// Unlike the logistic function its tails decay as `1/|x|`, so it stays
/// strictly monotonic in `f64` far from the origin. Each branch is
/// evaluated without cancellation.
pub fn soft_step(x: f64) -> f64 {
    if x < 0.0 {
        0.5 / (1.0 - x)
    } else {
        1.0 - 0.5 / (1.0 + x)
    }
}

/// Smallest strictly positive root of `a t^2 + b t + c = 0`.
pub fn smallest_positive_root(a: f64, b: f64, c: f64) -> Option<f64> {
    const EPS: f64 = 1e-12;

    let roots: Vec<f64> = if a.abs() < EPS {
        if b.abs() < EPS {
            vec![]
        } else {
            vec![-c / b]
        }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            vec![]
        } else {
            // Numerically stable form
            let sq = disc.sqrt();
            let q = -0.5 * (b + b.signum() * sq);
            let mut r = vec![q / a];
            if q.abs() > EPS {
                r.push(c / q);
            } else {
                r.push(-b / (2.0 * a));
            }
            r
        }
    };

    roots
        .into_iter()
        .filter(|t| t.is_finite() && *t > EPS)
        .min_by(|a, b| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_ls_recovers_parabola() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64 - 4.5).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x * x - 2.0 * x + 3.0).collect();
        let beta = quadratic_ls(&na::DVector::from_vec(xs), &na::DVector::from_vec(ys)).unwrap();
        assert!((beta[0] - 0.5).abs() < 1e-9);
        assert!((beta[1] + 2.0).abs() < 1e-9);
        assert!((beta[2] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_quadratic_ls_needs_three_points() {
        let x = na::DVector::from_vec(vec![0.0, 1.0]);
        let y = na::DVector::from_vec(vec![0.0, 1.0]);
        assert!(quadratic_ls(&x, &y).is_none());
    }

    #[test]
    fn test_quadratic_ls_degenerate_x() {
        let x = na::DVector::from_vec(vec![2.0, 2.0, 2.0, 2.0]);
        let y = na::DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(quadratic_ls(&x, &y).is_none());
    }

    #[test]
    fn test_soft_step_shape() {
        assert_eq!(soft_step(0.0), 0.5);
        assert!((soft_step(1.0) - 0.75).abs() < 1e-15);
        assert!((soft_step(-1.0) - 0.25).abs() < 1e-15);
        assert!((soft_step(3.0) + soft_step(-3.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_soft_step_tails_keep_falling() {
        let mut prev = soft_step(-1.0);
        for x in [-10.0, -1e3, -1e6, -1e12, -1e100] {
            let v = soft_step(x);
            assert!(v > 0.0 && v < prev, "soft_step({x}) = {v}");
            prev = v;
        }
        assert!(soft_step(1e12) < 1.0);
    }

    #[test]
    fn test_smallest_positive_root() {
        // (t - 1)(t - 3)
        assert!((smallest_positive_root(1.0, -4.0, 3.0).unwrap() - 1.0).abs() < 1e-12);
        // linear: 2t - 4
        assert!((smallest_positive_root(0.0, 2.0, -4.0).unwrap() - 2.0).abs() < 1e-12);
        // t^2 + 1 has no real roots
        assert!(smallest_positive_root(1.0, 0.0, 1.0).is_none());
        // both roots negative
        assert!(smallest_positive_root(1.0, 3.0, 2.0).is_none());
    }
}
