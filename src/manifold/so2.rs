//! SO(2) - Special Orthogonal Group in 2D
//!
//! Rotations in the plane, represented as unit complex numbers stored as
//! `[cos θ, sin θ]`. The tangent space is the rotation angle, so nx = 2 and
//! ndx = 1.
//!
//! SO(2) is abelian, which keeps the exponential and logarithmic maps and
//! their Jacobians scalar: exp is `θ ↦ (cos θ, sin θ)` and log is `atan2`.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::manifold::{DifferenceArg, Manifold};

/// The circle group of planar rotations.
#[derive(Debug, Clone, Default)]
pub struct SO2;

impl SO2 {
    pub fn new() -> Self {
        SO2
    }

    /// Build the point representation from an angle in radians.
    pub fn from_angle(angle: f64) -> DVector<f64> {
        DVector::from_vec(vec![angle.cos(), angle.sin()])
    }

    /// Rotation angle of a point, in (-π, π].
    pub fn angle(x: &DVector<f64>) -> f64 {
        x[1].atan2(x[0])
    }
}

impl Manifold for SO2 {
    fn nx(&self) -> usize {
        2
    }

    fn ndx(&self) -> usize {
        1
    }

    fn neutral(&self) -> DVector<f64> {
        DVector::from_vec(vec![1.0, 0.0])
    }

    fn random(&self) -> DVector<f64> {
        let mut rng = rand::thread_rng();
        Self::from_angle(rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI))
    }

    /// out = x · exp(i v), i.e. rotate x by the angle v[0].
    fn integrate(&self, x: &DVector<f64>, v: &DVector<f64>, out: &mut DVector<f64>) {
        let (s, c) = v[0].sin_cos();
        let re = x[0] * c - x[1] * s;
        let im = x[0] * s + x[1] * c;
        out[0] = re;
        out[1] = im;
    }

    /// out = log(x⁻¹ · y), the relative angle from x to y.
    fn difference(&self, x: &DVector<f64>, y: &DVector<f64>, out: &mut DVector<f64>) {
        let re = x[0] * y[0] + x[1] * y[1];
        let im = x[0] * y[1] - x[1] * y[0];
        out[0] = im.atan2(re);
    }

    fn jacobian_difference(
        &self,
        _x: &DVector<f64>,
        _y: &DVector<f64>,
        jac: &mut DMatrix<f64>,
        arg: DifferenceArg,
    ) {
        jac[(0, 0)] = match arg {
            DifferenceArg::First => -1.0,
            DifferenceArg::Second => 1.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_angle_roundtrip() {
        let x = SO2::from_angle(0.75);
        assert!((SO2::angle(&x) - 0.75).abs() < TOLERANCE);
    }

    #[test]
    fn test_difference_wraps() {
        let space = SO2::new();
        let x = SO2::from_angle(3.0);
        let y = SO2::from_angle(-3.0);
        let mut d = DVector::zeros(1);
        space.difference(&x, &y, &mut d);
        // going from +3 rad to -3 rad is a short hop across the cut
        assert!((d[0] - (2.0 * std::f64::consts::PI - 6.0)).abs() < TOLERANCE);
    }

    #[test]
    fn test_points_stay_unit_norm() {
        let space = SO2::new();
        let mut x = space.random();
        let v = DVector::from_vec(vec![0.3]);
        let mut y = DVector::zeros(2);
        for _ in 0..100 {
            space.integrate(&x, &v, &mut y);
            x.copy_from(&y);
        }
        assert!((x.norm() - 1.0).abs() < 1e-10);
    }
}
