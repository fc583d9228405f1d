//! The box C = [lo, hi], encoding bound constraints lo ≤ g(x) ≤ hi.

use nalgebra::{DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

use crate::error::{AlpineResult, SolverError};
use crate::sets::ConstraintSet;

/// Axis-aligned box with componentwise bounds.
#[derive(Debug, Clone)]
pub struct BoxSet {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl BoxSet {
    /// Build a box from componentwise bounds.
    ///
    /// Fails if the bound vectors differ in size or cross (`lower[i] >
    /// upper[i]` for some i). Infinite bounds are allowed and give one-sided
    /// intervals.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> AlpineResult<Self> {
        if lower.len() != upper.len() {
            return Err(SolverError::DimensionMismatch {
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        for i in 0..lower.len() {
            if lower[i] > upper[i] {
                return Err(SolverError::InvalidParameters(format!(
                    "box bounds cross at coordinate {i}: {} > {}",
                    lower[i], upper[i]
                )));
            }
        }
        Ok(BoxSet { lower, upper })
    }

    /// Scalar interval [lo, hi] repeated over `dim` coordinates.
    pub fn uniform(dim: usize, lo: f64, hi: f64) -> AlpineResult<Self> {
        Self::new(
            DVector::from_element(dim, lo),
            DVector::from_element(dim, hi),
        )
    }
}

impl ConstraintSet for BoxSet {
    fn projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].clamp(self.lower[i], self.upper[i]);
        }
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i] - z[i].clamp(self.lower[i], self.upper[i]);
        }
    }

    fn apply_normal_cone_projection_jacobian(
        &self,
        z: DVectorView<f64>,
        mut jac: DMatrixViewMut<f64>,
    ) {
        for i in 0..z.len() {
            if z[i] > self.lower[i] && z[i] < self.upper[i] {
                jac.row_mut(i).fill(0.0);
            }
        }
    }

    fn compute_active_set(&self, z: DVectorView<f64>, out: &mut [bool]) {
        for i in 0..z.len() {
            out[i] = z[i] <= self.lower[i] || z[i] >= self.upper[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::tests::check_projection_identities;
    use nalgebra::DMatrix;

    #[test]
    fn test_projection_identities() {
        let set = BoxSet::uniform(4, -1.0, 2.0).unwrap();
        let z = DVector::from_vec(vec![-3.0, 0.5, 2.0, 7.0]);
        check_projection_identities(&set, &z);
    }

    #[test]
    fn test_crossed_bounds_rejected() {
        let lower = DVector::from_vec(vec![0.0, 1.0]);
        let upper = DVector::from_vec(vec![1.0, 0.5]);
        assert!(BoxSet::new(lower, upper).is_err());
    }

    #[test]
    fn test_jacobian_kept_only_outside() {
        let set = BoxSet::uniform(3, 0.0, 1.0).unwrap();
        let z = DVector::from_vec(vec![-0.5, 0.5, 1.5]);
        let mut jac = DMatrix::from_element(3, 2, 1.0);
        set.apply_normal_cone_projection_jacobian(z.rows(0, 3), jac.rows_mut(0, 3));
        assert_eq!(jac.row(0).sum(), 2.0);
        assert_eq!(jac.row(1).sum(), 0.0);
        assert_eq!(jac.row(2).sum(), 2.0);
    }

    #[test]
    fn test_one_sided_interval() {
        let set = BoxSet::uniform(2, f64::NEG_INFINITY, 1.0).unwrap();
        let z = DVector::from_vec(vec![-100.0, 5.0]);
        let mut proj = DVector::zeros(2);
        set.projection(z.rows(0, 2), proj.rows_mut(0, 2));
        assert_eq!(proj[0], -100.0);
        assert_eq!(proj[1], 1.0);
    }
}
