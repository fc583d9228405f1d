//! The negative orthant C = ℝ₋ʳ, encoding inequality constraints g(x) ≤ 0.

use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};

use crate::sets::ConstraintSet;

/// Componentwise nonpositivity set.
///
/// Π_C(z) = min(z, 0) and Π_N(z) = max(z, 0); the generalized Jacobian of Π_N
/// keeps exactly the rows where the shifted residual is nonnegative.
#[derive(Debug, Clone, Default)]
pub struct NegativeOrthant;

impl NegativeOrthant {
    pub fn new() -> Self {
        NegativeOrthant
    }
}

impl ConstraintSet for NegativeOrthant {
    fn projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].min(0.0);
        }
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        for i in 0..z.len() {
            out[i] = z[i].max(0.0);
        }
    }

    fn apply_normal_cone_projection_jacobian(
        &self,
        z: DVectorView<f64>,
        mut jac: DMatrixViewMut<f64>,
    ) {
        for i in 0..z.len() {
            if z[i] < 0.0 {
                jac.row_mut(i).fill(0.0);
            }
        }
    }

    fn compute_active_set(&self, z: DVectorView<f64>, out: &mut [bool]) {
        for i in 0..z.len() {
            out[i] = z[i] >= 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::tests::check_projection_identities;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn test_projection_identities() {
        let set = NegativeOrthant::new();
        let z = DVector::from_vec(vec![1.5, -0.25, 0.0, -3.0]);
        check_projection_identities(&set, &z);
    }

    #[test]
    fn test_jacobian_masks_inactive_rows() {
        let set = NegativeOrthant::new();
        let z = DVector::from_vec(vec![0.5, -0.5]);
        let mut jac = DMatrix::from_element(2, 3, 1.0);
        set.apply_normal_cone_projection_jacobian(z.rows(0, 2), jac.rows_mut(0, 2));
        assert_eq!(jac.row(0).sum(), 3.0);
        assert_eq!(jac.row(1).sum(), 0.0);
    }

    #[test]
    fn test_active_set_at_boundary() {
        let set = NegativeOrthant::new();
        let z = DVector::from_vec(vec![0.0, -1e-9, 2.0]);
        let mut active = [false; 3];
        set.compute_active_set(z.rows(0, 3), &mut active);
        assert_eq!(active, [true, false, true]);
    }
}
