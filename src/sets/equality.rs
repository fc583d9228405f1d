//! The zero set C = {0}, encoding equality constraints g(x) = 0.

use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};

use crate::sets::ConstraintSet;

/// Equality constraint set: projection collapses everything to the origin and
/// the normal cone is the whole space.
#[derive(Debug, Clone, Default)]
pub struct EqualitySet;

impl EqualitySet {
    pub fn new() -> Self {
        EqualitySet
    }
}

impl ConstraintSet for EqualitySet {
    fn projection(&self, _z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        out.fill(0.0);
    }

    fn normal_cone_projection(&self, z: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        out.copy_from(&z);
    }

    fn apply_normal_cone_projection_jacobian(
        &self,
        _z: DVectorView<f64>,
        _jac: DMatrixViewMut<f64>,
    ) {
        // Π_N is the identity here.
    }

    fn compute_active_set(&self, _z: DVectorView<f64>, out: &mut [bool]) {
        out.fill(true);
    }

    /// The multiplier term carries all the curvature information for an
    /// equality constraint, so the Gauss-Newton approximation drops its
    /// vector-Hessian product.
    fn disable_gauss_newton(&self) -> bool {
        true
    }
}
