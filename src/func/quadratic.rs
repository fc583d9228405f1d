//! Weighted squared distance to a target point on a manifold.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::func::Cost;
use crate::manifold::{DifferenceArg, Manifold};

/// f(x) = ½ d(x, x̄)ᵀ W d(x, x̄) with d(x, x̄) = x ⊖ x̄.
///
/// W is a symmetric PSD weight matrix on the tangent space. The Hessian uses
/// the Gauss-Newton form JᵀWJ through the difference Jacobian, which is exact
/// on vector spaces and the standard approximation elsewhere.
pub struct QuadraticDistanceCost {
    manifold: Arc<dyn Manifold>,
    target: DVector<f64>,
    weights: DMatrix<f64>,
}

impl QuadraticDistanceCost {
    pub fn new(manifold: Arc<dyn Manifold>, target: DVector<f64>, weights: DMatrix<f64>) -> Self {
        let ndx = manifold.ndx();
        assert_eq!(target.len(), manifold.nx(), "target point size mismatch");
        assert_eq!(weights.nrows(), ndx, "weight matrix must be ndx x ndx");
        assert_eq!(weights.ncols(), ndx, "weight matrix must be ndx x ndx");
        QuadraticDistanceCost {
            manifold,
            target,
            weights,
        }
    }

    /// Identity weights.
    pub fn unweighted(manifold: Arc<dyn Manifold>, target: DVector<f64>) -> Self {
        let ndx = manifold.ndx();
        Self::new(manifold, target, DMatrix::identity(ndx, ndx))
    }

    /// Move the reference point.
    pub fn set_target(&mut self, target: &DVector<f64>) {
        self.target.copy_from(target);
    }

    pub fn target(&self) -> &DVector<f64> {
        &self.target
    }

    pub(crate) fn weights_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.weights
    }

    fn displacement(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut d = DVector::zeros(self.manifold.ndx());
        self.manifold.difference(&self.target, x, &mut d);
        d
    }
}

impl Cost for QuadraticDistanceCost {
    fn nx(&self) -> usize {
        self.manifold.nx()
    }

    fn ndx(&self) -> usize {
        self.manifold.ndx()
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        let d = self.displacement(x);
        0.5 * d.dot(&(&self.weights * &d))
    }

    fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        let ndx = self.manifold.ndx();
        let d = self.displacement(x);
        let mut jac = DMatrix::zeros(ndx, ndx);
        self.manifold
            .jacobian_difference(&self.target, x, &mut jac, DifferenceArg::Second);
        out.gemv_tr(1.0, &jac, &(&self.weights * &d), 0.0);
    }

    fn hessian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>) {
        let ndx = self.manifold.ndx();
        let mut jac = DMatrix::zeros(ndx, ndx);
        self.manifold
            .jacobian_difference(&self.target, x, &mut jac, DifferenceArg::Second);
        out.copy_from(&(jac.transpose() * &self.weights * &jac));
    }
}
