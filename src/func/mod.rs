//! Cost and residual function interfaces.
//!
//! The solver consumes derivatives, it never computes them: a problem is
//! assembled from a twice-differentiable cost and a sequence of
//! twice-differentiable constraint residuals, each supplying its own
//! gradient/Jacobian/Hessian evaluations.

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

pub mod linear;
pub mod quadratic;
pub mod state_residual;

pub use linear::LinearFunction;
pub use quadratic::QuadraticDistanceCost;
pub use state_residual::ManifoldDifference;

/// A twice-differentiable scalar cost on a manifold.
pub trait Cost {
    /// Size of the ambient point representation.
    fn nx(&self) -> usize;

    /// Tangent-space dimension the derivatives are expressed in.
    fn ndx(&self) -> usize;

    /// Cost value f(x).
    fn value(&self, x: &DVector<f64>) -> f64;

    /// Tangent-space gradient, written into `out` (ndx).
    fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>);

    /// Tangent-space Hessian, written into `out` (ndx × ndx).
    fn hessian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>);
}

/// A twice-differentiable vector-valued map g : M → ℝʳ used as a constraint
/// residual.
pub trait C2Function {
    /// Size of the ambient point representation.
    fn nx(&self) -> usize;

    /// Tangent-space dimension the Jacobian columns are expressed in.
    fn ndx(&self) -> usize;

    /// Output dimension r.
    fn nr(&self) -> usize;

    /// Residual value g(x), written into `out` (r).
    fn call(&self, x: &DVector<f64>, out: DVectorViewMut<f64>);

    /// Tangent-space Jacobian, written into `out` (r × ndx).
    fn jacobian(&self, x: &DVector<f64>, out: DMatrixViewMut<f64>);

    /// Contraction of the residual Hessian with a multiplier: Σᵢ λᵢ ∇²gᵢ(x),
    /// written into `out` (ndx × ndx). Defaults to zero, which is exact for
    /// residuals that are affine in the tangent variable.
    fn vector_hessian_product(
        &self,
        _x: &DVector<f64>,
        _lam: DVectorView<f64>,
        out: &mut DMatrix<f64>,
    ) {
        out.fill(0.0);
    }
}
