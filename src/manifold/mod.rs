//! Manifold representations for optimization on non-Euclidean spaces.
//!
//! The solver is generic over a differentiable manifold with a retraction.
//! A manifold exposes two coupled operations and their tangent-space
//! Jacobians:
//!
//! - `integrate(x, v)`: the retraction x ⊕ v, mapping a point and a tangent
//!   vector to a new point;
//! - `difference(x, y)`: the inverse operation y ⊖ x, recovering the tangent
//!   vector that transports x onto y.
//!
//! Two dimensions characterize a manifold:
//! - `nx`: size of the ambient point representation
//! - `ndx`: dimension of the tangent space
//!
//! The contract `integrate(x, 0) = x` and `difference(x, integrate(x, v)) = v`
//! (for small v) must hold for every implementation.

use nalgebra::{DMatrix, DVector};

pub mod euclidean;
pub mod so2;

pub use euclidean::EuclideanSpace;
pub use so2::SO2;

/// Selects which argument a difference Jacobian is taken with respect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceArg {
    /// Jacobian of y ⊖ x with respect to x
    First,
    /// Jacobian of y ⊖ x with respect to y
    Second,
}

/// Core trait for differentiable manifolds with a retraction.
///
/// Points and tangent vectors are dynamically sized vectors so the solver can
/// treat all manifolds uniformly; implementations are expected to be cheap to
/// call in inner loops and must not allocate when writing into `out` buffers.
pub trait Manifold {
    /// Size of the ambient point representation.
    fn nx(&self) -> usize;

    /// Dimension of the tangent space.
    fn ndx(&self) -> usize;

    /// Canonical origin of the manifold.
    fn neutral(&self) -> DVector<f64>;

    /// Random point, for tests and initialization.
    fn random(&self) -> DVector<f64>;

    /// Retraction: out = x ⊕ v.
    fn integrate(&self, x: &DVector<f64>, v: &DVector<f64>, out: &mut DVector<f64>);

    /// Inverse retraction: out = y ⊖ x.
    fn difference(&self, x: &DVector<f64>, y: &DVector<f64>, out: &mut DVector<f64>);

    /// Tangent-space Jacobian of y ⊖ x with respect to either argument.
    ///
    /// Writes an ndx × ndx matrix into `jac`.
    fn jacobian_difference(
        &self,
        x: &DVector<f64>,
        y: &DVector<f64>,
        jac: &mut DMatrix<f64>,
        arg: DifferenceArg,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn check_retraction_contract(space: &dyn Manifold, x: &DVector<f64>, v: &DVector<f64>) {
        let mut y = DVector::zeros(space.nx());
        let mut recovered = DVector::zeros(space.ndx());

        // integrate(x, 0) = x
        let zero = DVector::zeros(space.ndx());
        space.integrate(x, &zero, &mut y);
        space.difference(x, &y, &mut recovered);
        assert!(recovered.amax() < TOLERANCE, "integrate(x, 0) moved x");

        // difference(x, integrate(x, v)) = v
        space.integrate(x, v, &mut y);
        space.difference(x, &y, &mut recovered);
        assert!(
            (&recovered - v).amax() < TOLERANCE,
            "difference does not invert integrate: got {recovered}, expected {v}"
        );
    }

    #[test]
    fn test_euclidean_contract() {
        let space = EuclideanSpace::new(3);
        let x = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let v = DVector::from_vec(vec![0.1, 0.2, -0.3]);
        check_retraction_contract(&space, &x, &v);
    }

    #[test]
    fn test_so2_contract() {
        let space = SO2::new();
        let x = space.random();
        let v = DVector::from_vec(vec![0.7]);
        check_retraction_contract(&space, &x, &v);
    }
}
