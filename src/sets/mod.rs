//! Constraint-set interface.
//!
//! Every constraint in a problem pairs a residual function g(x) with a closed
//! convex set C; feasibility means g(x) ∈ C. The solver only needs a small
//! kernel of operations from the set:
//!
//! - Euclidean projection Π_C,
//! - projection onto the normal cone, Π_N(z) = z − Π_C(z),
//! - the (generalized) Jacobian of Π_N applied to a Jacobian stripe in place,
//! - a per-coordinate active-set indicator.
//!
//! # Contract
//!
//! The decomposition identity `z = Π_C(z) + Π_N(z)` must hold exactly, and
//! both projections must be idempotent. The multiplier update and the KKT
//! residuals are built directly on that identity, so a set breaking it will
//! silently corrupt the dual iterates.
//!
//! All methods operate on views into the solver's stacked constraint buffers
//! and must not allocate.

use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};

pub mod box_set;
pub mod equality;
pub mod nonneg;

pub use box_set::BoxSet;
pub use equality::EqualitySet;
pub use nonneg::NegativeOrthant;

/// Operations on a closed convex set C ⊂ ℝʳ.
pub trait ConstraintSet {
    /// Euclidean projection onto C: out = Π_C(z).
    fn projection(&self, z: DVectorView<f64>, out: DVectorViewMut<f64>);

    /// Projection onto the normal cone: out = z − Π_C(z).
    fn normal_cone_projection(&self, z: DVectorView<f64>, out: DVectorViewMut<f64>);

    /// Left-multiplies `jac` in place by the generalized Jacobian of the
    /// normal-cone projection at z.
    fn apply_normal_cone_projection_jacobian(&self, z: DVectorView<f64>, jac: DMatrixViewMut<f64>);

    /// Per-coordinate active-set indicator at z.
    fn compute_active_set(&self, z: DVectorView<f64>, out: &mut [bool]);

    /// Whether the solver should skip this constraint's vector-Hessian
    /// product when running in Gauss-Newton mode.
    fn disable_gauss_newton(&self) -> bool {
        false
    }

    /// Hook for sets that scale internal state with the penalty parameter.
    fn set_prox_parameter(&self, _mu: f64) {}
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nalgebra::DVector;

    const TOLERANCE: f64 = 1e-14;

    /// Checks z = Π_C(z) + Π_N(z) and idempotence of both projections.
    pub(crate) fn check_projection_identities(set: &dyn ConstraintSet, z: &DVector<f64>) {
        let n = z.len();
        let mut proj = DVector::zeros(n);
        let mut normal = DVector::zeros(n);
        set.projection(z.rows(0, n), proj.rows_mut(0, n));
        set.normal_cone_projection(z.rows(0, n), normal.rows_mut(0, n));

        let recomposed = &proj + &normal;
        assert!(
            (&recomposed - z).amax() < TOLERANCE,
            "decomposition identity failed: {recomposed} != {z}"
        );

        let mut twice = DVector::zeros(n);
        set.projection(proj.rows(0, n), twice.rows_mut(0, n));
        assert!((&twice - &proj).amax() < TOLERANCE, "projection not idempotent");

        set.normal_cone_projection(normal.rows(0, n), twice.rows_mut(0, n));
        assert!(
            (&twice - &normal).amax() < TOLERANCE,
            "normal-cone projection not idempotent"
        );
    }
}
