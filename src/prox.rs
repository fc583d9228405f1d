//! Proximal regularization term anchored at the last accepted iterate.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::func::{Cost, QuadraticDistanceCost};
use crate::manifold::Manifold;

/// ρ/2 · d(x, x̄)ᵀ W d(x, x̄) with W = ρ·I on the tangent space.
///
/// The solver re-anchors the target x̄ to each accepted outer iterate and
/// rescales W when the proximal weight changes, so the term always measures
/// the step taken since the last outer acceptance.
pub struct ProximalPenalty {
    cost: QuadraticDistanceCost,
    ndx: usize,
}

impl ProximalPenalty {
    pub fn new(manifold: Arc<dyn Manifold>, target: DVector<f64>, scale: f64) -> Self {
        let ndx = manifold.ndx();
        let weights = DMatrix::identity(ndx, ndx) * scale;
        ProximalPenalty {
            cost: QuadraticDistanceCost::new(manifold, target, weights),
            ndx,
        }
    }

    /// Re-anchor the penalty at a new reference point.
    pub fn update_target(&mut self, target: &DVector<f64>) {
        self.cost.set_target(target);
    }

    /// Reset W = scale·I.
    pub fn set_scale(&mut self, scale: f64) {
        let weights = self.cost.weights_mut();
        weights.fill(0.0);
        for k in 0..self.ndx {
            weights[(k, k)] = scale;
        }
    }

    pub fn value(&self, x: &DVector<f64>) -> f64 {
        self.cost.value(x)
    }

    pub fn gradient(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        self.cost.gradient(x, out);
    }

    pub fn hessian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>) {
        self.cost.hessian(x, out);
    }
}
