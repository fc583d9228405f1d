//! Primal-dual augmented Lagrangian merit function.

use nalgebra::DVector;

use crate::func::Cost;
use crate::problem::Problem;

/// Merit function of the primal-dual augmented Lagrangian method,
///
/// Φ(x, λ) = f(x) + (μ/2)·(‖λ⁺‖² + ‖λ⁺ − λ‖²),
///
/// where λ⁺ = Π_N(c(x) + μ λ_prev)/μ is the first-order multiplier estimate.
/// Expressed through λ⁺ this is exactly f + (1/2μ)‖Π_N(s)‖² +
/// (1/2μ)‖Π_N(s) − μλ‖², since Π_N(s) = μλ⁺; evaluating from the estimates
/// avoids projecting the shifted residuals a second time.
///
/// Its tangent gradient is Jᵀλ_pdal with λ_pdal = 2λ⁺ − λ, and its gradient
/// in λ is −μ(λ⁺ − λ), which is the lower block of the KKT right-hand side
/// with its sign flipped.
#[derive(Debug, Clone, Copy)]
pub struct AlMeritFunction {
    mu: f64,
}

impl AlMeritFunction {
    pub fn new(mu: f64) -> Self {
        assert!(mu > 0.0, "penalty parameter must be positive");
        AlMeritFunction { mu }
    }

    pub fn set_penalty(&mut self, mu: f64) {
        self.mu = mu;
    }

    pub fn penalty(&self) -> f64 {
        self.mu
    }

    /// Evaluate Φ at (x, λ) given refreshed multiplier estimates λ⁺.
    pub fn evaluate(
        &self,
        problem: &Problem,
        x: &DVector<f64>,
        lams: &DVector<f64>,
        lams_plus: &DVector<f64>,
    ) -> f64 {
        let mut quad = 0.0;
        for k in 0..lams.len() {
            let diff = lams_plus[k] - lams[k];
            quad += lams_plus[k] * lams_plus[k] + diff * diff;
        }
        problem.cost().value(x) + 0.5 * self.mu * quad
    }
}
