//! Backtracking Armijo line search on the merit function.

use tracing::warn;

/// Options for the backtracking search.
#[derive(Debug, Clone, Copy)]
pub struct LinesearchOptions {
    /// Smallest step length tried before giving up.
    pub alpha_min: f64,
    /// Sufficient-decrease constant c₁ ∈ (0, 0.5).
    pub armijo_c1: f64,
    /// Step contraction factor ∈ (0, 1).
    pub contraction: f64,
}

impl Default for LinesearchOptions {
    fn default() -> Self {
        LinesearchOptions {
            alpha_min: 1e-7,
            armijo_c1: 1e-4,
            contraction: 0.5,
        }
    }
}

/// Backtracking line search enforcing the Armijo condition
/// φ(α) ≤ φ(0) + c₁·α·φ'(0).
#[derive(Debug, Clone, Copy)]
pub struct ArmijoLinesearch {
    options: LinesearchOptions,
}

impl ArmijoLinesearch {
    pub fn new(options: LinesearchOptions) -> Self {
        ArmijoLinesearch { options }
    }

    /// Run the search on φ given φ(0) and the directional derivative φ'(0).
    ///
    /// Returns `(α, φ(α))` for the last evaluated step length, so any state
    /// the closure updates as a side effect matches the returned α. A
    /// non-descent direction (φ'(0) ≥ 0) is answered with the evaluation at
    /// `alpha_min`; the caller sees the failure through the merit value.
    pub fn run(&self, mut phi: impl FnMut(f64) -> f64, phi0: f64, dphi0: f64) -> (f64, f64) {
        let opts = &self.options;

        if dphi0 >= 0.0 {
            warn!(dphi0, "line search received a non-descent direction");
            let alpha = opts.alpha_min;
            return (alpha, phi(alpha));
        }

        let mut alpha = 1.0;
        loop {
            let value = phi(alpha);
            if value <= phi0 + opts.armijo_c1 * alpha * dphi0 {
                return (alpha, value);
            }
            if alpha <= opts.alpha_min {
                return (alpha, value);
            }
            alpha = (alpha * opts.contraction).max(opts.alpha_min);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_full_step_accepted_on_quadratic() {
        // φ(α) = (1 - α)², minimized exactly at the unit step
        let phi = |alpha: f64| (1.0 - alpha) * (1.0 - alpha);
        let ls = ArmijoLinesearch::new(LinesearchOptions::default());
        let (alpha, value) = ls.run(phi, 1.0, -2.0);
        assert!((alpha - 1.0).abs() < TOLERANCE);
        assert!(value < TOLERANCE);
    }

    #[test]
    fn test_backtracks_on_overshoot() {
        // steep valley: the unit step overshoots badly
        let phi = |alpha: f64| (1.0 - 10.0 * alpha) * (1.0 - 10.0 * alpha) / 2.0;
        let ls = ArmijoLinesearch::new(LinesearchOptions::default());
        let (alpha, value) = ls.run(phi, 0.5, -10.0);
        assert!(alpha < 1.0);
        assert!(value <= 0.5 + 1e-4 * alpha * -10.0);
    }

    #[test]
    fn test_alpha_floor() {
        // pathological: φ increases for every α > 0
        let phi = |alpha: f64| alpha;
        let opts = LinesearchOptions {
            alpha_min: 1e-3,
            ..Default::default()
        };
        let ls = ArmijoLinesearch::new(opts);
        let (alpha, _) = ls.run(phi, 0.0, -1.0);
        assert!((alpha - 1e-3).abs() < TOLERANCE);
    }

    #[test]
    fn test_non_descent_falls_back_to_alpha_min() {
        let mut evals = Vec::new();
        let phi = |alpha: f64| {
            evals.push(alpha);
            alpha
        };
        let ls = ArmijoLinesearch::new(LinesearchOptions::default());
        let (alpha, _) = ls.run(phi, 0.0, 1.0);
        assert!((alpha - 1e-7).abs() < TOLERANCE);
        assert_eq!(evals.len(), 1);
    }
}
