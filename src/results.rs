//! Solver outputs.

use std::fmt;

use nalgebra::{DVector, DVectorView};

use crate::manifold::Manifold;
use crate::problem::Problem;

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceFlag {
    /// `solve` has not run (or has not terminated) on this Results object.
    Uninitialized,
    /// Primal and dual infeasibilities reached the target tolerance.
    Success,
    /// The iteration budget ran out first.
    MaxItersReached,
}

impl fmt::Display for ConvergenceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceFlag::Uninitialized => write!(f, "Uninitialized"),
            ConvergenceFlag::Success => write!(f, "Success"),
            ConvergenceFlag::MaxItersReached => write!(f, "Maximum iterations reached"),
        }
    }
}

/// Output of a solver run; written incrementally by the solver, with the
/// convergence flag set exactly once at termination.
pub struct Results {
    /// Best primal iterate.
    pub x_opt: DVector<f64>,
    /// Stacked multipliers.
    pub lams_opt: DVector<f64>,
    /// Per-constraint infinity-norm violations.
    pub constraint_violations: DVector<f64>,
    /// Per-constraint, per-coordinate active-set indicators.
    pub active_set: Vec<Vec<bool>>,
    /// Cost value at `x_opt`.
    pub value: f64,
    /// Merit value at the last accepted step.
    pub merit: f64,
    /// Primal infeasibility (max constraint violation).
    pub prim_infeas: f64,
    /// Dual infeasibility (infinity norm of the dual residual).
    pub dual_infeas: f64,
    /// Penalty parameter at termination.
    pub mu: f64,
    /// Proximal weight at termination.
    pub rho: f64,
    /// Total inner iterations performed.
    pub num_iters: usize,
    /// Termination status.
    pub converged: ConvergenceFlag,

    indices: Vec<usize>,
}

impl Results {
    pub fn new(problem: &Problem) -> Self {
        let m = problem.num_constraints();
        let numdual = problem.total_constraint_dim();
        let indices = (0..=m)
            .map(|i| if i < m { problem.index(i) } else { numdual })
            .collect();
        Results {
            x_opt: problem.manifold().neutral(),
            lams_opt: DVector::zeros(numdual),
            constraint_violations: DVector::zeros(m),
            active_set: (0..m)
                .map(|i| vec![false; problem.constraint_dim(i)])
                .collect(),
            value: 0.0,
            merit: 0.0,
            prim_infeas: 0.0,
            dual_infeas: 0.0,
            mu: 0.0,
            rho: 0.0,
            num_iters: 0,
            converged: ConvergenceFlag::Uninitialized,
            indices,
        }
    }

    /// Multipliers of constraint i.
    pub fn multiplier_segment(&self, i: usize) -> DVectorView<f64> {
        let offset = self.indices[i];
        let len = self.indices[i + 1] - offset;
        self.lams_opt.rows(offset, len)
    }
}

impl fmt::Display for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results {{")?;
        writeln!(f, "  converged:   {}", self.converged)?;
        writeln!(f, "  value:       {:.6e}", self.value)?;
        writeln!(f, "  merit:       {:.6e}", self.merit)?;
        writeln!(f, "  prim_infeas: {:.6e}", self.prim_infeas)?;
        writeln!(f, "  dual_infeas: {:.6e}", self.dual_infeas)?;
        writeln!(f, "  mu:          {:.3e}", self.mu)?;
        writeln!(f, "  rho:         {:.3e}", self.rho)?;
        writeln!(f, "  num_iters:   {}", self.num_iters)?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::{LinearFunction, QuadraticDistanceCost};
    use crate::manifold::EuclideanSpace;
    use crate::sets::EqualitySet;
    use nalgebra::DMatrix;
    use std::sync::Arc;

    #[test]
    fn test_starts_uninitialized() {
        let space = Arc::new(EuclideanSpace::new(2));
        let cost = QuadraticDistanceCost::unweighted(space.clone(), DVector::zeros(2));
        let mut problem = Problem::new(space, Box::new(cost));
        problem.add_constraint(
            Box::new(LinearFunction::homogeneous(DMatrix::from_row_slice(
                1,
                2,
                &[1.0, 1.0],
            ))),
            Box::new(EqualitySet::new()),
        );

        let results = Results::new(&problem);
        assert_eq!(results.converged, ConvergenceFlag::Uninitialized);
        assert_eq!(results.lams_opt.len(), 1);
        assert_eq!(results.multiplier_segment(0).len(), 1);
        assert_eq!(results.active_set.len(), 1);
    }
}
