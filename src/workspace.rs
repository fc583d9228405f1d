//! Scratch storage for one solver/problem binding.
//!
//! Every buffer the inner and outer loops touch is allocated here, once, from
//! the problem dimensions; the loops themselves never allocate. Per-constraint
//! data lives in stacked flat buffers addressed through (offset, length)
//! pairs from [`Workspace::segment`] rather than through stored views.

use nalgebra::{DMatrix, DVector};

use crate::error::AlpineResult;
use crate::linalg::{LdltChoice, LdltDriver};
use crate::problem::Problem;

/// Solver workspace; exclusively owned by a single `solve` call at a time.
pub struct Workspace {
    /// Tangent dimension of the primal variable.
    pub ndx: usize,
    /// Total dual dimension Σᵢ rᵢ.
    pub numdual: usize,
    /// KKT system dimension ndx + numdual.
    pub ntot: usize,
    /// Prefix-sum offsets of the constraint segments (length m + 1).
    indices: Vec<usize>,

    /// Last accepted primal iterate.
    pub x_prev: DVector<f64>,
    /// Trial point of the line search.
    pub x_trial: DVector<f64>,

    /// Multipliers at the last outer acceptance.
    pub lams_prev: DVector<f64>,
    /// Trial multipliers of the line search.
    pub lams_trial: DVector<f64>,
    /// First-order multiplier estimates λ⁺.
    pub lams_plus: DVector<f64>,
    /// Primal-dual estimates λ_pdal = 2λ⁺ − λ.
    pub lams_pdal: DVector<f64>,

    /// Stacked constraint values c(x).
    pub cstr_values: DVector<f64>,
    /// Shifted values s = c(x) + μ λ_prev.
    pub shift_cstr_values: DVector<f64>,
    /// Projections Π_C(s), for the violation measure.
    pub shift_cstr_proj: DVector<f64>,

    /// Stacked constraint Jacobians (numdual × ndx).
    pub jacobians: DMatrix<f64>,
    /// Jacobians with the normal-cone projection Jacobian applied.
    pub jacobians_proj: DMatrix<f64>,
    /// Per-constraint vector-Hessian products (each ndx × ndx).
    pub cstr_vhp: Vec<DMatrix<f64>>,

    /// Objective gradient and Hessian.
    pub objective_gradient: DVector<f64>,
    pub objective_hessian: DMatrix<f64>,
    /// Proximal-term gradient and Hessian.
    pub prox_grad: DVector<f64>,
    pub prox_hess: DMatrix<f64>,
    /// Gradient of the merit function in x.
    pub merit_gradient: DVector<f64>,
    /// Dual residual (top KKT block without the proximal contribution).
    pub dual_residual: DVector<f64>,
    /// μ(λ⁺ − λ), the lower KKT block.
    pub dual_prox_err: DVector<f64>,

    /// KKT matrix, symmetric indefinite, lower-right diagonal −μ.
    pub kkt_matrix: DMatrix<f64>,
    /// KKT right-hand side (ndx + numdual).
    pub kkt_rhs: DVector<f64>,
    /// Primal-dual Newton step.
    pub pd_step: DVector<f64>,
    /// Residual buffer reused across iterative-refinement sweeps.
    pub kkt_resdl: DVector<f64>,
    /// Scaled primal step α·dx handed to the retraction.
    pub step_scratch: DVector<f64>,
    /// Pivot signs of the last factorization.
    pub signature: Vec<i8>,

    /// Accepted line-search step length.
    pub alpha_opt: f64,
    /// Directional derivative of the merit function along the step.
    pub dmerit_dir: f64,

    /// Factorization backend.
    pub ldlt: LdltDriver,
}

impl Workspace {
    /// Allocate a workspace with the default (blocked) factorization.
    pub fn new(problem: &Problem) -> AlpineResult<Self> {
        Self::with_ldlt(problem, LdltChoice::default())
    }

    /// Allocate a workspace with an explicit factorization backend.
    pub fn with_ldlt(problem: &Problem, choice: LdltChoice) -> AlpineResult<Self> {
        let nx = problem.nx();
        let ndx = problem.ndx();
        let numdual = problem.total_constraint_dim();
        let ntot = ndx + numdual;
        let m = problem.num_constraints();

        let indices = (0..=m).map(|i| if i < m { problem.index(i) } else { numdual }).collect();

        Ok(Workspace {
            ndx,
            numdual,
            ntot,
            indices,
            x_prev: DVector::zeros(nx),
            x_trial: DVector::zeros(nx),
            lams_prev: DVector::zeros(numdual),
            lams_trial: DVector::zeros(numdual),
            lams_plus: DVector::zeros(numdual),
            lams_pdal: DVector::zeros(numdual),
            cstr_values: DVector::zeros(numdual),
            shift_cstr_values: DVector::zeros(numdual),
            shift_cstr_proj: DVector::zeros(numdual),
            jacobians: DMatrix::zeros(numdual, ndx),
            jacobians_proj: DMatrix::zeros(numdual, ndx),
            cstr_vhp: (0..m).map(|_| DMatrix::zeros(ndx, ndx)).collect(),
            objective_gradient: DVector::zeros(ndx),
            objective_hessian: DMatrix::zeros(ndx, ndx),
            prox_grad: DVector::zeros(ndx),
            prox_hess: DMatrix::zeros(ndx, ndx),
            merit_gradient: DVector::zeros(ndx),
            dual_residual: DVector::zeros(ndx),
            dual_prox_err: DVector::zeros(numdual),
            kkt_matrix: DMatrix::zeros(ntot, ntot),
            kkt_rhs: DVector::zeros(ntot),
            pd_step: DVector::zeros(ntot),
            kkt_resdl: DVector::zeros(ntot),
            step_scratch: DVector::zeros(ndx),
            signature: vec![0; ntot],
            alpha_opt: 0.0,
            dmerit_dir: 0.0,
            ldlt: LdltDriver::from_problem(problem, choice)?,
        })
    }

    /// (offset, length) of constraint i inside the stacked dual buffers.
    pub fn segment(&self, i: usize) -> (usize, usize) {
        (self.indices[i], self.indices[i + 1] - self.indices[i])
    }

    /// Number of constraints the dual buffers are split into.
    pub fn num_segments(&self) -> usize {
        self.indices.len() - 1
    }

    /// Primal part of the Newton step.
    pub fn prim_step(&self) -> nalgebra::DVectorView<f64> {
        self.pd_step.rows(0, self.ndx)
    }

    /// Dual part of the Newton step.
    pub fn dual_step(&self) -> nalgebra::DVectorView<f64> {
        self.pd_step.rows(self.ndx, self.numdual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::{LinearFunction, QuadraticDistanceCost};
    use crate::manifold::EuclideanSpace;
    use crate::sets::EqualitySet;
    use std::sync::Arc;

    #[test]
    fn test_allocation_sizes() {
        let space = Arc::new(EuclideanSpace::new(3));
        let cost = QuadraticDistanceCost::unweighted(space.clone(), DVector::zeros(3));
        let mut problem = Problem::new(space, Box::new(cost));
        problem.add_constraint(
            Box::new(LinearFunction::homogeneous(DMatrix::from_row_slice(
                2,
                3,
                &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            ))),
            Box::new(EqualitySet::new()),
        );

        let ws = Workspace::new(&problem).unwrap();
        assert_eq!(ws.ndx, 3);
        assert_eq!(ws.numdual, 2);
        assert_eq!(ws.ntot, 5);
        assert_eq!(ws.kkt_matrix.nrows(), 5);
        assert_eq!(ws.jacobians.shape(), (2, 3));
        assert_eq!(ws.segment(0), (0, 2));
        assert_eq!(ws.num_segments(), 1);
    }
}
