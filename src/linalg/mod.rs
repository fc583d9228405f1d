//! Linear-algebra backends for the regularized KKT system.
//!
//! Three interchangeable LDLᵀ drivers are provided:
//!
//! - **Dense**: in-crate unpivoted reference factorization
//! - **Blocked**: permuted block factorization exploiting the KKT sparsity
//! - **Faer**: faer's dense Bunch-Kaufman solve
//!
//! The set of backends is closed, so dispatch goes through a sum type rather
//! than trait objects.

use nalgebra::{DMatrix, DVector};

pub mod block_ldlt;
pub mod dense_ldlt;
pub mod faer_ldlt;
pub mod symbolic;

pub use block_ldlt::BlockLdlt;
pub use dense_ldlt::DenseLdlt;
pub use faer_ldlt::FaerLdlt;
pub use symbolic::{BlockKind, SymbolicBlockMatrix};

use crate::error::AlpineResult;
use crate::problem::Problem;

/// Which LDLᵀ backend the solver factorizes the KKT matrix with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LdltChoice {
    /// In-crate dense reference factorization.
    Dense,
    /// Block factorization with a fill-reducing block permutation.
    #[default]
    Blocked,
    /// faer's dense Bunch-Kaufman factorization.
    Faer,
}

/// Closed sum over the LDLᵀ backends, all exposing the same interface.
pub enum LdltDriver {
    Dense(DenseLdlt),
    Blocked(BlockLdlt),
    Faer(FaerLdlt),
}

impl LdltDriver {
    /// Allocate a driver sized for a problem's KKT system.
    ///
    /// The blocked backend uses the standard structure of the primal-dual
    /// system: a dense primal block, dense primal-dual coupling stripes, and
    /// diagonal dual blocks with no dual-dual coupling. The block ordering is
    /// the symbolic best permutation when the search is affordable, identity
    /// otherwise.
    pub fn from_problem(problem: &Problem, choice: LdltChoice) -> AlpineResult<Self> {
        let ntot = problem.ndx() + problem.total_constraint_dim();
        match choice {
            LdltChoice::Dense => Ok(LdltDriver::Dense(DenseLdlt::new(ntot))),
            LdltChoice::Faer => Ok(LdltDriver::Faer(FaerLdlt::new(ntot))),
            LdltChoice::Blocked => {
                let nduals: Vec<usize> = (0..problem.num_constraints())
                    .map(|i| problem.constraint_dim(i))
                    .collect();
                let structure = kkt_structure(problem.ndx(), &nduals);
                let ldlt = match structure.brute_force_best_permutation() {
                    Some(perm) => BlockLdlt::new(&structure, perm)?,
                    None => BlockLdlt::with_identity_permutation(&structure)?,
                };
                Ok(LdltDriver::Blocked(ldlt))
            }
        }
    }

    pub fn compute(&mut self, mat: &DMatrix<f64>) -> AlpineResult<()> {
        match self {
            LdltDriver::Dense(inner) => inner.compute(mat),
            LdltDriver::Blocked(inner) => inner.compute(mat),
            LdltDriver::Faer(inner) => inner.compute(mat),
        }
    }

    pub fn solve_in_place(&mut self, rhs: &mut DVector<f64>) -> AlpineResult<()> {
        match self {
            LdltDriver::Dense(inner) => inner.solve_in_place(rhs),
            LdltDriver::Blocked(inner) => inner.solve_in_place(rhs),
            LdltDriver::Faer(inner) => inner.solve_in_place(rhs),
        }
    }

    /// Out-of-place solve convenience; allocates, so the solver's inner loop
    /// sticks to [`LdltDriver::solve_in_place`].
    pub fn solve(&mut self, rhs: &DVector<f64>) -> AlpineResult<DVector<f64>> {
        let mut x = rhs.clone();
        self.solve_in_place(&mut x)?;
        Ok(x)
    }

    pub fn vector_d(&self) -> &DVector<f64> {
        match self {
            LdltDriver::Dense(inner) => inner.vector_d(),
            LdltDriver::Blocked(inner) => inner.vector_d(),
            LdltDriver::Faer(inner) => inner.vector_d(),
        }
    }

    pub fn signature(&self, out: &mut [i8]) {
        match self {
            LdltDriver::Dense(inner) => inner.signature(out),
            LdltDriver::Blocked(inner) => inner.signature(out),
            LdltDriver::Faer(inner) => inner.signature(out),
        }
    }

    pub fn rcond(&self) -> f64 {
        match self {
            LdltDriver::Dense(inner) => inner.rcond(),
            LdltDriver::Blocked(inner) => inner.rcond(),
            LdltDriver::Faer(inner) => inner.rcond(),
        }
    }

    /// Packed factors for diagnostics.
    pub fn matrix_ldlt(&self) -> &DMatrix<f64> {
        match self {
            LdltDriver::Dense(inner) => inner.matrix_ldlt(),
            LdltDriver::Blocked(inner) => inner.matrix_ldlt(),
            LdltDriver::Faer(inner) => inner.matrix_ldlt(),
        }
    }
}

/// Symbolic pattern of the primal-dual KKT matrix.
pub(crate) fn kkt_structure(ndx: usize, nduals: &[usize]) -> SymbolicBlockMatrix {
    let nblocks = 1 + nduals.len();
    let mut lens = vec![ndx];
    lens.extend_from_slice(nduals);
    let mut structure = SymbolicBlockMatrix::zeroed(lens);
    structure.set(0, 0, BlockKind::Dense);
    for i in 1..nblocks {
        structure.set(i, 0, BlockKind::Dense);
        structure.set(0, i, BlockKind::Dense);
        structure.set(i, i, BlockKind::Diag);
    }
    structure
}
