//! External-library fallback: faer's dense Bunch-Kaufman factorization.

use faer::linalg::solvers::{Lblt, Solve};
use faer::{Mat, Side};
use nalgebra::{DMatrix, DVector};

use crate::error::{AlpineResult, SolverError};
use crate::linalg::dense_ldlt::{ldlt_in_place, rcond_from_diagonal};

/// Wrapper exposing faer's symmetric-indefinite solver through the same
/// interface as the in-crate factorizations.
///
/// The Bunch-Kaufman solve is the robust path; faer does not expose the signs
/// of its pivot blocks, so the inertia signature is read off an auxiliary
/// unpivoted elimination of the same matrix.
pub struct FaerLdlt {
    n: usize,
    fact: Option<Lblt<f64>>,
    aux: DMatrix<f64>,
    d: DVector<f64>,
    rhs: Mat<f64>,
}

impl FaerLdlt {
    pub fn new(n: usize) -> Self {
        FaerLdlt {
            n,
            fact: None,
            aux: DMatrix::zeros(n, n),
            d: DVector::zeros(n),
            rhs: Mat::zeros(n, 1),
        }
    }

    pub fn compute(&mut self, mat: &DMatrix<f64>) -> AlpineResult<()> {
        if mat.nrows() != self.n || mat.ncols() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected: self.n,
                actual: mat.nrows(),
            });
        }
        let m = Mat::from_fn(self.n, self.n, |i, j| mat[(i, j)]);
        self.fact = Some(Lblt::new(m.as_ref(), Side::Lower));

        self.aux.copy_from(mat);
        ldlt_in_place(&mut self.aux);
        for k in 0..self.n {
            self.d[k] = self.aux[(k, k)];
        }
        Ok(())
    }

    pub fn solve_in_place(&mut self, rhs: &mut DVector<f64>) -> AlpineResult<()> {
        if rhs.len() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected: self.n,
                actual: rhs.len(),
            });
        }
        let fact = self
            .fact
            .as_ref()
            .ok_or_else(|| SolverError::Factorization("compute() has not been called".into()))?;
        for i in 0..self.n {
            self.rhs[(i, 0)] = rhs[i];
        }
        fact.solve_in_place(self.rhs.as_mut());
        for i in 0..self.n {
            rhs[i] = self.rhs[(i, 0)];
        }
        Ok(())
    }

    /// Diagonal of the auxiliary unpivoted factorization.
    pub fn vector_d(&self) -> &DVector<f64> {
        &self.d
    }

    /// Signs of the pivots: -1, 0, or 1 per entry.
    pub fn signature(&self, out: &mut [i8]) {
        for k in 0..self.n {
            out[k] = if self.d[k] > 0.0 {
                1
            } else if self.d[k] < 0.0 {
                -1
            } else {
                0
            };
        }
    }

    pub fn rcond(&self) -> f64 {
        rcond_from_diagonal(&self.d)
    }

    /// Packed factors of the auxiliary elimination, for diagnostics.
    pub fn matrix_ldlt(&self) -> &DMatrix<f64> {
        &self.aux
    }
}
