//! Unpivoted dense LDLᵀ, the reference factorization for the KKT system.

use nalgebra::{DMatrix, DVector};

use crate::error::{AlpineResult, SolverError};

/// In-place unpivoted LDLᵀ of a symmetric matrix.
///
/// After the call the strict lower triangle of `m` holds L (unit diagonal
/// implied) and the diagonal holds D. Only the lower triangle of the input is
/// read. A pivot that cancels exactly leaves a zero in D and a zeroed column
/// in L; the caller reads the zero off the signature instead of receiving an
/// error, which is what the inertia-correction loop needs to react.
pub(crate) fn ldlt_in_place(m: &mut DMatrix<f64>) {
    let n = m.nrows();
    for j in 0..n {
        let mut d = m[(j, j)];
        for t in 0..j {
            let l = m[(j, t)];
            d -= l * l * m[(t, t)];
        }
        m[(j, j)] = d;
        for i in (j + 1)..n {
            let mut v = m[(i, j)];
            for t in 0..j {
                v -= m[(i, t)] * m[(j, t)] * m[(t, t)];
            }
            m[(i, j)] = if d != 0.0 { v / d } else { 0.0 };
        }
    }
}

/// Solve L D Lᵀ x = b in place given a factorization produced by
/// [`ldlt_in_place`].
pub(crate) fn ldlt_solve_in_place(fac: &DMatrix<f64>, b: &mut DVector<f64>) {
    let n = fac.nrows();
    // forward: L z = b (unit lower)
    for i in 0..n {
        let mut v = b[i];
        for j in 0..i {
            v -= fac[(i, j)] * b[j];
        }
        b[i] = v;
    }
    // diagonal: D y = z
    for i in 0..n {
        b[i] /= fac[(i, i)];
    }
    // backward: Lᵀ x = y
    for i in (0..n).rev() {
        let mut v = b[i];
        for j in (i + 1)..n {
            v -= fac[(j, i)] * b[j];
        }
        b[i] = v;
    }
}

/// Reciprocal condition estimate from the pivot spread, for logging only.
pub(crate) fn rcond_from_diagonal(d: &DVector<f64>) -> f64 {
    let mut dmin = f64::INFINITY;
    let mut dmax: f64 = 0.0;
    for k in 0..d.len() {
        let a = d[k].abs();
        dmin = dmin.min(a);
        dmax = dmax.max(a);
    }
    if dmax == 0.0 {
        return 0.0;
    }
    dmin / dmax
}

/// Reference dense LDLᵀ driver.
#[derive(Debug, Clone)]
pub struct DenseLdlt {
    n: usize,
    work: DMatrix<f64>,
    d: DVector<f64>,
}

impl DenseLdlt {
    pub fn new(n: usize) -> Self {
        DenseLdlt {
            n,
            work: DMatrix::zeros(n, n),
            d: DVector::zeros(n),
        }
    }

    pub fn compute(&mut self, mat: &DMatrix<f64>) -> AlpineResult<()> {
        if mat.nrows() != self.n || mat.ncols() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected: self.n,
                actual: mat.nrows(),
            });
        }
        self.work.copy_from(mat);
        ldlt_in_place(&mut self.work);
        for k in 0..self.n {
            self.d[k] = self.work[(k, k)];
        }
        Ok(())
    }

    pub fn solve_in_place(&self, rhs: &mut DVector<f64>) -> AlpineResult<()> {
        if rhs.len() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected: self.n,
                actual: rhs.len(),
            });
        }
        ldlt_solve_in_place(&self.work, rhs);
        Ok(())
    }

    /// Diagonal of D from the last factorization.
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

    /// Packed L and D factors, for diagnostics.
    pub fn matrix_ldlt(&self) -> &DMatrix<f64> {
        &self.work
    }
}
