//! Block-structured LDLᵀ factorization of the KKT matrix.
//!
//! The factorization works on a block-permuted copy of the input: the
//! permutation is chosen once (from the symbolic analysis) when the driver is
//! built, and `compute` gathers the matrix into that layout before running a
//! kind-aware elimination. Dense pivot blocks get a dense in-place LDLᵀ,
//! diagonal pivot blocks reduce to scalar divisions, and blocks whose
//! symbolic tag is Zero are skipped entirely.

use nalgebra::{DMatrix, DVector};

use crate::error::{AlpineResult, SolverError};
use crate::linalg::dense_ldlt::rcond_from_diagonal;
use crate::linalg::symbolic::{BlockKind, SymbolicBlockMatrix};

/// Permuted block LDLᵀ driver.
#[derive(Debug, Clone)]
pub struct BlockLdlt {
    n: usize,
    nblocks: usize,
    /// Tags of L in the permuted layout (output of the symbolic Cholesky).
    factor_structure: SymbolicBlockMatrix,
    /// Block permutation (work segment -> original segment).
    perm: Vec<usize>,
    /// Scalar offsets of the permuted segments, length nblocks + 1.
    offsets: Vec<usize>,
    /// Work row/column -> row/column of the original matrix.
    scalar_perm: Vec<usize>,
    work: DMatrix<f64>,
    d: DVector<f64>,
    z: DVector<f64>,
}

impl BlockLdlt {
    /// Build a driver for the given symmetric block pattern, factorizing in
    /// the segment order `perm`.
    ///
    /// Fails if the permuted pattern cannot be factorized symbolically.
    pub fn new(structure: &SymbolicBlockMatrix, perm: Vec<usize>) -> AlpineResult<Self> {
        let nblocks = structure.nsegments();
        if perm.len() != nblocks {
            return Err(SolverError::DimensionMismatch {
                expected: nblocks,
                actual: perm.len(),
            });
        }
        let mut factor_structure = structure.permuted(&perm);
        if !factor_structure.llt_in_place() {
            return Err(SolverError::Factorization(
                "block pattern has no symbolic Cholesky in this ordering".to_string(),
            ));
        }

        let mut offsets = Vec::with_capacity(nblocks + 1);
        offsets.push(0);
        for len in factor_structure.segment_lens() {
            offsets.push(offsets.last().unwrap() + len);
        }
        let n = *offsets.last().unwrap();

        // prefix offsets in the original ordering
        let mut orig_offsets = vec![0usize; nblocks + 1];
        for (b, len) in structure.segment_lens().iter().enumerate() {
            orig_offsets[b + 1] = orig_offsets[b] + len;
        }
        let mut scalar_perm = vec![0usize; n];
        for (b, &p) in perm.iter().enumerate() {
            for t in 0..structure.segment_lens()[p] {
                scalar_perm[offsets[b] + t] = orig_offsets[p] + t;
            }
        }

        Ok(BlockLdlt {
            n,
            nblocks,
            factor_structure,
            perm,
            offsets,
            scalar_perm,
            work: DMatrix::zeros(n, n),
            d: DVector::zeros(n),
            z: DVector::zeros(n),
        })
    }

    /// Identity ordering.
    pub fn with_identity_permutation(structure: &SymbolicBlockMatrix) -> AlpineResult<Self> {
        let perm: Vec<usize> = (0..structure.nsegments()).collect();
        Self::new(structure, perm)
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Block permutation in use (work segment -> original segment).
    pub fn permutation(&self) -> &[usize] {
        &self.perm
    }

    /// Factorize `mat` (symmetric, matching the block pattern).
    pub fn compute(&mut self, mat: &DMatrix<f64>) -> AlpineResult<()> {
        if mat.nrows() != self.n || mat.ncols() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected: self.n,
                actual: mat.nrows(),
            });
        }

        // gather into the permuted layout
        for i in 0..self.n {
            for j in 0..self.n {
                self.work[(i, j)] = mat[(self.scalar_perm[i], self.scalar_perm[j])];
            }
        }

        let s = &self.factor_structure;
        let nb = self.nblocks;
        let work = &mut self.work;

        for bk in 0..nb {
            let (k0, k1) = (self.offsets[bk], self.offsets[bk + 1]);
            let diag_pivot = s.get(bk, bk) == BlockKind::Diag;

            if !diag_pivot {
                // dense LDLᵀ of the pivot block, in place
                for j in k0..k1 {
                    let mut d = work[(j, j)];
                    for t in k0..j {
                        let l = work[(j, t)];
                        d -= l * l * work[(t, t)];
                    }
                    work[(j, j)] = d;
                    for i in (j + 1)..k1 {
                        let mut v = work[(i, j)];
                        for t in k0..j {
                            v -= work[(i, t)] * work[(j, t)] * work[(t, t)];
                        }
                        work[(i, j)] = if d != 0.0 { v / d } else { 0.0 };
                    }
                }
            }

            // panel: L(i, k) = A(i, k) L_kk⁻ᵀ D_k⁻¹ for every block row below
            for bi in (bk + 1)..nb {
                if s.get(bi, bk) == BlockKind::Zero {
                    continue;
                }
                let (i0, i1) = (self.offsets[bi], self.offsets[bi + 1]);
                for i in i0..i1 {
                    for j in k0..k1 {
                        let mut v = work[(i, j)];
                        if !diag_pivot {
                            for t in k0..j {
                                v -= work[(i, t)] * work[(j, t)] * work[(t, t)];
                            }
                        }
                        let d = work[(j, j)];
                        work[(i, j)] = if d != 0.0 { v / d } else { 0.0 };
                    }
                }
            }

            // trailing update of the lower triangle:
            // A(i, j) -= L(i, k) D_k L(j, k)ᵀ
            for bi in (bk + 1)..nb {
                if s.get(bi, bk) == BlockKind::Zero {
                    continue;
                }
                let (i0, i1) = (self.offsets[bi], self.offsets[bi + 1]);
                for bj in (bk + 1)..=bi {
                    if s.get(bj, bk) == BlockKind::Zero {
                        continue;
                    }
                    let (j0, j1) = (self.offsets[bj], self.offsets[bj + 1]);
                    for i in i0..i1 {
                        let jend = if bi == bj { (i + 1).min(j1) } else { j1 };
                        for j in j0..jend {
                            let mut acc = 0.0;
                            for t in k0..k1 {
                                acc += work[(i, t)] * work[(t, t)] * work[(j, t)];
                            }
                            work[(i, j)] -= acc;
                        }
                    }
                }
            }
        }

        for k in 0..self.n {
            self.d[k] = self.work[(k, k)];
        }
        Ok(())
    }

    /// Solve K x = b in place through the permuted factors.
    pub fn solve_in_place(&mut self, rhs: &mut DVector<f64>) -> AlpineResult<()> {
        if rhs.len() != self.n {
            return Err(SolverError::DimensionMismatch {
                expected: self.n,
                actual: rhs.len(),
            });
        }
        let n = self.n;
        for i in 0..n {
            self.z[i] = rhs[self.scalar_perm[i]];
        }
        // forward: L y = P b (unit lower)
        for i in 0..n {
            let mut v = self.z[i];
            for j in 0..i {
                v -= self.work[(i, j)] * self.z[j];
            }
            self.z[i] = v;
        }
        // diagonal
        for i in 0..n {
            self.z[i] /= self.work[(i, i)];
        }
        // backward: Lᵀ x = y
        for i in (0..n).rev() {
            let mut v = self.z[i];
            for j in (i + 1)..n {
                v -= self.work[(j, i)] * self.z[j];
            }
            self.z[i] = v;
        }
        for i in 0..n {
            rhs[self.scalar_perm[i]] = self.z[i];
        }
        Ok(())
    }

    /// Diagonal of D from the last factorization, in the permuted layout.
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

    /// Packed L and D factors in the working layout, for diagnostics.
    pub fn matrix_ldlt(&self) -> &DMatrix<f64> {
        &self.work
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::symbolic::BlockKind::*;

    const TOLERANCE: f64 = 1e-10;

    /// Default KKT layout: one dense primal block coupled to diagonal dual
    /// blocks.
    fn kkt_structure(nprim: usize, nduals: &[usize]) -> SymbolicBlockMatrix {
        let n = 1 + nduals.len();
        let mut lens = vec![nprim];
        lens.extend_from_slice(nduals);
        let mut s = SymbolicBlockMatrix::zeroed(lens);
        s.set(0, 0, Dense);
        for i in 1..n {
            s.set(i, 0, Dense);
            s.set(0, i, Dense);
            s.set(i, i, Diag);
        }
        s
    }

    /// Random symmetric matrix honoring the KKT block pattern.
    fn kkt_matrix(nprim: usize, nduals: &[usize], mu: f64) -> DMatrix<f64> {
        use rand::Rng;
        let ndual: usize = nduals.iter().sum();
        let n = nprim + ndual;
        let mut rng = rand::thread_rng();
        let mut m = DMatrix::zeros(n, n);
        for i in 0..nprim {
            for j in 0..=i {
                let v = rng.gen_range(-1.0..1.0);
                m[(i, j)] = v;
                m[(j, i)] = v;
            }
            // diagonally dominant primal block
            m[(i, i)] += nprim as f64 + 1.0;
        }
        for i in nprim..n {
            for j in 0..nprim {
                let v = rng.gen_range(-1.0..1.0);
                m[(i, j)] = v;
                m[(j, i)] = v;
            }
            m[(i, i)] = -mu;
        }
        m
    }

    #[test]
    fn test_factor_reconstructs_block_matrix() {
        let s = kkt_structure(5, &[2, 1, 3]);
        let mut ldlt = BlockLdlt::with_identity_permutation(&s).unwrap();
        let m = kkt_matrix(5, &[2, 1, 3], 1.0);
        ldlt.compute(&m).unwrap();

        // rebuild P K Pᵀ from the packed factors
        let n = ldlt.dim();
        let fac = ldlt.matrix_ldlt();
        let mut l = DMatrix::identity(n, n);
        let mut d = DMatrix::zeros(n, n);
        for i in 0..n {
            d[(i, i)] = fac[(i, i)];
            for j in 0..i {
                l[(i, j)] = fac[(i, j)];
            }
        }
        let rebuilt = &l * d * l.transpose();
        for i in 0..n {
            for j in 0..n {
                let expected = m[(ldlt.scalar_perm[i], ldlt.scalar_perm[j])];
                assert!(
                    (rebuilt[(i, j)] - expected).abs() < TOLERANCE,
                    "mismatch at ({i}, {j}): {} vs {expected}",
                    rebuilt[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_solve_matches_direct_residual() {
        let s = kkt_structure(4, &[2, 2]);
        let perm = s.brute_force_best_permutation().unwrap();
        let mut ldlt = BlockLdlt::new(&s, perm).unwrap();
        let m = kkt_matrix(4, &[2, 2], 0.5);
        ldlt.compute(&m).unwrap();

        let b = DVector::from_fn(8, |i, _| (i as f64) - 3.5);
        let mut x = b.clone();
        ldlt.solve_in_place(&mut x).unwrap();
        assert!((&m * &x - &b).amax() < TOLERANCE);
    }

    #[test]
    fn test_signature_counts_saddle_point() {
        let s = kkt_structure(3, &[2]);
        let mut ldlt = BlockLdlt::with_identity_permutation(&s).unwrap();
        let m = kkt_matrix(3, &[2], 1.0);
        ldlt.compute(&m).unwrap();

        let mut sig = vec![0i8; 5];
        ldlt.signature(&mut sig);
        let pos = sig.iter().filter(|&&s| s > 0).count();
        let neg = sig.iter().filter(|&&s| s < 0).count();
        assert_eq!(pos, 3);
        assert_eq!(neg, 2);
    }

    #[test]
    fn test_best_permutation_solve_agrees_with_identity() {
        let s = kkt_structure(3, &[1, 2]);
        let m = kkt_matrix(3, &[1, 2], 2.0);
        let b = DVector::from_fn(6, |i, _| 1.0 + i as f64);

        let mut id = BlockLdlt::with_identity_permutation(&s).unwrap();
        id.compute(&m).unwrap();
        let mut x_id = b.clone();
        id.solve_in_place(&mut x_id).unwrap();

        let perm = s.brute_force_best_permutation().unwrap();
        let mut best = BlockLdlt::new(&s, perm).unwrap();
        best.compute(&m).unwrap();
        let mut x_best = b.clone();
        best.solve_in_place(&mut x_best).unwrap();

        assert!((&x_id - &x_best).amax() < TOLERANCE);
    }
}
