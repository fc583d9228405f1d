//! Block factorization scenarios
//!
//! Exercises the symbolic ordering search and the numeric block LDLᵀ on the
//! saddle-point structure the solver assembles: one dense primal block, dense
//! primal-dual coupling, diagonal dual blocks, no dual-dual coupling.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use alpine_solver::linalg::symbolic::{BlockKind, SymbolicBlockMatrix};
use alpine_solver::linalg::BlockLdlt;

const TOLERANCE: f64 = 1e-10;

fn saddle_point_structure(nprim: usize, nduals: &[usize]) -> SymbolicBlockMatrix {
    let nblocks = 1 + nduals.len();
    let mut lens = vec![nprim];
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

/// Random symmetric matrix honoring the saddle-point pattern, with a
/// diagonally dominant primal block and a negative dual diagonal.
fn random_saddle_point(nprim: usize, nduals: &[usize], mu: f64) -> DMatrix<f64> {
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
fn test_best_permutation_beats_identity() {
    // primal block of size 5 coupled to dual blocks (2, 1, 3)
    let structure = saddle_point_structure(5, &[2, 1, 3]);
    let perm = structure
        .brute_force_best_permutation()
        .expect("ordering search failed");

    let mut best = structure.permuted(&perm);
    assert!(best.llt_in_place());
    let mut identity = structure.clone();
    assert!(identity.llt_in_place());

    assert!(best.count_nnz() <= identity.count_nnz());
    // the dense primal block has to be eliminated last to avoid filling the
    // dual diagonal
    assert_eq!(*perm.last().unwrap(), 0);
}

#[test]
fn test_numeric_factorization_reproduces_matrix() {
    let structure = saddle_point_structure(5, &[2, 1, 3]);
    let perm = structure
        .brute_force_best_permutation()
        .expect("ordering search failed");
    let mut ldlt = BlockLdlt::new(&structure, perm).expect("symbolic factorization failed");

    let matrix = random_saddle_point(5, &[2, 1, 3], 1.0);
    ldlt.compute(&matrix).unwrap();

    // rebuild the permuted matrix from the packed factors
    let n = ldlt.dim();
    let lens = [5usize, 2, 1, 3];
    let perm = ldlt.permutation().to_vec();
    let mut orig_offsets = vec![0usize; lens.len() + 1];
    for (b, len) in lens.iter().enumerate() {
        orig_offsets[b + 1] = orig_offsets[b] + len;
    }
    let mut scalar_perm = Vec::with_capacity(n);
    for &p in &perm {
        for t in 0..lens[p] {
            scalar_perm.push(orig_offsets[p] + t);
        }
    }

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
            let expected = matrix[(scalar_perm[i], scalar_perm[j])];
            assert!(
                (rebuilt[(i, j)] - expected).abs() < TOLERANCE,
                "mismatch at ({i}, {j}): {} vs {}",
                rebuilt[(i, j)],
                expected
            );
        }
    }
}

#[test]
fn test_solve_residual_small() {
    let structure = saddle_point_structure(6, &[3, 2]);
    let perm = structure
        .brute_force_best_permutation()
        .expect("ordering search failed");
    let mut ldlt = BlockLdlt::new(&structure, perm).unwrap();

    let matrix = random_saddle_point(6, &[3, 2], 0.01);
    ldlt.compute(&matrix).unwrap();

    let b = DVector::from_fn(11, |i, _| (i as f64 * 0.7).sin());
    let mut x = b.clone();
    ldlt.solve_in_place(&mut x).unwrap();
    assert!((&matrix * &x - &b).amax() < 1e-8);
}

#[test]
fn test_saddle_point_inertia() {
    // signature of the factorization counts nprim positive and ndual
    // negative pivots for a well-posed saddle-point matrix
    let structure = saddle_point_structure(4, &[2, 2]);
    let perm = structure.brute_force_best_permutation().unwrap();
    let mut ldlt = BlockLdlt::new(&structure, perm).unwrap();
    let matrix = random_saddle_point(4, &[2, 2], 1.0);
    ldlt.compute(&matrix).unwrap();

    let mut signature = vec![0i8; 8];
    ldlt.signature(&mut signature);
    assert_eq!(signature.iter().filter(|&&s| s > 0).count(), 4);
    assert_eq!(signature.iter().filter(|&&s| s < 0).count(), 4);
    assert!(ldlt.rcond() > 0.0);
}

#[test]
fn test_symbolic_nnz_bounds_numeric_nnz() {
    // the symbolic pattern is an upper bound on where numeric entries appear
    let structure = saddle_point_structure(3, &[2, 2]);
    let mut factored = structure.clone();
    assert!(factored.llt_in_place());

    let mut ldlt = BlockLdlt::with_identity_permutation(&structure).unwrap();
    let matrix = random_saddle_point(3, &[2, 2], 0.5);
    ldlt.compute(&matrix).unwrap();

    // count numeric nonzeros of the packed lower factor (plus diagonal)
    let fac = ldlt.matrix_ldlt();
    let n = ldlt.dim();
    let mut numeric_nnz = 0;
    for i in 0..n {
        for j in 0..=i {
            if fac[(i, j)].abs() > 1e-14 {
                numeric_nnz += 1;
            }
        }
    }
    // the symbolic factorization zeroes the strict upper triangle, so its
    // count is exactly the lower-factor bound
    let symbolic_nnz = factored.count_nnz();
    assert!(
        numeric_nnz <= symbolic_nnz,
        "numeric {numeric_nnz} exceeds symbolic bound {symbolic_nnz}"
    );
}
