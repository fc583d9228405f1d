//! Affine residual g(x) = A x + b on a vector space.

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorViewMut};

use crate::func::C2Function;

/// Affine map with constant Jacobian A and zero curvature.
#[derive(Debug, Clone)]
pub struct LinearFunction {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl LinearFunction {
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Self {
        assert_eq!(a.nrows(), b.len(), "row count of A must match length of b");
        LinearFunction { a, b }
    }

    /// Homogeneous map g(x) = A x.
    pub fn homogeneous(a: DMatrix<f64>) -> Self {
        let b = DVector::zeros(a.nrows());
        LinearFunction { a, b }
    }
}

impl C2Function for LinearFunction {
    fn nx(&self) -> usize {
        self.a.ncols()
    }

    fn ndx(&self) -> usize {
        self.a.ncols()
    }

    fn nr(&self) -> usize {
        self.a.nrows()
    }

    fn call(&self, x: &DVector<f64>, mut out: DVectorViewMut<f64>) {
        out.copy_from(&self.b);
        out.gemv(1.0, &self.a, x, 1.0);
    }

    fn jacobian(&self, _x: &DVector<f64>, mut out: DMatrixViewMut<f64>) {
        out.copy_from(&self.a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_evaluation() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let f = LinearFunction::new(a, DVector::from_vec(vec![-2.0]));
        let x = DVector::from_vec(vec![3.0, 4.0]);
        let mut out = DVector::zeros(1);
        f.call(&x, out.rows_mut(0, 1));
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_constant_jacobian() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let f = LinearFunction::homogeneous(a.clone());
        let mut jac = DMatrix::zeros(2, 2);
        f.jacobian(&DVector::zeros(2), jac.view_mut((0, 0), (2, 2)));
        assert_eq!(jac, a);
    }
}
