//! Residual measuring the displacement from a reference point on a manifold.

use std::sync::Arc;

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorViewMut};

use crate::func::C2Function;
use crate::manifold::{DifferenceArg, Manifold};

/// r(x) = x ⊖ x_ref, the tangent vector carrying the reference onto x.
///
/// Paired with [`crate::sets::EqualitySet`] this pins a variable to a target
/// point; its Jacobian is the manifold's difference Jacobian with respect to
/// the moving argument.
pub struct ManifoldDifference {
    manifold: Arc<dyn Manifold>,
    x_ref: DVector<f64>,
}

impl ManifoldDifference {
    pub fn new(manifold: Arc<dyn Manifold>, x_ref: DVector<f64>) -> Self {
        assert_eq!(x_ref.len(), manifold.nx(), "reference point size mismatch");
        ManifoldDifference { manifold, x_ref }
    }
}

impl C2Function for ManifoldDifference {
    fn nx(&self) -> usize {
        self.manifold.nx()
    }

    fn ndx(&self) -> usize {
        self.manifold.ndx()
    }

    fn nr(&self) -> usize {
        self.manifold.ndx()
    }

    fn call(&self, x: &DVector<f64>, mut out: DVectorViewMut<f64>) {
        let mut d = DVector::zeros(self.manifold.ndx());
        self.manifold.difference(&self.x_ref, x, &mut d);
        out.copy_from(&d);
    }

    fn jacobian(&self, x: &DVector<f64>, mut out: DMatrixViewMut<f64>) {
        let ndx = self.manifold.ndx();
        let mut jac = DMatrix::zeros(ndx, ndx);
        self.manifold
            .jacobian_difference(&self.x_ref, x, &mut jac, DifferenceArg::Second);
        out.copy_from(&jac);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::EuclideanSpace;

    #[test]
    fn test_euclidean_displacement() {
        let space = Arc::new(EuclideanSpace::new(2));
        let x_ref = DVector::from_vec(vec![1.0, 1.0]);
        let res = ManifoldDifference::new(space, x_ref);
        let x = DVector::from_vec(vec![3.0, 0.0]);
        let mut out = DVector::zeros(2);
        res.call(&x, out.rows_mut(0, 2));
        assert_eq!(out, DVector::from_vec(vec![2.0, -1.0]));
    }
}
