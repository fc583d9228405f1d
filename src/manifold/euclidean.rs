//! Flat vector space ℝⁿ with the trivial retraction.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::manifold::{DifferenceArg, Manifold};

/// The vector space ℝⁿ; points and tangents coincide (nx == ndx).
#[derive(Debug, Clone)]
pub struct EuclideanSpace {
    dim: usize,
}

impl EuclideanSpace {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "EuclideanSpace dimension must be positive");
        EuclideanSpace { dim }
    }
}

impl Manifold for EuclideanSpace {
    fn nx(&self) -> usize {
        self.dim
    }

    fn ndx(&self) -> usize {
        self.dim
    }

    fn neutral(&self) -> DVector<f64> {
        DVector::zeros(self.dim)
    }

    fn random(&self) -> DVector<f64> {
        let mut rng = rand::thread_rng();
        DVector::from_fn(self.dim, |_, _| rng.gen_range(-1.0..1.0))
    }

    fn integrate(&self, x: &DVector<f64>, v: &DVector<f64>, out: &mut DVector<f64>) {
        out.copy_from(x);
        *out += v;
    }

    fn difference(&self, x: &DVector<f64>, y: &DVector<f64>, out: &mut DVector<f64>) {
        out.copy_from(y);
        *out -= x;
    }

    fn jacobian_difference(
        &self,
        _x: &DVector<f64>,
        _y: &DVector<f64>,
        jac: &mut DMatrix<f64>,
        arg: DifferenceArg,
    ) {
        jac.fill(0.0);
        let sign = match arg {
            DifferenceArg::First => -1.0,
            DifferenceArg::Second => 1.0,
        };
        jac.fill_diagonal(sign);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_is_subtraction() {
        let space = EuclideanSpace::new(2);
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let y = DVector::from_vec(vec![4.0, 6.0]);
        let mut d = DVector::zeros(2);
        space.difference(&x, &y, &mut d);
        assert_eq!(d, DVector::from_vec(vec![3.0, 4.0]));
    }

    #[test]
    fn test_jacobian_signs() {
        let space = EuclideanSpace::new(2);
        let x = space.neutral();
        let mut jac = DMatrix::zeros(2, 2);
        space.jacobian_difference(&x, &x, &mut jac, DifferenceArg::Second);
        assert_eq!(jac, DMatrix::identity(2, 2));
        space.jacobian_difference(&x, &x, &mut jac, DifferenceArg::First);
        assert_eq!(jac, -DMatrix::identity(2, 2));
    }
}
