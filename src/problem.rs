//! Problem definition: a cost, an ordered list of constraints, and the
//! manifold they live on.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::func::{C2Function, Cost};
use crate::manifold::Manifold;
use crate::sets::ConstraintSet;

/// One constraint: a residual function g and a closed convex set C, with
/// feasibility meaning g(x) ∈ C.
pub struct ConstraintObject {
    pub func: Box<dyn C2Function>,
    pub set: Box<dyn ConstraintSet>,
}

impl ConstraintObject {
    pub fn new(func: Box<dyn C2Function>, set: Box<dyn ConstraintSet>) -> Self {
        ConstraintObject { func, set }
    }

    pub fn dim(&self) -> usize {
        self.func.nr()
    }
}

/// Immutable optimization problem shared by the solver and its sub-objects.
///
/// Constraint residuals are stacked into a single dual vector; `index(i)`
/// gives the offset of constraint i inside it, with `index(0) == 0` and
/// `index(i) + dim(i) == index(i + 1)`.
pub struct Problem {
    manifold: Arc<dyn Manifold>,
    cost: Box<dyn Cost>,
    constraints: Vec<ConstraintObject>,
    indices: Vec<usize>,
}

impl Problem {
    /// Unconstrained problem; constraints are attached with
    /// [`Problem::add_constraint`].
    pub fn new(manifold: Arc<dyn Manifold>, cost: Box<dyn Cost>) -> Self {
        assert_eq!(cost.nx(), manifold.nx(), "cost ambient dimension mismatch");
        assert_eq!(cost.ndx(), manifold.ndx(), "cost tangent dimension mismatch");
        Problem {
            manifold,
            cost,
            constraints: Vec::new(),
            indices: vec![0],
        }
    }

    /// Fully constructed problem.
    pub fn with_constraints(
        manifold: Arc<dyn Manifold>,
        cost: Box<dyn Cost>,
        constraints: Vec<ConstraintObject>,
    ) -> Self {
        let mut problem = Problem::new(manifold, cost);
        for c in constraints {
            problem.push(c);
        }
        problem
    }

    /// Append a constraint (g, C).
    pub fn add_constraint(&mut self, func: Box<dyn C2Function>, set: Box<dyn ConstraintSet>) {
        self.push(ConstraintObject::new(func, set));
    }

    fn push(&mut self, cstr: ConstraintObject) {
        assert_eq!(
            cstr.func.nx(),
            self.manifold.nx(),
            "constraint ambient dimension mismatch"
        );
        let next = self.total_constraint_dim() + cstr.dim();
        self.constraints.push(cstr);
        self.indices.push(next);
    }

    pub fn manifold(&self) -> &dyn Manifold {
        self.manifold.as_ref()
    }

    pub fn manifold_arc(&self) -> Arc<dyn Manifold> {
        Arc::clone(&self.manifold)
    }

    pub fn cost(&self) -> &dyn Cost {
        self.cost.as_ref()
    }

    pub fn nx(&self) -> usize {
        self.manifold.nx()
    }

    pub fn ndx(&self) -> usize {
        self.manifold.ndx()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraint(&self, i: usize) -> &ConstraintObject {
        &self.constraints[i]
    }

    /// Offset of constraint i in the stacked dual vector.
    pub fn index(&self, i: usize) -> usize {
        self.indices[i]
    }

    /// Output dimension of constraint i.
    pub fn constraint_dim(&self, i: usize) -> usize {
        self.indices[i + 1] - self.indices[i]
    }

    /// Total dual dimension Σᵢ rᵢ.
    pub fn total_constraint_dim(&self) -> usize {
        *self.indices.last().unwrap_or(&0)
    }

    /// Evaluate all constraint residuals into the stacked buffer `values`.
    pub fn evaluate_constraints(&self, x: &DVector<f64>, values: &mut DVector<f64>) {
        for (i, cstr) in self.constraints.iter().enumerate() {
            let (offset, len) = (self.indices[i], self.constraint_dim(i));
            cstr.func.call(x, values.rows_mut(offset, len));
        }
    }

    /// Evaluate all constraint Jacobians into the stacked stripe matrix `jac`
    /// (total_constraint_dim × ndx).
    pub fn constraint_jacobians(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) {
        for (i, cstr) in self.constraints.iter().enumerate() {
            let (offset, len) = (self.indices[i], self.constraint_dim(i));
            cstr.func.jacobian(x, jac.rows_mut(offset, len));
        }
    }

    /// Evaluate per-constraint vector-Hessian products ⟨λᵢ, ∇²gᵢ⟩.
    ///
    /// With `use_gauss_newton` set, constraints whose set opts out keep a
    /// zeroed buffer and their curvature is dropped from the KKT matrix.
    pub fn vector_hessian_products(
        &self,
        x: &DVector<f64>,
        lams: &DVector<f64>,
        use_gauss_newton: bool,
        out: &mut [DMatrix<f64>],
    ) {
        for (i, cstr) in self.constraints.iter().enumerate() {
            let use_vhp = !use_gauss_newton || !cstr.set.disable_gauss_newton();
            if use_vhp {
                let (offset, len) = (self.indices[i], self.constraint_dim(i));
                cstr.func
                    .vector_hessian_product(x, lams.rows(offset, len), &mut out[i]);
            } else {
                out[i].fill(0.0);
            }
        }
    }
}
