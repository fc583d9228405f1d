//! # Alpine Solver
//!
//! A Rust library for nonlinear constrained optimization on manifolds, built
//! around a primal-dual augmented Lagrangian method with proximal
//! regularization.
//!
//! ## Features
//!
//! - **Primal-dual augmented Lagrangian**: multiplier estimates and merit
//!   function built from the projected shifted constraints
//! - **Manifold support**: the solver is generic over a retraction-based
//!   manifold abstraction (ℝⁿ, SO(2), user-defined spaces)
//! - **Generic constraint sets**: any closed convex set exposing a projection
//!   and a normal-cone projection (equalities, inequalities, boxes)
//! - **Block-structured KKT factorization**: symbolic analysis picks a
//!   fill-reducing block ordering before the numeric LDLᵀ
//! - **Robust inner loop**: inertia correction, iterative refinement, and a
//!   backtracking Armijo line search on the merit function
//!
//! ## Factorization backends
//!
//! - **Blocked**: in-crate block LDLᵀ exploiting the KKT sparsity (default)
//! - **Dense**: in-crate unpivoted reference LDLᵀ
//! - **Faer**: dense Bunch-Kaufman factorization from the faer library
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::{DMatrix, DVector};
//! use alpine_solver::func::{LinearFunction, QuadraticDistanceCost};
//! use alpine_solver::manifold::EuclideanSpace;
//! use alpine_solver::sets::EqualitySet;
//! use alpine_solver::{Problem, Results, Solver, Workspace};
//!
//! // minimize ½‖x − (1, 2)‖² subject to x₁ + x₂ = 0
//! let space = Arc::new(EuclideanSpace::new(2));
//! let target = DVector::from_vec(vec![1.0, 2.0]);
//! let cost = QuadraticDistanceCost::unweighted(space.clone(), target);
//! let mut problem = Problem::new(space, Box::new(cost));
//! problem.add_constraint(
//!     Box::new(LinearFunction::homogeneous(DMatrix::from_row_slice(
//!         1, 2, &[1.0, 1.0],
//!     ))),
//!     Box::new(EqualitySet::new()),
//! );
//!
//! let problem = Arc::new(problem);
//! let mut solver = Solver::new(problem.clone());
//! let mut workspace = Workspace::new(&problem).unwrap();
//! let mut results = Results::new(&problem);
//!
//! let x0 = DVector::zeros(2);
//! solver.solve(&mut workspace, &mut results, &x0).unwrap();
//! assert!((results.x_opt[0] - (-0.5)).abs() < 1e-6);
//! ```

pub mod error;
pub mod func;
pub mod linalg;
pub mod linesearch;
pub mod logger;
pub mod manifold;
pub mod merit;
pub mod problem;
pub mod prox;
pub mod results;
pub mod sets;
pub mod solver;
pub mod workspace;

pub use error::{AlpineResult, SolverError};
pub use linalg::LdltChoice;
pub use linesearch::{ArmijoLinesearch, LinesearchOptions};
pub use logger::{init_logger, init_logger_with_level};
pub use problem::{ConstraintObject, Problem};
pub use results::{ConvergenceFlag, Results};
pub use solver::{BclParams, Callback, HistoryCallback, InertiaFlag, LogRecord, Solver, VerboseLevel};
pub use workspace::Workspace;
