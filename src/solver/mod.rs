//! The primal-dual augmented Lagrangian solver.
//!
//! The outer loop follows the bound-constrained Lagrangian (BCL) update
//! schedule: after each inner solve it accepts or rejects the multiplier
//! estimates based on the observed constraint violation, tightening the
//! primal tolerance η and the inner tolerance ω on success and shrinking the
//! penalty μ on failure. The inner loop is a regularized Newton iteration on
//! the primal-dual optimality system, with:
//!
//! - inertia correction of the KKT matrix by primal regularization,
//! - iterative refinement of the Newton step,
//! - a backtracking Armijo search on the primal-dual merit function.

use std::sync::{Arc, Mutex};

use nalgebra::DVector;
use tracing::{debug, info, warn};

use crate::error::{AlpineResult, SolverError};
use crate::func::Cost;
use crate::linalg::LdltChoice;
use crate::linesearch::{ArmijoLinesearch, LinesearchOptions};
use crate::manifold::Manifold;
use crate::merit::AlMeritFunction;
use crate::problem::Problem;
use crate::prox::ProximalPenalty;
use crate::results::{ConvergenceFlag, Results};
use crate::sets::ConstraintSet;
use crate::workspace::Workspace;

/// How chatty the solver is through `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerboseLevel {
    /// No per-iteration output.
    #[default]
    Quiet,
    /// One record per outer iteration.
    Verbose,
    /// One record per inner iteration.
    Very,
}

/// Outcome of an inertia check on the KKT factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertiaFlag {
    /// ndx positive and numdual negative pivots, no zeros.
    Ok,
    /// Wrong sign counts.
    Bad,
    /// Zero pivots present.
    HasZeros,
}

/// BCL schedule parameters.
#[derive(Debug, Clone, Copy)]
pub struct BclParams {
    /// Exponent of μ in the primal tolerance after a failed outer step.
    pub prim_alpha: f64,
    /// Exponent of μ/μ_upper scaling the primal tolerance after success.
    pub prim_beta: f64,
    /// Exponent of μ in the inner tolerance after a failed outer step.
    pub dual_alpha: f64,
    /// Exponent of μ/μ_upper scaling the inner tolerance after success.
    pub dual_beta: f64,
    /// Multiplicative penalty decrease on failure, in (0, 1).
    pub mu_update_factor: f64,
    /// Multiplicative proximal-weight decay applied every outer step, in
    /// (0, 1].
    pub rho_update_factor: f64,
}

impl Default for BclParams {
    fn default() -> Self {
        BclParams {
            prim_alpha: 0.1,
            prim_beta: 0.9,
            dual_alpha: 1.0,
            dual_beta: 1.0,
            mu_update_factor: 0.1,
            rho_update_factor: 1.0,
        }
    }
}

/// One row of the inner-iteration log.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord {
    pub iter: usize,
    pub alpha: f64,
    pub inner_crit: f64,
    pub prim_infeas: f64,
    pub dual_infeas: f64,
    pub delta: f64,
    pub dmerit_dir: f64,
    pub merit: f64,
    pub delta_merit: f64,
}

/// Observer invoked after each accepted inner step and at termination.
///
/// Callbacks must not mutate solver state; they see the workspace and results
/// read-only.
pub trait Callback {
    fn call(&mut self, workspace: &Workspace, results: &Results);
}

/// Per-iteration history of the key convergence measures.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub prim_infeas: Vec<f64>,
    pub dual_infeas: Vec<f64>,
    pub merit: Vec<f64>,
}

/// Callback recording a [`History`]; clone it before registering and read the
/// snapshot from the copy you kept.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    data: Arc<Mutex<History>>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> History {
        self.data.lock().expect("history lock poisoned").clone()
    }
}

impl Callback for HistoryCallback {
    fn call(&mut self, _workspace: &Workspace, results: &Results) {
        let mut data = self.data.lock().expect("history lock poisoned");
        data.prim_infeas.push(results.prim_infeas);
        data.dual_infeas.push(results.dual_infeas);
        data.merit.push(results.merit);
    }
}

const MAX_REFINEMENT_STEPS: usize = 5;
const REFINEMENT_TOL: f64 = 1e-13;

/// Primal-dual augmented Lagrangian solver with proximal regularization.
pub struct Solver {
    problem: Arc<Problem>,
    merit: AlMeritFunction,
    prox_penalty: ProximalPenalty,
    callbacks: Vec<Box<dyn Callback>>,

    /// Verbosity of the `tracing` output.
    pub verbose: VerboseLevel,
    /// Drop constraint curvature terms where the sets allow it.
    pub use_gauss_newton: bool,
    /// BCL schedule parameters.
    pub bcl: BclParams,
    /// Line-search options.
    pub ls_options: LinesearchOptions,

    /// Initial regularization tried by the inertia loop.
    pub delta_init: f64,
    /// First nonzero regularization when zero fails cold.
    pub delta_nonzero_init: f64,
    /// Floor for warm-started regularization.
    pub delta_min: f64,
    /// Regularization budget; exceeding it is a hard numerical failure.
    pub delta_max: f64,
    /// Growth factor when the previous accepted regularization was nonzero.
    pub del_inc_k: f64,
    /// Growth factor when regularizing from a cold start.
    pub del_inc_big: f64,
    /// Shrink factor applied to the previously accepted regularization.
    pub del_dec_k: f64,

    target_tol: f64,
    mu_init: f64,
    rho_init: f64,
    mu_lower: f64,
    mu_upper: f64,
    prim_tol0: f64,
    inner_tol0: f64,
    inner_tol_min: f64,
    max_iters: usize,

    mu: f64,
    mu_inv: f64,
    rho: f64,
    prim_tol: f64,
    inner_tol: f64,
}

impl Solver {
    /// Build a solver with the default configuration.
    pub fn new(problem: Arc<Problem>) -> Self {
        let mu_init = 1e-2;
        let rho_init = 0.0;
        let prox_penalty =
            ProximalPenalty::new(problem.manifold_arc(), problem.manifold().neutral(), rho_init);
        Solver {
            merit: AlMeritFunction::new(mu_init),
            prox_penalty,
            callbacks: Vec::new(),
            verbose: VerboseLevel::Quiet,
            use_gauss_newton: false,
            bcl: BclParams::default(),
            ls_options: LinesearchOptions::default(),
            delta_init: 0.0,
            delta_nonzero_init: 1e-4,
            delta_min: 1e-14,
            delta_max: 1e6,
            del_inc_k: 8.0,
            del_inc_big: 100.0,
            del_dec_k: 1.0 / 3.0,
            target_tol: 1e-6,
            mu_init,
            rho_init,
            mu_lower: 1e-9,
            mu_upper: 1.0,
            prim_tol0: 1.0,
            inner_tol0: 1.0,
            inner_tol_min: 1e-9,
            max_iters: 100,
            mu: mu_init,
            mu_inv: 1.0 / mu_init,
            rho: rho_init,
            prim_tol: 1.0,
            inner_tol: 1.0,
            problem,
        }
    }

    /// Set the target tolerance on primal and dual infeasibility.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.target_tol = tol;
        self
    }

    /// Set the initial penalty parameter μ.
    pub fn with_mu_init(mut self, mu_init: f64) -> Self {
        self.mu_init = mu_init;
        self
    }

    /// Set the initial proximal weight ρ.
    pub fn with_rho_init(mut self, rho_init: f64) -> Self {
        self.rho_init = rho_init;
        self
    }

    /// Set the verbosity level.
    pub fn with_verbose(mut self, verbose: VerboseLevel) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the penalty floor μ_lower.
    pub fn with_mu_lower(mut self, mu_lower: f64) -> Self {
        self.mu_lower = mu_lower;
        self
    }

    /// Override the BCL schedule parameters.
    pub fn with_bcl_params(mut self, bcl: BclParams) -> Self {
        self.bcl = bcl;
        self
    }

    /// Override the line-search options.
    pub fn with_linesearch_options(mut self, options: LinesearchOptions) -> Self {
        self.ls_options = options;
        self
    }

    /// Set the inner-iteration budget.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Allocate a workspace with the given factorization backend.
    pub fn allocate_workspace(&self, choice: LdltChoice) -> AlpineResult<Workspace> {
        Workspace::with_ldlt(&self.problem, choice)
    }

    /// Set the augmented Lagrangian penalty parameter.
    pub fn set_penalty(&mut self, mu: f64) {
        self.mu = mu;
        self.mu_inv = 1.0 / mu;
        self.merit.set_penalty(mu);
        for i in 0..self.problem.num_constraints() {
            self.problem.constraint(i).set.set_prox_parameter(mu);
        }
    }

    /// Set the primal proximal penalty parameter.
    pub fn set_prox_parameter(&mut self, rho: f64) {
        self.rho = rho;
        self.prox_penalty.set_scale(rho);
    }

    /// Set the target tolerance.
    pub fn set_tolerance(&mut self, tol: f64) {
        self.target_tol = tol;
    }

    /// Set the inner-iteration budget.
    pub fn set_max_iters(&mut self, max_iters: usize) {
        self.max_iters = max_iters;
    }

    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Add an observer invoked after each accepted step.
    pub fn register_callback(&mut self, cb: Box<dyn Callback>) {
        self.callbacks.push(cb);
    }

    /// Remove all observers.
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    /// Solve from `x0` with zero initial multipliers.
    pub fn solve(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &DVector<f64>,
    ) -> AlpineResult<ConvergenceFlag> {
        let lams0 = DVector::zeros(workspace.numdual);
        self.solve_with_multipliers(workspace, results, x0, &lams0)
    }

    /// Solve from `x0` with per-constraint initial multiplier blocks.
    pub fn solve_with_multiplier_blocks(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &DVector<f64>,
        lams0: &[DVector<f64>],
    ) -> AlpineResult<ConvergenceFlag> {
        let numc = self.problem.num_constraints();
        if lams0.len() != numc {
            return Err(SolverError::MultiplierCount {
                provided: lams0.len(),
                expected: numc,
            });
        }
        let mut flat = DVector::zeros(self.problem.total_constraint_dim());
        for (i, block) in lams0.iter().enumerate() {
            let (offset, len) = (self.problem.index(i), self.problem.constraint_dim(i));
            if block.len() != len {
                return Err(SolverError::DimensionMismatch {
                    expected: len,
                    actual: block.len(),
                });
            }
            flat.rows_mut(offset, len).copy_from(block);
        }
        self.solve_with_multipliers(workspace, results, x0, &flat)
    }

    /// Solve from `x0` with a stacked initial multiplier vector.
    pub fn solve_with_multipliers(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: &DVector<f64>,
        lams0: &DVector<f64>,
    ) -> AlpineResult<ConvergenceFlag> {
        if x0.len() != self.problem.nx() {
            return Err(SolverError::DimensionMismatch {
                expected: self.problem.nx(),
                actual: x0.len(),
            });
        }
        if lams0.len() != self.problem.total_constraint_dim() {
            return Err(SolverError::DimensionMismatch {
                expected: self.problem.total_constraint_dim(),
                actual: lams0.len(),
            });
        }

        self.set_penalty(self.mu_init);
        self.set_prox_parameter(self.rho_init);

        results.x_opt.copy_from(x0);
        workspace.x_prev.copy_from(x0);
        results.lams_opt.copy_from(lams0);
        workspace.lams_prev.copy_from(lams0);
        results.converged = ConvergenceFlag::Uninitialized;
        results.num_iters = 0;
        self.prox_penalty.update_target(&workspace.x_prev);

        self.update_tolerance_failure();

        let mut outer_iter = 0usize;
        while results.num_iters < self.max_iters {
            results.mu = self.mu;
            results.rho = self.rho;
            if self.verbose >= VerboseLevel::Verbose {
                info!(
                    outer_iter,
                    omega = self.inner_tol,
                    eta = self.prim_tol,
                    mu = self.mu,
                    "outer iteration"
                );
            }
            self.solve_inner(workspace, results)?;

            // accept the new primal iterate and re-anchor the proximal term
            workspace.x_prev.copy_from(&results.x_opt);
            self.prox_penalty.update_target(&workspace.x_prev);

            if results.prim_infeas < self.prim_tol {
                workspace.lams_prev.copy_from(&results.lams_opt);
                if results.prim_infeas < self.target_tol && results.dual_infeas < self.target_tol {
                    results.converged = ConvergenceFlag::Success;
                    break;
                }
                self.update_tolerance_success();
            } else {
                self.update_penalty();
                self.update_tolerance_failure();
            }
            self.set_prox_parameter(self.rho * self.bcl.rho_update_factor);

            outer_iter += 1;
        }

        match results.converged {
            ConvergenceFlag::Success => {
                info!(num_iters = results.num_iters, "solver successfully converged")
            }
            ConvergenceFlag::MaxItersReached => {
                warn!(max_iters = self.max_iters, "max number of iterations reached")
            }
            ConvergenceFlag::Uninitialized => {}
        }

        self.invoke_callbacks(workspace, results);

        Ok(results.converged)
    }

    /// Newton iteration on the primal-dual system at fixed (μ, ρ, λ_prev).
    fn solve_inner(&mut self, ws: &mut Workspace, results: &mut Results) -> AlpineResult<()> {
        let ndx = ws.ndx;
        let nd = ws.numdual;
        let ntot = ws.ntot;
        let numc = self.problem.num_constraints();

        results.lams_opt.copy_from(&ws.lams_prev);
        self.merit.set_penalty(self.mu);

        let mut delta_last = 0.0;

        loop {
            // evaluate the problem and refresh the multiplier estimates
            results.value = self.problem.cost().value(&results.x_opt);
            self.problem
                .evaluate_constraints(&results.x_opt, &mut ws.cstr_values);
            self.compute_multipliers(
                &results.lams_opt,
                &ws.cstr_values,
                &ws.lams_prev,
                &mut ws.shift_cstr_values,
                &mut ws.lams_plus,
                &mut ws.lams_pdal,
                &mut ws.dual_prox_err,
            );

            self.problem
                .constraint_jacobians(&results.x_opt, &mut ws.jacobians);
            self.problem
                .cost()
                .gradient(&results.x_opt, &mut ws.objective_gradient);
            self.problem
                .cost()
                .hessian(&results.x_opt, &mut ws.objective_hessian);

            ws.jacobians_proj.copy_from(&ws.jacobians);
            for i in 0..numc {
                let (offset, len) = ws.segment(i);
                self.problem
                    .constraint(i)
                    .set
                    .apply_normal_cone_projection_jacobian(
                        ws.shift_cstr_values.rows(offset, len),
                        ws.jacobians_proj.rows_mut(offset, len),
                    );
            }
            self.problem.vector_hessian_products(
                &results.x_opt,
                &ws.lams_pdal,
                self.use_gauss_newton,
                &mut ws.cstr_vhp,
            );

            results.merit =
                self.merit
                    .evaluate(&self.problem, &results.x_opt, &results.lams_opt, &ws.lams_plus);
            if self.rho > 0.0 {
                results.merit += self.prox_penalty.value(&results.x_opt);
                self.prox_penalty.gradient(&results.x_opt, &mut ws.prox_grad);
                self.prox_penalty.hessian(&results.x_opt, &mut ws.prox_hess);
            }
            check_nan_vector("prox_grad", &ws.prox_grad)?;

            // KKT right-hand side and merit gradient
            ws.kkt_rhs.fill(0.0);
            {
                let mut head = ws.kkt_rhs.rows_mut(0, ndx);
                head.copy_from(&ws.objective_gradient);
                head.gemv_tr(1.0, &ws.jacobians, &results.lams_opt, 1.0);
            }
            ws.kkt_rhs.rows_mut(ndx, nd).copy_from(&ws.dual_prox_err);
            ws.merit_gradient.copy_from(&ws.objective_gradient);
            ws.merit_gradient.gemv_tr(1.0, &ws.jacobians, &ws.lams_pdal, 1.0);
            if self.rho > 0.0 {
                ws.kkt_rhs.rows_mut(0, ndx).axpy(1.0, &ws.prox_grad, 1.0);
                ws.merit_gradient += &ws.prox_grad;
            }
            check_nan_vector("kkt_rhs", &ws.kkt_rhs)?;

            for i in 0..numc {
                let (offset, len) = ws.segment(i);
                self.problem
                    .constraint(i)
                    .set
                    .compute_active_set(ws.cstr_values.rows(offset, len), &mut results.active_set[i]);
            }

            // primal and dual infeasibility
            ws.dual_residual.copy_from(&ws.kkt_rhs.rows(0, ndx));
            if self.rho > 0.0 {
                ws.dual_residual -= &ws.prox_grad;
            }
            results.dual_infeas = ws.dual_residual.amax();
            for i in 0..numc {
                let (offset, len) = ws.segment(i);
                self.problem.constraint(i).set.projection(
                    ws.shift_cstr_values.rows(offset, len),
                    ws.shift_cstr_proj.rows_mut(offset, len),
                );
                let mut violation: f64 = 0.0;
                for k in offset..offset + len {
                    violation = violation.max((ws.cstr_values[k] - ws.shift_cstr_proj[k]).abs());
                }
                results.constraint_violations[i] = violation;
            }
            results.prim_infeas = if numc > 0 {
                results.constraint_violations.amax()
            } else {
                0.0
            };
            let inner_crit = ws.kkt_rhs.amax();

            let outer_cond = results.prim_infeas <= self.target_tol
                && results.dual_infeas <= self.target_tol;
            if inner_crit <= self.inner_tol || outer_cond {
                return Ok(());
            }

            // KKT matrix
            ws.kkt_matrix.fill(0.0);
            ws.kkt_matrix
                .view_mut((0, 0), (ndx, ndx))
                .copy_from(&ws.objective_hessian);
            ws.kkt_matrix
                .view_mut((0, ndx), (ndx, nd))
                .tr_copy_from(&ws.jacobians_proj);
            ws.kkt_matrix
                .view_mut((ndx, 0), (nd, ndx))
                .copy_from(&ws.jacobians_proj);
            for k in 0..nd {
                ws.kkt_matrix[(ndx + k, ndx + k)] = -self.mu;
            }
            if self.rho > 0.0 {
                let mut top_left = ws.kkt_matrix.view_mut((0, 0), (ndx, ndx));
                top_left += &ws.prox_hess;
            }
            for i in 0..numc {
                let use_vhp = !self.use_gauss_newton
                    || !self.problem.constraint(i).set.disable_gauss_newton();
                if use_vhp {
                    let mut top_left = ws.kkt_matrix.view_mut((0, 0), (ndx, ndx));
                    top_left += &ws.cstr_vhp[i];
                }
            }
            check_nan_matrix("kkt_matrix", &ws.kkt_matrix)?;

            // inertia correction; on acceptance the regularized diagonal
            // stays in the matrix until the refined step is computed
            let mut delta = self.delta_init;
            let mut inertia = InertiaFlag::Bad;
            while delta <= self.delta_max {
                if delta > 0.0 {
                    for k in 0..ndx {
                        ws.kkt_matrix[(k, k)] += delta;
                    }
                }
                ws.ldlt.compute(&ws.kkt_matrix)?;
                ws.ldlt.signature(&mut ws.signature);
                inertia = check_inertia(ndx, nd, &ws.signature)?;
                debug!(delta, rcond = ws.ldlt.rcond(), ?inertia, "factorization");

                if inertia == InertiaFlag::Ok {
                    delta_last = delta;
                    break;
                }
                if delta > 0.0 {
                    for k in 0..ndx {
                        ws.kkt_matrix[(k, k)] -= delta;
                    }
                }
                if delta == 0.0 {
                    delta = if delta_last == 0.0 {
                        self.delta_nonzero_init
                    } else {
                        self.delta_min.max(self.del_dec_k * delta_last)
                    };
                } else {
                    delta *= if delta_last == 0.0 {
                        self.del_inc_big
                    } else {
                        self.del_inc_k
                    };
                }
            }
            if inertia != InertiaFlag::Ok {
                return Err(SolverError::InertiaCorrectionFailed {
                    delta_max: self.delta_max,
                });
            }

            // Newton step with iterative refinement against the factorized
            // (regularized) matrix
            for k in 0..ntot {
                ws.pd_step[k] = -ws.kkt_rhs[k];
            }
            ws.ldlt.solve_in_place(&mut ws.pd_step)?;
            check_nan_vector("pd_step", &ws.pd_step)?;

            for _ in 0..MAX_REFINEMENT_STEPS {
                ws.kkt_resdl.copy_from(&ws.kkt_rhs);
                ws.kkt_resdl.gemv(1.0, &ws.kkt_matrix, &ws.pd_step, 1.0);
                if ws.kkt_resdl.amax() < REFINEMENT_TOL {
                    break;
                }
                ws.kkt_resdl.neg_mut();
                ws.ldlt.solve_in_place(&mut ws.kkt_resdl)?;
                ws.pd_step += &ws.kkt_resdl;
            }

            // restore the unregularized diagonal
            if delta > 0.0 {
                for k in 0..ndx {
                    ws.kkt_matrix[(k, k)] -= delta;
                }
            }

            // merit slope along the step
            ws.dmerit_dir = ws.merit_gradient.dot(&ws.pd_step.rows(0, ndx))
                - ws.dual_prox_err.dot(&ws.pd_step.rows(ndx, nd));

            let phi0 = results.merit;
            let dmerit_dir = ws.dmerit_dir;
            let (alpha_opt, phi_new) = ArmijoLinesearch::new(self.ls_options).run(
                |alpha| self.eval_merit_at(alpha, ws, results),
                phi0,
                dmerit_dir,
            );

            check_nan_scalar("alpha_opt", alpha_opt)?;
            check_nan_vector("x_trial", &ws.x_trial)?;
            check_nan_vector("lams_trial", &ws.lams_trial)?;
            ws.alpha_opt = alpha_opt;
            results.x_opt.copy_from(&ws.x_trial);
            results.lams_opt.copy_from(&ws.lams_trial);
            results.merit = phi_new;
            check_nan_scalar("merit", results.merit)?;

            self.invoke_callbacks(ws, results);

            let record = LogRecord {
                iter: results.num_iters + 1,
                alpha: alpha_opt,
                inner_crit,
                prim_infeas: results.prim_infeas,
                dual_infeas: results.dual_infeas,
                delta,
                dmerit_dir,
                merit: results.merit,
                delta_merit: phi_new - phi0,
            };
            if self.verbose >= VerboseLevel::Very {
                info!(
                    iter = record.iter,
                    alpha = record.alpha,
                    inner_crit = record.inner_crit,
                    prim_infeas = record.prim_infeas,
                    dual_infeas = record.dual_infeas,
                    delta = record.delta,
                    dmerit_dir = record.dmerit_dir,
                    merit = record.merit,
                    delta_merit = record.delta_merit,
                    "inner iteration"
                );
            } else {
                debug!(?record, "inner iteration");
            }

            results.num_iters += 1;
            if results.num_iters >= self.max_iters {
                results.converged = ConvergenceFlag::MaxItersReached;
                return Ok(());
            }
        }
    }

    /// Merit value at the trial point x ⊕ α·dx, λ + α·dλ.
    ///
    /// Leaves the trial point and refreshed multiplier estimates in the
    /// workspace, so the accepted α matches the buffers.
    fn eval_merit_at(&self, alpha: f64, ws: &mut Workspace, results: &Results) -> f64 {
        let ndx = ws.ndx;
        for k in 0..ndx {
            ws.step_scratch[k] = alpha * ws.pd_step[k];
        }
        self.problem
            .manifold()
            .integrate(&results.x_opt, &ws.step_scratch, &mut ws.x_trial);
        for k in 0..ws.numdual {
            ws.lams_trial[k] = results.lams_opt[k] + alpha * ws.pd_step[ndx + k];
        }

        self.problem
            .evaluate_constraints(&ws.x_trial, &mut ws.cstr_values);
        self.compute_multipliers(
            &ws.lams_trial,
            &ws.cstr_values,
            &ws.lams_prev,
            &mut ws.shift_cstr_values,
            &mut ws.lams_plus,
            &mut ws.lams_pdal,
            &mut ws.dual_prox_err,
        );

        let mut value =
            self.merit
                .evaluate(&self.problem, &ws.x_trial, &ws.lams_trial, &ws.lams_plus);
        if self.rho > 0.0 {
            value += self.prox_penalty.value(&ws.x_trial);
        }
        value
    }

    /// First-order and primal-dual multiplier estimates at the current point.
    ///
    /// Fills s = c(x) + μ λ_prev, λ⁺ = Π_N(s)/μ, the dual proximal error
    /// μ(λ⁺ − λ), and λ_pdal = 2λ⁺ − λ.
    #[allow(clippy::too_many_arguments)]
    fn compute_multipliers(
        &self,
        lams: &DVector<f64>,
        cstr_values: &DVector<f64>,
        lams_prev: &DVector<f64>,
        shift: &mut DVector<f64>,
        lams_plus: &mut DVector<f64>,
        lams_pdal: &mut DVector<f64>,
        dual_prox_err: &mut DVector<f64>,
    ) {
        shift.copy_from(cstr_values);
        shift.axpy(self.mu, lams_prev, 1.0);
        for i in 0..self.problem.num_constraints() {
            let (offset, len) = (self.problem.index(i), self.problem.constraint_dim(i));
            self.problem
                .constraint(i)
                .set
                .normal_cone_projection(shift.rows(offset, len), lams_plus.rows_mut(offset, len));
        }
        *lams_plus *= self.mu_inv;
        for k in 0..lams.len() {
            dual_prox_err[k] = self.mu * (lams_plus[k] - lams[k]);
            lams_pdal[k] = 2.0 * lams_plus[k] - lams[k];
        }
    }

    fn invoke_callbacks(&mut self, workspace: &Workspace, results: &Results) {
        for cb in &mut self.callbacks {
            cb.call(workspace, results);
        }
    }

    fn update_penalty(&mut self) {
        if self.mu == self.mu_lower {
            self.set_penalty(self.mu_init);
        } else {
            self.set_penalty((self.mu * self.bcl.mu_update_factor).max(self.mu_lower));
        }
    }

    /// Recompute both tolerances from scratch off the new penalty.
    fn update_tolerance_failure(&mut self) {
        self.prim_tol = self.prim_tol0 * self.mu.powf(self.bcl.prim_alpha);
        self.inner_tol = self.inner_tol0 * self.mu.powf(self.bcl.dual_alpha);
        self.tolerance_post_update();
    }

    /// Contract the current tolerances.
    fn update_tolerance_success(&mut self) {
        self.prim_tol *= (self.mu / self.mu_upper).powf(self.bcl.prim_beta);
        self.inner_tol *= (self.mu / self.mu_upper).powf(self.bcl.dual_beta);
        self.tolerance_post_update();
    }

    fn tolerance_post_update(&mut self) {
        self.inner_tol = self.inner_tol.max(self.inner_tol_min);
        self.prim_tol = self.prim_tol.max(self.target_tol);
    }
}

/// Classify a factorization signature against the expected saddle-point
/// inertia (ndx positive, numdual negative, no zeros).
fn check_inertia(ndx: usize, numdual: usize, signature: &[i8]) -> AlpineResult<InertiaFlag> {
    let mut numpos = 0;
    let mut numneg = 0;
    let mut numzer = 0;
    for &s in signature {
        match s {
            1 => numpos += 1,
            -1 => numneg += 1,
            0 => numzer += 1,
            _ => return Err(SolverError::InvalidSignature),
        }
    }
    if numpos == ndx && numneg == numdual && numzer == 0 {
        Ok(InertiaFlag::Ok)
    } else if numzer != 0 {
        Ok(InertiaFlag::HasZeros)
    } else {
        Ok(InertiaFlag::Bad)
    }
}

fn check_nan_vector(name: &'static str, v: &DVector<f64>) -> AlpineResult<()> {
    if v.iter().any(|x| x.is_nan()) {
        return Err(SolverError::NaN { name });
    }
    Ok(())
}

fn check_nan_matrix(name: &'static str, m: &nalgebra::DMatrix<f64>) -> AlpineResult<()> {
    if m.iter().any(|x| x.is_nan()) {
        return Err(SolverError::NaN { name });
    }
    Ok(())
}

fn check_nan_scalar(name: &'static str, x: f64) -> AlpineResult<()> {
    if x.is_nan() {
        return Err(SolverError::NaN { name });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_inertia_classification() {
        assert_eq!(check_inertia(2, 1, &[1, 1, -1]).unwrap(), InertiaFlag::Ok);
        assert_eq!(check_inertia(2, 1, &[1, -1, -1]).unwrap(), InertiaFlag::Bad);
        assert_eq!(
            check_inertia(2, 1, &[1, 0, -1]).unwrap(),
            InertiaFlag::HasZeros
        );
        assert!(check_inertia(1, 0, &[2]).is_err());
    }

    #[test]
    fn test_bcl_tolerance_floors() {
        use crate::func::QuadraticDistanceCost;
        use crate::manifold::EuclideanSpace;
        use nalgebra::DVector;

        let space = Arc::new(EuclideanSpace::new(2));
        let cost = QuadraticDistanceCost::unweighted(space.clone(), DVector::zeros(2));
        let problem = Arc::new(Problem::new(space, Box::new(cost)));
        let mut solver = Solver::new(problem).with_tolerance(1e-5);

        // drive the penalty down hard; the floors must hold throughout
        solver.set_penalty(1e-12);
        solver.update_tolerance_failure();
        assert!(solver.prim_tol >= 1e-5);
        assert!(solver.inner_tol >= solver.inner_tol_min);

        for _ in 0..50 {
            solver.update_tolerance_success();
            assert!(solver.prim_tol >= 1e-5);
            assert!(solver.inner_tol >= solver.inner_tol_min);
        }
    }

    #[test]
    fn test_verbose_ordering() {
        assert!(VerboseLevel::Quiet < VerboseLevel::Verbose);
        assert!(VerboseLevel::Verbose < VerboseLevel::Very);
    }
}
