//! Block-sequential proximal ADMM solver

use std::collections::{BTreeMap, BTreeSet};
use core::fmt::Display;
use num_traits::Num;
use crate::affine::build_constraints;
use crate::data::{DataCache, DataProvider};
use crate::expression::{Expression, ExpressionKind, Problem};
use crate::floatgeneric::FloatGeneric;
use crate::parameter::{ParameterService, variable_parameter_id};
use crate::prox::{ProxOperator, ProxOperatorArg, VariableOffsets, build_prox_operator};
use crate::solver_error::SolverError;
use crate::vector::{BlockMatrix, BlockVector};

type La = FloatGeneric<f64>;

const NORM_ESTIMATE_ITERS: usize = 50;
const LINEARIZE_MARGIN: f64 = 1.01;

//

/// Solver parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams
{
    /// Penalty weight of the augmented Lagrangian.
    pub rho: f64,
    /// Absolute tolerance of the primal and dual residuals.
    pub abs_tol: f64,
    /// Relative tolerance of the primal and dual residuals.
    pub rel_tol: f64,
    /// Max iteration number.
    pub max_iterations: usize,
    /// Period of iterations to check the residuals and output progress log.
    pub epoch_iterations: usize,
}

impl Default for SolverParams
{
    fn default() -> Self
    {
        SolverParams {
            rho: 1.,
            abs_tol: 1e-4,
            rel_tol: 1e-3,
            max_iterations: 10_000,
            epoch_iterations: 10,
        }
    }
}

fn num_by_env<N: Num + Display>(e: &str) -> Option<N>
{
    if let Some(v) = std::env::var(e).ok()
                     .and_then(|s| {N::from_str_radix(&s, 10).ok()}) {
        log::info!("{}: {}", e, v);
        Some(v)
    }
    else {
        None
    }
}

impl SolverParams
{
    /// Overrides parameters by environment variables
    /// `RHO`, `ABS_TOL`, `REL_TOL`, `MAX_ITERATIONS` and `EPOCH_ITERATIONS`.
    pub fn set_par_by_env(&mut self)
    {
        self.rho = num_by_env("RHO").unwrap_or(self.rho);
        self.abs_tol = num_by_env("ABS_TOL").unwrap_or(self.abs_tol);
        self.rel_tol = num_by_env("REL_TOL").unwrap_or(self.rel_tol);
        self.max_iterations = num_by_env("MAX_ITERATIONS").unwrap_or(self.max_iterations);
        self.epoch_iterations = num_by_env("EPOCH_ITERATIONS").unwrap_or(self.epoch_iterations);
    }
}

//

/// Solver states.
///
/// `NotStarted` and `Running` are followed by exactly one of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverState
{
    #[default]
    NotStarted,
    Running,
    /// Residuals met the tolerances.
    Optimal,
    /// Iteration cap reached; the last iterate is still written.
    MaxIterationsReached,
    /// The solve was aborted by a [`SolverError`].
    Error,
}

/// Residuals and their tolerances at the last check.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Residuals
{
    pub r_norm: f64,
    pub s_norm: f64,
    pub epsilon_primal: f64,
    pub epsilon_dual: f64,
}

impl Residuals
{
    pub fn converged(&self) -> bool
    {
        self.r_norm <= self.epsilon_primal && self.s_norm <= self.epsilon_dual
    }
}

/// Status reported by [`ProxAdmmSolver::solve`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverStatus
{
    pub state: SolverState,
    pub num_iterations: usize,
    pub residuals: Residuals,
}

//

/// How a block step reduces to the proximal operator of its term.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Coupling
{
    /// \\(A_i^T A_i = \alpha I\\)
    Scalar(f64),
    /// No constraint row touches the block.
    Unconstrained,
    /// Linearized step with \\(\mu \ge \\|A_i\\|^2\\).
    Linearized(f64),
}

/// Objective block `index` with its constraint operator and proximal operator.
struct ProxOperatorInfo
{
    index: usize,
    offsets: VariableOffsets,
    a: BlockMatrix,
    at: BlockMatrix,
    coupling: Coupling,
    rho: f64,
    prox: Box<dyn ProxOperator>,
}

impl ProxOperatorInfo
{
    fn new(index: usize, term: &Expression, offsets: VariableOffsets, a_all: &BlockMatrix, data: &DataCache, rho: f64)
    -> Result<Self, SolverError>
    {
        let cols: BTreeSet<String> = offsets.iter().map(|(k, _)| k.clone()).collect();
        let a = a_all.restrict_cols(&cols);
        let at = a.transpose();

        // a scaled identity Gram must cover every variable of the block
        let scalar = if a.col_keys().count() == offsets.len() {
            a.gram()?.as_scalar()
        }
        else {
            None
        };

        let coupling = if a.is_empty() {
            Coupling::Unconstrained
        }
        else {
            match scalar {
                Some(alpha) if alpha > 0. => Coupling::Scalar(alpha),
                _ => {
                    let norm = a.norm_estimate(NORM_ESTIMATE_ITERS)?;
                    if norm > 0. {
                        Coupling::Linearized(LINEARIZE_MARGIN * norm * norm)
                    }
                    else {
                        Coupling::Unconstrained
                    }
                },
            }
        };

        let rho_i = match coupling {
            Coupling::Scalar(alpha) => rho * alpha,
            Coupling::Unconstrained => 0.,
            Coupling::Linearized(mu) => rho * mu,
        };
        log::debug!("block {}: {} variables, {:?}, rho {:.3e}", index, offsets.n(), coupling, rho_i);

        let arg = ProxOperatorArg::build(term, data, offsets.clone(), rho_i)?;
        let prox = build_prox_operator(&arg)?;

        Ok(ProxOperatorInfo {
            index, offsets, a, at, coupling, rho: rho_i, prox,
        })
    }

    /// New block variables given the partial residual `u` and the current iterate `x`.
    fn step(&mut self, u: &BlockVector, x: &BlockVector) -> Result<BlockVector, SolverError>
    {
        let v = match self.coupling {
            Coupling::Scalar(alpha) => {
                let mut v = self.offsets.flatten(&self.at.apply(u)?);
                La::scale(alpha.recip(), &mut v);
                v
            },
            Coupling::Unconstrained => {
                self.offsets.flatten(x)
            },
            Coupling::Linearized(mu) => {
                let mut r = self.a.apply(x)?;
                r.add_scaled(-1., u)?;
                let g = self.offsets.flatten(&self.at.apply(&r)?);
                let mut v = self.offsets.flatten(x);
                La::add(-mu.recip(), &g, &mut v);
                v
            },
        };

        let xi = self.prox.apply(&v)?;
        if xi.len() != self.offsets.n() {
            return Err(SolverError::ProxFailure(
                format!("block {}: {} values for {} variables", self.index, xi.len(), self.offsets.n())
            ));
        }
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("block {} (rho {:.3e}): {:?}", self.index, self.rho, xi);
        }
        Ok(self.offsets.split(&xi))
    }
}

//

/// Block-sequential proximal ADMM solver.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// This struct solves a problem
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & \sum_i f_i(x_i) \\\\
/// {\rm subject \ to} & \sum_i A_i x_i + b = 0,
/// \end{array}
/// \\]
/// where each \\(f_i\\) is an objective term with a registered [`ProxOperator`]
/// and \\(x_i\\) are the variables owned by that term.
/// Blocks are updated one after another within an iteration,
/// each seeing the most recent values of the blocks before it.
///
/// On completion the variables are written through a [`ParameterService`]
/// under [`variable_parameter_id`] of the problem and variable ids.
pub struct ProxAdmmSolver<P: ParameterService>
{
    /// solver parameters.
    pub par: SolverParams,
    problem: Problem,
    service: P,
    status: SolverStatus,
}

impl<P: ParameterService> ProxAdmmSolver<P>
{
    /// Creates an instance.
    pub fn new(problem: Problem, par: SolverParams, service: P) -> Self
    {
        ProxAdmmSolver {
            par,
            problem,
            service,
            status: SolverStatus::default(),
        }
    }

    /// Changes solver parameters.
    ///
    /// Returns [`ProxAdmmSolver`] with its parameters changed.
    /// * `f` is a function to change parameters given by its argument.
    pub fn par<F>(mut self, f: F) -> Self
    where F: FnOnce(&mut SolverParams)
    {
        f(&mut self.par);
        self
    }

    pub fn problem_id(&self) -> &str
    {
        &self.problem.id
    }

    pub fn status(&self) -> &SolverStatus
    {
        &self.status
    }

    pub fn parameter_service(&self) -> &P
    {
        &self.service
    }

    /// Consumes the solver and returns its [`ParameterService`].
    pub fn into_parameter_service(self) -> P
    {
        self.service
    }

    /// Starts to solve the problem.
    ///
    /// Returns `Ok` with the final [`SolverStatus`], either [`SolverState::Optimal`]
    /// or [`SolverState::MaxIterationsReached`], or `Err` with [`SolverError`].
    /// * `data` resolves the constant data keys of the problem.
    pub fn solve(&mut self, data: &dyn DataProvider) -> Result<SolverStatus, SolverError>
    {
        self.status = SolverStatus {
            state: SolverState::Running,
            ..Default::default()
        };

        match self.solve_core(data) {
            Ok(status) => {
                self.status = status;
                Ok(status)
            },
            Err(e) => {
                log::error!("{}", e);
                self.status.state = SolverState::Error;
                Err(e)
            },
        }
    }

    fn solve_core(&mut self, data: &dyn DataProvider) -> Result<SolverStatus, SolverError>
    {
        log::info!("----- Initializing");
        log::debug!("{:?}", self.par);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.problem.debug_string());
        }

        let cache = DataCache::new(data);
        let (a, b) = build_constraints(&self.problem, &cache)?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("A:\n{}", a.debug_string());
            log::trace!("b:\n{}", b.debug_string());
        }

        let terms = objective_terms(&self.problem.objective)?;
        let layouts = block_layouts(&terms, &a)?;

        let mut blocks = Vec::with_capacity(terms.len());
        for (i, (term, offsets)) in terms.iter().zip(layouts).enumerate() {
            blocks.push(ProxOperatorInfo::new(i, term, offsets, &a, &cache, self.par.rho)?);
        }
        log::debug!("{} blocks, {} data keys", blocks.len(), cache.len());

        let mut core = SolverCore::new(&self.par, blocks, b, a.n());

        log::info!("----- Started");
        let status = core.iterate()?;

        for (var, value) in core.x.iter() {
            self.service.update(variable_parameter_id(&self.problem.id, var), value);
        }
        Ok(status)
    }
}

/// Direct children of an `Add` objective, or a single term.
fn objective_terms(objective: &Expression) -> Result<Vec<&Expression>, SolverError>
{
    let terms: Vec<&Expression> = match &objective.kind {
        ExpressionKind::Add => objective.args.iter().collect(),
        ExpressionKind::ProxFunction(_) => vec![objective],
        _ => return Err(SolverError::MalformedExpression(
            format!("objective must be a sum of proximal functions:\n{}", objective.debug_string())
        )),
    };

    if terms.is_empty() {
        return Err(SolverError::MalformedExpression("empty objective".to_string()));
    }
    Ok(terms)
}

fn collect_variables(e: &Expression, vars: &mut BTreeMap<String, usize>) -> Result<(), SolverError>
{
    if let ExpressionKind::Variable(id) = &e.kind {
        match vars.get(id) {
            Some(d) if *d != e.dim() => return Err(SolverError::DimensionMismatch(
                format!("variable {}: {} vs {}", id, d, e.dim())
            )),
            _ => {
                vars.insert(id.clone(), e.dim());
            },
        }
    }
    for a in e.args.iter() {
        collect_variables(a, vars)?;
    }
    Ok(())
}

/// Variable layout of each term; every variable belongs to exactly one term.
fn block_layouts(terms: &[&Expression], a: &BlockMatrix) -> Result<Vec<VariableOffsets>, SolverError>
{
    let mut owner = BTreeMap::<String, usize>::new();
    let mut layouts = Vec::with_capacity(terms.len());

    for (i, term) in terms.iter().enumerate() {
        let mut vars = BTreeMap::new();
        collect_variables(term, &mut vars)?;

        for (id, d) in vars.iter() {
            if let Some(j) = owner.insert(id.clone(), i) {
                return Err(SolverError::MalformedExpression(
                    format!("variable {} appears in objective terms {} and {}", id, j, i)
                ));
            }
            match a.col_dim(id) {
                Some(n) if n != *d => return Err(SolverError::DimensionMismatch(
                    format!("variable {}: {} in constraints vs {} in objective", id, n, d)
                )),
                _ => {},
            }
        }
        layouts.push(VariableOffsets::new(vars.iter().map(|(k, n)| (k, *n))));
    }

    if let Some(id) = a.col_keys().find(|k| !owner.contains_key(*k)) {
        return Err(SolverError::MalformedExpression(
            format!("variable {} appears only in constraints", id)
        ));
    }
    Ok(layouts)
}

//

struct SolverCore<'a>
{
    par: &'a SolverParams,
    blocks: Vec<ProxOperatorInfo>,
    b: BlockVector,
    n: usize,

    x: BlockVector,
    x_prev: BlockVector,
    u: BlockVector,
}

impl<'a> SolverCore<'a>
{
    fn new(par: &'a SolverParams, blocks: Vec<ProxOperatorInfo>, b: BlockVector, n: usize) -> Self
    {
        let mut x = BlockVector::new();
        for blk in blocks.iter() {
            for (k, (_, d)) in blk.offsets.iter() {
                x.insert(k, vec![0.; *d]);
            }
        }

        SolverCore {
            par,
            blocks,
            b,
            n,
            x_prev: x.clone(),
            x,
            u: BlockVector::new(),
        }
    }

    fn iterate(&mut self) -> Result<SolverStatus, SolverError>
    {
        let epoch = self.par.epoch_iterations.max(1);

        let mut i = 0;
        while i < self.par.max_iterations {
            self.x_prev = self.x.clone();
            self.sweep()?;

            if i % epoch == 0 {
                let res = self.residuals()?;
                log::debug!("iter={} residuals primal={:.2e} [{:.2e}] dual={:.2e} [{:.2e}]",
                    i, res.r_norm, res.epsilon_primal, res.s_norm, res.epsilon_dual);

                if res.converged() {
                    log::info!("----- Converged");
                    return Ok(SolverStatus {
                        state: SolverState::Optimal,
                        num_iterations: i,
                        residuals: res,
                    });
                }
            }
            i += 1;
        }

        let res = self.residuals()?;
        log::debug!("iter={} residuals primal={:.2e} [{:.2e}] dual={:.2e} [{:.2e}]",
            i, res.r_norm, res.epsilon_primal, res.s_norm, res.epsilon_dual);
        log::warn!("----- MaxIterationsReached");

        Ok(SolverStatus {
            state: SolverState::MaxIterationsReached,
            num_iterations: i,
            residuals: res,
        })
    }

    /// One Gauss-Seidel pass over the blocks.
    fn sweep(&mut self) -> Result<(), SolverError>
    {
        // u := u - b - sum_i A_i x_i
        self.u.add_scaled(-1., &self.b)?;
        for blk in self.blocks.iter() {
            self.u.add_scaled(-1., &blk.a.apply(&self.x)?)?;
        }

        for blk in self.blocks.iter_mut() {
            self.u.add_scaled(1., &blk.a.apply(&self.x)?)?;

            let xi = blk.step(&self.u, &self.x)?;
            for (k, v) in xi.iter() {
                self.x.insert(k, v.clone());
            }

            self.u.add_scaled(-1., &blk.a.apply(&self.x)?)?;
        }
        Ok(())
    }

    fn residuals(&self) -> Result<Residuals, SolverError>
    {
        let par = self.par;

        // primal
        let mut sum = self.b.clone();
        let mut max_norm = self.b.norm();
        for blk in self.blocks.iter() {
            let ax = blk.a.apply(&self.x)?;
            max_norm = max_norm.max(ax.norm());
            sum.add_scaled(1., &ax)?;
        }
        let r_norm = sum.norm();

        // dual, accumulated from the last block backward
        let mut ax_diff = BlockVector::new();
        let mut s_sq = 0.;
        for i in (0.. self.blocks.len().saturating_sub(1)).rev() {
            let next = &self.blocks[i + 1];
            ax_diff.add_scaled(1., &next.a.apply(&self.x)?)?;
            ax_diff.add_scaled(-1., &next.a.apply(&self.x_prev)?)?;

            let s_i = self.blocks[i].at.apply(&ax_diff)?.norm();
            s_sq += s_i * s_i;
        }
        let s_norm = par.rho * s_sq.sqrt();

        let mut atu_sq = 0.;
        for blk in self.blocks.iter() {
            let atu = blk.at.apply(&self.u)?.norm();
            atu_sq += atu * atu;
        }

        let m = self.b.dim() as f64;
        let n = self.n as f64;
        Ok(Residuals {
            r_norm,
            s_norm,
            epsilon_primal: par.abs_tol * m.sqrt() + par.rel_tol * max_norm,
            epsilon_dual: par.abs_tol * n.sqrt() + par.rel_tol * par.rho * atu_sq.sqrt(),
        })
    }
}

//

#[cfg(test)]
mod tests
{
    use float_eq::assert_float_eq;
    use crate::data::DataMap;
    use crate::densemat::DenseMatrix;
    use crate::expression::*;
    use crate::parameter::LocalParameterService;
    use super::*;

    fn sum_square_to(id: &str, key: &str, n: usize) -> Expression
    {
        prox_function(ProxFunctionType::SumSquare, 1., vec![
            add(vec![variable(n, 1, id), negate(constant(n, 1, key))]),
        ])
    }

    #[test]
    fn test_params_default()
    {
        let p = SolverParams::default();
        assert_eq!(p.rho, 1.);
        assert_eq!(p.max_iterations, 10_000);
        assert_eq!(p.epoch_iterations, 10);

        let s = ProxAdmmSolver::new(Problem::new("p", add(vec![]), vec![]), p, LocalParameterService::new())
            .par(|p| p.rho = 2.);
        assert_eq!(s.par.rho, 2.);
        assert_eq!(s.status().state, SolverState::NotStarted);
    }

    #[test]
    fn test_shared_variable()
    {
        let _ = env_logger::builder().is_test(true).try_init();

        let obj = add(vec![sum_square_to("x", "a", 2), sum_square_to("x", "c", 2)]);
        let data = DataMap::new()
            .dense("a", DenseMatrix::new(2, 1))
            .dense("c", DenseMatrix::new(2, 1));
        let mut s = ProxAdmmSolver::new(Problem::new("p", obj, vec![]), SolverParams::default(), LocalParameterService::new());

        let r = s.solve(&data);
        assert!(matches!(r, Err(SolverError::MalformedExpression(_))));
        assert_eq!(s.status().state, SolverState::Error);
        assert!(s.parameter_service().is_empty());
    }

    #[test]
    fn test_linearized_block()
    {
        let _ = env_logger::builder().is_test(true).try_init();

        // ||x - a||^2 + ||z||^2 s.t. D x - z = 0, D = diag(1, 2)
        let data = DataMap::new()
            .dense("a", DenseMatrix::new(2, 1).iter_colmaj(&[1., 1.]))
            .dense("D", DenseMatrix::new(2, 2).iter_rowmaj(&[1., 0., 0., 2.]));
        let obj = add(vec![
            sum_square_to("x", "a", 2),
            prox_function(ProxFunctionType::SumSquare, 1., vec![variable(2, 1, "z")]),
        ]);
        let c = eq_constraint(add(vec![
            multiply(constant(2, 2, "D"), variable(2, 1, "x")),
            negate(variable(2, 1, "z")),
        ]));
        let mut s = ProxAdmmSolver::new(Problem::new("p", obj, vec![c]), SolverParams::default(), LocalParameterService::new())
            .par(|p| {
                p.abs_tol = 1e-8;
                p.rel_tol = 1e-8;
                p.epoch_iterations = 1;
            });

        let status = s.solve(&data).unwrap();
        assert_eq!(status.state, SolverState::Optimal);

        // minimize (x_k - 1)^2 + d_k^2 x_k^2: x_k = 1 / (1 + d_k^2)
        let x = s.parameter_service().fetch(variable_parameter_id("p", "x"));
        assert_float_eq!(x.as_slice(), [0.5, 0.2].as_ref(), abs_all <= 1e-5);
    }
}
