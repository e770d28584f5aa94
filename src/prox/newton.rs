use log::trace;
use crate::densemat::{DenseMatrix, DenseLu};
use crate::floatgeneric::FloatGeneric;
use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg, ScaledArg, SmoothFunction, VariableOffsets};

type La = FloatGeneric<f64>;

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOL: f64 = 1e-10;
const LINE_SEARCH_ALPHA: f64 = 0.25;
const LINE_SEARCH_BETA: f64 = 0.5;
const LINE_SEARCH_MIN_STEP: f64 = 1e-12;
const EPI_MAX_ITER: usize = 100;
const EPI_TOL: f64 = 1e-9;
const EPI_MAX_BRACKET: usize = 100;

/// How the argument of a Newton-based term depends on the block variables.
enum ArgMap
{
    /// \\(y = {\bf diag}(\beta) x + g\\)
    Diagonal(ScaledArg),
    /// \\(y = H x + g\\) with dense \\(H\\)
    Dense(DenseMatrix, Vec<f64>),
}

impl ArgMap
{
    fn to_arg(&self, x: &[f64]) -> Vec<f64>
    {
        match self {
            ArgMap::Diagonal(s) => s.to_arg(x),
            ArgMap::Dense(h, g) => {
                let mut y = h.mul_vec(x);
                La::add(1., g, &mut y);
                y
            },
        }
    }
}

/// Damped Newton minimization of \\(\alpha f(y(x)) + \frac{\rho}{2}\\|x - v\\|_2^2\\).
///
/// Starts from `v`, projecting onto the domain of `f` after each step.
fn newton_solve<F: SmoothFunction>(f: &F, alpha: f64, map: &ArgMap, rho: f64, v: &[f64]) -> Result<Vec<f64>, SolverError>
{
    let n = v.len();
    let phi = |x: &[f64]| {
        let y = map.to_arg(x);
        let d: f64 = x.iter().zip(v).map(|(a, b)| (a - b) * (a - b)).sum();
        alpha * f.eval(&y) + 0.5 * rho * d
    };
    let project = |x: &mut Vec<f64>| {
        if let ArgMap::Diagonal(s) = map {
            let mut y = s.to_arg(x);
            f.proj_feasible(&mut y);
            *x = s.from_arg(&y, x);
        }
    };

    let mut x = v.to_vec();
    project(&mut x);
    let mut phi_x = phi(&x);

    for iter in 0.. NEWTON_MAX_ITER {
        let y = map.to_arg(&x);
        let gy = f.gradf(&y);
        let hy = f.hessf(&y);

        // gradient and Newton direction in x
        let mut grad: Vec<f64> = x.iter().zip(v).map(|(a, b)| rho * (a - b)).collect();
        let dir: Vec<f64> = match map {
            ArgMap::Diagonal(s) => {
                for i in 0.. n {
                    grad[i] += alpha * s.beta[i] * gy[i];
                }
                (0.. n).map(|i| {
                    let h = alpha * s.beta[i] * s.beta[i] * hy[i] + rho;
                    if h > 0. {-grad[i] / h} else {0.}
                }).collect()
            },
            ArgMap::Dense(hm, _) => {
                let gx = hm.trans_mul_vec(&gy);
                La::add(alpha, &gx, &mut grad);
                let (m, _) = hm.size();
                let scaled = DenseMatrix::new(m, n).by_fn(|r, c| alpha * hy[r] * hm[(r, c)]);
                let mut hess = hm.transpose().mul_mat(&scaled);
                for i in 0.. n {
                    hess[(i, i)] += rho;
                }
                let lu = DenseLu::new(&hess, 0.)
                    .ok_or_else(|| SolverError::ProxFailure("singular Newton system".to_string()))?;
                lu.solve(&grad).iter().map(|d| -d).collect()
            },
        };

        let dir_norm = La::norm(&dir);
        trace!("newton {}: step {:.3e}", iter, dir_norm);
        if !dir_norm.is_finite() {
            return Err(SolverError::ProxFailure("non-finite Newton step".to_string()));
        }
        if dir_norm <= NEWTON_TOL * (1. + La::norm(&x)) {
            return Ok(x);
        }

        // backtracking
        let slope = La::dot(&grad, &dir);
        let mut t = 1.;
        loop {
            let mut xt: Vec<f64> = x.iter().zip(dir.iter()).map(|(a, d)| a + t * d).collect();
            project(&mut xt);
            let phi_t = phi(&xt);
            if phi_t <= phi_x + LINE_SEARCH_ALPHA * t * slope {
                x = xt;
                phi_x = phi_t;
                break;
            }
            t *= LINE_SEARCH_BETA;
            if t < LINE_SEARCH_MIN_STEP {
                // no further decrease is possible at machine precision
                if t * dir_norm <= NEWTON_TOL * (1. + La::norm(&x)) {
                    return Ok(x);
                }
                return Err(SolverError::ProxFailure(format!("line search failed at iteration {}", iter)));
            }
        }
    }

    Err(SolverError::ProxFailure(format!("Newton iteration did not converge in {} iterations", NEWTON_MAX_ITER)))
}

//

/// Proximal operator of \\(\alpha f(H x + g)\\) for a [`SmoothFunction`] \\(f\\).
///
/// A diagonal \\(H\\) keeps the Newton system diagonal;
/// otherwise \\(H\\) is densified and the full Hessian \\(\alpha H^T \nabla^2 f H + \rho I\\) is factorized each step.
pub struct NewtonProx<F: SmoothFunction>
{
    f: F,
    alpha: f64,
    rho: f64,
    map: Option<ArgMap>,
}

impl<F: SmoothFunction> NewtonProx<F>
{
    pub fn new(f: F) -> Self
    {
        NewtonProx {
            f,
            alpha: 1.,
            rho: 0.,
            map: None,
        }
    }
}

impl<F: SmoothFunction> ProxOperator for NewtonProx<F>
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let a = arg.single_arg()?;
        self.alpha = arg.function.alpha;
        self.rho = arg.rho;

        self.map = Some(if let Ok(s) = arg.scaled_arg() {
            ArgMap::Diagonal(s)
        }
        else if self.f.full_domain() {
            ArgMap::Dense(a.dense(&arg.offsets), a.offset.clone())
        }
        else {
            return Err(SolverError::UnknownProx(
                format!("{:?} with a restricted domain needs a diagonally scaled variable argument", arg.function.prox_type)
            ));
        });
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let map = self.map.as_ref().ok_or_else(|| SolverError::ProxFailure("not initialized".to_string()))?;
        newton_solve(&self.f, self.alpha, map, self.rho, v)
    }
}

//

/// Projection onto the epigraph \\(\\{(x, t) : \alpha f(x) \le t\\}\\) of a [`SmoothFunction`] \\(f\\).
///
/// Both arguments must be plain variables, `t` a scalar.
/// Outside of the epigraph, the projection is \\((x(\lambda), s + \lambda)\\) where
/// \\(x(\lambda)\\) is the proximal point of \\(\lambda \alpha f\\) at \\(v\\) and
/// \\(\lambda > 0\\) solves \\(\alpha f(x(\lambda)) = s + \lambda\\).
pub struct NewtonEpigraph<F: SmoothFunction>
{
    f: F,
    alpha: f64,
    offsets: VariableOffsets,
    x_var: String,
    t_var: String,
}

impl<F: SmoothFunction> NewtonEpigraph<F>
{
    pub fn new(f: F) -> Self
    {
        NewtonEpigraph {
            f,
            alpha: 1.,
            offsets: VariableOffsets::default(),
            x_var: String::new(),
            t_var: String::new(),
        }
    }

    fn value(&self, x: &[f64]) -> f64
    {
        self.alpha * self.f.eval(x)
    }

    /// \\(g(\lambda) = \alpha f(x(\lambda)) - s - \lambda\\), its derivative and \\(x(\lambda)\\).
    fn residual(&self, map: &ArgMap, v: &[f64], s: f64, lambda: f64) -> Result<(f64, f64, Vec<f64>), SolverError>
    {
        let x = newton_solve(&self.f, self.alpha, map, 1. / lambda, v)?;
        let g = self.value(&x) - s - lambda;

        let gx = self.f.gradf(&x);
        let hx = self.f.hessf(&x);
        let dg = -gx.iter().zip(hx.iter())
            .map(|(g, h)| {
                let ag = self.alpha * g;
                ag * ag / (1. + lambda * self.alpha * h)
            })
            .sum::<f64>() - 1.;
        Ok((g, dg, x))
    }
}

impl<F: SmoothFunction> ProxOperator for NewtonEpigraph<F>
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        if arg.args.len() != 2 {
            return Err(SolverError::MalformedExpression(
                format!("epigraph takes 2 arguments, got {}", arg.args.len())
            ));
        }
        let plain = |i: usize| arg.args[i].plain_variable().cloned().ok_or_else(|| SolverError::UnknownProx(
            format!("epigraph of {:?} needs plain variable arguments", arg.function.prox_type)
        ));
        let (x_var, t_var) = (plain(0)?, plain(1)?);
        if x_var == t_var || arg.args[1].dim() != 1 || arg.offsets.len() != 2 {
            return Err(SolverError::UnknownProx(
                format!("epigraph of {:?} needs distinct variables with a scalar bound", arg.function.prox_type)
            ));
        }

        self.alpha = arg.function.alpha;
        self.offsets = arg.offsets.clone();
        self.x_var = x_var;
        self.t_var = t_var;
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let vb = self.offsets.split(v);
        let vx = vb.get_or_zero(&self.x_var, 0);
        let s = vb.get_or_zero(&self.t_var, 1)[0];
        let n = vx.len();

        let mut vx_feasible = vx.clone();
        self.f.proj_feasible(&mut vx_feasible);
        if vx_feasible == vx && self.value(&vx) <= s {
            return Ok(v.to_vec());
        }

        let map = ArgMap::Diagonal(ScaledArg {
            beta: vec![1.; n],
            offset: vec![0.; n],
        });

        // bracket the root of the decreasing residual
        let (mut lo, mut hi) = (0., 1.);
        let mut bracket = 0;
        while self.residual(&map, &vx, s, hi)?.0 > 0. {
            lo = hi;
            hi *= 2.;
            bracket += 1;
            if bracket > EPI_MAX_BRACKET {
                return Err(SolverError::ProxFailure("epigraph projection is unbounded".to_string()));
            }
        }

        // safeguarded Newton on lambda
        let mut lambda = 0.5 * (lo + hi);
        for iter in 0.. EPI_MAX_ITER {
            let (g, dg, x) = self.residual(&map, &vx, s, lambda)?;
            trace!("epigraph {}: lambda {:.3e} residual {:.3e}", iter, lambda, g);

            if g.abs() <= EPI_TOL * (1. + s.abs() + lambda) || hi - lo <= EPI_TOL * (1. + hi) {
                let mut out = v.to_vec();
                let (ox, _) = self.offsets.get(&self.x_var).unwrap_or((0, n));
                let (ot, _) = self.offsets.get(&self.t_var).unwrap_or((n, 1));
                out[ox.. ox + n].copy_from_slice(&x);
                out[ot] = s + lambda;
                return Ok(out);
            }

            if g > 0. {
                lo = lambda;
            }
            else {
                hi = lambda;
            }
            let next = lambda - g / dg;
            lambda = if next > lo && next < hi {next} else {0.5 * (lo + hi)};
        }

        Err(SolverError::ProxFailure(format!("epigraph projection did not converge in {} iterations", EPI_MAX_ITER)))
    }
}

//

#[cfg(test)]
mod tests
{
    use float_eq::assert_float_eq;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    #[test]
    fn test_newton_inv_pos()
    {
        // argmin 1/x + (rho/2)(x - v)^2  =>  -1/x^2 + rho (x - v) = 0
        let term = prox_function(ProxFunctionType::InvPos, 1., vec![variable(2, 1, "x")]);
        let (mut op, _) = build_term(&term, 1.).unwrap();

        let x = op.apply(&[1., -3.]).unwrap();
        for (xi, vi) in x.iter().zip([1., -3.]) {
            assert!(*xi > 0.);
            assert!((-1. / (xi * xi) + (xi - vi)).abs() < 1e-8);
        }
    }

    #[test]
    fn test_newton_exp_dense()
    {
        // argument x + y: non-diagonal map of the block
        let term = prox_function(ProxFunctionType::Exp, 1., vec![
            add(vec![variable(1, 1, "x"), variable(1, 1, "y")]),
        ]);
        let (mut op, _) = build_term(&term, 2.).unwrap();

        let v = [0.5, -0.5];
        let x = op.apply(&v).unwrap();
        // stationarity: e^(x + y) + 2 (x_i - v_i) = 0
        let e = (x[0] + x[1]).exp();
        assert_float_eq!(e + 2. * (x[0] - v[0]), 0., abs <= 1e-8);
        assert_float_eq!(e + 2. * (x[1] - v[1]), 0., abs <= 1e-8);
    }

    #[test]
    fn test_newton_unbounded()
    {
        // exp alone has no minimizer
        let term = prox_function(ProxFunctionType::Exp, 1., vec![variable(1, 1, "x")]);
        let (mut op, _) = build_term(&term, 0.).unwrap();
        assert!(op.apply(&[0.]).is_err());
    }

    #[test]
    fn test_epigraph_sum_square()
    {
        let term = epigraph(ProxFunctionType::SumSquare, 1., variable(1, 1, "x"), variable(1, 1, "t"));
        let (mut op, offsets) = build_term(&term, 1.).unwrap();
        assert_eq!(offsets.get("t"), Some((0, 1)));

        // inside: unchanged
        let p = op.apply(&[5., 1.]).unwrap();
        assert_eq!(p, vec![5., 1.]);

        // outside: projection onto t >= x^2 from (t, x) = (0, 2)
        let p = op.apply(&[0., 2.]).unwrap();
        let (t, x) = (p[0], p[1]);
        assert_float_eq!(t, x * x, abs <= 1e-7);
        // normal of the boundary at (x, t) is (2x, -1), parallel to (x - 2, t - 0)
        assert_float_eq!((x - 2.) * (-1.) - t * (2. * x), 0., abs <= 1e-6);
    }
}
