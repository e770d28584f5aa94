use crate::floatgeneric::FloatGeneric;
use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg, ScaledArg};
use super::neg_log::neg_log_scalar;

type La = FloatGeneric<f64>;

const EPS_ZERO: f64 = 1e-12;

/// Matrix decomposition an orthogonally invariant function acts through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spectrum
{
    /// Eigenvalues of the symmetric part of a square matrix.
    Eigen,
    /// Singular values.
    Singular,
}

/// Orthogonally invariant function \\(F(Y) = \sum_i \phi(\lambda_i(Y))\\).
pub trait SpectralFunction
{
    fn spectrum(&self) -> Spectrum;

    /// Proximal operator of \\(\alpha \phi\\) with unit penalty at `lambda`.
    fn prox(&self, lambda: f64, alpha: f64) -> f64;

    /// Whether \\(F\\) is minimized at the zero matrix, so that a zero penalty is allowed.
    fn minimized_at_zero(&self) -> bool;
}

/// \\(-\log\det Y\\)
pub struct NegLogDetSpectrum;

impl SpectralFunction for NegLogDetSpectrum
{
    fn spectrum(&self) -> Spectrum
    {
        Spectrum::Eigen
    }

    fn prox(&self, lambda: f64, alpha: f64) -> f64
    {
        neg_log_scalar(lambda, alpha, 1.)
    }

    fn minimized_at_zero(&self) -> bool
    {
        false
    }
}

/// \\(\\|Y\\|_*\\)
pub struct NuclearSpectrum;

impl SpectralFunction for NuclearSpectrum
{
    fn spectrum(&self) -> Spectrum
    {
        Spectrum::Singular
    }

    fn prox(&self, sigma: f64, alpha: f64) -> f64
    {
        (sigma - alpha).max(0.)
    }

    fn minimized_at_zero(&self) -> bool
    {
        true
    }
}

/// Proximal operator of \\(\alpha F(\beta X + G)\\) for an orthogonally invariant \\(F\\).
///
/// Decomposes \\(\beta V + G\\), maps each eigen or singular value through the scalar operator of
/// \\(\phi\\) with penalty \\(\rho / \beta^2\\) and reconstructs.
pub struct OrthoInvariantProx<S: SpectralFunction>
{
    f: S,
    alpha: f64,
    rate: f64,
    m: usize,
    n: usize,
    arg: Option<ScaledArg>,
}

impl<S: SpectralFunction> OrthoInvariantProx<S>
{
    pub fn new(f: S) -> Self
    {
        OrthoInvariantProx {
            f,
            alpha: 1.,
            rate: 0.,
            m: 0,
            n: 0,
            arg: None,
        }
    }
}

impl<S: SpectralFunction> ProxOperator for OrthoInvariantProx<S>
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let a = arg.single_arg()?;
        let s = arg.scaled_arg()?;
        let beta = s.uniform().ok_or_else(|| SolverError::UnknownProx(
            format!("{:?} needs a uniformly scaled matrix argument", arg.function.prox_type)
        ))?;

        if self.f.spectrum() == Spectrum::Eigen && a.m != a.n {
            return Err(SolverError::DimensionMismatch(
                format!("{:?} of a {} x {} matrix", arg.function.prox_type, a.m, a.n)
            ));
        }
        if arg.rho == 0. && !self.f.minimized_at_zero() {
            return Err(SolverError::ProxFailure(
                format!("{:?} is unbounded without a penalty", arg.function.prox_type)
            ));
        }

        self.alpha = arg.function.alpha;
        self.rate = arg.rho / (beta * beta);
        self.m = a.m;
        self.n = a.n;
        self.arg = Some(s);
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let s = self.arg.as_ref().ok_or_else(|| SolverError::ProxFailure("not initialized".to_string()))?;

        let mut y = s.to_arg(v);
        if self.rate == 0. {
            y.iter_mut().for_each(|e| *e = 0.);
            return Ok(s.from_arg(&y, v));
        }

        // prox of alpha phi with penalty r equals prox of (alpha / r) phi with unit penalty
        let t = self.alpha / self.rate;
        match self.f.spectrum() {
            Spectrum::Eigen => La::map_eig_dense(self.n, &mut y, EPS_ZERO, |e| Some(self.f.prox(e, t))),
            Spectrum::Singular => La::map_svd(self.m, self.n, &mut y, EPS_ZERO, |e| self.f.prox(e, t)),
        }

        if y.iter().any(|e| !e.is_finite()) {
            return Err(SolverError::ProxFailure("non-finite spectral map".to_string()));
        }
        Ok(s.from_arg(&y, v))
    }
}

//

#[test]
fn test_neg_log_det_prox()
{
    use float_eq::assert_float_eq;
    use crate::densemat::DenseMatrix;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    let term = prox_function(ProxFunctionType::NegLogDet, 1., vec![variable(2, 2, "X")]);
    let (mut op, _) = build_term(&term, 1.).unwrap();

    // eigenvalues 3 and 1 with eigenvectors (1, 1) and (1, -1)
    let v = [2., 1., 1., 2.];
    let x = op.apply(&v).unwrap();

    let l1 = (3. + (9f64 + 4.).sqrt()) / 2.;
    let l2 = (1. + (1f64 + 4.).sqrt()) / 2.;
    let expected = DenseMatrix::new(2, 2).iter_rowmaj(&[
        (l1 + l2) / 2., (l1 - l2) / 2.,
        (l1 - l2) / 2., (l1 + l2) / 2.,
    ]);
    assert_float_eq!(x.as_slice(), expected.as_slice(), abs_all <= 1e-9);
}

#[test]
fn test_nuclear_prox()
{
    use float_eq::assert_float_eq;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    let term = prox_function(ProxFunctionType::NormNuclear, 1., vec![variable(2, 3, "X")]);
    let (mut op, _) = build_term(&term, 1.).unwrap();

    // singular values 3 and 0.5
    let v = [3., 0., 0., 0.5, 0., 0.];
    let x = op.apply(&v).unwrap();
    assert_float_eq!(x.as_slice(), [2., 0., 0., 0., 0., 0.].as_ref(), abs_all <= 1e-9);

    // without a penalty the minimizer is zero
    let (mut op, _) = build_term(&term, 0.).unwrap();
    let x = op.apply(&v).unwrap();
    assert_float_eq!(x.as_slice(), [0.; 6].as_ref(), abs_all <= 1e-12);
}
