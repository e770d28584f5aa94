use crate::floatgeneric::FloatGeneric;
use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg, ScaledArg};

type La = FloatGeneric<f64>;

fn soft_threshold(y: f64, k: f64) -> f64
{
    if y > k {
        y - k
    }
    else if y < -k {
        y + k
    }
    else {
        0.
    }
}

/// Proximal operator of \\(\alpha \\|{\bf diag}(\beta) x + g\\|_1\\), the soft threshold.
#[derive(Default)]
pub struct NormL1Prox
{
    alpha: f64,
    rates: Vec<f64>,
    arg: Option<ScaledArg>,
}

impl ProxOperator for NormL1Prox
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let s = arg.scaled_arg()?;
        self.alpha = arg.function.alpha;
        self.rates = s.rates(arg.rho);
        self.arg = Some(s);
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let s = self.arg.as_ref().ok_or_else(|| SolverError::ProxFailure("not initialized".to_string()))?;

        let y: Vec<f64> = s.to_arg(v).iter().zip(self.rates.iter())
            .map(|(y, r)| if *r > 0. {soft_threshold(*y, self.alpha / r)} else {0.})
            .collect();
        Ok(s.from_arg(&y, v))
    }
}

/// Proximal operator of \\(\alpha \\|\beta x + g\\|_2\\), the block soft threshold.
#[derive(Default)]
pub struct NormL2Prox
{
    alpha: f64,
    rate: f64,
    arg: Option<ScaledArg>,
}

impl ProxOperator for NormL2Prox
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let s = arg.scaled_arg()?;
        let beta = s.uniform().ok_or_else(|| SolverError::UnknownProx(
            "NormL2 needs a uniformly scaled variable argument".to_string()
        ))?;
        self.alpha = arg.function.alpha;
        self.rate = arg.rho / (beta * beta);
        self.arg = Some(s);
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let s = self.arg.as_ref().ok_or_else(|| SolverError::ProxFailure("not initialized".to_string()))?;

        let mut y = s.to_arg(v);
        let norm = La::norm(&y);
        let k = if self.rate > 0. && norm > 0. {
            (1. - self.alpha / (self.rate * norm)).max(0.)
        }
        else {
            0.
        };
        La::scale(k, &mut y);
        Ok(s.from_arg(&y, v))
    }
}

//

#[test]
fn test_norm_l1_prox()
{
    use float_eq::assert_float_eq;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    let term = prox_function(ProxFunctionType::NormL1, 1., vec![variable(3, 1, "x")]);
    let (mut op, _) = build_term(&term, 2.).unwrap();
    let x = op.apply(&[2., -0.3, -1.]).unwrap();
    assert_float_eq!(x.as_slice(), [1.5, 0., -0.5].as_ref(), abs_all <= 1e-12);

    // |2 x|: threshold on 2x at 1 / (rho / 4)
    let term = prox_function(ProxFunctionType::NormL1, 1., vec![
        multiply(scalar_constant(2., 1, 1), variable(1, 1, "x")),
    ]);
    let (mut op, _) = build_term(&term, 4.).unwrap();
    let x = op.apply(&[2.]).unwrap();
    assert_float_eq!(x[0], 1.5, abs <= 1e-12);
}

#[test]
fn test_norm_l2_prox()
{
    use float_eq::assert_float_eq;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    let term = prox_function(ProxFunctionType::NormL2, 1., vec![variable(2, 1, "x")]);
    let (mut op, _) = build_term(&term, 1.).unwrap();
    let x = op.apply(&[3., 4.]).unwrap();
    assert_float_eq!(x.as_slice(), [2.4, 3.2].as_ref(), abs_all <= 1e-12);

    let x = op.apply(&[0.3, 0.4]).unwrap();
    assert_float_eq!(x.as_slice(), [0., 0.].as_ref(), abs_all <= 1e-12);
}
