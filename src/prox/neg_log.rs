use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg, ScaledArg};

/// Closed form of \\(\arg\min_y -\alpha \log y + \frac{r}{2}(y - w)^2\\).
pub(crate) fn neg_log_scalar(w: f64, alpha: f64, r: f64) -> f64
{
    (w + (w * w + 4. * alpha / r).sqrt()) / 2.
}

/// Proximal operator of \\(-\alpha \sum_i \log({\bf diag}(\beta) x + g)_i\\).
#[derive(Default)]
pub struct NegLogProx
{
    alpha: f64,
    rates: Vec<f64>,
    arg: Option<ScaledArg>,
}

impl ProxOperator for NegLogProx
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let s = arg.scaled_arg()?;
        let rates = s.rates(arg.rho);
        if rates.iter().any(|r| *r == 0.) {
            return Err(SolverError::ProxFailure("negative log is unbounded without a penalty".to_string()));
        }

        self.alpha = arg.function.alpha;
        self.rates = rates;
        self.arg = Some(s);
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let s = self.arg.as_ref().ok_or_else(|| SolverError::ProxFailure("not initialized".to_string()))?;

        let y: Vec<f64> = s.to_arg(v).iter().zip(self.rates.iter())
            .map(|(w, r)| if r.is_finite() {neg_log_scalar(*w, self.alpha, *r)} else {*w})
            .collect();
        Ok(s.from_arg(&y, v))
    }
}

//

#[test]
fn test_neg_log_prox()
{
    use float_eq::assert_float_eq;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    let term = prox_function(ProxFunctionType::NegLog, 2., vec![variable(2, 1, "x")]);
    let (mut op, _) = build_term(&term, 1.).unwrap();
    let x = op.apply(&[1., -1.]).unwrap();
    for (xi, vi) in x.iter().zip([1., -1.]) {
        assert!(*xi > 0.);
        // -2 / x + (x - v) = 0
        assert_float_eq!(-2. / xi + (xi - vi), 0., abs <= 1e-12);
    }

    assert!(build_term(&term, 0.).is_err());
}
