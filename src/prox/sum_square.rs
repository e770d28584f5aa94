use crate::densemat::DenseLu;
use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg, ScaledArg, AffineArg, VariableOffsets};

enum SumSquareForm
{
    Diagonal(ScaledArg),
    /// LU of \\(2\alpha H^T H + \rho I\\) and \\(2\alpha H^T g\\)
    General(DenseLu, Vec<f64>),
}

/// Proximal operator of \\(\alpha \\|H x + g\\|_2^2\\).
///
/// Solves \\((2\alpha H^T H + \rho I) x = \rho v - 2\alpha H^T g\\),
/// componentwise for a diagonal \\(H\\) and through a cached LU factorization otherwise.
#[derive(Default)]
pub struct SumSquareProx
{
    alpha: f64,
    rho: f64,
    form: Option<SumSquareForm>,
}

impl SumSquareProx
{
    fn general(&self, a: &AffineArg, offsets: &VariableOffsets) -> Result<SumSquareForm, SolverError>
    {
        let h = a.dense(offsets);
        let mut m = h.transpose().mul_mat(&h).scale(2. * self.alpha);
        for i in 0.. offsets.n() {
            m[(i, i)] += self.rho;
        }
        let lu = DenseLu::new(&m, 0.).ok_or_else(|| SolverError::ProxFailure(
            "sum of squares has no unique minimizer".to_string()
        ))?;

        let mut htg = h.trans_mul_vec(&a.offset);
        htg.iter_mut().for_each(|v| *v *= 2. * self.alpha);
        Ok(SumSquareForm::General(lu, htg))
    }
}

impl ProxOperator for SumSquareProx
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let a = arg.single_arg()?;
        self.alpha = arg.function.alpha;
        self.rho = arg.rho;

        self.form = Some(match arg.scaled_arg() {
            Ok(s) => SumSquareForm::Diagonal(s),
            Err(_) => self.general(a, &arg.offsets)?,
        });
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        let (alpha, rho) = (self.alpha, self.rho);

        match &self.form {
            Some(SumSquareForm::Diagonal(s)) => {
                let mut x = Vec::with_capacity(v.len());
                for i in 0.. v.len() {
                    let (b, g) = (s.beta[i], s.offset[i]);
                    let d = 2. * alpha * b * b + rho;
                    if d > 0. {
                        x.push((rho * v[i] - 2. * alpha * b * g) / d);
                    }
                    else {
                        // the term does not depend on this component
                        x.push(v[i]);
                    }
                }
                Ok(x)
            },
            Some(SumSquareForm::General(lu, htg)) => {
                let rhs: Vec<f64> = v.iter().zip(htg.iter()).map(|(v, h)| rho * v - h).collect();
                Ok(lu.solve(&rhs))
            },
            None => Err(SolverError::ProxFailure("not initialized".to_string())),
        }
    }
}

//

#[test]
fn test_sum_square_prox()
{
    use float_eq::assert_float_eq;
    use crate::expression::*;
    use crate::prox::tests::build_term;

    // ||x - 1||^2 with rho = 2: x = (2 v + 2) / 4
    let term = prox_function(ProxFunctionType::SumSquare, 1., vec![
        add(vec![variable(2, 1, "x"), scalar_constant(-1., 1, 1)]),
    ]);
    let (mut op, _) = build_term(&term, 2.).unwrap();
    let x = op.apply(&[3., -1.]).unwrap();
    assert_float_eq!(x.as_slice(), [2., 0.].as_ref(), abs_all <= 1e-12);

    // without a penalty the minimizer of the term alone
    let (mut op, _) = build_term(&term, 0.).unwrap();
    let x = op.apply(&[3., -1.]).unwrap();
    assert_float_eq!(x.as_slice(), [1., 1.].as_ref(), abs_all <= 1e-12);

    // ||x - y||^2 with rho = 1: x - v_x = -2 (x - y), y - v_y = 2 (x - y)
    let term = prox_function(ProxFunctionType::SumSquare, 1., vec![
        add(vec![variable(1, 1, "x"), negate(variable(1, 1, "y"))]),
    ]);
    let (mut op, _) = build_term(&term, 1.).unwrap();
    let p = op.apply(&[1., 0.]).unwrap();
    let d = p[0] - p[1];
    assert_float_eq!(p[0] - 1., -2. * d, abs <= 1e-12);
    assert_float_eq!(p[1], 2. * d, abs <= 1e-12);
}
