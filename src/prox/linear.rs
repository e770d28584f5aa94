use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg};

/// Proximal operator of a linear term \\(c^T x\\), a translation \\(v - c / \rho\\).
///
/// The term \\(\alpha \sum_j (H x + g)_j\\) has \\(c = \alpha H^T \mathbf{1}\\), summed over all arguments.
#[derive(Default)]
pub struct LinearProx
{
    c: Vec<f64>,
    rho: f64,
}

impl LinearProx
{
    pub fn c(&self) -> &[f64]
    {
        &self.c
    }
}

impl ProxOperator for LinearProx
{
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        let mut c = vec![0.; arg.offsets.n()];
        for a in arg.args.iter() {
            let ca = a.trans_apply(&arg.offsets, &vec![arg.function.alpha; a.dim()]);
            c.iter_mut().zip(ca).for_each(|(p, q)| *p += q);
        }

        if arg.rho == 0. && c.iter().any(|v| *v != 0.) {
            return Err(SolverError::ProxFailure("linear term is unbounded without a penalty".to_string()));
        }

        self.c = c;
        self.rho = arg.rho;
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        if self.rho == 0. {
            return Ok(v.to_vec());
        }
        Ok(v.iter().zip(self.c.iter()).map(|(v, c)| v - c / self.rho).collect())
    }
}

//

#[test]
fn test_linear_prox()
{
    use float_eq::assert_float_eq;
    use crate::data::DataMap;
    use crate::densemat::DenseMatrix;
    use crate::expression::*;
    use crate::prox::tests::build_term_with;

    // c'x with c = (1, -2, 3)
    let data = DataMap::new().dense("c", DenseMatrix::new(1, 3).iter_rowmaj(&[1., -2., 3.]));
    let term = prox_function(ProxFunctionType::Affine, 1., vec![
        multiply(constant(1, 3, "c"), variable(3, 1, "x")),
    ]);

    for rho in [0.5, 1., 4.] {
        let (mut op, _) = build_term_with(&term, rho, &data).unwrap();
        let v = [0.3, -1.2, 7.];
        let x = op.apply(&v).unwrap();
        let expected: Vec<f64> = v.iter().zip([1., -2., 3.]).map(|(v, c)| v - c / rho).collect();
        assert_float_eq!(x.as_slice(), expected.as_slice(), abs_all <= 1e-12);
    }

    assert!(build_term_with(&term, 0., &data).is_err());
}
