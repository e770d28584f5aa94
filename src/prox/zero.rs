use crate::solver_error::SolverError;
use super::{ProxOperator, ProxOperatorArg};

/// Proximal operator of \\(f = 0\\), the identity.
#[derive(Default)]
pub struct ZeroProx;

impl ProxOperator for ZeroProx
{
    fn init(&mut self, _arg: &ProxOperatorArg) -> Result<(), SolverError>
    {
        Ok(())
    }

    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>
    {
        Ok(v.to_vec())
    }
}
