/// Solver errors.
///
/// Every variant aborts the current solve.
/// Reaching the iteration cap is not an error; see [`crate::SolverState::MaxIterationsReached`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError
{
    /// Unsupported expression node shape or wrong number of arguments.
    MalformedExpression(String),
    /// Incompatible sizes of operands, constants or blocks.
    DimensionMismatch(String),
    /// No proximal operator registered for an objective term.
    UnknownProx(String),
    /// Constant data could not be resolved.
    MissingData(String),
    /// Inverse requested of a non-square or singular operator.
    SingularOperator(String),
    /// Failure of a proximal evaluation.
    ProxFailure(String),
}

impl SolverError
{
    /// Short name of the error kind.
    pub fn kind(&self) -> &'static str
    {
        match self {
            SolverError::MalformedExpression(_) => "MalformedExpression",
            SolverError::DimensionMismatch(_)   => "DimensionMismatch",
            SolverError::UnknownProx(_)         => "UnknownProx",
            SolverError::MissingData(_)         => "MissingData",
            SolverError::SingularOperator(_)    => "SingularOperator",
            SolverError::ProxFailure(_)         => "ProxFailure",
        }
    }

    /// Message attached to the error.
    pub fn message(&self) -> &str
    {
        match self {
            SolverError::MalformedExpression(s) |
            SolverError::DimensionMismatch(s) |
            SolverError::UnknownProx(s) |
            SolverError::MissingData(s) |
            SolverError::SingularOperator(s) |
            SolverError::ProxFailure(s) => s,
        }
    }
}

impl core::fmt::Display for SolverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let desc = match &self {
            SolverError::MalformedExpression(_) => "malformed or unsupported expression",
            SolverError::DimensionMismatch(_)   => "dimension mismatch",
            SolverError::UnknownProx(_)         => "no proximal operator",
            SolverError::MissingData(_)         => "missing constant data",
            SolverError::SingularOperator(_)    => "operator is not invertible",
            SolverError::ProxFailure(_)         => "proximal evaluation failed",
        };
        write!(f, "{}: {}: {}", self.kind(), desc, self.message())
    }
}

impl std::error::Error for SolverError {}

//

#[test]
fn test_solver_error_display()
{
    let e = SolverError::DimensionMismatch("row 0: 2 vs 3".to_string());
    assert_eq!(e.kind(), "DimensionMismatch");
    assert_eq!(e.message(), "row 0: 2 vs 3");
    assert_eq!(format!("{}", e), "DimensionMismatch: dimension mismatch: row 0: 2 vs 3");
}
