/*!
A block-sequential proximal ADMM solver for separable convex problems.

<script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>

This crate solves
\\[
\begin{array}{ll}
{\rm minimize} & \sum_i f_i(x_i) \\\\
{\rm subject \ to} & \sum_i A_i x_i + b = 0,
\end{array}
\\]
where every objective term \\(f_i\\) has a proximal operator and
the linear operators \\(A_i\\) keep their structure (scalar, diagonal, Kronecker product, sparse, dense or apply-only)
instead of being assembled into one matrix.

# General usage

1. Describe the objective and constraints as a [`Problem`] with the builder functions of [`expression`].
   The objective is a sum of [`expression::prox_function`] terms, each owning its variables.
   A constraint is an [`expression::eq_constraint`] of an affine expression.
1. Provide constant data referenced by key through a [`DataProvider`], such as [`DataMap`].
1. Create a [`ProxAdmmSolver`] with a [`ParameterService`] to receive the solution, and optionally set its parameters.
1. Invoke [`ProxAdmmSolver::solve`] and fetch the variables by [`variable_parameter_id`].

# Examples

Consensus of two squared distances:
\\[
\begin{array}{ll}
{\rm minimize} & \\|x - a\\|_2^2 + \\|z - c\\|_2^2 \\\\
{\rm subject \ to} & x - z = 0
\end{array}
\\]
whose solution is \\(x = z = (a + c) / 2\\).

```
use float_eq::assert_float_eq;
use proxadmm::prelude::*;
use proxadmm::expression::*;

//env_logger::init(); // Use any logger crate as `proxadmm` uses `log` crate.

let data = DataMap::new()
    .dense("a", DenseMatrix::new(2, 1).iter_colmaj(&[1., 2.]))
    .dense("c", DenseMatrix::new(2, 1).iter_colmaj(&[3., -2.]));

let objective = add(vec![
    prox_function(ProxFunctionType::SumSquare, 1., vec![
        add(vec![variable(2, 1, "x"), negate(constant(2, 1, "a"))]),
    ]),
    prox_function(ProxFunctionType::SumSquare, 1., vec![
        add(vec![variable(2, 1, "z"), negate(constant(2, 1, "c"))]),
    ]),
]);
let constraints = vec![
    eq_constraint(add(vec![variable(2, 1, "x"), negate(variable(2, 1, "z"))])),
];

let mut s = ProxAdmmSolver::new(
    Problem::new("consensus", objective, constraints),
    SolverParams::default(),
    LocalParameterService::new(),
).par(|p| {
    p.abs_tol = 1e-8;
    p.rel_tol = 1e-8;
});
let status = s.solve(&data).unwrap();
assert_eq!(status.state, SolverState::Optimal);

let x = s.parameter_service().fetch(variable_parameter_id("consensus", "x"));
assert_float_eq!(x.as_slice(), [2., 0.].as_ref(), abs_all <= 1e-6);
```
*/

mod floatgeneric;

pub use floatgeneric::FloatGeneric;

//

mod densemat;

pub use densemat::*;

//

pub mod linear;

pub use linear::LinearMap;

//

mod vector;

pub use vector::*;

//

pub mod expression;

pub use expression::{Expression, ExpressionKind, Problem, ProxFunction, ProxFunctionType};

//

mod data;

pub use data::*;

//

pub mod affine;
pub mod prox;

//

mod parameter;

pub use parameter::*;

//

mod solver;

pub use solver::*;

//

mod solver_error;

pub use solver_error::*;

//

/// Prelude
pub mod prelude
{
    pub use crate::solver::{ProxAdmmSolver, SolverParams, SolverState, SolverStatus};
    pub use crate::solver_error::SolverError;
    pub use crate::parameter::{ParameterService, LocalParameterService, variable_parameter_id};
    pub use crate::data::{DataProvider, DataMap};
    pub use crate::densemat::DenseMatrix;
    pub use crate::expression::Problem;
}
