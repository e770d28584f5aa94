//! Affine compiler
//!
//! Compiles an expression into \\(A x + b\\), where \\(A\\) is a [`BlockMatrix`] from variable ids
//! to a row key and \\(b\\) a [`BlockVector`] at that row key.
//! The value of the expression is taken as its column-major vectorization.

use log::trace;
use crate::data::{ConstantData, DataCache};
use crate::densemat::DenseMatrix;
use crate::expression::{Constant, ConstantValue, Expression, ExpressionKind, LinearMapDesc, Problem};
use crate::linear::LinearMap;
use crate::solver_error::SolverError;
use crate::vector::{BlockMatrix, BlockVector};

/// Compiles `expr` into `(A, b)` at `row_key`.
pub fn build_affine_operator(expr: &Expression, data: &DataCache, row_key: &str) -> Result<(BlockMatrix, BlockVector), SolverError>
{
    let mut a = BlockMatrix::new();
    let mut b = BlockVector::new();
    let l = LinearMap::identity(expr.dim());

    build_affine_operator_with(expr, data, row_key, &l, &mut a, &mut b)?;

    // a constant-free row still has an explicit zero offset
    if !b.contains_key(row_key) {
        b.insert(row_key, vec![0.; l.m()]);
    }
    Ok((a, b))
}

/// Accumulates `L` times the affine form of `expr` into `a` and `b`.
///
/// `l` must have as many columns as `expr` has elements.
pub fn build_affine_operator_with(
    expr: &Expression, data: &DataCache, row_key: &str,
    l: &LinearMap, a: &mut BlockMatrix, b: &mut BlockVector,
) -> Result<(), SolverError>
{
    if l.n() != expr.dim() {
        return Err(SolverError::DimensionMismatch(
            format!("{} node of {} x {} under operator of {} columns", kind_name(expr), expr.m, expr.n, l.n())
        ));
    }
    trace!("affine {} {}: {:?}", row_key, kind_name(expr), l);

    match &expr.kind {
        ExpressionKind::Add => {
            if expr.args.is_empty() {
                return Err(malformed(expr, "no arguments"));
            }
            for arg in expr.args.iter() {
                if arg.dim() == expr.dim() {
                    build_affine_operator_with(arg, data, row_key, l, a, b)?;
                }
                else if arg.dim() == 1 && arg.is_constant() {
                    // broadcast
                    let ones = LinearMap::dense(DenseMatrix::new(expr.dim(), 1).by_fn(|_, _| 1.));
                    build_affine_operator_with(arg, data, row_key, &(l * &ones), a, b)?;
                }
                else {
                    return Err(SolverError::DimensionMismatch(
                        format!("add of {} x {} and {} x {}", expr.m, expr.n, arg.m, arg.n)
                    ));
                }
            }
        },
        ExpressionKind::Variable(id) => {
            a.insert_or_add(row_key, id, l.clone())?;
        },
        ExpressionKind::Constant(c) => {
            let value = constant_vec(c, data)?;
            if value.len() != l.n() {
                return Err(SolverError::DimensionMismatch(
                    format!("constant of {} x {} under operator of {} columns", c.m, c.n, l.n())
                ));
            }
            b.insert_or_add(row_key, l.apply(&value))?;
        },
        ExpressionKind::LinearMap(desc) => {
            let arg = single_arg(expr)?;
            let m = build_linear_map(desc, data)?;
            if m.size() != (expr.dim(), arg.dim()) {
                return Err(SolverError::DimensionMismatch(
                    format!("linear map {:?} on {} x {} argument", m.size(), arg.m, arg.n)
                ));
            }
            build_affine_operator_with(arg, data, row_key, &(l * &m), a, b)?;
        },
        ExpressionKind::Reshape => {
            let arg = single_arg(expr)?;
            build_affine_operator_with(arg, data, row_key, l, a, b)?;
        },
        ExpressionKind::Negate => {
            let arg = single_arg(expr)?;
            build_affine_operator_with(arg, data, row_key, &-l, a, b)?;
        },
        ExpressionKind::Multiply => {
            if expr.args.len() != 2 {
                return Err(malformed(expr, "multiply needs two arguments"));
            }
            let (lhs, rhs) = (&expr.args[0], &expr.args[1]);

            if let ExpressionKind::Constant(c) = &lhs.kind {
                let op = if lhs.dim() == 1 {
                    LinearMap::scalar(rhs.dim(), scalar_of(c, data)?)
                }
                else {
                    if c.n != rhs.m {
                        return Err(SolverError::DimensionMismatch(
                            format!("multiply of {} x {} and {} x {}", c.m, c.n, rhs.m, rhs.n)
                        ));
                    }
                    // vec(C X) = (I (x) C) vec(X)
                    LinearMap::kronecker(LinearMap::identity(rhs.n), constant_map(c, data)?)
                };
                check_product(expr, &op)?;
                build_affine_operator_with(rhs, data, row_key, &(l * &op), a, b)?;
            }
            else if let ExpressionKind::Constant(c) = &rhs.kind {
                let op = if rhs.dim() == 1 {
                    LinearMap::scalar(lhs.dim(), scalar_of(c, data)?)
                }
                else {
                    if lhs.n != c.m {
                        return Err(SolverError::DimensionMismatch(
                            format!("multiply of {} x {} and {} x {}", lhs.m, lhs.n, c.m, c.n)
                        ));
                    }
                    // vec(X C) = (C^T (x) I) vec(X)
                    LinearMap::kronecker(constant_map(c, data)?.transpose(), LinearMap::identity(lhs.m))
                };
                check_product(expr, &op)?;
                build_affine_operator_with(lhs, data, row_key, &(l * &op), a, b)?;
            }
            else {
                return Err(malformed(expr, "multiply needs a constant factor"));
            }
        },
        ExpressionKind::ZeroCone | ExpressionKind::ProxFunction(_) => {
            return Err(malformed(expr, "not an affine expression"));
        },
    }
    Ok(())
}

fn check_product(expr: &Expression, op: &LinearMap) -> Result<(), SolverError>
{
    if op.m() != expr.dim() {
        return Err(SolverError::DimensionMismatch(
            format!("multiply node of {} x {} yields {} elements", expr.m, expr.n, op.m())
        ));
    }
    Ok(())
}

/// Compiles every constraint `expr == 0` with its ordinal as the row key.
pub fn build_constraints(problem: &Problem, data: &DataCache) -> Result<(BlockMatrix, BlockVector), SolverError>
{
    let mut a = BlockMatrix::new();
    let mut b = BlockVector::new();

    for (i, c) in problem.constraints.iter().enumerate() {
        if c.kind != ExpressionKind::ZeroCone {
            return Err(malformed(c, "constraint must be a zero cone"));
        }
        let (ai, bi) = build_affine_operator(single_arg(c)?, data, &i.to_string())?;
        a.add(&ai)?;
        b.add_scaled(1., &bi)?;
    }
    Ok((a, b))
}

/// Builds the operator of a [`LinearMapDesc`].
pub fn build_linear_map(desc: &LinearMapDesc, data: &DataCache) -> Result<LinearMap, SolverError>
{
    let l = match desc {
        LinearMapDesc::Dense(c) => LinearMap::dense(data.dense(c)?),
        LinearMapDesc::Sparse(c) => LinearMap::sparse(data.sparse(c)?),
        LinearMapDesc::Diagonal(c) => LinearMap::diagonal(data.dense(c)?.into_vec()),
        LinearMapDesc::Scalar { n, alpha } => LinearMap::scalar(*n, *alpha),
        LinearMapDesc::Kronecker(p, q) => LinearMap::kronecker(build_linear_map(p, data)?, build_linear_map(q, data)?),
        LinearMapDesc::Transpose(p) => build_linear_map(p, data)?.transpose(),
    };
    Ok(l)
}

//

fn kind_name(expr: &Expression) -> &'static str
{
    match expr.kind {
        ExpressionKind::Add => "Add",
        ExpressionKind::Multiply => "Multiply",
        ExpressionKind::Negate => "Negate",
        ExpressionKind::Variable(_) => "Variable",
        ExpressionKind::Constant(_) => "Constant",
        ExpressionKind::LinearMap(_) => "LinearMap",
        ExpressionKind::Reshape => "Reshape",
        ExpressionKind::ZeroCone => "ZeroCone",
        ExpressionKind::ProxFunction(_) => "ProxFunction",
    }
}

fn malformed(expr: &Expression, what: &str) -> SolverError
{
    SolverError::MalformedExpression(format!("{}: {}", kind_name(expr), what))
}

fn single_arg(expr: &Expression) -> Result<&Expression, SolverError>
{
    if expr.args.len() != 1 {
        return Err(malformed(expr, &format!("{} arguments, expected 1", expr.args.len())));
    }
    Ok(&expr.args[0])
}

fn constant_vec(c: &Constant, data: &DataCache) -> Result<Vec<f64>, SolverError>
{
    Ok(data.dense(c)?.into_vec())
}

fn scalar_of(c: &Constant, data: &DataCache) -> Result<f64, SolverError>
{
    match &c.value {
        ConstantValue::Scalar(v) => Ok(*v),
        ConstantValue::Data(_) => Ok(data.dense(c)?.as_slice()[0]),
    }
}

fn constant_map(c: &Constant, data: &DataCache) -> Result<LinearMap, SolverError>
{
    match &c.value {
        ConstantValue::Scalar(_) => Ok(LinearMap::dense(data.dense(c)?)),
        ConstantValue::Data(key) => {
            let d = data.get_sized(key, c.m, c.n)?;
            Ok(match d.as_ref() {
                ConstantData::Dense(m) => LinearMap::dense(m.clone()),
                ConstantData::Sparse(s) => LinearMap::sparse(s.clone()),
            })
        },
    }
}

//

#[test]
fn test_affine_scale_offset()
{
    use crate::data::DataMap;
    use crate::expression::*;

    let data = DataMap::new();
    let cache = DataCache::new(&data);

    // 3 * x + 5
    let e = add(vec![
        multiply(scalar_constant(3., 1, 1), variable(2, 1, "x")),
        scalar_constant(5., 1, 1),
    ]);
    let (a, b) = build_affine_operator(&e, &cache, "0").unwrap();
    assert_eq!(a.get("0", "x"), Some(&LinearMap::scalar(2, 3.)));
    assert_eq!(b.get("0"), Some(&vec![5., 5.]));
}
