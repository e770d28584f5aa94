//! Proximal operators
//!
//! A [`ProxOperator`] of an objective term \\(f\\) with penalty \\(\rho\\) evaluates
//! \\[
//! {\bf prox}(v) = \arg\min_x f(x) + \frac{\rho}{2} \\|x - v\\|_2^2
//! \\]
//! over the flat variables of its block.
//! Operators are created through a static registry keyed by [`ProxFunctionType`] and the epigraph flag.

mod zero;
mod linear;
mod sum_square;
mod norm;
mod neg_log;
mod newton;
mod smooth;
mod ortho_invariant;

pub use zero::*;
pub use linear::*;
pub use sum_square::*;
pub use norm::*;
pub use neg_log::*;
pub use newton::*;
pub use smooth::*;
pub use ortho_invariant::*;

use std::collections::BTreeMap;
use crate::affine::build_affine_operator;
use crate::data::DataCache;
use crate::densemat::DenseMatrix;
use crate::expression::{Expression, ExpressionKind, ProxFunction, ProxFunctionType};
use crate::linear::LinearMap;
use crate::solver_error::SolverError;
use crate::vector::BlockVector;

/// Proximal operator of one objective term.
pub trait ProxOperator
{
    /// Prepares the operator for the term and penalty of `arg`.
    fn init(&mut self, arg: &ProxOperatorArg) -> Result<(), SolverError>;

    /// Evaluates the proximal operator at `v`, a flat vector of the block variables.
    fn apply(&mut self, v: &[f64]) -> Result<Vec<f64>, SolverError>;
}

//

/// Layout of block variables in a flat vector, in variable id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableOffsets
{
    offsets: BTreeMap<String, (usize, usize)>,
    n: usize,
}

impl VariableOffsets
{
    /// Creates a layout of `(variable_id, size)` pairs.
    pub fn new<'a, I>(vars: I) -> Self
    where I: IntoIterator<Item=(&'a String, usize)>
    {
        let sorted: BTreeMap<String, usize> = vars.into_iter().map(|(k, n)| (k.clone(), n)).collect();
        let mut offsets = BTreeMap::new();
        let mut n = 0;
        for (k, d) in sorted {
            offsets.insert(k, (n, d));
            n += d;
        }
        VariableOffsets {offsets, n}
    }

    /// Total size.
    pub fn n(&self) -> usize
    {
        self.n
    }

    /// Offset and size of a variable.
    pub fn get(&self, id: &str) -> Option<(usize, usize)>
    {
        self.offsets.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&String, &(usize, usize))>
    {
        self.offsets.iter()
    }

    pub fn len(&self) -> usize
    {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.offsets.is_empty()
    }

    /// Splits a flat vector into variable blocks.
    pub fn split(&self, x: &[f64]) -> BlockVector
    {
        assert_eq!(x.len(), self.n);

        let mut v = BlockVector::new();
        for (k, (o, d)) in self.offsets.iter() {
            v.insert(k, x[*o.. o + d].to_vec());
        }
        v
    }

    /// Flattens variable blocks; missing ones are zero.
    pub fn flatten(&self, v: &BlockVector) -> Vec<f64>
    {
        let mut x = vec![0.; self.n];
        for (k, (o, d)) in self.offsets.iter() {
            if let Some(vk) = v.get(k) {
                x[*o.. o + d].copy_from_slice(vk);
            }
        }
        x
    }
}

/// One argument \\(H x + g\\) of a term, of `m` by `n`.
#[derive(Debug, Clone)]
pub struct AffineArg
{
    pub maps: BTreeMap<String, LinearMap>,
    pub offset: Vec<f64>,
    pub m: usize,
    pub n: usize,
}

impl AffineArg
{
    /// Compiles an argument expression.
    pub fn build(expr: &Expression, data: &DataCache) -> Result<Self, SolverError>
    {
        const KEY: &str = "arg";

        let (a, b) = build_affine_operator(expr, data, KEY)?;
        let maps = a.iter().map(|(_, col, map)| (col.clone(), map.clone())).collect();
        Ok(AffineArg {
            maps,
            offset: b.get_or_zero(KEY, expr.dim()),
            m: expr.m,
            n: expr.n,
        })
    }

    pub fn dim(&self) -> usize
    {
        self.m * self.n
    }

    /// Calculates \\(H x + g\\).
    pub fn apply(&self, offsets: &VariableOffsets, x: &[f64]) -> Vec<f64>
    {
        let mut y = self.offset.clone();
        for (k, map) in self.maps.iter() {
            if let Some((o, d)) = offsets.get(k) {
                let yk = map.apply(&x[o.. o + d]);
                y.iter_mut().zip(yk).for_each(|(a, b)| *a += b);
            }
        }
        y
    }

    /// Calculates \\(H^T y\\).
    pub fn trans_apply(&self, offsets: &VariableOffsets, y: &[f64]) -> Vec<f64>
    {
        let mut x = vec![0.; offsets.n()];
        for (k, map) in self.maps.iter() {
            if let Some((o, d)) = offsets.get(k) {
                let xk = map.transpose().apply(y);
                x[o.. o + d].iter_mut().zip(xk).for_each(|(a, b)| *a += b);
            }
        }
        x
    }

    /// Dense \\(H\\) over the flat block variables.
    pub fn dense(&self, offsets: &VariableOffsets) -> DenseMatrix
    {
        let mut h = DenseMatrix::new(self.dim(), offsets.n());
        for (k, map) in self.maps.iter() {
            if let Some((o, d)) = offsets.get(k) {
                let hk = map.as_dense();
                for c in 0.. d {
                    for r in 0.. self.dim() {
                        h[(r, o + c)] = hk[(r, c)];
                    }
                }
            }
        }
        h
    }

    /// Diagonal of \\(H\\) if the argument is a diagonal map of the whole block.
    pub fn diagonal(&self, offsets: &VariableOffsets) -> Option<Vec<f64>>
    {
        if self.maps.len() != 1 || offsets.len() != 1 || self.dim() != offsets.n() {
            return None;
        }
        let (k, map) = self.maps.iter().next()?;
        offsets.get(k)?;
        map.as_diagonal()
    }

    /// Whether the argument is exactly one variable.
    pub fn plain_variable(&self) -> Option<&String>
    {
        if self.maps.len() != 1 || self.offset.iter().any(|v| *v != 0.) {
            return None;
        }
        let (k, map) = self.maps.iter().next()?;
        if map.as_scalar() == Some(1.) {Some(k)} else {None}
    }
}

/// Input to [`ProxOperator::init`].
#[derive(Debug, Clone)]
pub struct ProxOperatorArg
{
    pub function: ProxFunction,
    pub args: Vec<AffineArg>,
    pub offsets: VariableOffsets,
    pub rho: f64,
}

impl ProxOperatorArg
{
    /// Compiles the arguments of an objective term.
    pub fn build(term: &Expression, data: &DataCache, offsets: VariableOffsets, rho: f64) -> Result<Self, SolverError>
    {
        let function = match &term.kind {
            ExpressionKind::ProxFunction(f) => f.clone(),
            _ => return Err(SolverError::MalformedExpression(
                format!("objective term is not a proximal function:\n{}", term.debug_string())
            )),
        };

        let args = term.args.iter()
            .map(|a| AffineArg::build(a, data))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProxOperatorArg {
            function, args, offsets, rho,
        })
    }

    /// The single argument of the term.
    pub fn single_arg(&self) -> Result<&AffineArg, SolverError>
    {
        if self.args.len() != 1 {
            return Err(SolverError::MalformedExpression(
                format!("{:?} takes 1 argument, got {}", self.function.prox_type, self.args.len())
            ));
        }
        Ok(&self.args[0])
    }

    /// Single argument as a componentwise scaling of the block.
    pub fn scaled_arg(&self) -> Result<ScaledArg, SolverError>
    {
        let arg = self.single_arg()?;
        let beta = arg.diagonal(&self.offsets).ok_or_else(|| SolverError::UnknownProx(
            format!("{:?} needs a diagonally scaled variable argument", self.function.prox_type)
        ))?;
        Ok(ScaledArg {
            beta,
            offset: arg.offset.clone(),
        })
    }
}

/// Argument \\(y = {\bf diag}(\beta) x + g\\).
///
/// A separable term \\(f(y)\\) with penalty \\(\rho\\) on \\(x\\) is evaluated as
/// \\(f\\) with penalty \\(\rho / \beta_i^2\\) on each \\(y_i\\) at \\(\beta_i v_i + g_i\\).
#[derive(Debug, Clone)]
pub struct ScaledArg
{
    pub beta: Vec<f64>,
    pub offset: Vec<f64>,
}

impl ScaledArg
{
    pub fn to_arg(&self, v: &[f64]) -> Vec<f64>
    {
        v.iter().zip(self.beta.iter()).zip(self.offset.iter())
            .map(|((v, b), g)| b * v + g)
            .collect()
    }

    /// Inverse of [`ScaledArg::to_arg`]; components with zero scaling keep `v`.
    pub fn from_arg(&self, y: &[f64], v: &[f64]) -> Vec<f64>
    {
        y.iter().zip(v).zip(self.beta.iter().zip(self.offset.iter()))
            .map(|((y, v), (b, g))| if *b == 0. {*v} else {(y - g) / b})
            .collect()
    }

    /// Penalty on each component of the argument.
    pub fn rates(&self, rho: f64) -> Vec<f64>
    {
        self.beta.iter()
            .map(|b| if *b == 0. {f64::INFINITY} else {rho / (b * b)})
            .collect()
    }

    /// Common scaling if it is uniform and nonzero.
    pub fn uniform(&self) -> Option<f64>
    {
        let b0 = *self.beta.first()?;
        if b0 != 0. && self.beta.iter().all(|b| *b == b0) {Some(b0)} else {None}
    }
}

//

type ProxCtor = fn() -> Box<dyn ProxOperator>;

/// Registered operators, keyed by function kind and epigraph flag.
const PROX_REGISTRY: &[(ProxFunctionType, bool, ProxCtor)] = &[
    (ProxFunctionType::Zero, false, || -> Box<dyn ProxOperator> {Box::new(ZeroProx::default())}),
    (ProxFunctionType::Affine, false, || -> Box<dyn ProxOperator> {Box::new(LinearProx::default())}),
    (ProxFunctionType::SumSquare, false, || -> Box<dyn ProxOperator> {Box::new(SumSquareProx::default())}),
    (ProxFunctionType::NormL1, false, || -> Box<dyn ProxOperator> {Box::new(NormL1Prox::default())}),
    (ProxFunctionType::NormL2, false, || -> Box<dyn ProxOperator> {Box::new(NormL2Prox::default())}),
    (ProxFunctionType::NegLog, false, || -> Box<dyn ProxOperator> {Box::new(NegLogProx::default())}),
    (ProxFunctionType::InvPos, false, || -> Box<dyn ProxOperator> {Box::new(NewtonProx::new(InvPos))}),
    (ProxFunctionType::Exp, false, || -> Box<dyn ProxOperator> {Box::new(NewtonProx::new(Exp))}),
    (ProxFunctionType::Logistic, false, || -> Box<dyn ProxOperator> {Box::new(NewtonProx::new(Logistic))}),
    (ProxFunctionType::SumSquare, true, || -> Box<dyn ProxOperator> {Box::new(NewtonEpigraph::new(SumSquare))}),
    (ProxFunctionType::NegLog, true, || -> Box<dyn ProxOperator> {Box::new(NewtonEpigraph::new(NegLog))}),
    (ProxFunctionType::InvPos, true, || -> Box<dyn ProxOperator> {Box::new(NewtonEpigraph::new(InvPos))}),
    (ProxFunctionType::Exp, true, || -> Box<dyn ProxOperator> {Box::new(NewtonEpigraph::new(Exp))}),
    (ProxFunctionType::Logistic, true, || -> Box<dyn ProxOperator> {Box::new(NewtonEpigraph::new(Logistic))}),
    (ProxFunctionType::NegLogDet, false, || -> Box<dyn ProxOperator> {Box::new(OrthoInvariantProx::new(NegLogDetSpectrum))}),
    (ProxFunctionType::NormNuclear, false, || -> Box<dyn ProxOperator> {Box::new(OrthoInvariantProx::new(NuclearSpectrum))}),
];

/// Creates the registered operator of `f`.
pub fn create_prox_operator(f: &ProxFunction) -> Result<Box<dyn ProxOperator>, SolverError>
{
    PROX_REGISTRY.iter()
        .find(|(t, epi, _)| *t == f.prox_type && *epi == f.epigraph)
        .map(|(_, _, ctor)| ctor())
        .ok_or_else(|| SolverError::UnknownProx(
            format!("{:?}{}", f.prox_type, if f.epigraph {" epigraph"} else {""})
        ))
}

/// Creates and initializes the operator of `arg`.
pub fn build_prox_operator(arg: &ProxOperatorArg) -> Result<Box<dyn ProxOperator>, SolverError>
{
    let mut op = create_prox_operator(&arg.function)?;
    op.init(arg)?;
    Ok(op)
}

//

#[cfg(test)]
pub(crate) mod tests
{
    use super::*;
    use crate::data::{DataMap, DataCache};
    use crate::expression::*;

    /// Initialized operator of `term` over the variables it references.
    pub fn build_term(term: &Expression, rho: f64) -> Result<(Box<dyn ProxOperator>, VariableOffsets), SolverError>
    {
        build_term_with(term, rho, &DataMap::new())
    }

    pub fn build_term_with(term: &Expression, rho: f64, data: &DataMap) -> Result<(Box<dyn ProxOperator>, VariableOffsets), SolverError>
    {
        let cache = DataCache::new(data);
        let mut dims = BTreeMap::new();
        collect_dims(term, &mut dims);
        let offsets = VariableOffsets::new(dims.iter().map(|(k, n)| (k, *n)));

        let arg = ProxOperatorArg::build(term, &cache, offsets.clone(), rho)?;
        Ok((build_prox_operator(&arg)?, offsets))
    }

    fn collect_dims(e: &Expression, dims: &mut BTreeMap<String, usize>)
    {
        if let ExpressionKind::Variable(id) = &e.kind {
            dims.insert(id.clone(), e.dim());
        }
        for a in e.args.iter() {
            collect_dims(a, dims);
        }
    }

    #[test]
    fn test_registry_unknown()
    {
        let f = ProxFunction {prox_type: ProxFunctionType::NormL1, alpha: 1., epigraph: true};
        assert!(matches!(create_prox_operator(&f), Err(SolverError::UnknownProx(_))));
    }

    #[test]
    fn test_variable_offsets()
    {
        let x = "x".to_string();
        let a = "a".to_string();
        let o = VariableOffsets::new(vec![(&x, 2), (&a, 1)]);
        assert_eq!(o.get("a"), Some((0, 1)));
        assert_eq!(o.get("x"), Some((1, 2)));

        let v = o.split(&[1., 2., 3.]);
        assert_eq!(v.get("x").unwrap(), &vec![2., 3.]);
        assert_eq!(o.flatten(&v), vec![1., 2., 3.]);
    }

    #[test]
    fn test_scaled_arg()
    {
        let term = prox_function(ProxFunctionType::NormL1, 1., vec![
            add(vec![multiply(scalar_constant(2., 1, 1), variable(2, 1, "x")), scalar_constant(1., 1, 1)]),
        ]);
        let cache_data = DataMap::new();
        let cache = DataCache::new(&cache_data);
        let x = "x".to_string();
        let offsets = VariableOffsets::new(vec![(&x, 2)]);
        let arg = ProxOperatorArg::build(&term, &cache, offsets, 1.).unwrap();

        let s = arg.scaled_arg().unwrap();
        assert_eq!(s.beta, vec![2., 2.]);
        assert_eq!(s.offset, vec![1., 1.]);
        assert_eq!(s.to_arg(&[1., -1.]), vec![3., -1.]);
        assert_eq!(s.from_arg(&[3., -1.], &[0., 0.]), vec![1., -1.]);
        assert_eq!(s.rates(8.), vec![2., 2.]);
    }
}
