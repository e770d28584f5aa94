//! Problem description
//!
//! An objective is an [`ExpressionKind::Add`] node whose children are proximal function terms,
//! each applied to affine argument expressions.
//! A constraint is a zero-cone indicator of one affine expression.
//!
//! The builder functions are infallible; shapes are validated when the problem is compiled.

use std::fmt::Write;

/// Inline scalar or a key resolved by a [`crate::DataProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue
{
    Scalar(f64),
    Data(String),
}

/// Constant of `m` by `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant
{
    pub m: usize,
    pub n: usize,
    pub value: ConstantValue,
}

/// Description of an operator wrapped by a [`ExpressionKind::LinearMap`] node.
#[derive(Debug, Clone, PartialEq)]
pub enum LinearMapDesc
{
    /// Dense matrix of the constant.
    Dense(Constant),
    /// Sparse matrix of the constant.
    Sparse(Constant),
    /// Diagonal matrix whose diagonal is the vectorized constant.
    Diagonal(Constant),
    /// \\(\alpha I_n\\).
    Scalar { n: usize, alpha: f64 },
    Kronecker(Box<LinearMapDesc>, Box<LinearMapDesc>),
    Transpose(Box<LinearMapDesc>),
}

impl LinearMapDesc
{
    pub fn size(&self) -> (usize, usize)
    {
        match self {
            LinearMapDesc::Dense(c) | LinearMapDesc::Sparse(c) => (c.m, c.n),
            LinearMapDesc::Diagonal(c) => (c.m * c.n, c.m * c.n),
            LinearMapDesc::Scalar { n, .. } => (*n, *n),
            LinearMapDesc::Kronecker(a, b) => {
                let (p, q) = a.size();
                let (r, s) = b.size();
                (p * r, q * s)
            },
            LinearMapDesc::Transpose(a) => {
                let (m, n) = a.size();
                (n, m)
            },
        }
    }
}

/// Proximal function kinds of objective terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxFunctionType
{
    /// \\(0\\)
    Zero,
    /// \\(\sum_i a_i\\), a linear function of the argument.
    Affine,
    /// \\(\\|a\\|_2^2\\)
    SumSquare,
    /// \\(\\|a\\|_1\\)
    NormL1,
    /// \\(\\|a\\|_2\\)
    NormL2,
    /// \\(-\sum_i \log a_i\\)
    NegLog,
    /// \\(\sum_i 1/a_i\\) on \\(a > 0\\)
    InvPos,
    /// \\(\sum_i e^{a_i}\\)
    Exp,
    /// \\(\sum_i \log(1 + e^{a_i})\\)
    Logistic,
    /// \\(-\log\det A\\) of a symmetric matrix argument
    NegLogDet,
    /// \\(\\|A\\|_*\\), the sum of singular values
    NormNuclear,
}

/// Objective term \\(\alpha f(a)\\), or its epigraph indicator \\(t \ge \alpha f(a)\\).
#[derive(Debug, Clone, PartialEq)]
pub struct ProxFunction
{
    pub prox_type: ProxFunctionType,
    pub alpha: f64,
    pub epigraph: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind
{
    Add,
    /// Product of two arguments, one of which must be constant.
    Multiply,
    Negate,
    Variable(String),
    Constant(Constant),
    LinearMap(LinearMapDesc),
    Reshape,
    /// Indicator of \\(\\{0\\}\\) applied to the single argument.
    ZeroCone,
    ProxFunction(ProxFunction),
}

/// Node of an expression tree of `m` by `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression
{
    pub kind: ExpressionKind,
    pub m: usize,
    pub n: usize,
    pub args: Vec<Expression>,
}

impl Expression
{
    pub fn dim(&self) -> usize
    {
        self.m * self.n
    }

    pub fn is_constant(&self) -> bool
    {
        match &self.kind {
            ExpressionKind::Constant(_) => true,
            ExpressionKind::Variable(_) => false,
            _ => !self.args.is_empty() && self.args.iter().all(|a| a.is_constant()),
        }
    }

    /// Variable ids referenced by the expression, each once, in first-seen order.
    pub fn variable_ids(&self) -> Vec<String>
    {
        let mut ids = Vec::new();
        self.collect_variable_ids(&mut ids);
        ids
    }

    fn collect_variable_ids(&self, ids: &mut Vec<String>)
    {
        if let ExpressionKind::Variable(id) = &self.kind {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        for a in self.args.iter() {
            a.collect_variable_ids(ids);
        }
    }

    /// Indented multi-line tree.
    pub fn debug_string(&self) -> String
    {
        let mut s = String::new();
        self.write_tree(&mut s, 0);
        s
    }

    fn write_tree(&self, s: &mut String, depth: usize)
    {
        let label = match &self.kind {
            ExpressionKind::Variable(id) => format!("Variable({})", id),
            ExpressionKind::Constant(c) => format!("Constant({:?})", c.value),
            ExpressionKind::LinearMap(d) => format!("LinearMap({:?})", d),
            ExpressionKind::ProxFunction(p) => format!("{:?}", p),
            k => format!("{:?}", k),
        };
        let _ = writeln!(s, "{:width$}{} ({} x {})", "", label, self.m, self.n, width = depth * 2);
        for a in self.args.iter() {
            a.write_tree(s, depth + 1);
        }
    }
}

/// Objective, equality constraints and an identifier of the problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem
{
    pub id: String,
    pub objective: Expression,
    pub constraints: Vec<Expression>,
}

impl Problem
{
    pub fn new(id: &str, objective: Expression, constraints: Vec<Expression>) -> Self
    {
        Problem {
            id: id.to_string(),
            objective,
            constraints,
        }
    }

    pub fn debug_string(&self) -> String
    {
        let mut s = format!("problem {}\nobjective:\n{}", self.id, self.objective.debug_string());
        for (i, c) in self.constraints.iter().enumerate() {
            let _ = write!(s, "constraint {}:\n{}", i, c.debug_string());
        }
        s
    }
}

//

fn node(kind: ExpressionKind, m: usize, n: usize, args: Vec<Expression>) -> Expression
{
    Expression {
        kind, m, n, args,
    }
}

/// Sum of `args`; the size is the largest among them so that scalars broadcast.
pub fn add(args: Vec<Expression>) -> Expression
{
    let (m, n) = args.iter()
        .map(|a| (a.m, a.n))
        .max_by_key(|(m, n)| m * n)
        .unwrap_or((1, 1));
    node(ExpressionKind::Add, m, n, args)
}

/// Matrix product `lhs * rhs`; a 1 by 1 `lhs` scales `rhs`.
pub fn multiply(lhs: Expression, rhs: Expression) -> Expression
{
    let (m, n) = if lhs.dim() == 1 {
        (rhs.m, rhs.n)
    }
    else if rhs.dim() == 1 {
        (lhs.m, lhs.n)
    }
    else {
        (lhs.m, rhs.n)
    };
    node(ExpressionKind::Multiply, m, n, vec![lhs, rhs])
}

pub fn negate(x: Expression) -> Expression
{
    let (m, n) = (x.m, x.n);
    node(ExpressionKind::Negate, m, n, vec![x])
}

pub fn variable(m: usize, n: usize, variable_id: &str) -> Expression
{
    node(ExpressionKind::Variable(variable_id.to_string()), m, n, Vec::new())
}

/// Constant of `m` by `n` filled with `value`.
pub fn scalar_constant(value: f64, m: usize, n: usize) -> Expression
{
    let c = Constant {
        m, n, value: ConstantValue::Scalar(value),
    };
    node(ExpressionKind::Constant(c), m, n, Vec::new())
}

/// Constant of `m` by `n` resolved from data `key`.
pub fn constant(m: usize, n: usize, key: &str) -> Expression
{
    let c = Constant {
        m, n, value: ConstantValue::Data(key.to_string()),
    };
    node(ExpressionKind::Constant(c), m, n, Vec::new())
}

/// Operator applied to the vectorization of `x`, giving a column.
pub fn linear_map(desc: LinearMapDesc, x: Expression) -> Expression
{
    let (m, _) = desc.size();
    node(ExpressionKind::LinearMap(desc), m, 1, vec![x])
}

pub fn reshape(x: Expression, m: usize, n: usize) -> Expression
{
    node(ExpressionKind::Reshape, m, n, vec![x])
}

/// Constraint `x == 0`.
pub fn eq_constraint(x: Expression) -> Expression
{
    let (m, n) = (x.m, x.n);
    node(ExpressionKind::ZeroCone, m, n, vec![x])
}

/// Objective term `alpha * f(args...)`.
pub fn prox_function(prox_type: ProxFunctionType, alpha: f64, args: Vec<Expression>) -> Expression
{
    let f = ProxFunction {
        prox_type, alpha, epigraph: false,
    };
    node(ExpressionKind::ProxFunction(f), 1, 1, args)
}

/// Objective term of the indicator `t >= alpha * f(x)`.
pub fn epigraph(prox_type: ProxFunctionType, alpha: f64, x: Expression, t: Expression) -> Expression
{
    let f = ProxFunction {
        prox_type, alpha, epigraph: true,
    };
    node(ExpressionKind::ProxFunction(f), 1, 1, vec![x, t])
}

//

#[test]
fn test_expression_builders()
{
    let x = variable(2, 3, "x");
    let c = constant(4, 2, "C");
    let cx = multiply(c, x.clone());
    assert_eq!((cx.m, cx.n), (4, 3));

    let s = multiply(scalar_constant(3., 1, 1), x.clone());
    assert_eq!((s.m, s.n), (2, 3));

    let e = add(vec![s, scalar_constant(5., 1, 1)]);
    assert_eq!((e.m, e.n), (2, 3));
    assert!(!e.is_constant());
    assert_eq!(e.variable_ids(), vec!["x".to_string()]);

    let k = LinearMapDesc::Kronecker(
        Box::new(LinearMapDesc::Scalar { n: 3, alpha: 1. }),
        Box::new(LinearMapDesc::Transpose(Box::new(LinearMapDesc::Dense(Constant {
            m: 4, n: 2, value: ConstantValue::Data("C".to_string()),
        })))),
    );
    assert_eq!(k.size(), (6, 12));
    assert_eq!(linear_map(k, variable(12, 1, "y")).m, 6);
}
