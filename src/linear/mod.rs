//! Linear operators
//!
//! [`LinearMap`] is a cheap-to-clone value over a shared [`LinearMapImpl`].
//! Composition with `+`, `*` and scalar `*` keeps the cheapest representation that is exact,
//! so structured operators are densified only on request.

mod basic;
mod kronecker;
mod ops;
pub mod sparse;

pub use basic::{BasicMap, ApplyFn};
pub use sparse::SparseMatrix;

use std::fmt;
use std::rc::Rc;
use crate::densemat::{DenseMatrix, DenseLu};
use crate::floatgeneric::FloatGeneric;
use crate::solver_error::SolverError;

type La = FloatGeneric<f64>;

const EPS_SINGULAR: f64 = 1e-12;

/// Representation of a [`LinearMap`].
pub enum LinearMapImpl
{
    /// Dense matrix.
    Dense(DenseMatrix),
    /// Sparse matrix in CSC.
    Sparse(SparseMatrix),
    /// Square diagonal matrix of the given entries.
    Diagonal(Vec<f64>),
    /// \\(\alpha I_n\\) of `(n, alpha)`.
    Scalar(usize, f64),
    /// \\(A \otimes B\\), applied without expansion.
    Kronecker(LinearMap, LinearMap),
    /// Apply-only opaque operator.
    Basic(BasicMap),
}

/// Variant tag of a [`LinearMapImpl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearMapImplType
{
    Dense,
    Sparse,
    Diagonal,
    Scalar,
    Kronecker,
    Basic,
}

/// Linear operator \\(\mathbb{R}^n \to \mathbb{R}^m\\).
#[derive(Clone)]
pub struct LinearMap
{
    imp: Rc<LinearMapImpl>,
}

impl LinearMap
{
    fn from_impl(imp: LinearMapImpl) -> Self
    {
        LinearMap {
            imp: Rc::new(imp),
        }
    }

    pub fn dense(mat: DenseMatrix) -> Self
    {
        Self::from_impl(LinearMapImpl::Dense(mat))
    }

    pub fn sparse(mat: SparseMatrix) -> Self
    {
        Self::from_impl(LinearMapImpl::Sparse(mat))
    }

    pub fn diagonal(d: Vec<f64>) -> Self
    {
        Self::from_impl(LinearMapImpl::Diagonal(d))
    }

    pub fn scalar(n: usize, alpha: f64) -> Self
    {
        Self::from_impl(LinearMapImpl::Scalar(n, alpha))
    }

    pub fn identity(n: usize) -> Self
    {
        Self::scalar(n, 1.)
    }

    /// Kronecker product \\(A \otimes B\\).
    ///
    /// A product of two scalar maps collapses into a scalar map.
    pub fn kronecker(a: LinearMap, b: LinearMap) -> Self
    {
        if let (LinearMapImpl::Scalar(p, x), LinearMapImpl::Scalar(r, y)) = (a.imp(), b.imp()) {
            return Self::scalar(p * r, x * y);
        }
        Self::from_impl(LinearMapImpl::Kronecker(a, b))
    }

    pub fn basic(map: BasicMap) -> Self
    {
        Self::from_impl(LinearMapImpl::Basic(map))
    }

    pub fn imp(&self) -> &LinearMapImpl
    {
        &self.imp
    }

    pub fn impl_type(&self) -> LinearMapImplType
    {
        match self.imp() {
            LinearMapImpl::Dense(_) => LinearMapImplType::Dense,
            LinearMapImpl::Sparse(_) => LinearMapImplType::Sparse,
            LinearMapImpl::Diagonal(_) => LinearMapImplType::Diagonal,
            LinearMapImpl::Scalar(..) => LinearMapImplType::Scalar,
            LinearMapImpl::Kronecker(..) => LinearMapImplType::Kronecker,
            LinearMapImpl::Basic(_) => LinearMapImplType::Basic,
        }
    }

    /// Number of rows and columns.
    pub fn size(&self) -> (usize, usize)
    {
        match self.imp() {
            LinearMapImpl::Dense(d) => d.size(),
            LinearMapImpl::Sparse(s) => (s.rows(), s.cols()),
            LinearMapImpl::Diagonal(d) => (d.len(), d.len()),
            LinearMapImpl::Scalar(n, _) => (*n, *n),
            LinearMapImpl::Kronecker(a, b) => {
                let (p, q) = a.size();
                let (r, s) = b.size();
                (p * r, q * s)
            },
            LinearMapImpl::Basic(f) => f.size(),
        }
    }

    pub fn m(&self) -> usize
    {
        self.size().0
    }

    pub fn n(&self) -> usize
    {
        self.size().1
    }

    /// Calculates \\(L x\\).
    ///
    /// `x` must have length `n`; the result has length `m`.
    pub fn apply(&self, x: &[f64]) -> Vec<f64>
    {
        assert_eq!(x.len(), self.n());

        match self.imp() {
            LinearMapImpl::Dense(d) => d.mul_vec(x),
            LinearMapImpl::Sparse(s) => sparse::apply(s, x),
            LinearMapImpl::Diagonal(d) => d.iter().zip(x).map(|(a, b)| a * b).collect(),
            LinearMapImpl::Scalar(_, alpha) => x.iter().map(|v| alpha * v).collect(),
            LinearMapImpl::Kronecker(a, b) => kronecker::apply(a, b, x),
            LinearMapImpl::Basic(f) => f.apply(x),
        }
    }

    /// Transposed operator.
    ///
    /// An apply-only operator without a known transpose is densified.
    pub fn transpose(&self) -> LinearMap
    {
        match self.imp() {
            LinearMapImpl::Dense(d) => LinearMap::dense(d.transpose()),
            LinearMapImpl::Sparse(s) => LinearMap::sparse(sparse::transpose(s)),
            LinearMapImpl::Diagonal(_) | LinearMapImpl::Scalar(..) => self.clone(),
            LinearMapImpl::Kronecker(a, b) => LinearMap::kronecker(a.transpose(), b.transpose()),
            LinearMapImpl::Basic(f) => {
                if let Some(ft) = f.transpose() {
                    LinearMap::basic(ft)
                }
                else {
                    log::trace!("densifying {} for transpose", f.name());
                    LinearMap::dense(f.to_dense().transpose())
                }
            },
        }
    }

    /// Inverse operator.
    ///
    /// Returns [`SolverError::SingularOperator`] if the operator is not square or is singular.
    pub fn inverse(&self) -> Result<LinearMap, SolverError>
    {
        let (m, n) = self.size();
        if m != n {
            return Err(SolverError::SingularOperator(format!("{} x {} is not square", m, n)));
        }

        match self.imp() {
            LinearMapImpl::Scalar(n, alpha) => {
                if *alpha == 0. {
                    Err(SolverError::SingularOperator("zero scalar".to_string()))
                }
                else {
                    Ok(LinearMap::scalar(*n, 1. / alpha))
                }
            },
            LinearMapImpl::Diagonal(d) => {
                if let Some(i) = d.iter().position(|v| *v == 0.) {
                    Err(SolverError::SingularOperator(format!("zero diagonal at {}", i)))
                }
                else {
                    Ok(LinearMap::diagonal(d.iter().map(|v| 1. / v).collect()))
                }
            },
            LinearMapImpl::Kronecker(a, b) if a.m() == a.n() => {
                Ok(LinearMap::kronecker(a.inverse()?, b.inverse()?))
            },
            _ => {
                let d = self.as_dense();
                let lu = DenseLu::new(&d, EPS_SINGULAR)
                    .ok_or_else(|| SolverError::SingularOperator(format!("{:?}", self)))?;
                Ok(LinearMap::dense(lu.inverse()))
            },
        }
    }

    /// Explicit dense matrix of the operator.
    pub fn as_dense(&self) -> DenseMatrix
    {
        match self.imp() {
            LinearMapImpl::Dense(d) => d.clone(),
            LinearMapImpl::Sparse(s) => sparse::to_dense(s),
            LinearMapImpl::Diagonal(d) => {
                let n = d.len();
                DenseMatrix::new(n, n).by_fn(|r, c| if r == c {d[r]} else {0.})
            },
            LinearMapImpl::Scalar(n, alpha) => DenseMatrix::identity(*n).scale(*alpha),
            LinearMapImpl::Kronecker(a, b) => kronecker::to_dense(a, b),
            LinearMapImpl::Basic(f) => f.to_dense(),
        }
    }

    /// Explicit sparse matrix of the operator.
    pub fn as_sparse(&self) -> SparseMatrix
    {
        match self.imp() {
            LinearMapImpl::Dense(d) => sparse::from_dense(d),
            LinearMapImpl::Sparse(s) => s.clone(),
            LinearMapImpl::Diagonal(d) => sparse::from_diagonal(d),
            LinearMapImpl::Scalar(n, alpha) => sparse::from_diagonal(&vec![*alpha; *n]),
            LinearMapImpl::Kronecker(a, b) => kronecker::to_sparse(a, b),
            LinearMapImpl::Basic(f) => sparse::from_dense(&f.to_dense()),
        }
    }

    /// Returns `Some(alpha)` if the operator is structurally \\(\alpha I\\).
    pub fn as_scalar(&self) -> Option<f64>
    {
        if let LinearMapImpl::Scalar(_, alpha) = self.imp() {
            return Some(*alpha);
        }

        let d = self.as_diagonal()?;
        match d.first() {
            None => Some(0.),
            Some(d0) => if d.iter().all(|v| v == d0) {Some(*d0)} else {None},
        }
    }

    /// Returns the diagonal if the operator is structurally a square diagonal matrix.
    pub fn as_diagonal(&self) -> Option<Vec<f64>>
    {
        let (m, n) = self.size();
        if m != n {
            return None;
        }

        match self.imp() {
            LinearMapImpl::Scalar(n, alpha) => Some(vec![*alpha; *n]),
            LinearMapImpl::Diagonal(d) => Some(d.clone()),
            LinearMapImpl::Kronecker(a, b) => {
                let (da, db) = (a.as_diagonal()?, b.as_diagonal()?);
                Some(da.iter().flat_map(|x| db.iter().map(move |y| x * y)).collect())
            },
            LinearMapImpl::Dense(d) => {
                for c in 0.. n {
                    for r in 0.. n {
                        if r != c && d[(r, c)] != 0. {
                            return None;
                        }
                    }
                }
                Some((0.. n).map(|i| d[(i, i)]).collect())
            },
            LinearMapImpl::Sparse(s) => {
                let mut diag = vec![0.; n];
                for (v, (r, c)) in s.iter() {
                    if r == c {
                        diag[r] += *v;
                    }
                    else if *v != 0. {
                        return None;
                    }
                }
                Some(diag)
            },
            LinearMapImpl::Basic(_) => None,
        }
    }

    /// Diagonal entries if the operator is diagonal or scalar.
    pub(crate) fn diagonal_values(&self) -> Option<Vec<f64>>
    {
        match self.imp() {
            LinearMapImpl::Diagonal(d) => Some(d.clone()),
            LinearMapImpl::Scalar(n, alpha) => Some(vec![*alpha; *n]),
            _ => None,
        }
    }

    /// Returns \\(\alpha L\\).
    pub fn scale_by(&self, alpha: f64) -> LinearMap
    {
        if alpha == 1. {
            return self.clone();
        }

        match self.imp() {
            LinearMapImpl::Dense(d) => LinearMap::dense(d.clone().scale(alpha)),
            LinearMapImpl::Sparse(s) => LinearMap::sparse(sparse::scale(alpha, s)),
            LinearMapImpl::Diagonal(d) => LinearMap::diagonal(d.iter().map(|v| alpha * v).collect()),
            LinearMapImpl::Scalar(n, x) => LinearMap::scalar(*n, alpha * x),
            LinearMapImpl::Kronecker(a, b) => LinearMap::kronecker(a.scale_by(alpha), b.clone()),
            LinearMapImpl::Basic(f) => {
                let (m, n) = f.size();
                LinearMap::basic(BasicMap::new(
                    m, n,
                    BasicMap::scaled(f.apply_fn(), alpha),
                    f.trans_apply_fn().map(|t| BasicMap::scaled(t, alpha)),
                    &format!("{}*{}", alpha, f.name()),
                ))
            },
        }
    }

    /// Apply function usable by an opaque composition.
    pub(crate) fn apply_fn(&self) -> ApplyFn
    {
        if let LinearMapImpl::Basic(f) = self.imp() {
            f.apply_fn()
        }
        else {
            let l = self.clone();
            Rc::new(move |x: &[f64]| l.apply(x))
        }
    }

    /// Apply function of the transpose, if known without densification.
    pub(crate) fn trans_apply_fn(&self) -> Option<ApplyFn>
    {
        if let LinearMapImpl::Basic(f) = self.imp() {
            f.trans_apply_fn()
        }
        else {
            Some(self.transpose().apply_fn())
        }
    }

    /// Induced 2-norm estimated by power iteration on \\(L^T L\\).
    pub fn norm_estimate(&self, iters: usize) -> f64
    {
        let n = self.n();
        if n == 0 || self.m() == 0 {
            return 0.;
        }
        if let Some(alpha) = self.as_scalar() {
            return alpha.abs();
        }

        let lt = self.transpose();
        let mut x: Vec<f64> = (0.. n).map(|i| 1. + (i % 7) as f64 * 0.1).collect();
        let mut sigma2 = 0.;
        for _ in 0.. iters {
            let nx = La::norm(&x);
            if nx == 0. {
                break;
            }
            x.iter_mut().for_each(|v| *v /= nx);
            let y = lt.apply(&self.apply(&x));
            sigma2 = La::dot(&x, &y);
            x = y;
        }
        sigma2.max(0.).sqrt()
    }

    /// One-line description of the operator structure.
    pub fn debug_string(&self) -> String
    {
        let (m, n) = self.size();
        match self.imp() {
            LinearMapImpl::Dense(d) => format!("dense({} x {}, {:?})", m, n, d.as_slice()),
            LinearMapImpl::Sparse(s) => format!("sparse({} x {}, nnz={})", m, n, s.nnz()),
            LinearMapImpl::Diagonal(d) => format!("diagonal({:?})", d),
            LinearMapImpl::Scalar(n, alpha) => format!("scalar({}, {})", n, alpha),
            LinearMapImpl::Kronecker(a, b) => format!("kron({}, {})", a.debug_string(), b.debug_string()),
            LinearMapImpl::Basic(f) => format!("basic({} x {}, {})", m, n, f.name()),
        }
    }
}

impl PartialEq for LinearMap
{
    /// Structural equality: sizes and variants must match, then the factors are compared.
    fn eq(&self, other: &Self) -> bool
    {
        if self.size() != other.size() {
            return false;
        }
        if Rc::ptr_eq(&self.imp, &other.imp) {
            return true;
        }

        match (self.imp(), other.imp()) {
            (LinearMapImpl::Dense(a), LinearMapImpl::Dense(b)) => a == b,
            (LinearMapImpl::Sparse(a), LinearMapImpl::Sparse(b)) => a == b,
            (LinearMapImpl::Diagonal(a), LinearMapImpl::Diagonal(b)) => a == b,
            (LinearMapImpl::Scalar(_, a), LinearMapImpl::Scalar(_, b)) => a == b,
            (LinearMapImpl::Kronecker(a1, b1), LinearMapImpl::Kronecker(a2, b2)) => a1 == a2 && b1 == b2,
            (LinearMapImpl::Basic(a), LinearMapImpl::Basic(b)) => a.same_fn(b),
            _ => false,
        }
    }
}

impl fmt::Debug for LinearMap
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.debug_string())
    }
}

//

#[test]
fn test_kron_apply1()
{
    use float_eq::assert_float_eq;

    let a = LinearMap::dense(DenseMatrix::new(2, 2).iter_rowmaj(&[
        1., 2.,
        3., 4.,
    ]));
    let b = LinearMap::dense(DenseMatrix::new(2, 3).iter_rowmaj(&[
        1., 0., 1.,
        0., 1., 1.,
    ]));
    let k = LinearMap::kronecker(a, b);
    assert_eq!(k.size(), (4, 6));

    let x = [1., 2., 3., 4., 5., 6.];
    let y = k.apply(&x);
    let yd = k.as_dense().mul_vec(&x);
    assert_float_eq!(y.as_slice(), yd.as_slice(), abs_all <= 1e-12);
}

#[test]
fn test_inverse1()
{
    use float_eq::assert_float_eq;

    let d = LinearMap::diagonal(vec![2., 4.]);
    assert_eq!(d.inverse().unwrap(), LinearMap::diagonal(vec![0.5, 0.25]));

    assert!(LinearMap::scalar(3, 0.).inverse().is_err());
    assert!(LinearMap::dense(DenseMatrix::new(2, 3)).inverse().is_err());

    let g = LinearMap::dense(DenseMatrix::new(2, 2).iter_rowmaj(&[
        2., 1.,
        1., 3.,
    ]));
    let gi = g.inverse().unwrap();
    let eye = (&g * &gi).as_dense();
    assert_float_eq!(eye.as_slice(), [1., 0., 0., 1.].as_ref(), abs_all <= 1e-12);
}

#[test]
fn test_as_scalar1()
{
    assert_eq!(LinearMap::scalar(3, 2.).as_scalar(), Some(2.));
    assert_eq!(LinearMap::diagonal(vec![2., 2.]).as_scalar(), Some(2.));
    assert_eq!(LinearMap::diagonal(vec![2., 1.]).as_scalar(), None);
    assert_eq!(LinearMap::dense(DenseMatrix::identity(2).scale(3.)).as_scalar(), Some(3.));

    let k = LinearMap::kronecker(LinearMap::identity(2), LinearMap::diagonal(vec![5., 5.]));
    assert_eq!(k.as_scalar(), Some(5.));
}

#[test]
fn test_norm_estimate1()
{
    let g = LinearMap::diagonal(vec![1., -3., 2.]);
    let n = g.norm_estimate(100);
    assert!((n - 3.).abs() < 1e-6);
}
