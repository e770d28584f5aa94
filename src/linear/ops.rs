use std::ops::{Add, AddAssign, Mul, Neg};
use super::{LinearMap, LinearMapImpl, BasicMap};
use super::sparse;

fn add_map(a: &LinearMap, b: &LinearMap) -> LinearMap
{
    assert_eq!(a.size(), b.size());

    let (m, n) = a.size();
    if m == 0 || n == 0 {
        return a.clone();
    }

    match (a.imp(), b.imp()) {
        (LinearMapImpl::Scalar(_, x), LinearMapImpl::Scalar(_, y)) => LinearMap::scalar(n, x + y),
        (LinearMapImpl::Scalar(..) | LinearMapImpl::Diagonal(_),
         LinearMapImpl::Scalar(..) | LinearMapImpl::Diagonal(_)) => {
            // both sides are diagonal here
            let (da, db) = (a.diagonal_values().unwrap_or_default(), b.diagonal_values().unwrap_or_default());
            LinearMap::diagonal(da.iter().zip(db).map(|(x, y)| x + y).collect())
        },
        (LinearMapImpl::Basic(_), _) | (_, LinearMapImpl::Basic(_)) => {
            let trans = match (a.trans_apply_fn(), b.trans_apply_fn()) {
                (Some(ta), Some(tb)) => Some(BasicMap::sum(ta, tb)),
                _ => None,
            };
            LinearMap::basic(BasicMap::new(
                m, n, BasicMap::sum(a.apply_fn(), b.apply_fn()), trans,
                &format!("({:?} + {:?})", a, b),
            ))
        },
        (LinearMapImpl::Kronecker(a1, b1), LinearMapImpl::Kronecker(a2, b2)) if a1 == a2 => {
            LinearMap::kronecker(a1.clone(), b1 + b2)
        },
        (LinearMapImpl::Kronecker(a1, b1), LinearMapImpl::Kronecker(a2, b2)) if b1 == b2 => {
            LinearMap::kronecker(a1 + a2, b1.clone())
        },
        (LinearMapImpl::Dense(_), _) | (_, LinearMapImpl::Dense(_)) => {
            let mut d = a.as_dense();
            d.add_scaled(1., &b.as_dense());
            LinearMap::dense(d)
        },
        _ => LinearMap::sparse(sparse::add(&a.as_sparse(), &b.as_sparse())),
    }
}

fn mul_map(a: &LinearMap, b: &LinearMap) -> LinearMap
{
    assert_eq!(a.n(), b.m());

    match (a.imp(), b.imp()) {
        (LinearMapImpl::Scalar(_, x), _) => b.scale_by(*x),
        (_, LinearMapImpl::Scalar(_, y)) => a.scale_by(*y),
        (LinearMapImpl::Diagonal(x), LinearMapImpl::Diagonal(y)) => {
            LinearMap::diagonal(x.iter().zip(y).map(|(p, q)| p * q).collect())
        },
        (LinearMapImpl::Basic(_), _) | (_, LinearMapImpl::Basic(_)) => {
            let trans = match (a.trans_apply_fn(), b.trans_apply_fn()) {
                (Some(ta), Some(tb)) => Some(BasicMap::compose(tb, ta, 1.)),
                _ => None,
            };
            LinearMap::basic(BasicMap::new(
                a.m(), b.n(), BasicMap::compose(a.apply_fn(), b.apply_fn(), 1.), trans,
                &format!("({:?} * {:?})", a, b),
            ))
        },
        (LinearMapImpl::Kronecker(a1, b1), LinearMapImpl::Kronecker(a2, b2))
        if a1.n() == a2.m() && b1.n() == b2.m() => {
            LinearMap::kronecker(a1 * a2, b1 * b2)
        },
        (LinearMapImpl::Dense(_), _) | (_, LinearMapImpl::Dense(_)) => {
            LinearMap::dense(a.as_dense().mul_mat(&b.as_dense()))
        },
        _ => LinearMap::sparse(sparse::mul(&a.as_sparse(), &b.as_sparse())),
    }
}

//

impl Add<&LinearMap> for &LinearMap
{
    type Output = LinearMap;

    fn add(self, rhs: &LinearMap) -> LinearMap
    {
        add_map(self, rhs)
    }
}

impl Add for LinearMap
{
    type Output = LinearMap;

    fn add(self, rhs: LinearMap) -> LinearMap
    {
        add_map(&self, &rhs)
    }
}

impl AddAssign<&LinearMap> for LinearMap
{
    fn add_assign(&mut self, rhs: &LinearMap)
    {
        *self = add_map(self, rhs);
    }
}

impl Mul<&LinearMap> for &LinearMap
{
    type Output = LinearMap;

    fn mul(self, rhs: &LinearMap) -> LinearMap
    {
        mul_map(self, rhs)
    }
}

impl Mul for LinearMap
{
    type Output = LinearMap;

    fn mul(self, rhs: LinearMap) -> LinearMap
    {
        mul_map(&self, &rhs)
    }
}

impl Mul<&LinearMap> for f64
{
    type Output = LinearMap;

    fn mul(self, rhs: &LinearMap) -> LinearMap
    {
        rhs.scale_by(self)
    }
}

impl Mul<LinearMap> for f64
{
    type Output = LinearMap;

    fn mul(self, rhs: LinearMap) -> LinearMap
    {
        rhs.scale_by(self)
    }
}

impl Neg for &LinearMap
{
    type Output = LinearMap;

    fn neg(self) -> LinearMap
    {
        self.scale_by(-1.)
    }
}

impl Neg for LinearMap
{
    type Output = LinearMap;

    fn neg(self) -> LinearMap
    {
        self.scale_by(-1.)
    }
}

//

#[test]
fn test_ops_representation()
{
    use super::LinearMapImplType;
    use crate::densemat::DenseMatrix;

    let s = LinearMap::scalar(2, 3.);
    let d = LinearMap::diagonal(vec![1., 2.]);
    let g = LinearMap::dense(DenseMatrix::new(2, 2).iter_rowmaj(&[1., 2., 3., 4.]));

    assert_eq!((&s + &s).impl_type(), LinearMapImplType::Scalar);
    assert_eq!((&s + &d).impl_type(), LinearMapImplType::Diagonal);
    assert_eq!((&d * &d).impl_type(), LinearMapImplType::Diagonal);
    assert_eq!((&s * &g).impl_type(), LinearMapImplType::Dense);
    assert_eq!((&d + &g).impl_type(), LinearMapImplType::Dense);
    assert_eq!((2. * &s), LinearMap::scalar(2, 6.));
    assert_eq!(-&d, LinearMap::diagonal(vec![-1., -2.]));

    let k = LinearMap::kronecker(LinearMap::identity(3), g.clone());
    assert_eq!((&k * &k).impl_type(), LinearMapImplType::Kronecker);
    assert_eq!((&k + &k).impl_type(), LinearMapImplType::Kronecker);

    let sum = (&d + &g).as_dense();
    assert_eq!(sum.as_slice(), &[2., 3., 2., 6.]);
}
