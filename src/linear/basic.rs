use std::rc::Rc;
use crate::densemat::DenseMatrix;

/// Apply function of an opaque operator.
pub type ApplyFn = Rc<dyn Fn(&[f64]) -> Vec<f64>>;

/// Apply-only linear operator.
///
/// The operator is known only through its apply function and, optionally, the apply function
/// of its transpose.
/// Without the latter, a transpose is built by applying the operator to every standard basis vector.
#[derive(Clone)]
pub struct BasicMap
{
    n_row: usize,
    n_col: usize,
    apply: ApplyFn,
    trans_apply: Option<ApplyFn>,
    name: String,
}

impl BasicMap
{
    pub fn new(n_row: usize, n_col: usize, apply: ApplyFn, trans_apply: Option<ApplyFn>, name: &str) -> Self
    {
        BasicMap {
            n_row, n_col, apply, trans_apply,
            name: name.to_string(),
        }
    }

    pub fn size(&self) -> (usize, usize)
    {
        (self.n_row, self.n_col)
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn apply(&self, x: &[f64]) -> Vec<f64>
    {
        assert_eq!(x.len(), self.n_col);

        let y = (self.apply)(x);
        assert_eq!(y.len(), self.n_row);
        y
    }

    /// Swaps the apply functions if the transpose is known.
    pub fn transpose(&self) -> Option<BasicMap>
    {
        self.trans_apply.as_ref().map(|t| {
            BasicMap {
                n_row: self.n_col,
                n_col: self.n_row,
                apply: t.clone(),
                trans_apply: Some(self.apply.clone()),
                name: format!("{}'", self.name),
            }
        })
    }

    /// Dense matrix built column by column from the images of the standard basis.
    pub fn to_dense(&self) -> DenseMatrix
    {
        let mut mat = DenseMatrix::new(self.n_row, self.n_col);
        let mut e = vec![0.; self.n_col];

        for c in 0.. self.n_col {
            e[c] = 1.;
            let col = self.apply(&e);
            e[c] = 0.;

            for (r, v) in col.iter().enumerate() {
                mat[(r, c)] = *v;
            }
        }
        mat
    }

    /// Composes `alpha * f(g(x))` from the apply functions of `f` and `g`.
    pub(crate) fn compose(f: ApplyFn, g: ApplyFn, alpha: f64) -> ApplyFn
    {
        Rc::new(move |x: &[f64]| {
            let mut y = f(&g(x));
            if alpha != 1. {
                y.iter_mut().for_each(|v| *v *= alpha);
            }
            y
        })
    }

    /// Scales the apply function `f` by `alpha`.
    pub(crate) fn scaled(f: ApplyFn, alpha: f64) -> ApplyFn
    {
        Rc::new(move |x: &[f64]| {
            let mut y = f(x);
            y.iter_mut().for_each(|v| *v *= alpha);
            y
        })
    }

    /// Sums the apply functions of `f` and `g`.
    pub(crate) fn sum(f: ApplyFn, g: ApplyFn) -> ApplyFn
    {
        Rc::new(move |x: &[f64]| {
            let mut y = f(x);
            let z = g(x);
            y.iter_mut().zip(z).for_each(|(a, b)| *a += b);
            y
        })
    }

    pub(crate) fn apply_fn(&self) -> ApplyFn
    {
        self.apply.clone()
    }

    pub(crate) fn trans_apply_fn(&self) -> Option<ApplyFn>
    {
        self.trans_apply.clone()
    }

    pub(crate) fn same_fn(&self, other: &BasicMap) -> bool
    {
        Rc::ptr_eq(&self.apply, &other.apply)
    }
}

//

#[test]
fn test_basic_to_dense()
{
    let f: ApplyFn = Rc::new(|x: &[f64]| vec![x[0] + x[1], 2. * x[1]]);
    let b = BasicMap::new(2, 2, f, None, "f");

    let d = b.to_dense();
    assert_eq!(d.as_slice(), &[1., 0., 1., 2.]);
    assert!(b.transpose().is_none());
}
