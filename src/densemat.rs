use std::ops::{Index, IndexMut, Deref};
use crate::floatgeneric::FloatGeneric;

type La = FloatGeneric<f64>;

/// Dense matrix
///
/// Matrix struct which owns a `Vec` of data array stored in column-major.
/// A vector is a dense matrix with one column.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix
{
    n_row: usize,
    n_col: usize,
    array: Vec<f64>,
}

impl DenseMatrix
{
    /// Creates an instance.
    ///
    /// Returns the [`DenseMatrix`] instance with zero data.
    pub fn new(n_row: usize, n_col: usize) -> Self
    {
        DenseMatrix {
            n_row,
            n_col,
            array: vec![0.; n_row * n_col],
        }
    }

    /// Creates an instance taking a column-major data array.
    pub fn from_colmaj(n_row: usize, n_col: usize, array: Vec<f64>) -> Self
    {
        assert_eq!(array.len(), n_row * n_col);

        DenseMatrix {
            n_row,
            n_col,
            array,
        }
    }

    /// Creates a one-column matrix of a vector.
    pub fn from_vec(v: Vec<f64>) -> Self
    {
        let n = v.len();
        Self::from_colmaj(n, 1, v)
    }

    /// Creates an identity matrix.
    pub fn identity(n: usize) -> Self
    {
        Self::new(n, n).by_fn(|r, c| if r == c {1.} else {0.})
    }

    /// Size of the matrix.
    ///
    /// Returns a tuple of a number of rows and columns.
    pub fn size(&self) -> (usize, usize)
    {
        (self.n_row, self.n_col)
    }

    /// Column-major data array.
    pub fn as_slice(&self) -> &[f64]
    {
        &self.array
    }

    /// Mutable column-major data array.
    pub fn as_mut_slice(&mut self) -> &mut [f64]
    {
        &mut self.array
    }

    /// Takes the column-major data array, that is \\({\rm vec}(G)\\).
    pub fn into_vec(self) -> Vec<f64>
    {
        self.array
    }

    /// Data by a function.
    ///
    /// * `func` takes a row and a column of the matrix and returns data of each element.
    pub fn set_by_fn<M>(&mut self, mut func: M)
    where M: FnMut(usize, usize) -> f64
    {
        for c in 0.. self.n_col {
            for r in 0.. self.n_row {
                self[(r, c)] = func(r, c);
            }
        }
    }
    /// Builder pattern of [`DenseMatrix::set_by_fn`].
    pub fn by_fn<M>(mut self, func: M) -> Self
    where M: FnMut(usize, usize) -> f64
    {
        self.set_by_fn(func);
        self
    }

    /// Data by an iterator in column-major.
    pub fn set_iter_colmaj<T, I>(&mut self, iter: T)
    where T: IntoIterator<Item=I>, I: Deref<Target=f64>
    {
        let mut i = iter.into_iter();

        for c in 0.. self.n_col {
            for r in 0.. self.n_row {
                if let Some(v) = i.next() {
                    self[(r, c)] = *v;
                }
                else {
                    break;
                }
            }
        }
    }
    /// Builder pattern of [`DenseMatrix::set_iter_colmaj`].
    pub fn iter_colmaj<T, I>(mut self, iter: T) -> Self
    where T: IntoIterator<Item=I>, I: Deref<Target=f64>
    {
        self.set_iter_colmaj(iter);
        self
    }

    /// Data by an iterator in row-major.
    pub fn set_iter_rowmaj<T, I>(&mut self, iter: T)
    where T: IntoIterator<Item=I>, I: Deref<Target=f64>
    {
        let mut i = iter.into_iter();

        for r in 0.. self.n_row {
            for c in 0.. self.n_col {
                if let Some(v) = i.next() {
                    self[(r, c)] = *v;
                }
                else {
                    break;
                }
            }
        }
    }
    /// Builder pattern of [`DenseMatrix::set_iter_rowmaj`].
    pub fn iter_rowmaj<T, I>(mut self, iter: T) -> Self
    where T: IntoIterator<Item=I>, I: Deref<Target=f64>
    {
        self.set_iter_rowmaj(iter);
        self
    }

    /// Scales by \\(\alpha\\).
    pub fn set_scale(&mut self, alpha: f64)
    {
        La::scale(alpha, &mut self.array);
    }
    /// Builder pattern of [`DenseMatrix::set_scale`].
    pub fn scale(mut self, alpha: f64) -> Self
    {
        self.set_scale(alpha);
        self
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Self
    {
        DenseMatrix {
            n_row: self.n_col,
            n_col: self.n_row,
            array: La::transpose_ge(self.n_row, self.n_col, &self.array),
        }
    }

    /// Calculates \\(G x\\).
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64>
    {
        let mut y = vec![0.; self.n_row];
        if self.n_row > 0 && self.n_col > 0 {
            La::transform_ge(false, self.n_row, self.n_col, 1., &self.array, x, 0., &mut y);
        }
        y
    }

    /// Calculates \\(G^T x\\).
    pub fn trans_mul_vec(&self, x: &[f64]) -> Vec<f64>
    {
        let mut y = vec![0.; self.n_col];
        if self.n_row > 0 && self.n_col > 0 {
            La::transform_ge(true, self.n_row, self.n_col, 1., &self.array, x, 0., &mut y);
        }
        y
    }

    /// Calculates a matrix product \\(G H\\).
    pub fn mul_mat(&self, other: &DenseMatrix) -> DenseMatrix
    {
        assert_eq!(self.n_col, other.n_row);

        let array = La::mul_ge(self.n_row, self.n_col, other.n_col, &self.array, &other.array);
        DenseMatrix::from_colmaj(self.n_row, other.n_col, array)
    }

    /// Calculates \\(G + \alpha H\\) in place.
    pub fn add_scaled(&mut self, alpha: f64, other: &DenseMatrix)
    {
        assert_eq!(self.size(), other.size());

        La::add(alpha, &other.array, &mut self.array);
    }

    /// Frobenius norm.
    pub fn norm(&self) -> f64
    {
        La::norm(&self.array)
    }

    fn index(&self, (r, c): (usize, usize)) -> usize
    {
        assert!(r < self.n_row);
        assert!(c < self.n_col);

        c * self.n_row + r
    }
}

//

impl Index<(usize, usize)> for DenseMatrix
{
    type Output = f64;
    fn index(&self, index: (usize, usize)) -> &Self::Output
    {
        let i = self.index(index);

        &self.array[i]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix
{
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output
    {
        let i = self.index(index);

        &mut self.array[i]
    }
}

impl AsRef<[f64]> for DenseMatrix
{
    fn as_ref(&self) -> &[f64]
    {
        &self.array
    }
}

//

/// LU factorization of a square [`DenseMatrix`], reused for repeated solves.
#[derive(Debug, Clone)]
pub struct DenseLu
{
    n: usize,
    lu: Vec<f64>,
    piv: Vec<usize>,
}

impl DenseLu
{
    /// Factorizes a matrix.
    ///
    /// Returns `None` if the matrix is not square or a pivot is not larger than `eps_zero`.
    pub fn new(mat: &DenseMatrix, eps_zero: f64) -> Option<Self>
    {
        let (n, n_) = mat.size();
        if n != n_ {
            return None;
        }

        let mut lu = mat.as_slice().to_vec();
        let mut piv = vec![0; n];
        La::lu_factor(n, &mut lu, &mut piv, eps_zero).ok()?;

        Some(DenseLu {n, lu, piv})
    }

    /// Solves \\(G x = b\\).
    pub fn solve(&self, b: &[f64]) -> Vec<f64>
    {
        let mut x = b.to_vec();
        La::lu_solve(self.n, &self.lu, &self.piv, &mut x);
        x
    }

    /// Explicit inverse \\(G^{-1}\\).
    pub fn inverse(&self) -> DenseMatrix
    {
        let n = self.n;
        let mut inv = DenseMatrix::identity(n);
        for col in inv.as_mut_slice().chunks_mut(n.max(1)) {
            La::lu_solve(n, &self.lu, &self.piv, col);
        }
        inv
    }
}

//

#[test]
fn test_densemat1()
{
    use float_eq::assert_float_eq;

    let g = DenseMatrix::new(2, 3).iter_rowmaj(&[
        1., 2., 3.,
        4., 5., 6.,
    ]);
    assert_eq!(g[(1, 0)], 4.);
    assert_eq!(g.as_slice(), &[1., 4., 2., 5., 3., 6.]);

    let y = g.mul_vec(&[1., 0., -1.]);
    assert_float_eq!(y.as_slice(), [-2., -2.].as_ref(), abs_all <= 1e-12);

    let yt = g.trans_mul_vec(&[1., 1.]);
    assert_float_eq!(yt.as_slice(), [5., 7., 9.].as_ref(), abs_all <= 1e-12);

    let gt = g.transpose();
    assert_eq!(gt.size(), (3, 2));
    assert_eq!(gt[(2, 1)], 6.);

    let ggt = g.mul_mat(&gt);
    assert_float_eq!(ggt.as_slice(), [14., 32., 32., 77.].as_ref(), abs_all <= 1e-12);
}

#[test]
fn test_dense_lu1()
{
    use float_eq::assert_float_eq;

    let g = DenseMatrix::new(2, 2).iter_rowmaj(&[
        4., 1.,
        2., 3.,
    ]);
    let lu = DenseLu::new(&g, 1e-12).unwrap();
    let inv = lu.inverse();
    let eye = g.mul_mat(&inv);
    assert_float_eq!(eye.as_slice(), [1., 0., 0., 1.].as_ref(), abs_all <= 1e-12);

    assert!(DenseLu::new(&DenseMatrix::new(2, 3), 1e-12).is_none());
}
