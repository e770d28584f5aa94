//! Sparse matrix helpers on `sprs` CSC matrices

use sprs::{CsMat, TriMat};
use crate::densemat::DenseMatrix;

/// Sparse matrix type used by [`crate::LinearMapImpl::Sparse`].
pub type SparseMatrix = CsMat<f64>;

/// Builds a CSC matrix from `(row, col, value)` triplets, summing duplicates.
pub fn from_triplets<I>(n_row: usize, n_col: usize, triplets: I) -> SparseMatrix
where I: IntoIterator<Item=(usize, usize, f64)>
{
    let mut tri = TriMat::new((n_row, n_col));
    for (r, c, v) in triplets {
        tri.add_triplet(r, c, v);
    }
    tri.to_csc()
}

pub(crate) fn triplets(a: &SparseMatrix) -> Vec<(usize, usize, f64)>
{
    a.iter().map(|(v, (r, c))| (r, c, *v)).collect()
}

pub(crate) fn apply(a: &SparseMatrix, x: &[f64]) -> Vec<f64>
{
    assert_eq!(a.cols(), x.len());

    let mut y = vec![0.; a.rows()];
    for (v, (r, c)) in a.iter() {
        y[r] += *v * x[c];
    }
    y
}

pub(crate) fn transpose(a: &SparseMatrix) -> SparseMatrix
{
    from_triplets(a.cols(), a.rows(), a.iter().map(|(v, (r, c))| (c, r, *v)))
}

pub(crate) fn scale(alpha: f64, a: &SparseMatrix) -> SparseMatrix
{
    from_triplets(a.rows(), a.cols(), a.iter().map(|(v, (r, c))| (r, c, alpha * *v)))
}

pub(crate) fn add(a: &SparseMatrix, b: &SparseMatrix) -> SparseMatrix
{
    assert_eq!(a.shape(), b.shape());

    from_triplets(a.rows(), a.cols(), triplets(a).into_iter().chain(triplets(b)))
}

pub(crate) fn mul(a: &SparseMatrix, b: &SparseMatrix) -> SparseMatrix
{
    assert_eq!(a.cols(), b.rows());

    let mut a_cols = vec![Vec::new(); a.cols()];
    for (v, (r, c)) in a.iter() {
        a_cols[c].push((r, *v));
    }

    let mut tri = Vec::new();
    for (vb, (k, j)) in b.iter() {
        for &(i, va) in a_cols[k].iter() {
            tri.push((i, j, va * *vb));
        }
    }
    from_triplets(a.rows(), b.cols(), tri)
}

pub(crate) fn to_dense(a: &SparseMatrix) -> DenseMatrix
{
    let mut d = DenseMatrix::new(a.rows(), a.cols());
    for (v, (r, c)) in a.iter() {
        d[(r, c)] += *v;
    }
    d
}

pub(crate) fn from_dense(d: &DenseMatrix) -> SparseMatrix
{
    let (n_row, n_col) = d.size();
    let mut tri = Vec::new();
    for c in 0.. n_col {
        for r in 0.. n_row {
            let v = d[(r, c)];
            if v != 0. {
                tri.push((r, c, v));
            }
        }
    }
    from_triplets(n_row, n_col, tri)
}

pub(crate) fn from_diagonal(d: &[f64]) -> SparseMatrix
{
    let n = d.len();
    from_triplets(n, n, d.iter().enumerate().filter(|(_, v)| **v != 0.).map(|(i, v)| (i, i, *v)))
}

//

#[test]
fn test_sparse_mul1()
{
    use float_eq::assert_float_eq;

    let a = from_triplets(2, 3, vec![(0, 0, 1.), (0, 2, 2.), (1, 1, 3.)]);
    let b = from_triplets(3, 2, vec![(0, 1, 4.), (1, 0, 5.), (2, 0, 6.)]);

    let ab = to_dense(&mul(&a, &b));
    // [1 0 2; 0 3 0] * [0 4; 5 0; 6 0] = [12 4; 15 0]
    assert_float_eq!(ab.as_slice(), [12., 15., 4., 0.].as_ref(), abs_all <= 1e-12);

    let at = to_dense(&transpose(&a));
    assert_eq!(at.size(), (3, 2));
    assert_eq!(at[(2, 0)], 2.);

    let y = apply(&a, &[1., 1., 1.]);
    assert_float_eq!(y.as_slice(), [3., 3.].as_ref(), abs_all <= 1e-12);
}
