//! Kronecker product \\(A \otimes B\\) applied without expansion.
//!
//! With \\(A \in \mathbb{R}^{p \times q}\\), \\(B \in \mathbb{R}^{r \times s}\\) and
//! \\(X \in \mathbb{R}^{s \times q}\\), \\((A \otimes B) {\rm vec}(X) = {\rm vec}(B X A^T)\\).

use super::LinearMap;
use super::sparse::{self, SparseMatrix};
use crate::densemat::DenseMatrix;

pub(crate) fn apply(a: &LinearMap, b: &LinearMap, x: &[f64]) -> Vec<f64>
{
    let (p, q) = a.size();
    let (r, s) = b.size();
    assert_eq!(x.len(), q * s);

    // Y = B X
    let mut y = vec![0.; r * q];
    for j in 0.. q {
        let yj = b.apply(&x[j * s.. (j + 1) * s]);
        y[j * r.. (j + 1) * r].copy_from_slice(&yj);
    }

    // Z = Y A^T, row by row
    let mut z = vec![0.; r * p];
    let mut row = vec![0.; q];
    for i in 0.. r {
        for j in 0.. q {
            row[j] = y[j * r + i];
        }
        let zi = a.apply(&row);
        for k in 0.. p {
            z[k * r + i] = zi[k];
        }
    }
    z
}

pub(crate) fn to_dense(a: &LinearMap, b: &LinearMap) -> DenseMatrix
{
    let da = a.as_dense();
    let db = b.as_dense();
    let (p, q) = da.size();
    let (r, s) = db.size();

    let mut d = DenseMatrix::new(p * r, q * s);
    for j in 0.. q {
        for i in 0.. p {
            let aij = da[(i, j)];
            if aij == 0. {
                continue;
            }
            for l in 0.. s {
                for k in 0.. r {
                    d[(i * r + k, j * s + l)] = aij * db[(k, l)];
                }
            }
        }
    }
    d
}

pub(crate) fn to_sparse(a: &LinearMap, b: &LinearMap) -> SparseMatrix
{
    let sa = a.as_sparse();
    let sb = b.as_sparse();
    let (p, q) = (sa.rows(), sa.cols());
    let (r, s) = (sb.rows(), sb.cols());

    let tb = sparse::triplets(&sb);
    let mut tri = Vec::with_capacity(sa.nnz() * tb.len());
    for (va, (i, j)) in sa.iter() {
        for &(k, l, vb) in tb.iter() {
            tri.push((i * r + k, j * s + l, *va * vb));
        }
    }
    sparse::from_triplets(p * r, q * s, tri)
}
