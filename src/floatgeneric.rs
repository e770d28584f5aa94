use num_traits::Float;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// `num::Float`-generic dense linear algebra
///
/// All numeric operations are written in pure Rust.
/// Matrices are stored in column-major order.
#[derive(Clone)]
pub struct FloatGeneric<F>
{
    ph_f: PhantomData<F>,
}

//

struct MatIdx<'a, F: Float>
{
    n_row: usize,
    n_col: usize,
    mat: &'a[F],
    transpose: bool,
}

impl<'a, F: Float> MatIdx<'a, F>
{
    fn idx(&self, (r, c): (usize, usize)) -> usize
    {
        let (r, c) = if !self.transpose {(r, c)} else {(c, r)};

        assert!(r < self.n_row);
        assert!(c < self.n_col);

        c * self.n_row + r
    }
}

impl<'a, F: Float> Index<(usize, usize)> for MatIdx<'a, F>
{
    type Output = F;

    fn index(&self, index: (usize, usize)) -> &Self::Output
    {
        &self.mat[self.idx(index)]
    }
}

//

struct MatIdxMut<'a, F: Float>
{
    n_row: usize,
    n_col: usize,
    mat: &'a mut[F],
}

impl<'a, F: Float> MatIdxMut<'a, F>
{
    fn idx(&self, (r, c): (usize, usize)) -> usize
    {
        assert!(r < self.n_row);
        assert!(c < self.n_col);

        c * self.n_row + r
    }

    fn col_vec(&self, c: usize) -> &[F]
    {
        assert!(c < self.n_col);

        let (_, v) = self.mat.split_at(c * self.n_row);
        let (v, _) = v.split_at(self.n_row);

        v
    }

    fn clear(&mut self)
    {
        for a in self.mat.iter_mut() {
            *a = F::zero();
        }
    }
}

impl<'a, F: Float> Index<(usize, usize)> for MatIdxMut<'a, F>
{
    type Output = F;

    fn index(&self, index: (usize, usize)) -> &Self::Output
    {
        &self.mat[self.idx(index)]
    }
}

impl<'a, F: Float> IndexMut<(usize, usize)> for MatIdxMut<'a, F>
{
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output
    {
        let i = self.idx(index);
        &mut self.mat[i]
    }
}

//

// cyclic Jacobi on a full symmetric matrix, accumulating rotations in mat_z
fn jacobi_eig<F: Float>(mat_s: &mut MatIdxMut<F>, mat_z: &mut MatIdxMut<F>, eps: F)
{
    let n = mat_s.n_col;
    let tol = eps * eps;
    let f0 = F::zero();
    let f1 = F::one();
    let f2 = f1 + f1;

    let mut sweep = true;

    while sweep {
        sweep = false;

        for p in 0.. n {
            for q in p + 1.. n {
                let spp = mat_s[(p, p)];
                let sqq = mat_s[(q, q)];
                let spq = mat_s[(p, q)];

                if spq * spq <= tol * (spp * sqq).abs() || spq * spq <= tol {
                    continue;
                }
                sweep = true;

                let theta = (sqq - spp) / (f2 * spq);
                let t = theta.signum() / (theta.abs() + (f1 + theta * theta).sqrt());
                let c = (f1 + t * t).sqrt().recip();
                let s = c * t;

                for k in 0.. n {
                    if k != p && k != q {
                        let skp = mat_s[(k, p)];
                        let skq = mat_s[(k, q)];
                        let np = c * skp - s * skq;
                        let nq = s * skp + c * skq;
                        mat_s[(k, p)] = np;
                        mat_s[(p, k)] = np;
                        mat_s[(k, q)] = nq;
                        mat_s[(q, k)] = nq;
                    }

                    let zp = mat_z[(k, p)];
                    let zq = mat_z[(k, q)];
                    mat_z[(k, p)] = c * zp - s * zq;
                    mat_z[(k, q)] = s * zp + c * zq;
                }

                mat_s[(p, p)] = spp - t * spq;
                mat_s[(q, q)] = sqq + t * spq;
                mat_s[(p, q)] = f0;
                mat_s[(q, p)] = f0;
            }
        }
    }
}

// one-sided Jacobi: orthogonalizes columns of mat_a (n_row >= n_col), accumulating rotations in mat_v
fn jacobi_svd<F: Float>(mat_a: &mut MatIdxMut<F>, mat_v: &mut MatIdxMut<F>, eps: F)
{
    let m = mat_a.n_row;
    let n = mat_a.n_col;
    let f0 = F::zero();
    let f1 = F::one();
    let f2 = f1 + f1;

    let mut conv = false;

    while !conv {
        conv = true;

        for i in 0.. n {
            for j in i + 1.. n {
                let mut alpha = f0;
                let mut beta = f0;
                let mut gamma = f0;
                for k in 0.. m {
                    let ai = mat_a[(k, i)];
                    let aj = mat_a[(k, j)];
                    alpha = alpha + ai * ai;
                    beta = beta + aj * aj;
                    gamma = gamma + ai * aj;
                }

                if (gamma * gamma > eps * eps * alpha * beta) && (gamma.abs() > eps * eps) {
                    conv = false;

                    let zeta = (beta - alpha) / (f2 * gamma);
                    let t = if zeta > f0 {
                        f1 / (zeta + (f1 + zeta * zeta).sqrt())
                    }
                    else {
                        -f1 / (-zeta + (f1 + zeta * zeta).sqrt())
                    };
                    let c = (f1 + t * t).sqrt().recip();
                    let s = c * t;

                    for k in 0.. m {
                        let ai = mat_a[(k, i)];
                        let aj = mat_a[(k, j)];
                        mat_a[(k, i)] = c * ai - s * aj;
                        mat_a[(k, j)] = s * ai + c * aj;
                    }
                    for k in 0.. n {
                        let vi = mat_v[(k, i)];
                        let vj = mat_v[(k, j)];
                        mat_v[(k, i)] = c * vi - s * vj;
                        mat_v[(k, j)] = s * vi + c * vj;
                    }
                }
            }
        }
    }
}

//

impl<F: Float> FloatGeneric<F>
{
    /// Calculates 2-norm \\(\\|x\\|_2\\).
    pub fn norm(x: &[F]) -> F
    {
        let mut sum = F::zero();
        for u in x {
            sum = sum + *u * *u;
        }
        sum.sqrt()
    }

    /// Calculates \\(x^T y\\).
    pub fn dot(x: &[F], y: &[F]) -> F
    {
        assert_eq!(x.len(), y.len());

        let mut sum = F::zero();
        for (u, v) in x.iter().zip(y) {
            sum = sum + *u * *v;
        }
        sum
    }

    /// Calculates \\(\alpha x\\) in place.
    pub fn scale(alpha: F, x: &mut[F])
    {
        for u in x {
            *u = alpha * *u;
        }
    }

    /// Calculates \\(\alpha x + y\\) in place of `y`.
    pub fn add(alpha: F, x: &[F], y: &mut[F])
    {
        assert_eq!(x.len(), y.len());

        for (u, v) in x.iter().zip(y) {
            *v = *v + alpha * *u;
        }
    }

    /// Calculates \\(\alpha G x + \beta y\\), or \\(\alpha G^T x + \beta y\\) if `transpose`.
    pub fn transform_ge(transpose: bool, n_row: usize, n_col: usize, alpha: F, mat: &[F], x: &[F], beta: F, y: &mut[F])
    {
        assert_eq!(mat.len(), n_row * n_col);
        if transpose {
            assert_eq!(x.len(), n_row);
            assert_eq!(y.len(), n_col);
        } else {
            assert_eq!(x.len(), n_col);
            assert_eq!(y.len(), n_row);
        };

        let mat = MatIdx {
            n_row, n_col, mat, transpose,
        };

        for r in 0.. y.len() {
            let mut mat_x = F::zero();
            for c in 0.. x.len() {
                mat_x = mat_x + mat[(r, c)] * x[c];
            }
            y[r] = alpha * mat_x + beta * y[r];
        }
    }

    /// Calculates a product \\(G H\\) of column-major matrices.
    ///
    /// * `(n_row, n_inner)` is the size of \\(G\\), `(n_inner, n_col)` the size of \\(H\\).
    pub fn mul_ge(n_row: usize, n_inner: usize, n_col: usize, mat_g: &[F], mat_h: &[F]) -> Vec<F>
    {
        assert_eq!(mat_g.len(), n_row * n_inner);
        assert_eq!(mat_h.len(), n_inner * n_col);

        let mut out = vec![F::zero(); n_row * n_col];
        for (h_col, o_col) in mat_h.chunks(n_inner.max(1)).zip(out.chunks_mut(n_row.max(1))) {
            if n_inner > 0 && n_row > 0 {
                Self::transform_ge(false, n_row, n_inner, F::one(), mat_g, h_col, F::zero(), o_col);
            }
        }
        out
    }

    /// LU factorization with partial pivoting of a square column-major matrix, in place.
    ///
    /// Returns `Err` with the failing column when a pivot is not larger than `eps_zero`.
    pub fn lu_factor(n: usize, mat: &mut[F], piv: &mut[usize], eps_zero: F) -> Result<(), usize>
    {
        assert_eq!(mat.len(), n * n);
        assert_eq!(piv.len(), n);

        let mut a = MatIdxMut {
            n_row: n, n_col: n, mat,
        };

        for k in 0.. n {
            let mut p = k;
            for i in k + 1.. n {
                if a[(i, k)].abs() > a[(p, k)].abs() {
                    p = i;
                }
            }
            if a[(p, k)].abs() <= eps_zero {
                return Err(k);
            }
            piv[k] = p;
            if p != k {
                for j in 0.. n {
                    let t = a[(k, j)];
                    a[(k, j)] = a[(p, j)];
                    a[(p, j)] = t;
                }
            }

            let d = a[(k, k)].recip();
            for i in k + 1.. n {
                a[(i, k)] = a[(i, k)] * d;
            }
            for j in k + 1.. n {
                let akj = a[(k, j)];
                for i in k + 1.. n {
                    a[(i, j)] = a[(i, j)] - a[(i, k)] * akj;
                }
            }
        }

        Ok(())
    }

    /// Solves \\(A x = b\\) in place of `b`, given the result of [`FloatGeneric::lu_factor`].
    pub fn lu_solve(n: usize, lu: &[F], piv: &[usize], b: &mut[F])
    {
        assert_eq!(lu.len(), n * n);
        assert_eq!(piv.len(), n);
        assert_eq!(b.len(), n);

        let a = MatIdx {
            n_row: n, n_col: n, mat: lu, transpose: false,
        };

        for k in 0.. n {
            b.swap(k, piv[k]);
        }
        for k in 0.. n {
            for i in k + 1.. n {
                b[i] = b[i] - a[(i, k)] * b[k];
            }
        }
        for k in (0.. n).rev() {
            b[k] = b[k] / a[(k, k)];
            for i in 0.. k {
                b[i] = b[i] - a[(i, k)] * b[k];
            }
        }
    }

    /// Applies a map to eigenvalues of the symmetric part \\(S = (G + G^T)/2\\) of a column-major `n` by `n` matrix \\(G\\),
    /// overwriting it with \\(V \mathbf{diag}(\lambda') V^T\\) where \\(S = V \mathbf{diag}(\lambda) V^T\\).
    ///
    /// * `map` takes an eigenvalue and returns a modified eigenvalue.
    ///   Returning `None` drops the eigenvalue from the reconstruction.
    pub fn map_eig_dense<M>(n: usize, mat: &mut[F], eps_zero: F, map: M)
    where M: Fn(F)->Option<F>
    {
        assert_eq!(mat.len(), n * n);

        let f2 = F::one() + F::one();
        let mut z = vec![F::zero(); n * n];
        let mut mat_s = MatIdxMut {
            n_row: n, n_col: n, mat,
        };
        let mut mat_z = MatIdxMut {
            n_row: n, n_col: n, mat: &mut z,
        };

        for c in 0.. n {
            for r in 0.. c {
                let v = (mat_s[(r, c)] + mat_s[(c, r)]) / f2;
                mat_s[(r, c)] = v;
                mat_s[(c, r)] = v;
            }
            mat_z[(c, c)] = F::one();
        }

        jacobi_eig(&mut mat_s, &mut mat_z, eps_zero);

        let lambda: Vec<Option<F>> = (0.. n).map(|i| map(mat_s[(i, i)])).collect();

        mat_s.clear();
        for (i, e) in lambda.iter().enumerate() {
            if let Some(e) = e {
                let zi = mat_z.col_vec(i);
                for c in 0.. n {
                    for r in 0.. n {
                        mat_s[(r, c)] = mat_s[(r, c)] + *e * zi[r] * zi[c];
                    }
                }
            }
        }
    }

    /// Applies a map to singular values of a column-major matrix \\(G\\).
    ///
    /// 1. Singular value decomposition: \\(G \rightarrow U \mathbf{diag}(\sigma) V^T\\)
    /// 1. Applies a map to the singular values: \\(\sigma \rightarrow \sigma'\\)
    /// 1. Reconstruct the matrix: \\(U \mathbf{diag}(\sigma') V^T \rightarrow G'\\)
    ///
    /// Singular values not larger than `eps_zero` are dropped from the reconstruction.
    pub fn map_svd<M>(n_row: usize, n_col: usize, mat: &mut[F], eps_zero: F, map: M)
    where M: Fn(F)->F
    {
        assert_eq!(mat.len(), n_row * n_col);

        if n_row < n_col {
            let mut mat_t = Self::transpose_ge(n_row, n_col, mat);
            Self::map_svd(n_col, n_row, &mut mat_t, eps_zero, map);
            let back = Self::transpose_ge(n_col, n_row, &mat_t);
            mat.copy_from_slice(&back);
            return;
        }

        let mut v = vec![F::zero(); n_col * n_col];
        let mut a = mat.to_vec();
        {
            let mut mat_a = MatIdxMut {
                n_row, n_col, mat: &mut a,
            };
            let mut mat_v = MatIdxMut {
                n_row: n_col, n_col, mat: &mut v,
            };
            for i in 0.. n_col {
                mat_v[(i, i)] = F::one();
            }

            jacobi_svd(&mut mat_a, &mut mat_v, eps_zero);
        }

        let mut out = MatIdxMut {
            n_row, n_col, mat,
        };
        out.clear();

        for j in 0.. n_col {
            let (_, aj) = a.split_at(j * n_row);
            let (aj, _) = aj.split_at(n_row);
            let sigma = Self::norm(aj);
            if sigma <= eps_zero {
                continue;
            }
            let ratio = map(sigma) / sigma;
            for c in 0.. n_col {
                let vc = v[j * n_col + c];
                for r in 0.. n_row {
                    out[(r, c)] = out[(r, c)] + ratio * aj[r] * vc;
                }
            }
        }
    }

    /// Transposes a column-major matrix of `n_row` by `n_col`.
    pub fn transpose_ge(n_row: usize, n_col: usize, mat: &[F]) -> Vec<F>
    {
        assert_eq!(mat.len(), n_row * n_col);

        let mut out = vec![F::zero(); n_row * n_col];
        for c in 0.. n_col {
            for r in 0.. n_row {
                out[r * n_col + c] = mat[c * n_row + r];
            }
        }
        out
    }
}

//

#[test]
fn test_lu1()
{
    use float_eq::assert_float_eq;

    type L = FloatGeneric<f64>;

    let n = 3;
    let mut a = vec![ // column-major
        0., 1., 2.,
        2., 1., 0.,
        1., 3., 1.,
    ];
    let a_orig = a.clone();
    let mut piv = vec![0; n];
    L::lu_factor(n, &mut a, &mut piv, 1e-12).unwrap();

    let x_ref = [1., -2., 0.5];
    let mut b = vec![0.; n];
    L::transform_ge(false, n, n, 1., &a_orig, &x_ref, 0., &mut b);
    L::lu_solve(n, &a, &piv, &mut b);

    assert_float_eq!(b.as_slice(), x_ref.as_ref(), abs_all <= 1e-9);
}

#[test]
fn test_lu_singular()
{
    type L = FloatGeneric<f64>;

    let mut a = vec![1., 2., 2., 4.];
    let mut piv = vec![0; 2];
    assert_eq!(L::lu_factor(2, &mut a, &mut piv, 1e-12), Err(1));
}

#[test]
fn test_map_eig_dense1()
{
    use float_eq::assert_float_eq;

    type L = FloatGeneric<f64>;

    // eigenvalues 1 and 3
    let mut a = vec![2., 1., 1., 2.];
    L::map_eig_dense(2, &mut a, 1e-12, |e| Some(e * e));

    // A^2
    assert_float_eq!(a.as_slice(), [5., 4., 4., 5.].as_ref(), abs_all <= 1e-9);
}

#[test]
fn test_map_svd1()
{
    use float_eq::assert_float_eq;

    type L = FloatGeneric<f64>;

    let a_orig = vec![ // 3 x 2, column-major
        1., 2., 0.,
        0., 1., 3.,
    ];
    let mut a = a_orig.clone();
    L::map_svd(3, 2, &mut a, 1e-12, |s| s);
    assert_float_eq!(a.as_slice(), a_orig.as_slice(), abs_all <= 1e-9);

    let mut b = L::transpose_ge(3, 2, &a_orig);
    L::map_svd(2, 3, &mut b, 1e-12, |_| 0.);
    assert_float_eq!(b.as_slice(), [0.; 6].as_ref(), abs_all <= 1e-12);
}
