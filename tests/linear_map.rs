use std::rc::Rc;
use float_eq::assert_float_eq;
use proxadmm::*;
use proxadmm::linear::{BasicMap, sparse};

//

fn some_maps() -> Vec<LinearMap>
{
    let dense = LinearMap::dense(DenseMatrix::new(3, 2).iter_rowmaj(&[
        1., 2.,
        -1., 0.5,
        0., 3.,
    ]));
    let sparse = LinearMap::sparse(sparse::from_triplets(2, 4, vec![
        (0, 0, 1.), (0, 3, -2.), (1, 1, 4.),
    ]));
    let diagonal = LinearMap::diagonal(vec![1., -2., 3.]);
    let scalar = LinearMap::scalar(4, 2.5);
    let kron = LinearMap::kronecker(
        LinearMap::dense(DenseMatrix::new(2, 2).iter_rowmaj(&[1., 2., 3., 4.])),
        LinearMap::sparse(sparse::from_triplets(2, 3, vec![(0, 0, 1.), (1, 2, -1.), (0, 1, 0.5)])),
    );
    // cyclic shift, whose transpose is the reverse shift
    let basic = LinearMap::basic(BasicMap::new(3, 3,
        Rc::new(|x: &[f64]| vec![x[2], x[0], x[1]]),
        Some(Rc::new(|y: &[f64]| vec![y[1], y[2], y[0]])),
        "shift",
    ));
    let basic_apply_only = LinearMap::basic(BasicMap::new(2, 3,
        Rc::new(|x: &[f64]| vec![x[0] + x[1], x[1] - x[2]]),
        None,
        "pair",
    ));

    vec![dense, sparse, diagonal, scalar, kron, basic, basic_apply_only]
}

fn basis(n: usize, j: usize) -> Vec<f64>
{
    let mut e = vec![0.; n];
    e[j] = 1.;
    e
}

#[test]
fn test_apply_matches_dense()
{
    let _ = env_logger::builder().is_test(true).try_init();

    for l in some_maps() {
        let (m, n) = l.size();
        let d = l.as_dense();
        assert_eq!(d.size(), (m, n));

        for j in 0.. n {
            let y = l.apply(&basis(n, j));
            let col: Vec<f64> = (0.. m).map(|i| d[(i, j)]).collect();
            assert_float_eq!(y.as_slice(), col.as_slice(), abs_all <= 1e-9, "{:?}", l);
        }
    }
}

#[test]
fn test_transpose_involution()
{
    let _ = env_logger::builder().is_test(true).try_init();

    for l in some_maps() {
        let t = l.transpose();
        assert_eq!(t.size(), (l.n(), l.m()));
        assert_float_eq!(t.as_dense().as_slice(), l.as_dense().transpose().as_slice(), abs_all <= 1e-12);

        let tt = t.transpose();
        assert_float_eq!(tt.as_dense().as_slice(), l.as_dense().as_slice(), abs_all <= 1e-12);
    }
}

#[test]
fn test_sparse_agrees_with_dense()
{
    for l in some_maps() {
        let (m, n) = l.size();
        let s = LinearMap::sparse(l.as_sparse());
        assert_eq!(s.size(), (m, n));
        assert_float_eq!(s.as_dense().as_slice(), l.as_dense().as_slice(), abs_all <= 1e-12);
    }
}

#[test]
fn test_composition()
{
    let maps = some_maps();
    let (dense, diagonal, kron) = (&maps[0], &maps[2], &maps[4]);

    // (D A) x == D (A x)
    let da = diagonal * dense;
    let x = [0.3, -1.7];
    assert_float_eq!(da.apply(&x).as_slice(), diagonal.apply(&dense.apply(&x)).as_slice(), abs_all <= 1e-12);

    // (K + K) x == 2 K x, and stays a Kronecker product
    let kk = kron + kron;
    assert_eq!(kk.impl_type(), kron.impl_type());
    let x: Vec<f64> = (0.. kron.n()).map(|i| i as f64 - 2.).collect();
    let mut y2 = kron.apply(&x);
    y2.iter_mut().for_each(|v| *v *= 2.);
    assert_float_eq!(kk.apply(&x).as_slice(), y2.as_slice(), abs_all <= 1e-12);

    // scalar times anything keeps the representation of the other factor
    let s = 3. * kron;
    assert_eq!(s.impl_type(), kron.impl_type());
    let n = -diagonal;
    assert_eq!(n.as_diagonal(), Some(vec![-1., 2., -3.]));
}

#[test]
fn test_kronecker_lazy_apply()
{
    // vec(B X A^T) with A = [[1, 2], [3, 4]], B = [[0, 1], [1, 0]]
    let a = LinearMap::dense(DenseMatrix::new(2, 2).iter_rowmaj(&[1., 2., 3., 4.]));
    let b = LinearMap::dense(DenseMatrix::new(2, 2).iter_rowmaj(&[0., 1., 1., 0.]));
    let k = LinearMap::kronecker(a, b);

    // X = [[1, 2], [3, 4]] column-major
    let x = [1., 3., 2., 4.];
    // B X = [[3, 4], [1, 2]], (B X) A^T = [[11, 25], [5, 11]]
    assert_float_eq!(k.apply(&x).as_slice(), [11., 5., 25., 11.].as_ref(), abs_all <= 1e-12);
}

#[test]
fn test_inverse()
{
    let maps = some_maps();
    for l in [&maps[2], &maps[3], &maps[5]] {
        let inv = l.inverse().unwrap();
        let x: Vec<f64> = (0.. l.n()).map(|i| 1. + i as f64).collect();
        assert_float_eq!(inv.apply(&l.apply(&x)).as_slice(), x.as_slice(), abs_all <= 1e-9);
    }

    assert!(matches!(maps[0].inverse(), Err(SolverError::SingularOperator(_))));
    assert!(matches!(LinearMap::diagonal(vec![1., 0.]).inverse(), Err(SolverError::SingularOperator(_))));
}
