use float_eq::assert_float_eq;
use proxadmm::*;
use proxadmm::expression::*;
use proxadmm::prox::*;

//

fn build(term: &Expression, vars: &[(&str, usize)], rho: f64, data: &DataMap) -> Result<Box<dyn ProxOperator>, SolverError>
{
    let cache = DataCache::new(data);
    let ids: Vec<(String, usize)> = vars.iter().map(|(k, n)| (k.to_string(), *n)).collect();
    let offsets = VariableOffsets::new(ids.iter().map(|(k, n)| (k, *n)));
    let arg = ProxOperatorArg::build(term, &cache, offsets, rho)?;
    build_prox_operator(&arg)
}

#[test]
fn test_linear_translation()
{
    let _ = env_logger::builder().is_test(true).try_init();

    // c'x + d'y over two variables
    let c = [0.5, -3.];
    let d = [2.];
    let data = DataMap::new()
        .dense("c", DenseMatrix::new(1, 2).iter_colmaj(&c))
        .dense("d", DenseMatrix::new(1, 1).iter_colmaj(&d));
    let term = prox_function(ProxFunctionType::Affine, 1., vec![
        add(vec![
            multiply(constant(1, 2, "c"), variable(2, 1, "x")),
            multiply(constant(1, 1, "d"), variable(1, 1, "y")),
        ]),
    ]);

    for rho in [0.1, 1., 7.5] {
        let mut op = build(&term, &[("x", 2), ("y", 1)], rho, &data).unwrap();
        let v = [1., 2., -4.];
        let x = op.apply(&v).unwrap();
        assert_float_eq!(x.as_slice(), [1. - 0.5 / rho, 2. + 3. / rho, -4. - 2. / rho].as_ref(), abs_all <= 1e-12);
    }
}

#[test]
fn test_stationarity()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = DataMap::new();
    let rho = 0.7;
    let v = [0.4, -1.3, 2.2];

    // grad f(x) + rho (x - v) = 0 for each smooth term
    let cases: [(ProxFunctionType, fn(f64) -> f64); 5] = [
        (ProxFunctionType::SumSquare, |x: f64| 2. * x),
        (ProxFunctionType::NegLog, |x: f64| -1. / x),
        (ProxFunctionType::InvPos, |x: f64| -1. / (x * x)),
        (ProxFunctionType::Exp, |x: f64| x.exp()),
        (ProxFunctionType::Logistic, |x: f64| 1. / (1. + (-x).exp())),
    ];
    for (t, grad) in cases {
        let term = prox_function(t, 1., vec![variable(3, 1, "x")]);
        let mut op = build(&term, &[("x", 3)], rho, &data).unwrap();
        let x = op.apply(&v).unwrap();
        for (xi, vi) in x.iter().zip(v) {
            assert_float_eq!(grad(*xi) + rho * (xi - vi), 0., abs <= 1e-7, "{:?}", t);
        }
    }
}

#[test]
fn test_epigraph_projection()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = DataMap::new();

    // t >= ||x||^2
    let term = epigraph(ProxFunctionType::SumSquare, 1., variable(2, 1, "x"), variable(1, 1, "t"));
    let mut op = build(&term, &[("t", 1), ("x", 2)], 1., &data).unwrap();

    // feasible points are kept
    let v = [5., 1., 1.];
    assert_float_eq!(op.apply(&v).unwrap().as_slice(), v.as_ref(), abs_all <= 1e-12);

    // projection lands on the boundary
    let v = [0., 1., 1.];
    let p = op.apply(&v).unwrap();
    let (t, x) = (p[0], &p[1..]);
    assert_float_eq!(t, x[0] * x[0] + x[1] * x[1], abs <= 1e-7);
    assert!(t > 0. && x[0] < 1.);
}

#[test]
fn test_unknown_shape()
{
    let data = DataMap::new();

    let term = epigraph(ProxFunctionType::NormL1, 1., variable(2, 1, "x"), variable(1, 1, "t"));
    assert!(matches!(build(&term, &[("t", 1), ("x", 2)], 1., &data), Err(SolverError::UnknownProx(_))));

    // soft threshold of a non-diagonal argument
    let data = DataMap::new().dense("A", DenseMatrix::new(2, 2).iter_rowmaj(&[1., 1., 0., 1.]));
    let term = prox_function(ProxFunctionType::NormL1, 1., vec![multiply(constant(2, 2, "A"), variable(2, 1, "x"))]);
    assert!(matches!(build(&term, &[("x", 2)], 1., &data), Err(SolverError::UnknownProx(_))));
}
