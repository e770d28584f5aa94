use float_eq::assert_float_eq;
use proxadmm::*;
use proxadmm::affine::{build_affine_operator, build_constraints};
use proxadmm::expression::*;

//

#[test]
fn test_scale_offset()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = DataMap::new();
    let cache = DataCache::new(&data);

    // 3 * x + 5
    let e = add(vec![
        multiply(scalar_constant(3., 1, 1), variable(2, 1, "x")),
        scalar_constant(5., 1, 1),
    ]);
    let (a, b) = build_affine_operator(&e, &cache, "r").unwrap();

    let ax = a.get("r", "x").unwrap();
    assert_eq!(ax.as_scalar(), Some(3.));
    assert_eq!(b.get("r").unwrap(), &vec![5., 5.]);
}

#[test]
fn test_dense_multiply()
{
    let _ = env_logger::builder().is_test(true).try_init();

    // C X - D with C of 2 x 3 and X of 3 x 2
    let data = DataMap::new()
        .dense("C", DenseMatrix::new(2, 3).iter_rowmaj(&[
            1., 0., 2.,
            0., -1., 1.,
        ]))
        .dense("D", DenseMatrix::new(2, 2).iter_rowmaj(&[
            1., 2.,
            3., 4.,
        ]));
    let cache = DataCache::new(&data);

    let e = add(vec![
        multiply(constant(2, 3, "C"), variable(3, 2, "X")),
        negate(constant(2, 2, "D")),
    ]);
    let (a, b) = build_affine_operator(&e, &cache, "r").unwrap();

    // X = [[1, 4], [2, 5], [3, 6]] column-major
    let x = [1., 2., 3., 4., 5., 6.];
    let mut v = BlockVector::new();
    v.insert("X", x.to_vec());
    let mut y = a.apply(&v).unwrap();
    y.add_scaled(1., &b).unwrap();

    // C X = [[7, 16], [1, 1]], minus D
    assert_float_eq!(y.get("r").unwrap().as_slice(), [6., -2., 14., -3.].as_ref(), abs_all <= 1e-12);

    // every key resolved once
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_right_multiply_and_linear_map()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = DataMap::new()
        .dense("C", DenseMatrix::new(2, 1).iter_colmaj(&[1., -1.]));
    let cache = DataCache::new(&data);

    // diag(2, 3) (X C) with X of 2 x 2
    let desc = LinearMapDesc::Diagonal(Constant {
        m: 2,
        n: 1,
        value: ConstantValue::Data("d".to_string()),
    });
    let e = linear_map(desc, multiply(variable(2, 2, "X"), constant(2, 1, "C")));
    let data_d = DataMap::new()
        .dense("C", DenseMatrix::new(2, 1).iter_colmaj(&[1., -1.]))
        .dense("d", DenseMatrix::new(2, 1).iter_colmaj(&[2., 3.]));
    let cache_d = DataCache::new(&data_d);
    let (a, b) = build_affine_operator(&e, &cache_d, "r").unwrap();
    assert!(b.get("r").unwrap().iter().all(|v| *v == 0.));

    // X = [[1, 2], [3, 4]]: X C = [-1, -1], scaled [-2, -3]
    let mut v = BlockVector::new();
    v.insert("X", vec![1., 3., 2., 4.]);
    let y = a.apply(&v).unwrap();
    assert_float_eq!(y.get("r").unwrap().as_slice(), [-2., -3.].as_ref(), abs_all <= 1e-12);

    // unresolved key
    assert!(matches!(build_affine_operator(&e, &cache, "r"), Err(SolverError::MissingData(_))));
}

#[test]
fn test_reshape()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = DataMap::new()
        .dense("G", DenseMatrix::new(2, 6).iter_rowmaj(&[
            1., 0., 0., 0., 0., 1.,
            0., 1., 1., 0., 0., 0.,
        ]));
    let cache = DataCache::new(&data);

    // vec(X) of a 2 x 3 variable
    let e = reshape(variable(2, 3, "X"), 6, 1);
    let (a, b) = build_affine_operator(&e, &cache, "r").unwrap();
    let ax = a.get("r", "X").unwrap();
    assert_eq!(ax.size(), (6, 6));
    assert_eq!(ax.as_scalar(), Some(1.));
    assert_eq!(b.get("r").unwrap(), &vec![0.; 6]);

    // G vec(X) + 1
    let e = add(vec![
        linear_map(
            LinearMapDesc::Dense(Constant {
                m: 2,
                n: 6,
                value: ConstantValue::Data("G".to_string()),
            }),
            reshape(variable(2, 3, "X"), 6, 1),
        ),
        scalar_constant(1., 1, 1),
    ]);
    let (a, b) = build_affine_operator(&e, &cache, "r").unwrap();
    assert_eq!(a.get("r", "X").unwrap().size(), (2, 6));
    assert_eq!(b.get("r").unwrap(), &vec![1., 1.]);

    let mut v = BlockVector::new();
    v.insert("X", vec![1., 2., 3., 4., 5., 6.]);
    let y = a.apply(&v).unwrap();
    assert_float_eq!(y.get("r").unwrap().as_slice(), [7., 5.].as_ref(), abs_all <= 1e-12);

    // reshape that changes the number of elements
    let e = reshape(variable(2, 3, "X"), 5, 1);
    assert!(matches!(build_affine_operator(&e, &cache, "r"), Err(SolverError::DimensionMismatch(_))));
}

#[test]
fn test_constraints_rows()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = DataMap::new();
    let cache = DataCache::new(&data);

    // x - z == 0, x + 1 == 0
    let p = Problem::new("p", add(vec![]), vec![
        eq_constraint(add(vec![variable(2, 1, "x"), negate(variable(2, 1, "z"))])),
        eq_constraint(add(vec![variable(2, 1, "x"), scalar_constant(1., 1, 1)])),
    ]);
    let (a, b) = build_constraints(&p, &cache).unwrap();

    assert_eq!(a.row_keys().cloned().collect::<Vec<_>>(), vec!["0".to_string(), "1".to_string()]);
    assert_eq!(a.get("0", "z").unwrap().as_scalar(), Some(-1.));
    assert!(a.get("1", "z").is_none());
    assert_eq!(b.get("0").unwrap(), &vec![0., 0.]);
    assert_eq!(b.get("1").unwrap(), &vec![1., 1.]);
    assert_eq!(a.m(), 4);
    assert_eq!(b.dim(), 4);
}

#[test]
fn test_malformed()
{
    let data = DataMap::new();
    let cache = DataCache::new(&data);

    // variable times variable
    let e = multiply(variable(2, 2, "X"), variable(2, 1, "y"));
    assert!(matches!(build_affine_operator(&e, &cache, "r"), Err(SolverError::MalformedExpression(_))));

    // inner dimensions
    let e = multiply(scalar_constant(1., 3, 3), variable(2, 1, "y"));
    assert!(matches!(build_affine_operator(&e, &cache, "r"), Err(SolverError::DimensionMismatch(_))));

    // multiply node whose declared size disagrees with its factors
    let e = Expression {
        kind: ExpressionKind::Multiply,
        m: 5,
        n: 1,
        args: vec![scalar_constant(1., 1, 1), variable(2, 1, "y")],
    };
    assert!(matches!(build_affine_operator(&e, &cache, "r"), Err(SolverError::DimensionMismatch(_))));
    let p = Problem::new("p", add(vec![]), vec![eq_constraint(e)]);
    assert!(matches!(build_constraints(&p, &cache), Err(SolverError::DimensionMismatch(_))));

    let e = Expression {
        kind: ExpressionKind::Multiply,
        m: 4,
        n: 1,
        args: vec![variable(2, 1, "y"), scalar_constant(2., 1, 1)],
    };
    assert!(matches!(build_affine_operator(&e, &cache, "r"), Err(SolverError::DimensionMismatch(_))));

    // a constraint that is not a zero cone
    let p = Problem::new("p", add(vec![]), vec![variable(1, 1, "x")]);
    assert!(matches!(build_constraints(&p, &cache), Err(SolverError::MalformedExpression(_))));
}
