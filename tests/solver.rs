use float_eq::assert_float_eq;
use proxadmm::prelude::*;
use proxadmm::expression::*;

//

fn vec_data(items: &[(&str, Vec<f64>)]) -> DataMap
{
    let mut data = DataMap::new();
    for (k, v) in items {
        data.insert_dense(k, DenseMatrix::new(v.len(), 1).iter_colmaj(v));
    }
    data
}

/// `||id - key||^2`
fn sum_square_to(id: &str, key: &str, n: usize) -> Expression
{
    prox_function(ProxFunctionType::SumSquare, 1., vec![
        add(vec![variable(n, 1, id), negate(constant(n, 1, key))]),
    ])
}

fn consensus() -> Problem
{
    Problem::new(
        "consensus",
        add(vec![sum_square_to("x", "a", 2), sum_square_to("z", "c", 2)]),
        vec![eq_constraint(add(vec![variable(2, 1, "x"), negate(variable(2, 1, "z"))]))],
    )
}

#[test]
fn test_unconstrained()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("a", vec![1.5, -2., 0.25])]);

    for rho in [0.01, 1., 100.] {
        let p = Problem::new("p", add(vec![sum_square_to("x", "a", 3)]), vec![]);
        let mut s = ProxAdmmSolver::new(p, SolverParams::default(), LocalParameterService::new())
            .par(|p| p.rho = rho);

        let status = s.solve(&data).unwrap();
        assert_eq!(status.state, SolverState::Optimal);
        assert_eq!(status.num_iterations, 0);

        let x = s.parameter_service().fetch(variable_parameter_id("p", "x"));
        assert_float_eq!(x.as_slice(), [1.5, -2., 0.25].as_ref(), abs_all <= 1e-12);
    }
}

#[test]
fn test_consensus()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("a", vec![1., 2.]), ("c", vec![3., -2.])]);

    let mut s = ProxAdmmSolver::new(consensus(), SolverParams::default(), LocalParameterService::new());
    let status = s.solve(&data).unwrap();
    assert_eq!(status.state, SolverState::Optimal);
    assert!(status.num_iterations < 100);
    assert!(status.residuals.r_norm <= status.residuals.epsilon_primal);
    assert!(status.residuals.s_norm <= status.residuals.epsilon_dual);

    let x = s.parameter_service().fetch(variable_parameter_id("consensus", "x"));
    let z = s.parameter_service().fetch(variable_parameter_id("consensus", "z"));
    assert_float_eq!(x.as_slice(), [2., 0.].as_ref(), abs_all <= 1e-2);
    assert_float_eq!(z.as_slice(), [2., 0.].as_ref(), abs_all <= 1e-2);

    // tighter tolerances, various penalties
    for rho in [0.1, 1., 10.] {
        let mut s = ProxAdmmSolver::new(consensus(), SolverParams::default(), LocalParameterService::new())
            .par(|p| {
                p.rho = rho;
                p.abs_tol = 1e-9;
                p.rel_tol = 1e-9;
            });
        let status = s.solve(&data).unwrap();
        assert_eq!(status.state, SolverState::Optimal);

        let x = s.parameter_service().fetch(variable_parameter_id("consensus", "x"));
        assert_float_eq!(x.as_slice(), [2., 0.].as_ref(), abs_all <= 1e-6);
    }
}

#[test]
fn test_residual_monotonicity()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("a", vec![1., 2.]), ("c", vec![3., -2.])]);
    let mut s = ProxAdmmSolver::new(consensus(), SolverParams::default(), LocalParameterService::new())
        .par(|p| {
            p.abs_tol = 0.;
            p.rel_tol = 0.;
            p.epoch_iterations = 1;
        });

    let mut prev: Option<(f64, f64)> = None;
    for k in 1..= 30 {
        s.par.max_iterations = k;
        let status = s.solve(&data).unwrap();
        assert_eq!(status.state, SolverState::MaxIterationsReached);
        assert_eq!(status.num_iterations, k);

        let (r, d) = (status.residuals.r_norm, status.residuals.s_norm);
        if let Some((r_prev, d_prev)) = prev {
            assert!(r <= r_prev * (1. + 1e-9), "iter {}: primal {} > {}", k, r, r_prev);
            assert!(d <= d_prev * (1. + 1e-9), "iter {}: dual {} > {}", k, d, d_prev);
        }
        prev = Some((r, d));
    }
}

#[test]
fn test_iteration_cap()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("a", vec![1., 2.]), ("c", vec![3., -2.])]);
    let mut s = ProxAdmmSolver::new(consensus(), SolverParams::default(), LocalParameterService::new())
        .par(|p| p.max_iterations = 5);

    let status = s.solve(&data).unwrap();
    assert_eq!(status.state, SolverState::MaxIterationsReached);
    assert_eq!(status.num_iterations, 5);
    assert!(!status.residuals.converged());
    assert_eq!(s.status(), &status);

    // the last iterate is still written
    let x = s.parameter_service().fetch(variable_parameter_id("consensus", "x"));
    assert_float_eq!(x.as_slice(), [2., 0.].as_ref(), abs_all <= 0.1);
}

#[test]
fn test_soft_threshold_split()
{
    let _ = env_logger::builder().is_test(true).try_init();

    // ||x - a||^2 + ||z||_1 s.t. x - z = 0
    let data = vec_data(&[("a", vec![3., 0.2, -1.])]);
    let p = Problem::new(
        "lasso",
        add(vec![
            sum_square_to("x", "a", 3),
            prox_function(ProxFunctionType::NormL1, 1., vec![variable(3, 1, "z")]),
        ]),
        vec![eq_constraint(add(vec![variable(3, 1, "x"), negate(variable(3, 1, "z"))]))],
    );

    let mut service = LocalParameterService::new();
    let mut s = ProxAdmmSolver::new(p, SolverParams::default(), &mut service)
        .par(|p| {
            p.abs_tol = 1e-8;
            p.rel_tol = 1e-8;
        });
    let status = s.solve(&data).unwrap();
    assert_eq!(status.state, SolverState::Optimal);
    drop(s);

    let z = service.fetch(variable_parameter_id("lasso", "z"));
    assert_float_eq!(z.as_slice(), [2.5, 0., -0.5].as_ref(), abs_all <= 1e-5);
}

/// `(x + y - 2)^2 + (z - 1)^2` s.t. `x - z = 0`, with y free of constraints
fn partly_constrained() -> Problem
{
    Problem::new(
        "partial",
        add(vec![
            prox_function(ProxFunctionType::SumSquare, 1., vec![
                add(vec![variable(1, 1, "x"), variable(1, 1, "y"), scalar_constant(-2., 1, 1)]),
            ]),
            sum_square_to("z", "c", 1),
        ]),
        vec![eq_constraint(add(vec![variable(1, 1, "x"), negate(variable(1, 1, "z"))]))],
    )
}

#[test]
fn test_partly_constrained_block()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("c", vec![1.])]);
    let mut s = ProxAdmmSolver::new(partly_constrained(), SolverParams::default(), LocalParameterService::new())
        .par(|p| {
            p.abs_tol = 1e-9;
            p.rel_tol = 1e-9;
        });
    let status = s.solve(&data).unwrap();
    assert_eq!(status.state, SolverState::Optimal);

    for id in ["x", "y", "z"] {
        let v = s.parameter_service().fetch(variable_parameter_id("partial", id));
        assert_float_eq!(v.as_slice(), [1.].as_ref(), abs_all <= 1e-5, "{}", id);
    }
}

#[test]
fn test_tolerances_count_constraint_columns()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("c", vec![1.])]);
    let mut s = ProxAdmmSolver::new(partly_constrained(), SolverParams::default(), LocalParameterService::new())
        .par(|p| {
            p.abs_tol = 1e-6;
            p.rel_tol = 0.;
            p.max_iterations = 3;
        });
    let status = s.solve(&data).unwrap();

    // one constraint row, two constraint columns (x and z)
    assert_float_eq!(status.residuals.epsilon_primal, 1e-6, abs <= 1e-15);
    assert_float_eq!(status.residuals.epsilon_dual, 1e-6 * 2_f64.sqrt(), abs <= 1e-15);
}

#[test]
fn test_errors()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let data = vec_data(&[("a", vec![1., 2.])]);

    // z appears only in the constraint
    let p = Problem::new(
        "p",
        add(vec![sum_square_to("x", "a", 2)]),
        vec![eq_constraint(add(vec![variable(2, 1, "x"), negate(variable(2, 1, "z"))]))],
    );
    let mut s = ProxAdmmSolver::new(p, SolverParams::default(), LocalParameterService::new());
    assert!(matches!(s.solve(&data), Err(SolverError::MalformedExpression(_))));
    assert_eq!(s.status().state, SolverState::Error);
    assert!(s.parameter_service().is_empty());

    // c is not provided
    let mut s = ProxAdmmSolver::new(consensus(), SolverParams::default(), LocalParameterService::new());
    assert!(matches!(s.solve(&data), Err(SolverError::MissingData(_))));

    // objective that is not a sum of proximal functions
    let p = Problem::new("p", variable(2, 1, "x"), vec![]);
    let mut s = ProxAdmmSolver::new(p, SolverParams::default(), LocalParameterService::new());
    assert!(matches!(s.solve(&data), Err(SolverError::MalformedExpression(_))));
}

#[test]
fn test_par_by_env()
{
    std::env::set_var("RHO", "2.5");
    std::env::set_var("MAX_ITERATIONS", "77");

    let mut p = SolverParams::default();
    p.set_par_by_env();

    std::env::remove_var("RHO");
    std::env::remove_var("MAX_ITERATIONS");

    assert_eq!(p.rho, 2.5);
    assert_eq!(p.max_iterations, 77);
    assert_eq!(p.abs_tol, SolverParams::default().abs_tol);
}
