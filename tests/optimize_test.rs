use float_cmp::approx_eq;
use minkit::prelude::*;
use ndarray::prelude::*;

const ALL: [Algorithm; 8] = [
    Algorithm::SteepestDescent,
    Algorithm::ConjugateGradientsFR,
    Algorithm::ConjugateGradientsPR,
    Algorithm::ConjugateGradientsPRP,
    Algorithm::QuasiNewtonDFP,
    Algorithm::QuasiNewtonBFGS,
    Algorithm::LimitedMemoryBFGS(3),
    Algorithm::LimitedMemoryBFGS(10),
];

/// f(x) = Σ a_i (x_i - c_i)²
fn weighted_quadratic(a: Array1<f64>, c: Array1<f64>) -> Optimizer {
    let n = a.len();
    let (a1, c1) = (a.clone(), c.clone());
    Optimizer::new(MultiDimGradFn::new(
        move |x: &Array1<f64>| {
            x.iter()
                .zip(a1.iter().zip(c1.iter()))
                .map(|(&xi, (&ai, &ci))| ai * (xi - ci).powi(2))
                .sum::<f64>()
        },
        move |x: &Array1<f64>| {
            Array1::from_shape_fn(x.len(), |i| 2.0 * a[i] * (x[i] - c[i]))
        },
        n,
    ))
}

fn until_gradient_small(max: usize, eps: f64) -> CombinedCondition {
    let conditions: Vec<Box<dyn TerminationCondition>> = vec![
        Box::new(IterationCondition::new(max)),
        Box::new(GradientNormCondition::new(eps).unwrap()),
    ];
    CombinedCondition::new(2, conditions).unwrap()
}

fn run_to_convergence(opt: &Optimizer, algorithm: Algorithm, x: &mut Array1<f64>, max: usize) -> usize {
    let mut termination = until_gradient_small(max, 1e-8);
    let mut sd = ConstantStartDistance::new(1.0).unwrap();
    let mut run = Run::new(&mut termination, &mut sd, 1e-10);
    opt.optimize(algorithm, x, &mut run).unwrap()
}

#[test]
fn test_separable_quadratic_all_methods() {
    let c = array![1.0, -2.0, 3.0, 0.5];
    let opt = weighted_quadratic(Array1::ones(4), c.clone());

    for algorithm in ALL {
        let mut x = Array1::zeros(4);
        let iters = run_to_convergence(&opt, algorithm, &mut x, 4 * 25);
        assert!(iters < 4 * 25, "{} took {} iterations", algorithm, iters);
        for i in 0..4 {
            assert!((x[i] - c[i]).abs() < 1e-6, "{}: {}", algorithm, x);
        }
    }
}

#[test]
fn test_ill_conditioned_quadratic() {
    let c = array![1.0, -2.0, 3.0, 0.5];
    let opt = weighted_quadratic(array![1.0, 5.0, 25.0, 125.0], c.clone());

    let mut x = array![-3.0, 4.0, 1.0, 2.0];
    let sd_iters = run_to_convergence(&opt, Algorithm::SteepestDescent, &mut x, 5000);

    for algorithm in &ALL[1..] {
        let mut x = array![-3.0, 4.0, 1.0, 2.0];
        let iters = run_to_convergence(&opt, *algorithm, &mut x, 5000);
        assert!(
            5 * iters < sd_iters,
            "{} took {} iterations, steepest descent {}",
            algorithm,
            iters,
            sd_iters
        );
        for i in 0..4 {
            assert!((x[i] - c[i]).abs() < 1e-6, "{}: {}", algorithm, x);
        }
    }
}

#[test]
fn test_lbfgs_matches_bfgs() {
    // tridiagonal, diagonally dominant
    let n = 5;
    let a = Array2::from_shape_fn((n, n), |(i, j)| match (i as isize - j as isize).abs() {
        0 => 4.0,
        1 => 1.0,
        _ => 0.0,
    });
    let b = array![1.0, -1.0, 2.0, 0.0, 3.0];
    let (a1, b1) = (a.clone(), b.clone());
    let opt = Optimizer::new(MultiDimGradFn::new(
        move |x: &Array1<f64>| 0.5 * x.dot(&a1.dot(x)) - b1.dot(x),
        move |x: &Array1<f64>| a.dot(x) - &b,
        n,
    ));

    let mut x_bfgs = Array1::ones(n);
    run_to_convergence(&opt, Algorithm::QuasiNewtonBFGS, &mut x_bfgs, 100);

    for m in n..=Lbfgs::MAX_MEMORY {
        let mut x_lbfgs = Array1::ones(n);
        run_to_convergence(&opt, Algorithm::LimitedMemoryBFGS(m), &mut x_lbfgs, 100);
        for i in 0..n {
            assert!(
                (x_lbfgs[i] - x_bfgs[i]).abs() < 1e-6,
                "m = {}: {} vs {}",
                m,
                x_lbfgs,
                x_bfgs
            );
        }
    }
}

#[test]
fn test_dimension_checks() {
    for n in [1usize, 5, 100] {
        let f = MultiDimGradFn::new(|x: &Array1<f64>| x.sum(), |x: &Array1<f64>| Array1::ones(x.len()), n);
        let g = MultiDimNumGradFn::new(|x: &Array1<f64>| x.sum(), n, 1e-6).unwrap();

        for len in [n - 1, n + 1, 0] {
            if len == n {
                continue;
            }
            let x = Array1::zeros(len);
            let expected = MinimizerError::DimensionMismatch { expected: n, found: len };
            assert_eq!(f.call(&x), Err(expected.clone()));
            assert_eq!(f.grad(&x), Err(expected.clone()));
            assert_eq!(g.call(&x), Err(expected.clone()));
            assert_eq!(g.grad(&x), Err(expected));
        }
    }
}

struct Fixed(f64);

impl StartDistanceForecaster for Fixed {
    fn next_start_distance(&mut self) -> f64 {
        self.0
    }

    fn record_last_distance(&mut self, _distance: f64) {}

    fn reset(&mut self) {}
}

#[test]
fn test_non_positive_forecast() {
    let opt = weighted_quadratic(array![1.0, 2.0], array![1.0, 1.0]);
    for algorithm in ALL {
        for bad in [0.0, -0.5] {
            let mut termination = IterationCondition::new(10);
            let mut sd = Fixed(bad);
            let mut run = Run::new(&mut termination, &mut sd, 1e-8);
            let mut x = array![0.0, 0.0];
            assert!(matches!(
                opt.optimize(algorithm, &mut x, &mut run),
                Err(MinimizerError::IllegalConfiguration(_))
            ));
            assert_eq!(x, array![0.0, 0.0]);
        }
    }
}

#[test]
fn test_dispatch_is_deterministic() {
    let opt = Optimizer::new(MultiDimGradFn::new(
        |x: &Array1<f64>| (1.0 - x[0]).powi(2) + 10.0 * (x[1] - x[0].powi(2)).powi(2),
        |x: &Array1<f64>| {
            array![
                -2.0 * (1.0 - x[0]) - 40.0 * x[0] * (x[1] - x[0].powi(2)),
                20.0 * (x[1] - x[0].powi(2)),
            ]
        },
        2,
    ));

    let mut termination = IterationCondition::new(15);
    let mut forecaster = LimitedMedianStartDistance::new(3, 1.0).unwrap();
    for algorithm in ALL {
        let mut results = Vec::new();
        for _ in 0..2 {
            let mut run = Run::new(&mut termination, &mut forecaster, 1e-8);
            let mut x = array![-1.0, 2.0];
            let iters = opt.optimize(algorithm, &mut x, &mut run).unwrap();
            results.push((iters, x));
        }
        assert_eq!(results[0], results[1], "{}", algorithm);
    }
}

#[test]
fn test_selection_by_code_and_name() {
    let c = array![2.0, -1.0];
    let opt = weighted_quadratic(array![1.0, 3.0], c.clone());

    let mut by_code = array![0.0, 0.0];
    let mut termination = until_gradient_small(50, 1e-8);
    let mut sd = ConstantStartDistance::new(1.0).unwrap();
    let mut run = Run::new(&mut termination, &mut sd, 1e-10);
    let iters_code = opt.optimize_code(4, &mut by_code, &mut run).unwrap();

    let algorithm: Algorithm = "L-BFGS(4)".parse().unwrap();
    let mut by_name = array![0.0, 0.0];
    let iters_name = run_to_convergence(&opt, algorithm, &mut by_name, 50);

    assert_eq!(iters_code, iters_name);
    assert_eq!(by_code, by_name);
    assert!(approx_eq!(f64, by_name[0], c[0], epsilon = 1e-6));
    assert!(approx_eq!(f64, by_name[1], c[1], epsilon = 1e-6));
}

#[test]
fn test_maximize_by_negation() {
    // concave with maximum 3 at (2, -1)
    let g = MultiDimGradFn::new(
        |x: &Array1<f64>| 3.0 - (x[0] - 2.0).powi(2) - 2.0 * (x[1] + 1.0).powi(2),
        |x: &Array1<f64>| array![-2.0 * (x[0] - 2.0), -4.0 * (x[1] + 1.0)],
        2,
    );
    let opt = Optimizer::new(Negated::new(g.clone()));
    let mut x = array![0.0, 0.0];
    run_to_convergence(&opt, Algorithm::QuasiNewtonBFGS, &mut x, 50);

    assert!(approx_eq!(f64, x[0], 2.0, epsilon = 1e-6));
    assert!(approx_eq!(f64, x[1], -1.0, epsilon = 1e-6));
    assert!(approx_eq!(f64, g.call(&x).unwrap(), 3.0, epsilon = 1e-10));
}

#[test]
fn test_numerical_gradient() {
    let f = MultiDimNumGradFn::new(
        |x: &Array1<f64>| (x[0] - 1.0).powi(2) + 4.0 * (x[1] - 0.5).powi(2) + x[0] * x[1],
        2,
        1e-7,
    )
    .unwrap();
    let opt = Optimizer::new(f);

    let conditions: Vec<Box<dyn TerminationCondition>> = vec![
        Box::new(IterationCondition::new(100)),
        Box::new(SmallDifferenceCondition::new(1e-14).unwrap()),
    ];
    let mut termination = CombinedCondition::new(2, conditions).unwrap();
    let mut sd = ConstantStartDistance::new(1.0).unwrap();
    let mut run = Run::new(&mut termination, &mut sd, 1e-10);
    let mut x = array![3.0, 3.0];
    opt.optimize(Algorithm::ConjugateGradientsPRP, &mut x, &mut run).unwrap();

    // 2(x0 - 1) + x1 = 0, 8(x1 - 0.5) + x0 = 0
    let expected = [0.8, 0.4];
    assert!((x[0] - expected[0]).abs() < 1e-4, "{}", x);
    assert!((x[1] - expected[1]).abs() < 1e-4, "{}", x);
}

#[test]
fn test_text_progress_rows() {
    let opt = weighted_quadratic(array![1.0, 10.0], array![1.0, 1.0]);
    let mut termination = IterationCondition::new(4);
    let mut sd = ConstantStartDistance::new(1.0).unwrap();
    let mut out = Vec::new();
    let iters = {
        let mut run = Run::new(&mut termination, &mut sd, 1e-8).with_progress(TextProgress::new(&mut out));
        let mut x = array![0.0, 0.0];
        opt.optimize(Algorithm::ConjugateGradientsFR, &mut x, &mut run).unwrap()
    };
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), iters + 3);
    assert_eq!(lines[0], Algorithm::ConjugateGradientsFR.to_string());
    for (i, line) in lines[3..].iter().enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], (i + 1).to_string());
        // the forecast is constant
        assert_eq!(fields[4], "1");
    }
}

/// f(x) = (x0 - 1)² + 10 (x1 - 1)², refusing to evaluate after `limit` calls.
#[derive(Clone)]
struct GivesUp {
    limit: usize,
    in_gradient: bool,
    calls: std::cell::Cell<usize>,
}

impl GivesUp {
    fn new(limit: usize, in_gradient: bool) -> Self {
        GivesUp { limit, in_gradient, calls: std::cell::Cell::new(0) }
    }

    fn count(&self) -> Result<(), MinimizerError> {
        self.calls.set(self.calls.get() + 1);
        if self.calls.get() > self.limit {
            return Err(MinimizerError::evaluation("model left its domain"));
        }
        Ok(())
    }
}

impl ObjFn for GivesUp {
    fn dimension(&self) -> usize {
        2
    }

    fn call(&self, x: &Array1<f64>) -> Result<f64, MinimizerError> {
        self.check_dimension(x)?;
        if !self.in_gradient {
            self.count()?;
        }
        Ok((x[0] - 1.0).powi(2) + 10.0 * (x[1] - 1.0).powi(2))
    }
}

impl ObjGradFn for GivesUp {
    fn grad(&self, x: &Array1<f64>) -> Result<Array1<f64>, MinimizerError> {
        self.check_dimension(x)?;
        if self.in_gradient {
            self.count()?;
        }
        Ok(array![2.0 * (x[0] - 1.0), 20.0 * (x[1] - 1.0)])
    }
}

#[test]
fn test_evaluation_failure_reaches_caller() {
    let expected = Err(MinimizerError::evaluation("model left its domain"));
    for algorithm in ALL {
        // value failures inside the line search, gradient failures between iterations
        for (limit, in_gradient) in [(0, false), (3, false), (8, false), (1, true), (2, true)] {
            let opt = Optimizer::new(GivesUp::new(limit, in_gradient));
            let mut termination = until_gradient_small(100, 1e-8);
            let mut sd = ConstantStartDistance::new(1.0).unwrap();
            let mut run = Run::new(&mut termination, &mut sd, 1e-10);
            let mut x = array![0.0, 0.0];
            assert_eq!(
                opt.optimize(algorithm, &mut x, &mut run),
                expected,
                "{} with limit {} (gradient: {})",
                algorithm,
                limit,
                in_gradient
            );
            assert!(x.iter().all(|v| v.is_finite()), "{}: {}", algorithm, x);
        }
    }
}

#[test]
fn test_undefined_numerical_gradient_stops_run() {
    let opt = Optimizer::new(
        MultiDimNumGradFn::new(|x: &Array1<f64>| (1.0 - x[0]).sqrt(), 1, 1e-6).unwrap(),
    );
    for algorithm in [Algorithm::SteepestDescent, Algorithm::QuasiNewtonBFGS] {
        let mut termination = IterationCondition::new(10);
        let mut sd = ConstantStartDistance::new(1.0).unwrap();
        let mut run = Run::new(&mut termination, &mut sd, 1e-8);
        let mut x = array![1.0 - 1e-9];
        assert!(matches!(
            opt.optimize(algorithm, &mut x, &mut run),
            Err(MinimizerError::EvaluationFailure(_))
        ));
        assert_eq!(x, array![1.0 - 1e-9]);
    }
}
