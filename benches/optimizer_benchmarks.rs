use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use minkit::prelude::*;
use ndarray::prelude::*;
use std::time::Duration;

const ALGORITHMS: [Algorithm; 7] = [
    Algorithm::SteepestDescent,
    Algorithm::ConjugateGradientsFR,
    Algorithm::ConjugateGradientsPR,
    Algorithm::ConjugateGradientsPRP,
    Algorithm::QuasiNewtonDFP,
    Algorithm::QuasiNewtonBFGS,
    Algorithm::LimitedMemoryBFGS(5),
];

#[derive(Clone)]
struct TestProblem {
    name: String,
    optimizer: Optimizer,
    x0: Array1<f64>,
    dimensions: usize,
}

/// f(x) = Σ 5^(i mod 4) (x_i - 1)²
fn ill_conditioned_quadratic(n: usize) -> TestProblem {
    let a = Array1::from_shape_fn(n, |i| 5f64.powi((i % 4) as i32));
    let a1 = a.clone();
    let optimizer = Optimizer::new(MultiDimGradFn::new(
        move |x: &Array1<f64>| {
            x.iter()
                .zip(a1.iter())
                .map(|(&xi, &ai)| ai * (xi - 1.0).powi(2))
                .sum::<f64>()
        },
        move |x: &Array1<f64>| Array1::from_shape_fn(x.len(), |i| 2.0 * a[i] * (x[i] - 1.0)),
        n,
    ));
    TestProblem {
        name: format!("quadratic_{}d", n),
        optimizer,
        x0: Array1::from_shape_fn(n, |i| if i % 2 == 0 { -2.0 } else { 3.0 }),
        dimensions: n,
    }
}

fn rosenbrock(n: usize) -> TestProblem {
    let optimizer = Optimizer::new(MultiDimGradFn::new(
        |x: &Array1<f64>| {
            (0..x.len() - 1)
                .map(|i| 100.0 * (x[i + 1] - x[i] * x[i]).powi(2) + (1.0 - x[i]).powi(2))
                .sum::<f64>()
        },
        |x: &Array1<f64>| {
            let n = x.len();
            let mut g: Array1<f64> = Array1::zeros(n);
            for i in 0..n - 1 {
                let t = x[i + 1] - x[i] * x[i];
                g[i] += -400.0 * x[i] * t - 2.0 * (1.0 - x[i]);
                g[i + 1] += 200.0 * t;
            }
            g
        },
        n,
    ));
    TestProblem {
        name: format!("rosenbrock_{}d", n),
        optimizer,
        x0: Array1::from_elem(n, -1.2),
        dimensions: n,
    }
}

fn setup_test_problems() -> Vec<TestProblem> {
    vec![
        ill_conditioned_quadratic(4),
        ill_conditioned_quadratic(20),
        rosenbrock(2),
        rosenbrock(10),
    ]
}

fn run_optimization_benchmark(
    problem: &TestProblem,
    algorithm: Algorithm,
    max_iterations: usize,
) -> (f64, usize) {
    let conditions: Vec<Box<dyn TerminationCondition>> = vec![
        Box::new(IterationCondition::new(max_iterations)),
        Box::new(GradientNormCondition::new(1e-6).unwrap()),
    ];
    let mut termination = CombinedCondition::new(2, conditions).unwrap();
    let mut forecaster = LimitedMedianStartDistance::new(5, 1.0).unwrap();
    let mut run = Run::new(&mut termination, &mut forecaster, 1e-8);

    let mut x = problem.x0.clone();
    let iterations = problem
        .optimizer
        .optimize(algorithm, &mut x, &mut run)
        .unwrap_or(0);
    let final_value = problem.optimizer.function().call(&x).unwrap_or(f64::NAN);
    (final_value, iterations)
}

fn bench_iterations(c: &mut Criterion, max_iterations: usize, measurement_secs: u64) {
    let problems = setup_test_problems();

    let mut group = c.benchmark_group(format!("minimize_{}_iterations", max_iterations));
    group.measurement_time(Duration::from_secs(measurement_secs));
    group.sample_size(20);

    for problem in &problems {
        for algorithm in ALGORITHMS {
            group.throughput(Throughput::Elements(problem.dimensions as u64));
            group.bench_with_input(
                BenchmarkId::new(algorithm.to_string(), &problem.name),
                &(problem, algorithm),
                |b, (prob, alg)| {
                    b.iter(|| {
                        let (final_value, iterations) = run_optimization_benchmark(
                            black_box(prob),
                            black_box(*alg),
                            black_box(max_iterations),
                        );
                        black_box((final_value, iterations))
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_iterations_10(c: &mut Criterion) {
    bench_iterations(c, 10, 10);
}

fn bench_iterations_1000(c: &mut Criterion) {
    bench_iterations(c, 1000, 30);
}

criterion_group!(optimizer_benches, bench_iterations_10, bench_iterations_1000);
criterion_main!(optimizer_benches);
