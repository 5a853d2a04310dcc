use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gbmtree::booster::GbmBooster;
use gbmtree::constants::MAX_CATEGORIES;
use gbmtree::data::{Dataset, Matrix};
use gbmtree::distribution::Distribution;
use gbmtree::tree::Tree;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const N_ROWS: usize = 20_000;
const N_COLS: usize = 5;

/// Column-major predictors with a few missing values, a categorical last
/// column with 8 levels, and a noisy additive response.
fn synthetic_data(seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(N_ROWS * N_COLS);
    for c in 0..N_COLS {
        for _ in 0..N_ROWS {
            let v = if c == N_COLS - 1 {
                rng.gen_range(0..8) as f64
            } else if rng.gen::<f64>() < 0.05 {
                f64::NAN
            } else {
                rng.gen::<f64>()
            };
            x.push(v);
        }
    }
    let y = (0..N_ROWS)
        .map(|i| {
            let x0 = x[i];
            let x1 = x[N_ROWS + i];
            let cat = x[(N_COLS - 1) * N_ROWS + i];
            let linear = if x0.is_nan() { 0.0 } else { 2.0 * x0 };
            let step = if x1 > 0.5 { 1.0 } else { 0.0 };
            let signal = linear + step + cat / 8.0;
            signal + rng.gen::<f64>()
        })
        .collect();
    (x, y)
}

pub fn tree_benchmarks(c: &mut Criterion) {
    let (x, y) = synthetic_data(0);
    let var_classes = vec![0, 0, 0, 0, 8];
    let data = Dataset::new(Matrix::new(&x, N_ROWS, N_COLS), &y, N_ROWS, 1.0)
        .unwrap()
        .with_var_classes(var_classes.clone())
        .unwrap();

    let loss = Distribution::Gaussian.create();
    let f = vec![loss.init_f(&data); N_ROWS];
    let mut z = vec![0.0; N_ROWS];
    loss.compute_working_response(&data, &f, &mut z);

    c.bench_function("compute_working_response", |b| {
        b.iter(|| loss.compute_working_response(black_box(&data), black_box(&f), &mut z))
    });

    let mut node_assign = vec![0; N_ROWS];
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = Tree::new(5, 0.1);
    c.bench_function("grow tree depth 5", |b| {
        b.iter(|| {
            tree.grow(
                black_box(&z),
                black_box(&data),
                10,
                MAX_CATEGORIES,
                &mut node_assign,
                &mut rng,
            )
            .unwrap()
        })
    });

    let mut fadj = vec![0.0; N_ROWS];
    c.bench_function("adjust tree", |b| {
        b.iter(|| tree.adjust(black_box(&node_assign), &mut fadj, 10).unwrap())
    });

    let mut booster_train = c.benchmark_group("train_booster");
    booster_train.warm_up_time(Duration::from_secs(5));
    booster_train.sample_size(10);
    booster_train.bench_function("train_booster_gaussian", |b| {
        b.iter(|| {
            let mut data = Dataset::new(Matrix::new(&x, N_ROWS, N_COLS), &y, 15_000, 0.5)
                .unwrap()
                .with_var_classes(var_classes.clone())
                .unwrap();
            let mut booster = GbmBooster::default().set_n_trees(50).set_interaction_depth(3).set_shrinkage(0.1);
            booster.fit(black_box(&mut data)).unwrap();
        })
    });
    booster_train.finish();

    let mut data = Dataset::new(Matrix::new(&x, N_ROWS, N_COLS), &y, N_ROWS, 0.5).unwrap();
    let mut booster = GbmBooster::default().set_n_trees(100).set_interaction_depth(3).set_shrinkage(0.1);
    booster.fit(&mut data).unwrap();
    c.bench_function("predict_single_threaded", |b| {
        b.iter(|| booster.predict(black_box(data.x()), false))
    });
    c.bench_function("predict_parallel", |b| {
        b.iter(|| booster.predict(black_box(data.x()), true))
    });
}

criterion_group!(benches, tree_benchmarks);
criterion_main!(benches);
