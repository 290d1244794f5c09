use corrclust::cluster::ClusteringAlgorithm;
use corrclust::correlation::{Copac, Eric, HiCO};
use corrclust::Relation;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use rand_distr::Normal;

/// Three noisy lines in `d` dimensions, `n` points each.
fn lines(n: usize, d: usize) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(42);
    let jitter = Normal::new(0.0, 0.02).unwrap();
    let mut data = Vec::with_capacity(3 * n);
    for line in 0..3 {
        let offset = line as f64 * 10.0;
        for _ in 0..n {
            let t: f64 = rng.random_range(0.0..5.0);
            let mut p: Vec<f64> = (0..d).map(|_| offset + rng.sample(jitter)).collect();
            p[line % d] += t;
            data.push(p);
        }
    }
    data
}

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");
    let data = lines(100, 5);
    let relation = Relation::new(&data).unwrap();

    group.bench_function("copac_n300_d5", |b| {
        b.iter(|| {
            Copac::new(15, 0.1, 10).run(black_box(&relation)).unwrap();
        })
    });

    group.bench_function("eric_n300_d5", |b| {
        b.iter(|| {
            Eric::new(15, 10).run(black_box(&relation)).unwrap();
        })
    });

    group.bench_function("hico_n300_d5", |b| {
        b.iter(|| {
            HiCO::new(10).with_k(15).run(black_box(&relation)).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_correlation);
criterion_main!(benches);
