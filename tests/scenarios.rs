//! End-to-end runs on synthetic data with known structure.

use std::sync::{Arc, Mutex};

use corrclust::cluster::{ClusteringAlgorithm, Dbscan, NOISE};
use corrclust::correlation::{Copac, Eric, Lmclus, Orclus};
use corrclust::{Progress, ProgressEvent, Relation};
use rand::prelude::*;
use rand_distr::Normal;

/// Line A along x, line B parallel to y through (5, ·, 5), and 20 points
/// scattered far away.
fn two_lines_with_noise() -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(11);
    let mut data = Vec::new();
    for i in 0..100 {
        data.push(vec![i as f64 * 0.1, 0.0, 0.0]);
    }
    for i in 0..100 {
        data.push(vec![5.0, i as f64 * 0.1, 5.0]);
    }
    for _ in 0..20 {
        data.push((0..3).map(|_| rng.random_range(20.0..30.0)).collect());
    }
    data
}

#[test]
fn eric_finds_two_lines_below_noise() {
    let rel = Relation::new(&two_lines_with_noise()).unwrap();
    let clustering = Eric::new(20, 10).run(&rel).unwrap();

    assert_eq!(clustering.toplevel().len(), 1);
    let top = clustering.toplevel()[0];
    let noise = clustering.cluster(top);
    assert!(noise.is_noise());
    assert_eq!(noise.name(), "[noise]");
    assert_eq!(noise.model().dimensionality(), 3);
    assert!((200..220).all(|id| noise.ids().contains(&id)));

    let lines: Vec<usize> = (0..clustering.len())
        .filter(|&i| !clustering.cluster(i).is_noise())
        .collect();
    assert_eq!(lines.len(), 2);
    for &i in &lines {
        let c = clustering.cluster(i);
        assert_eq!(c.model().dimensionality(), 1);
        assert_eq!(c.len(), 100);
        assert_eq!(clustering.parents(i), &[top]);
    }
    let mut children = clustering.children(top).to_vec();
    children.sort_unstable();
    assert_eq!(children, lines);
}

/// Three lines in 5-D, each along a different axis around a different centre.
fn three_lines(rng: &mut StdRng) -> (Vec<Vec<f64>>, Vec<usize>) {
    let jitter = Normal::new(0.0, 0.01).unwrap();
    let centres = [
        [0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 10.0, 10.0, 10.0],
        [0.0, 0.0, -10.0, -10.0, -10.0],
    ];
    let mut data = Vec::new();
    let mut truth = Vec::new();
    for (axis, centre) in centres.iter().enumerate() {
        for _ in 0..60 {
            let mut p: Vec<f64> = centre.iter().map(|c| c + rng.sample(jitter)).collect();
            p[axis] = centre[axis] + rng.random_range(-5.0..5.0);
            data.push(p);
            truth.push(axis);
        }
    }
    (data, truth)
}

#[test]
fn orclus_recovers_three_projected_clusters() {
    let mut rng = StdRng::seed_from_u64(5);
    let (data, truth) = three_lines(&mut rng);
    let rel = Relation::new(&data).unwrap();
    // Each line is tight in four directions, so l = 4 is its defining subspace.
    let clustering = Orclus::new(3, 4).with_k_i(5).with_seed(5).run(&rel).unwrap();
    assert_eq!(clustering.len(), 3);

    let mut correct = 0;
    for c in clustering.clusters() {
        assert_eq!(c.model().basis.shape(), (5, 4));
        let mut counts = [0usize; 3];
        for &id in c.ids() {
            counts[truth[id]] += 1;
        }
        correct += counts.iter().max().copied().unwrap_or(0);
    }
    let purity = correct as f64 / data.len() as f64;
    assert!(purity >= 0.95, "purity {purity}");
}

#[test]
fn lmclus_finds_plane_in_ten_dimensions() {
    let mut rng = StdRng::seed_from_u64(3);
    let jitter = Normal::new(0.0, 0.1).unwrap();
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let mut data = Vec::new();
    for _ in 0..200 {
        let a: f64 = rng.random_range(-10.0..10.0);
        let b: f64 = rng.random_range(-10.0..10.0);
        let mut p: Vec<f64> = (0..10).map(|_| rng.sample(jitter)).collect();
        p[0] += a * s;
        p[1] += a * s;
        p[2] += b * s;
        p[3] += b * s;
        data.push(p);
    }
    for _ in 0..100 {
        data.push((0..10).map(|_| rng.random_range(-10.0..10.0)).collect());
    }
    let rel = Relation::new(&data).unwrap();

    let clustering = Lmclus::new(50, 20.0)
        .with_maxdim(3)
        .with_sampling_level(100)
        .with_seed(9)
        .run(&rel)
        .unwrap();
    let found: Vec<_> = clustering.non_noise().collect();
    assert_eq!(found.len(), 1);
    let plane = found[0];
    assert_eq!(plane.model().dimensionality, 2);
    assert!(plane.len() >= 50);
    let on_plane = plane.ids().iter().filter(|&&id| id < 200).count();
    assert!(on_plane as f64 >= 0.9 * plane.len() as f64);
}

#[test]
fn copac_rotated_plane_is_one_cluster() {
    let s2 = 2f64.sqrt();
    let s6 = 6f64.sqrt();
    let u = [1.0 / s2, 1.0 / s2, 0.0];
    let v = [-1.0 / s6, 1.0 / s6, 2.0 / s6];
    let mut data: Vec<Vec<f64>> = Vec::new();
    for a in 0..11 {
        for b in 0..11 {
            let (a, b) = (a as f64, b as f64);
            data.push(
                (0..3)
                    .map(|i| [1.0, 2.0, 3.0][i] + a * u[i] + b * v[i])
                    .collect(),
            );
        }
    }
    let rel = Relation::new(&data).unwrap();
    let clustering = Copac::new(10, 0.5, 1).run(&rel).unwrap();
    assert_eq!(clustering.len(), 1);
    let plane = clustering.cluster(0);
    assert!(!plane.is_noise());
    assert_eq!(plane.len(), 121);
    assert_eq!(plane.model().dimensionality, 2);
}

#[test]
fn unreachable_density_is_all_noise() {
    let data = two_lines_with_noise();
    let labels = Dbscan::new(0.5, 500).fit_predict(&data).unwrap();
    assert!(labels.iter().all(|&l| l == NOISE));

    let rel = Relation::new(&data).unwrap();
    let clustering = Copac::new(10, 0.1, 500).run(&rel).unwrap();
    assert_eq!(clustering.len(), 1);
    assert!(clustering.cluster(0).is_noise());
    assert_eq!(clustering.cluster(0).len(), data.len());
}

#[test]
fn progress_reports_steps_and_completion() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let progress = Progress::new(move |e| sink.lock().unwrap().push(*e));

    let data = two_lines_with_noise();
    Eric::new(20, 10)
        .with_progress(progress)
        .fit_predict(&data)
        .unwrap();

    let events = events.lock().unwrap();
    let steps: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Step { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
    assert!(events.contains(&ProgressEvent::Processed {
        done: data.len(),
        total: data.len()
    }));
}
