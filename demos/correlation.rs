//! COPAC, ERiC and ORCLUS on two crossing lines in 3-D.
//!
//! Run with `RUST_LOG=corrclust=debug` to see per-step diagnostics.

use corrclust::cluster::ClusteringAlgorithm;
use corrclust::correlation::{Copac, Eric, Orclus};
use corrclust::{Relation, NOISE};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("corrclust=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Two lines that pass close to each other, plus a few stray points.
    let mut data: Vec<Vec<f64>> = Vec::new();
    for i in 0..40 {
        let t = i as f64 * 0.25 - 5.0;
        data.push(vec![t, t, 0.0]);
    }
    for i in 0..40 {
        let t = i as f64 * 0.25 - 5.0;
        data.push(vec![t, -t, 1.0]);
    }
    data.push(vec![8.0, -3.0, 6.0]);
    data.push(vec![-7.0, 4.0, -5.0]);
    let relation = Relation::new(&data)?;

    // --- COPAC (k=8, eps=0.2, minpts=5) ---
    let copac = Copac::new(8, 0.2, 5).run(&relation)?;
    println!("=== {} ===", copac.name());
    for c in copac.clusters() {
        println!(
            "  {:10} size {:3}  dimensionality {}",
            c.name(),
            c.len(),
            c.model().dimensionality
        );
    }

    // --- ERiC (k=8, minpts=5) ---
    let eric = Eric::new(8, 5).run(&relation)?;
    println!("\n=== {} ===", eric.name());
    for (idx, c) in eric.clusters().iter().enumerate() {
        let parents: Vec<&str> = eric
            .parents(idx)
            .iter()
            .map(|&p| eric.cluster(p).name())
            .collect();
        println!(
            "  {:10} size {:3}  dimensionality {}  parents {:?}",
            c.name(),
            c.len(),
            c.model().dimensionality(),
            parents
        );
    }

    // --- ORCLUS (k=2, l=2) ---
    let labels = Orclus::new(2, 2).with_k_i(5).with_seed(42).fit_predict(&data)?;
    println!("\n=== ORCLUS (k=2, l=2) ===");
    for (i, label) in labels.iter().enumerate().step_by(10) {
        let tag = if *label == NOISE {
            "NOISE".to_string()
        } else {
            format!("cluster {}", label)
        };
        println!("  point {:2} {:?} => {}", i, data[i], tag);
    }
    Ok(())
}
