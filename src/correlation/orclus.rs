//! ORCLUS: arbitrarily ORiented projected CLUSter generation.
//!
//! # The Algorithm (Aggarwal & Yu, 2000)
//!
//! ORCLUS is k-means in shrinking, per-cluster subspaces. It starts with
//! `k₀ = k_i · k` random seeds that use the full space, then repeats:
//!
//! 1. Assign every point to the seed with the smallest *projected distance*
//!    `‖Bᵀo − Bᵀc‖²`, where `B` holds the seed's basis vectors.
//! 2. Replace each basis by the `dim_c` least-variance eigenvectors of its
//!    cluster: the directions in which the cluster is compact.
//! 3. Shrink: `k_c ← max(k, ⌊α·k_c⌋)`, `dim_c ← max(l, ⌊β·dim_c⌋)`, with β
//!    chosen so both reach their targets in the same number of rounds.
//! 4. Merge the pair whose union has the smallest *projected energy* (mean
//!    squared projected distance to the union's centroid) until `k_c` seeds
//!    remain.
//!
//! A final assignment produces the clusters, each reported with its
//! centroid and basis.
//!
//! ## References
//!
//! Aggarwal, Yu (2000). "Finding Generalized Projected Clusters in High
//! Dimensional Spaces." SIGMOD.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, trace};

use crate::cluster::{Cluster, ClusteringAlgorithm, Clustering, SubspaceModel};
use crate::error::{Error, Result};
use crate::linalg;
use crate::pca::PcaRunner;
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

use super::make_rng;

/// ORCLUS clustering.
#[derive(Debug, Clone)]
pub struct Orclus {
    k: usize,
    k_i: usize,
    l: usize,
    alpha: f64,
    seed: Option<u64>,
    progress: Progress,
}

impl Orclus {
    /// Find `k` clusters on `l`-dimensional projected subspaces.
    pub fn new(k: usize, l: usize) -> Self {
        Self {
            k,
            k_i: 30,
            l,
            alpha: 0.5,
            seed: None,
            progress: Progress::none(),
        }
    }

    /// Initial seeds per requested cluster (default 30).
    pub fn with_k_i(mut self, k_i: usize) -> Self {
        self.k_i = k_i;
        self
    }

    /// Seed reduction factor per round, in `(0, 1)` (default 0.5).
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Seed the random seed selection for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn validate(&self, relation: &Relation) -> Result<()> {
        for (name, value) in [("k", self.k), ("k_i", self.k_i), ("l", self.l)] {
            if value == 0 {
                return Err(Error::InvalidParameter {
                    name,
                    message: "must be at least 1",
                });
            }
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: "must be in (0, 1)",
            });
        }
        let dim = relation.dimensionality();
        if dim < self.l {
            return Err(Error::DimensionalityTooSmall {
                dimensionality: dim,
                required: self.l,
            });
        }
        if self.k > relation.len() {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: relation.len(),
            });
        }
        Ok(())
    }
}

/// A cluster seed: members, centroid and projection basis (as columns).
#[derive(Debug, Clone)]
struct Seed {
    ids: Vec<PointId>,
    centroid: DVector<f64>,
    basis: DMatrix<f64>,
}

impl Seed {
    fn projected_distance_sq(&self, o: &DVector<f64>) -> f64 {
        (self.basis.tr_mul(o) - self.basis.tr_mul(&self.centroid)).norm_squared()
    }
}

/// Projected energy of merging seeds `a < b`.
#[derive(Debug)]
struct Energy {
    a: usize,
    b: usize,
    union: Seed,
    energy: f64,
}

/// The `dim` least-variance directions of the named points.
fn find_basis(relation: &Relation, ids: &[PointId], dim: usize) -> DMatrix<f64> {
    let d = relation.dimensionality();
    match PcaRunner::new().process_ids(relation, ids) {
        Ok(res) => res.eigenvectors().columns(d - dim, dim).into_owned(),
        Err(_) => linalg::unit_basis(d, dim),
    }
}

fn union(relation: &Relation, a: &Seed, b: &Seed, dim: usize) -> Seed {
    let mut ids: Vec<PointId> = a.ids.iter().chain(&b.ids).copied().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Seed {
            ids,
            centroid: (&a.centroid + &b.centroid) * 0.5,
            basis: linalg::unit_basis(relation.dimensionality(), dim),
        };
    }
    let centroid = relation.centroid(&ids);
    let basis = find_basis(relation, &ids, dim);
    Seed {
        ids,
        centroid,
        basis,
    }
}

fn projected_energy(
    relation: &Relation,
    a: usize,
    b: usize,
    sa: &Seed,
    sb: &Seed,
    dim: usize,
) -> Energy {
    let union = union(relation, sa, sb, dim);
    let energy = if union.ids.is_empty() {
        f64::INFINITY
    } else {
        let sum: f64 = union
            .ids
            .iter()
            .map(|&id| union.projected_distance_sq(relation.get(id)))
            .sum();
        sum / union.ids.len() as f64
    };
    Energy {
        a,
        b,
        union,
        energy,
    }
}

/// Assign every point to its closest live seed and recompute centroids.
fn assign(relation: &Relation, seeds: &mut [Option<Seed>]) {
    for seed in seeds.iter_mut().flatten() {
        seed.ids.clear();
    }
    let projected: Vec<Option<DVector<f64>>> = seeds
        .iter()
        .map(|s| s.as_ref().map(|s| s.basis.tr_mul(&s.centroid)))
        .collect();

    for id in relation.ids() {
        let o = relation.get(id);
        let mut best: Option<(usize, f64)> = None;
        for (handle, seed) in seeds.iter().enumerate() {
            let (Some(seed), Some(pc)) = (seed, &projected[handle]) else {
                continue;
            };
            let dist = (seed.basis.tr_mul(o) - pc).norm_squared();
            match best {
                Some((_, d)) if !(dist < d) => {}
                _ => best = Some((handle, dist)),
            }
        }
        if let Some((handle, _)) = best {
            if let Some(seed) = seeds[handle].as_mut() {
                seed.ids.push(id);
            }
        }
    }

    for seed in seeds.iter_mut().flatten() {
        if !seed.ids.is_empty() {
            seed.centroid = relation.centroid(&seed.ids);
        }
    }
}

fn live_handles(seeds: &[Option<Seed>]) -> Vec<usize> {
    seeds
        .iter()
        .enumerate()
        .filter_map(|(h, s)| s.as_ref().map(|_| h))
        .collect()
}

/// Merge live seeds by smallest projected energy until `k_new` remain.
fn merge(relation: &Relation, seeds: &mut [Option<Seed>], k_new: usize, dim: usize) {
    let handles = live_handles(seeds);
    let mut energies = Vec::with_capacity(handles.len() * handles.len().saturating_sub(1) / 2);
    for (i, &a) in handles.iter().enumerate() {
        for &b in &handles[i + 1..] {
            if let (Some(sa), Some(sb)) = (&seeds[a], &seeds[b]) {
                energies.push(projected_energy(relation, a, b, sa, sb, dim));
            }
        }
    }

    let mut remaining = handles.len();
    while remaining > k_new {
        let Some(pos) = energies
            .iter()
            .enumerate()
            .min_by(|(_, x), (_, y)| {
                x.energy
                    .total_cmp(&y.energy)
                    .then(x.a.cmp(&y.a))
                    .then(x.b.cmp(&y.b))
            })
            .map(|(pos, _)| pos)
        else {
            break;
        };
        let Energy { a, b, union, energy } = energies.swap_remove(pos);
        trace!(a, b, energy, size = union.ids.len(), "merging seeds");

        // The union takes over handle `a`; `b` is retired.
        seeds[a] = Some(union);
        seeds[b] = None;
        remaining -= 1;
        energies.retain(|e| e.a != a && e.a != b && e.b != a && e.b != b);

        for other in live_handles(seeds) {
            if other == a {
                continue;
            }
            let (lo, hi) = if other < a { (other, a) } else { (a, other) };
            if let (Some(sl), Some(sh)) = (&seeds[lo], &seeds[hi]) {
                energies.push(projected_energy(relation, lo, hi, sl, sh, dim));
            }
        }
    }
}

impl ClusteringAlgorithm for Orclus {
    type Model = SubspaceModel;

    fn run(&self, relation: &Relation) -> Result<Clustering<SubspaceModel>> {
        self.validate(relation)?;
        let n = relation.len();
        let mut dim_c = relation.dimensionality();
        let mut k_c = n.min(self.k_i.saturating_mul(self.k));

        let mut rng = make_rng(self.seed);
        let mut seeds: Vec<Option<Seed>> = rand::seq::index::sample(&mut *rng, n, k_c)
            .into_vec()
            .into_iter()
            .map(|id| {
                Some(Seed {
                    ids: vec![id],
                    centroid: relation.get(id).clone(),
                    basis: linalg::unit_basis(dim_c, dim_c),
                })
            })
            .collect();

        let beta = if k_c > self.k {
            (-(dim_c as f64 / self.l as f64).ln() * (1.0 / self.alpha).ln()
                / (k_c as f64 / self.k as f64).ln())
            .exp()
        } else {
            1.0
        };
        debug!(seeds = k_c, beta, "ORCLUS initialized");

        let total = k_c - self.k;
        while k_c > self.k {
            assign(relation, &mut seeds);
            for seed in seeds.iter_mut().flatten() {
                if !seed.ids.is_empty() {
                    seed.basis = find_basis(relation, &seed.ids, dim_c);
                }
            }

            k_c = self.k.max((k_c as f64 * self.alpha) as usize);
            dim_c = self.l.max((dim_c as f64 * beta) as usize);
            merge(relation, &mut seeds, k_c, dim_c);
            debug!(seeds = k_c, dimensionality = dim_c, "ORCLUS round done");
            self.progress.processed(total - (k_c - self.k), total);
        }
        assign(relation, &mut seeds);

        let mut result = Clustering::new("ORCLUS Clustering");
        for seed in seeds.into_iter().flatten() {
            if seed.ids.is_empty() {
                continue;
            }
            let name = format!("cluster_{}", result.len());
            let model = SubspaceModel {
                centroid: seed.centroid,
                basis: seed.basis,
            };
            result.add_toplevel(Cluster::new(name, seed.ids, model));
        }
        info!(
            clusters = result.len(),
            points = n,
            dimensionality = dim_c,
            "ORCLUS finished"
        );
        Ok(result)
    }
}
