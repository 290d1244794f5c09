//! LMCLUS: Linear Manifold Clustering.
//!
//! # The Algorithm (Haralick & Harpaz, 2005)
//!
//! LMCLUS looks for linear manifolds by sampling. For a candidate manifold
//! dimension `k`, draw `k + 1` points, span a `k`-dimensional affine
//! subspace through them, and histogram the distances of all other points
//! to it. A cluster on (or near) the sampled manifold shows up as a peak of
//! small distances, separated from the rest by a valley.
//!
//! The valley is found with Kittler–Illingworth minimum-error thresholding:
//! for every bin `i`, model the left and right parts of the histogram as
//! Gaussians and evaluate
//!
//! ```text
//!   J(i) = 1 + 2·(P₁(ln σ₁ − ln P₁) + P₂(ln σ₂ − ln P₂))
//! ```
//!
//! Local minima of `J` are candidate thresholds. A candidate's *goodness* is
//! the depth of its valley times the discriminability of the two sides,
//! `(μ₁ − μ₂)² / (σ₁² + σ₂²)`.
//!
//! If the best goodness exceeds the sensitivity threshold, the points below
//! the threshold become the new working set and the search repeats at the
//! same or a higher dimension. The surviving set becomes a cluster and the
//! process restarts on the remaining points. Leftovers form one noise
//! cluster.
//!
//! The dimension-growth loop has no principled stopping rule beyond
//! "goodness too low" and "subset too small"; it is kept as published.
//!
//! ## References
//!
//! Haralick, Harpaz (2005). "Linear Manifold Clustering." MLDM.

use nalgebra::{DMatrix, DVector};
use rand::RngCore;
use tracing::{debug, info, trace, warn};

use crate::cluster::{Cluster, ClusteringAlgorithm, Clustering, DimensionModel};
use crate::error::{Error, Result};
use crate::linalg;
use crate::progress::Progress;
use crate::relation::{PointId, Relation};

use super::make_rng;

/// Histogram resolution of the separation search.
const BINS: usize = 50;

/// Redraws allowed when samples are linearly dependent.
const MAX_RETRIES: usize = 100;

/// Probability that no sample lies entirely within one cluster.
const NOT_FROM_ONE_CLUSTER_PROBABILITY: f64 = 0.2;

/// LMCLUS clustering.
#[derive(Debug, Clone)]
pub struct Lmclus {
    maxdim: Option<usize>,
    minsize: usize,
    sampling_level: usize,
    threshold: f64,
    seed: Option<u64>,
    progress: Progress,
}

impl Lmclus {
    /// Create an LMCLUS run.
    ///
    /// # Arguments
    ///
    /// * `minsize` - Smallest set of points accepted as a cluster.
    /// * `threshold` - Goodness a separation must exceed to be used.
    pub fn new(minsize: usize, threshold: f64) -> Self {
        Self {
            maxdim: None,
            minsize,
            sampling_level: 100,
            threshold,
            seed: None,
            progress: Progress::none(),
        }
    }

    /// Largest manifold dimension searched (default: the data dimensionality).
    pub fn with_maxdim(mut self, maxdim: usize) -> Self {
        self.maxdim = Some(maxdim);
        self
    }

    /// Controls the number of samples per search (default 100).
    pub fn with_sampling_level(mut self, sampling_level: usize) -> Self {
        self.sampling_level = sampling_level;
        self
    }

    /// Seed the sampling for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.minsize == 0 {
            return Err(Error::InvalidParameter {
                name: "minsize",
                message: "must be at least 1",
            });
        }
        if self.sampling_level == 0 {
            return Err(Error::InvalidParameter {
                name: "sampling_level",
                message: "must be at least 1",
            });
        }
        if self.maxdim == Some(0) {
            return Err(Error::InvalidParameter {
                name: "maxdim",
                message: "must be at least 1",
            });
        }
        if self.threshold.is_nan() {
            return Err(Error::InvalidParameter {
                name: "threshold",
                message: "must be a number",
            });
        }
        Ok(())
    }

    /// Number of samples drawn when searching `k`-dimensional manifolds.
    fn sample_count(&self, k: usize, available: usize) -> usize {
        let miss = -(self.sampling_level as f64).powi(-(k as i32));
        let samples = NOT_FROM_ONE_CLUSTER_PROBABILITY.ln() / miss.ln_1p();
        samples.min(available as f64) as usize
    }

    /// Best separation of `current` by a sampled `k`-dimensional manifold.
    ///
    /// `None` when no sample produced a valley in its histogram.
    fn find_separation(
        &self,
        relation: &Relation,
        current: &[PointId],
        k: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Separation>> {
        if current.len() < k + 1 {
            return Ok(None);
        }
        let samples = self.sample_count(k, current.len());
        let weight = 1.0 / current.len() as f64;
        let mut best: Option<Separation> = None;
        let mut remaining_retries = MAX_RETRIES;

        let mut drawn = 0;
        while drawn < samples {
            let sample: Vec<PointId> = rand::seq::index::sample(&mut *rng, current.len(), k + 1)
                .into_iter()
                .map(|i| current[i])
                .collect();
            let origin = relation.get(sample[0]);
            let spans: Vec<DVector<f64>> = sample[1..]
                .iter()
                .map(|&id| relation.get(id) - origin)
                .collect();
            let Some(basis) = linalg::orthonormal_basis(&spans) else {
                if remaining_retries == 0 {
                    return Err(Error::TooManyRetries {
                        retries: MAX_RETRIES,
                    });
                }
                remaining_retries -= 1;
                continue;
            };
            drawn += 1;

            let candidate = Separation {
                goodness: f64::NEG_INFINITY,
                threshold: f64::NEG_INFINITY,
                origin: origin.clone(),
                basis,
            };
            let deviations: Vec<f64> = current
                .iter()
                .copied()
                .filter(|id| !sample.contains(id))
                .map(|id| candidate.deviation(relation.get(id)))
                .collect();
            let Some(histogram) = Histogram::build(&deviations, weight) else {
                continue;
            };
            let Some((bin, goodness)) = evaluate_threshold(&histogram.bins) else {
                continue;
            };
            trace!(k, goodness, bin, "sampled separation");
            if best.as_ref().map_or(true, |b| goodness > b.goodness) {
                best = Some(Separation {
                    goodness,
                    threshold: histogram.right_edge(bin),
                    ..candidate
                });
            }
        }
        Ok(best)
    }
}

/// A sampled manifold and the distance threshold separating points on it.
#[derive(Debug, Clone)]
struct Separation {
    goodness: f64,
    threshold: f64,
    origin: DVector<f64>,
    basis: DMatrix<f64>,
}

impl Separation {
    /// Distance of `x` from the manifold.
    fn deviation(&self, x: &DVector<f64>) -> f64 {
        let diff = x - &self.origin;
        let inside = self.basis.tr_mul(&diff).norm_squared();
        let residual = diff.norm_squared() - inside;
        if residual > 0.0 {
            residual.sqrt()
        } else {
            0.0
        }
    }
}

/// Fixed-width histogram over the observed value range.
#[derive(Debug)]
struct Histogram {
    bins: Vec<f64>,
    lo: f64,
    width: f64,
}

impl Histogram {
    /// `None` for an empty value set.
    fn build(values: &[f64], weight: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (hi - lo) / BINS as f64;
        let mut bins = vec![0.0; BINS];
        for &v in values {
            let bin = if width > 0.0 {
                ((v - lo) / width) as usize
            } else {
                0
            };
            bins[bin.min(BINS - 1)] += weight;
        }
        Some(Self { bins, lo, width })
    }

    fn right_edge(&self, bin: usize) -> f64 {
        self.lo + (bin + 1) as f64 * self.width
    }
}

/// Weighted running mean and variance (West, 1979).
#[derive(Debug, Default, Clone, Copy)]
struct MeanVariance {
    weight: f64,
    mean: f64,
    m2: f64,
}

impl MeanVariance {
    fn put(&mut self, x: f64, w: f64) {
        if w == 0.0 {
            return;
        }
        let total = self.weight + w;
        let delta = x - self.mean;
        self.mean += delta * w / total;
        self.m2 += w * delta * (x - self.mean);
        self.weight = total;
    }

    /// Population standard deviation; NaN without any weight.
    fn stddev(&self) -> f64 {
        if self.weight == 0.0 {
            return f64::NAN;
        }
        (self.m2 / self.weight).sqrt()
    }
}

/// Kittler–Illingworth thresholding of a histogram.
///
/// Returns the best bin and its goodness, or `None` when the criterion has
/// no local minimum. A minimum without a neighboring maximum on either side
/// has infinite depth. NaN criterion values never form a minimum,
/// since every comparison against NaN fails.
fn evaluate_threshold(histogram: &[f64]) -> Option<(usize, f64)> {
    let n = histogram.len();
    if n < 3 {
        return None;
    }
    let mut p1 = vec![0.0; n];
    let mut mu1 = vec![0.0; n];
    let mut sigma1 = vec![0.0; n];
    let mut p2 = vec![0.0; n];
    let mut mu2 = vec![0.0; n];
    let mut sigma2 = vec![0.0; n];

    let (mut acc, mut mv) = (0.0, MeanVariance::default());
    for (i, &h) in histogram.iter().enumerate() {
        acc += h;
        mv.put(i as f64, h);
        p1[i] = acc;
        mu1[i] = mv.mean;
        sigma1[i] = mv.stddev();
    }
    let (mut acc, mut mv) = (0.0, MeanVariance::default());
    for (j, &h) in histogram.iter().enumerate().rev() {
        acc += h;
        mv.put(j as f64, h);
        p2[j] = acc;
        mu2[j] = mv.mean;
        sigma2[j] = mv.stddev();
    }

    let term = |p: f64, sigma: f64| p * (sigma.ln() - p.ln());
    let jt: Vec<f64> = (0..n)
        .map(|i| 1.0 + 2.0 * (term(p1[i], sigma1[i]) + term(p2[i], sigma2[i])))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    let mut best_goodness = f64::NEG_INFINITY;
    let mut dev_prev = jt[1] - jt[0];
    for i in 1..n - 1 {
        let dev_cur = jt[i + 1] - jt[i];
        if dev_cur >= 0.0 && dev_prev <= 0.0 {
            let left = (1..i).rev().find(|&j| jt[j - 1] < jt[j]);
            let right = (i + 1..n.saturating_sub(2)).find(|&j| jt[j + 1] < jt[j]);
            let lowest_maximum = left
                .into_iter()
                .chain(right)
                .map(|j| jt[j])
                .fold(f64::INFINITY, f64::min);
            let depth = lowest_maximum - jt[i];

            let separation = mu1[i] - mu2[i];
            let mut discriminability =
                separation * separation / (sigma1[i] * sigma1[i] + sigma2[i] * sigma2[i]);
            if discriminability.is_nan() {
                discriminability = -1.0;
            }
            let goodness = depth * discriminability;
            if goodness > best_goodness {
                best_goodness = goodness;
                best = Some((i, goodness));
            }
        }
        dev_prev = dev_cur;
    }
    best
}

impl ClusteringAlgorithm for Lmclus {
    type Model = DimensionModel;

    fn run(&self, relation: &Relation) -> Result<Clustering<DimensionModel>> {
        self.validate()?;
        let n = relation.len();
        let dim = relation.dimensionality();
        let maxdim = match self.maxdim {
            Some(m) if m > dim => {
                warn!(maxdim = m, dim, "maxdim exceeds the data dimensionality");
                dim
            }
            Some(m) => m,
            None => dim,
        };
        let mut rng = make_rng(self.seed);

        let mut unclustered: Vec<PointId> = relation.ids().collect();
        let mut result = Clustering::new("LMCLUS Clustering");
        let mut cnum = 0usize;
        while unclustered.len() > self.minsize {
            let mut current = unclustered.clone();
            let mut lm_dim = 1;
            for k in 1..=maxdim {
                loop {
                    let Some(sep) = self.find_separation(relation, &current, k, &mut *rng)? else {
                        break;
                    };
                    if !(sep.goodness > self.threshold) {
                        break;
                    }
                    let subset: Vec<PointId> = current
                        .iter()
                        .copied()
                        .filter(|&id| sep.deviation(relation.get(id)) < sep.threshold)
                        .collect();
                    if subset.len() < self.minsize {
                        break;
                    }
                    debug!(
                        k,
                        goodness = sep.goodness,
                        threshold = sep.threshold,
                        size = subset.len(),
                        "LMCLUS split"
                    );
                    current = subset;
                    lm_dim = k;
                }
            }
            // `current` only ever shrinks, so equal length means no split happened.
            if current.len() < self.minsize || current.len() == unclustered.len() {
                break;
            }

            let mut taken = vec![false; n];
            for &id in &current {
                taken[id] = true;
            }
            unclustered.retain(|&id| !taken[id]);
            debug!(dimensionality = lm_dim, size = current.len(), "LMCLUS cluster");
            result.add_toplevel(Cluster::new(
                format!("cluster_{lm_dim}d_{cnum}"),
                current,
                DimensionModel {
                    dimensionality: lm_dim,
                },
            ));
            cnum += 1;
            self.progress.processed(n - unclustered.len(), n);
        }

        if !unclustered.is_empty() {
            result.add_toplevel(Cluster::noise(
                "noise",
                unclustered,
                DimensionModel {
                    dimensionality: dim,
                },
            ));
        }
        info!(clusters = cnum, points = n, "LMCLUS finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deviation_measures_distance_to_manifold() {
        let sep = Separation {
            goodness: 0.0,
            threshold: 0.0,
            origin: DVector::from_vec(vec![1.0, 1.0, 0.0]),
            basis: linalg::unit_basis(3, 1),
        };
        let x = DVector::from_vec(vec![5.0, 4.0, 4.0]);
        assert!((sep.deviation(&x) - 5.0).abs() < 1e-12);
        assert_eq!(sep.deviation(&DVector::from_vec(vec![-3.0, 1.0, 0.0])), 0.0);
    }

    #[test]
    fn threshold_falls_into_the_valley() {
        let mut h = vec![0.0; BINS];
        for b in &mut h[..8] {
            *b = 0.08;
        }
        for b in &mut h[40..46] {
            *b = 0.05;
        }
        let total: f64 = h.iter().sum();
        for b in &mut h {
            *b /= total;
        }
        let (bin, goodness) = evaluate_threshold(&h).unwrap();
        assert_eq!(bin, 8);
        assert!(goodness > 100.0);
    }

    fn normalized(h: &[f64]) -> Vec<f64> {
        let total: f64 = h.iter().sum();
        h.iter().map(|v| v / total).collect()
    }

    #[test]
    fn deepest_discriminating_minimum_wins() {
        // Minima at bins 2 and 4; bin 4 has no maximum to its right, which
        // must not promote it over the better split at bin 2.
        let h = normalized(&[0.1, 0.5, 0.0, 0.2, 0.0, 0.3]);
        let (bin, goodness) = evaluate_threshold(&h).unwrap();
        assert_eq!(bin, 2);
        assert!((goodness - 5.011247222284059).abs() < 1e-9, "{goodness}");
    }

    #[test]
    fn depth_uses_the_only_neighboring_maximum() {
        let h = normalized(&[0.4, 0.1, 0.0, 0.1, 0.4]);
        let (bin, goodness) = evaluate_threshold(&h).unwrap();
        assert_eq!(bin, 2);
        assert!((goodness - 38.73973704298292).abs() < 1e-9, "{goodness}");
    }

    #[test]
    fn single_spike_has_no_threshold() {
        let mut h = vec![0.0; BINS];
        h[0] = 1.0;
        assert!(evaluate_threshold(&h).is_none());
    }

    #[test]
    fn histogram_of_constant_values_uses_first_bin() {
        let h = Histogram::build(&[2.0, 2.0, 2.0], 0.5).unwrap();
        assert_eq!(h.bins[0], 1.5);
        assert_eq!(h.width, 0.0);
        assert!(Histogram::build(&[], 1.0).is_none());
    }

    #[test]
    fn sample_count_is_capped() {
        let lmclus = Lmclus::new(10, 1.0);
        assert_eq!(lmclus.sample_count(1, 10_000), 160);
        assert_eq!(lmclus.sample_count(2, 300), 300);
    }

    #[test]
    fn identical_points_exhaust_retries() {
        let data = vec![vec![1.0, 2.0, 3.0]; 20];
        let err = Lmclus::new(5, 1.0).with_seed(0).fit_predict(&data).unwrap_err();
        assert!(matches!(err, Error::TooManyRetries { retries: MAX_RETRIES }));
    }

    #[test]
    fn unreachable_threshold_leaves_only_noise() {
        let data: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, (i * i % 7) as f64, (i % 5) as f64])
            .collect();
        let rel = Relation::new(&data).unwrap();
        let clustering = Lmclus::new(5, f64::INFINITY)
            .with_seed(1)
            .run(&rel)
            .unwrap();
        assert_eq!(clustering.len(), 1);
        let noise = clustering.cluster(0);
        assert!(noise.is_noise());
        assert_eq!(noise.len(), 40);
        assert_eq!(noise.model().dimensionality, 3);
    }

    #[test]
    fn invalid_parameters() {
        let data = vec![vec![0.0, 1.0]; 10];
        assert!(Lmclus::new(0, 1.0).fit_predict(&data).is_err());
        assert!(Lmclus::new(3, f64::NAN).fit_predict(&data).is_err());
        assert!(Lmclus::new(3, 1.0).with_maxdim(0).fit_predict(&data).is_err());
        assert!(Lmclus::new(3, 1.0)
            .with_sampling_level(0)
            .fit_predict(&data)
            .is_err());
    }
}
