//! Lloyd's k-means.

use clap::{Parser, ValueEnum};
use rand::{
    Rng, SeedableRng,
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    seq::index,
};
use rayon::prelude::*;
use tracing::debug;
use ttm_core::{Matrix, Result, TtmError, parse_method_args};

use super::Clusterer;
use crate::distance::squared_euclidean;

/// Centroid initialisation strategy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Init {
    /// Spread initial centroids by squared-distance weighted sampling.
    #[default]
    #[value(name = "k-means++")]
    KMeansPlusPlus,
    /// Pick distinct rows uniformly at random.
    Random,
}

#[derive(Debug, Parser)]
#[command(about = "Partition rows with Lloyd's k-means")]
struct KMeansArgs {
    /// Number of clusters to produce.
    #[arg(long, default_value_t = 10)]
    clusters: usize,
    /// Centroid initialisation.
    #[arg(long, value_enum, default_value_t = Init::KMeansPlusPlus)]
    init: Init,
    /// Upper bound on Lloyd iterations.
    #[arg(long, default_value_t = 300)]
    max_iter: usize,
    /// Seed for centroid initialisation.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Lloyd iterations under squared Euclidean distance.
///
/// The assignment step runs in parallel over rows. Iteration stops when no
/// assignment changes or after `max_iter` rounds. A centroid that loses all
/// its rows keeps its previous position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KMeans {
    clusters: usize,
    init: Init,
    max_iter: usize,
    seed: u64,
}

impl KMeans {
    /// Partition into `clusters` clusters.
    #[must_use]
    pub const fn new(clusters: usize, init: Init, max_iter: usize, seed: u64) -> Self {
        Self {
            clusters,
            init,
            max_iter,
            seed,
        }
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: KMeansArgs = parse_method_args("kmeans", args)?;
        if parsed.clusters == 0 {
            return Err(TtmError::config("kmeans", "--clusters must be at least 1"));
        }
        Ok(Self::new(parsed.clusters, parsed.init, parsed.max_iter, parsed.seed))
    }

    fn initial_centroids(&self, vectors: &Matrix, rng: &mut StdRng) -> Matrix {
        let chosen = match self.init {
            Init::Random => index::sample(rng, vectors.rows(), self.clusters).into_vec(),
            Init::KMeansPlusPlus => plus_plus(vectors, self.clusters, rng),
        };
        let data = chosen
            .iter()
            .flat_map(|&row| vectors.row(row).iter().copied())
            .collect();
        Matrix::from_flat(self.clusters, vectors.cols(), data)
            .unwrap_or_else(|| Matrix::zeros(self.clusters, vectors.cols()))
    }
}

fn plus_plus(vectors: &Matrix, clusters: usize, rng: &mut StdRng) -> Vec<usize> {
    let rows = vectors.rows();
    let mut chosen = vec![rng.gen_range(0..rows)];
    let mut nearest: Vec<f64> = vectors
        .iter_rows()
        .map(|row| squared_euclidean(row, vectors.row(chosen[0])))
        .collect();
    while chosen.len() < clusters {
        let next = match WeightedIndex::new(&nearest) {
            Ok(weights) => weights.sample(rng),
            // Every row already coincides with a centroid.
            Err(_) => rng.gen_range(0..rows),
        };
        chosen.push(next);
        for (distance, row) in nearest.iter_mut().zip(vectors.iter_rows()) {
            *distance = distance.min(squared_euclidean(row, vectors.row(next)));
        }
    }
    chosen
}

fn nearest_centroid(centroids: &Matrix, row: &[f64]) -> usize {
    centroids
        .iter_rows()
        .map(|centroid| squared_euclidean(centroid, row))
        .enumerate()
        .min_by(|left, right| left.1.total_cmp(&right.1))
        .map_or(0, |(index, _)| index)
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "centroids are floating-point means"
)]
fn update_centroids(vectors: &Matrix, labels: &[usize], centroids: &mut Matrix) {
    let mut sums = Matrix::zeros(centroids.rows(), centroids.cols());
    let mut counts = vec![0_usize; centroids.rows()];
    for (row, &label) in vectors.iter_rows().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums.row_mut(label).iter_mut().zip(row) {
            *sum += value;
        }
    }
    for (cluster, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let count = count as f64;
        for (centroid, sum) in centroids.row_mut(cluster).iter_mut().zip(sums.row(cluster)) {
            *centroid = sum / count;
        }
    }
}

impl Clusterer for KMeans {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    #[expect(clippy::cast_possible_wrap, reason = "cluster counts fit in i64")]
    fn cluster(&self, vectors: &Matrix) -> Result<Vec<i64>> {
        let rows = vectors.rows();
        if rows == 0 {
            return Ok(Vec::new());
        }
        if rows < self.clusters {
            return Err(TtmError::algorithm(
                "kmeans",
                format!("cannot form {} clusters from {rows} rows", self.clusters),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.initial_centroids(vectors, &mut rng);
        let mut labels: Vec<usize> = Vec::new();
        for iteration in 0..self.max_iter.max(1) {
            let next: Vec<usize> = (0..rows)
                .into_par_iter()
                .map(|row| nearest_centroid(&centroids, vectors.row(row)))
                .collect();
            if next == labels {
                debug!(iterations = iteration, "k-means converged");
                break;
            }
            labels = next;
            update_centroids(vectors, &labels, &mut centroids);
        }
        Ok(labels.into_iter().map(|label| label as i64).collect())
    }
}
