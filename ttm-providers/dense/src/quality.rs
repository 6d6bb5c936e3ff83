//! Clustering quality metrics reported by `ttm eval`.
//!
//! The noise label `-1` is not special here: it counts as one more cluster.
//! Scores that need at least two clusters, and fewer clusters than rows,
//! return `None` when that does not hold so reports can print them as
//! undefined.

use std::collections::HashMap;
use std::hash::BuildHasher;

use rand::{SeedableRng, rngs::StdRng, seq::index::sample};
use rayon::prelude::*;
use ttm_core::{Matrix, Result, SchemaError, TtmError};

use crate::distance::{Metric, squared_euclidean};

/// Fraction of rows sampled for the silhouette coefficient by default.
pub const DEFAULT_SILHOUETTE_FRACTION: f64 = 0.2;

/// Relative cluster sizes, largest first.
///
/// Clusters of equal size keep the order in which they first appear.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterDistribution {
    shares: Vec<(String, f64)>,
}

impl ClusterDistribution {
    /// Count `labels` and normalise the counts to shares of the total.
    ///
    /// # Examples
    /// ```
    /// use ttm_providers_dense::quality::ClusterDistribution;
    ///
    /// let distribution = ClusterDistribution::from_labels(&["b", "a", "a", "a"]);
    /// let shares: Vec<_> = distribution.iter().collect();
    /// assert_eq!(shares, vec![("a", 0.75), ("b", 0.25)]);
    /// ```
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "shares are relative frequencies"
    )]
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for label in labels {
            let label = label.as_ref();
            if let Some(&slot) = slots.get(label) {
                counts[slot].1 += 1;
            } else {
                slots.insert(label, counts.len());
                counts.push((label.to_owned(), 1));
            }
        }
        counts.sort_by(|left, right| right.1.cmp(&left.1));
        let total = labels.len() as f64;
        Self {
            shares: counts
                .into_iter()
                .map(|(label, count)| (label, count as f64 / total))
                .collect(),
        }
    }

    /// Wrap shares that were computed elsewhere, keeping their order.
    #[must_use]
    pub const fn from_shares(shares: Vec<(String, f64)>) -> Self {
        Self { shares }
    }

    /// Number of distinct clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Whether no labels were counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// `(label, share)` pairs, largest share first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, f64)> + '_ {
        self.shares.iter().map(|(label, share)| (label.as_str(), *share))
    }

    /// Probability that two documents drawn at random share a cluster when
    /// documents are assigned to buckets of these sizes at random.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "sum of squared shares")]
    pub fn bucket_probability(&self) -> f64 {
        self.shares.iter().map(|(_, share)| share * share).sum()
    }
}

/// An observed rate rescaled so that chance agreement maps to zero.
///
/// `score = (observed - expected) / (1 - expected)` and
/// `zoom = 1 / (1 - expected)`. The zoom starts at one and grows as the
/// expected rate approaches one; large values point at lopsided clusters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChanceAdjusted {
    /// Chance-adjusted rate; zero is chance level, one is perfect.
    pub score: f64,
    /// Scale factor applied by the adjustment.
    pub zoom: f64,
}

impl ChanceAdjusted {
    /// Adjust `observed` for the `expected` chance rate; `None` when the
    /// expected rate is one and the adjustment is undefined.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "chance adjustment")]
    pub fn new(observed: f64, expected: f64) -> Option<Self> {
        let headroom = 1.0 - expected;
        (headroom > 0.0).then(|| Self {
            score: (observed - expected) / headroom,
            zoom: 1.0 / headroom,
        })
    }
}

/// Mean silhouette coefficient of a random sample of rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Silhouette {
    /// Mean coefficient in `[-1, 1]`.
    pub score: f64,
    /// Number of rows sampled.
    pub samples: usize,
}

/// Labels mapped onto dense cluster indices.
struct Partition {
    assignment: Vec<usize>,
    sizes: Vec<usize>,
}

impl Partition {
    fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut sizes = Vec::new();
        let assignment = labels
            .iter()
            .map(|label| {
                let next = slots.len();
                let slot = *slots.entry(label.as_ref()).or_insert(next);
                if slot == sizes.len() {
                    sizes.push(0);
                }
                sizes[slot] += 1;
                slot
            })
            .collect();
        Self { assignment, sizes }
    }

    fn clusters(&self) -> usize {
        self.sizes.len()
    }

    /// Scores are defined for `2 <= clusters < rows`.
    fn scorable(&self) -> bool {
        (2..self.assignment.len()).contains(&self.clusters())
    }

    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "centroids are component means"
    )]
    fn centroids(&self, vectors: &Matrix) -> Matrix {
        let mut centroids = Matrix::zeros(self.clusters(), vectors.cols());
        for (row, &cluster) in vectors.iter_rows().zip(&self.assignment) {
            for (sum, value) in centroids.row_mut(cluster).iter_mut().zip(row) {
                *sum += value;
            }
        }
        for (cluster, &size) in self.sizes.iter().enumerate() {
            for value in centroids.row_mut(cluster) {
                *value /= size as f64;
            }
        }
        centroids
    }
}

fn partition<S: AsRef<str>>(vectors: &Matrix, labels: &[S]) -> Result<Partition> {
    if labels.len() != vectors.rows() {
        return Err(SchemaError::ValueCountMismatch {
            column: "cluster".to_owned(),
            expected: vectors.rows(),
            actual: labels.len(),
        }
        .into());
    }
    Ok(Partition::new(labels))
}

/// Caliński–Harabasz score: between-cluster dispersion over within-cluster
/// dispersion, each normalised by its degrees of freedom. Higher is better.
///
/// # Errors
/// Returns [`SchemaError::ValueCountMismatch`] when `labels` and `vectors`
/// disagree on the number of rows.
#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "dispersion ratios are floating point"
)]
pub fn calinski_harabasz<S: AsRef<str>>(vectors: &Matrix, labels: &[S]) -> Result<Option<f64>> {
    let partition = partition(vectors, labels)?;
    if !partition.scorable() {
        return Ok(None);
    }
    let centroids = partition.centroids(vectors);
    let whole = Partition {
        assignment: vec![0; vectors.rows()],
        sizes: vec![vectors.rows()],
    }
    .centroids(vectors);
    let mean = whole.row(0);

    let between: f64 = centroids
        .iter_rows()
        .zip(&partition.sizes)
        .map(|(centroid, &size)| size as f64 * squared_euclidean(centroid, mean))
        .sum();
    let within: f64 = vectors
        .iter_rows()
        .zip(&partition.assignment)
        .map(|(row, &cluster)| squared_euclidean(row, centroids.row(cluster)))
        .sum();
    if within == 0.0 {
        return Ok(Some(1.0));
    }
    let rows = vectors.rows() as f64;
    let clusters = partition.clusters() as f64;
    Ok(Some(between * (rows - clusters) / (within * (clusters - 1.0))))
}

/// Davies–Bouldin score: the mean over clusters of the worst ratio of summed
/// scatter to centroid separation. Zero is the lower bound; lower is better.
///
/// # Errors
/// Returns [`SchemaError::ValueCountMismatch`] when `labels` and `vectors`
/// disagree on the number of rows.
#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "scatter ratios are floating point"
)]
pub fn davies_bouldin<S: AsRef<str>>(vectors: &Matrix, labels: &[S]) -> Result<Option<f64>> {
    let partition = partition(vectors, labels)?;
    if !partition.scorable() {
        return Ok(None);
    }
    let centroids = partition.centroids(vectors);
    let mut scatter = vec![0.0; partition.clusters()];
    for (row, &cluster) in vectors.iter_rows().zip(&partition.assignment) {
        scatter[cluster] += Metric::Euclidean.distance(row, centroids.row(cluster));
    }
    for (value, &size) in scatter.iter_mut().zip(&partition.sizes) {
        *value /= size as f64;
    }

    let clusters = partition.clusters();
    let mut separations = Vec::with_capacity(clusters * clusters);
    for left in 0..clusters {
        for right in 0..clusters {
            separations.push(Metric::Euclidean.distance(centroids.row(left), centroids.row(right)));
        }
    }
    let negligible = |value: &f64| value.abs() <= 1e-8;
    if scatter.iter().all(negligible) || separations.iter().all(negligible) {
        return Ok(Some(0.0));
    }

    let worst_sum: f64 = (0..clusters)
        .map(|left| {
            (0..clusters)
                .filter(|&right| right != left)
                .filter_map(|right| {
                    let separation = separations[left * clusters + right];
                    // Coincident centroids contribute nothing.
                    (separation > 0.0).then(|| (scatter[left] + scatter[right]) / separation)
                })
                .fold(0.0, f64::max)
        })
        .sum();
    Ok(Some(worst_sum / clusters as f64))
}

/// Number of rows sampled for a silhouette `fraction` of `rows`, rounding
/// halves to even.
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_arithmetic,
    reason = "sample counts are rounded fractions of the row count"
)]
pub fn silhouette_sample_count(rows: usize, fraction: f64) -> usize {
    let count = (rows as f64 * fraction).round_ties_even();
    if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    }
}

/// Mean silhouette coefficient over a seeded random sample of
/// `round(rows × fraction)` rows.
///
/// Distances are only taken within the sample. A sampled row alone in its
/// cluster scores zero. Returns `None` when the sample is empty, larger than
/// the table, or does not hold between two and `samples - 1` clusters.
///
/// # Errors
/// Returns [`SchemaError::ValueCountMismatch`] when `labels` and `vectors`
/// disagree on the number of rows.
#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "silhouette coefficients are mean distance ratios"
)]
pub fn silhouette<S: AsRef<str>>(
    vectors: &Matrix,
    labels: &[S],
    metric: Metric,
    fraction: f64,
    seed: u64,
) -> Result<Option<Silhouette>> {
    partition(vectors, labels)?;
    let rows = vectors.rows();
    let samples = silhouette_sample_count(rows, fraction);
    if samples == 0 || samples > rows {
        return Ok(None);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = sample(&mut rng, rows, samples).into_vec();
    picked.sort_unstable();
    let sampled = vectors.select_rows(|row| picked.binary_search(&row).is_ok());
    let sampled_labels: Vec<&str> = picked.iter().map(|&row| labels[row].as_ref()).collect();
    let partition = Partition::new(&sampled_labels);
    if !partition.scorable() {
        return Ok(None);
    }

    let total: f64 = (0..samples)
        .into_par_iter()
        .map(|row| {
            let own = partition.assignment[row];
            if partition.sizes[own] == 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; partition.clusters()];
            for (other, &cluster) in partition.assignment.iter().enumerate() {
                sums[cluster] += metric.distance(sampled.row(row), sampled.row(other));
            }
            let cohesion = sums[own] / (partition.sizes[own] - 1) as f64;
            let separation = sums
                .iter()
                .zip(&partition.sizes)
                .enumerate()
                .filter(|&(cluster, _)| cluster != own)
                .map(|(_, (sum, &size))| sum / size as f64)
                .fold(f64::INFINITY, f64::min);
            let scale = cohesion.max(separation);
            if scale > 0.0 {
                (separation - cohesion) / scale
            } else {
                0.0
            }
        })
        .sum();
    Ok(Some(Silhouette {
        score: total / samples as f64,
        samples,
    }))
}

/// Fraction of consecutive-page pairs whose documents share a cluster.
///
/// `clusters` maps document ids to cluster labels.
///
/// # Errors
/// Returns [`TtmError::Algorithm`] when `pairs` is empty or names a document
/// missing from `clusters`.
#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "the count is a rate"
)]
pub fn psq_count<H: BuildHasher>(
    clusters: &HashMap<String, String, H>,
    pairs: &[(String, String)],
) -> Result<f64> {
    if pairs.is_empty() {
        return Err(TtmError::algorithm("eval", "no psq pairs to count"));
    }
    let lookup = |id: &String| {
        clusters.get(id).ok_or_else(|| {
            TtmError::algorithm("eval", format!("psq pair names unknown document `{id}`"))
        })
    };
    let mut matches = 0_usize;
    for (first, second) in pairs {
        if lookup(first)? == lookup(second)? {
            matches += 1;
        }
    }
    Ok(matches as f64 / pairs.len() as f64)
}

/// Psq-count adjusted for the chance that a random pair shares a cluster,
/// given the cluster sizes. `None` with fewer than two clusters.
#[must_use]
pub fn psq_score(count: f64, distribution: &ClusterDistribution) -> Option<ChanceAdjusted> {
    if distribution.len() < 2 {
        return None;
    }
    ChanceAdjusted::new(count, distribution.bucket_probability())
}
