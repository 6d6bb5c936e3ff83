//! Agglomerative clustering by the nearest-neighbour chain algorithm.

use clap::{Parser, ValueEnum};
use tracing::debug;
use ttm_core::{Matrix, Result, TtmError, parse_method_args};

use super::{Clusterer, hdbscan::DisjointSet};
use crate::distance::{Metric, squared_euclidean};

/// Criterion for the distance between two clusters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Linkage {
    /// Minimise the increase in within-cluster variance.
    #[default]
    Ward,
    /// Largest pairwise distance.
    Complete,
    /// Mean pairwise distance.
    Average,
    /// Smallest pairwise distance.
    Single,
}

#[derive(Debug, Parser)]
#[command(about = "Bottom-up hierarchical clustering")]
struct AgglomerativeArgs {
    /// Number of clusters to produce.
    #[arg(long, default_value_t = 10)]
    clusters: usize,
    /// Distance between rows.
    #[arg(long, value_enum, default_value_t = Metric::Euclidean)]
    affinity: Metric,
    /// Distance between clusters.
    #[arg(long, value_enum, default_value_t = Linkage::Ward)]
    linkage: Linkage,
}

/// Merges the two closest clusters until `clusters` remain.
///
/// The full merge tree is built with the nearest-neighbour chain algorithm
/// and Lance-Williams updates, then replayed in order of merge distance and
/// cut once the requested number of clusters is reached. Labels are numbered
/// in order of each cluster's first row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Agglomerative {
    clusters: usize,
    affinity: Metric,
    linkage: Linkage,
}

impl Agglomerative {
    /// Cut the hierarchy into `clusters` clusters.
    ///
    /// # Errors
    /// Returns [`TtmError::Config`] when `clusters` is zero or when ward
    /// linkage is combined with a non-Euclidean affinity.
    pub fn new(clusters: usize, affinity: Metric, linkage: Linkage) -> Result<Self> {
        if clusters == 0 {
            return Err(TtmError::config("aggl", "--clusters must be at least 1"));
        }
        if linkage == Linkage::Ward && affinity != Metric::Euclidean {
            return Err(TtmError::config(
                "aggl",
                format!("ward linkage requires the euclidean affinity, not {}", affinity.as_str()),
            ));
        }
        Ok(Self {
            clusters,
            affinity,
            linkage,
        })
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: AgglomerativeArgs = parse_method_args("aggl", args)?;
        Self::new(parsed.clusters, parsed.affinity, parsed.linkage)
    }
}

/// Upper triangle of a symmetric dissimilarity matrix.
struct Condensed {
    size: usize,
    values: Vec<f64>,
}

impl Condensed {
    fn build(vectors: &Matrix, distance: impl Fn(&[f64], &[f64]) -> f64) -> Self {
        let size = vectors.rows();
        let mut values = Vec::with_capacity(size * size.saturating_sub(1) / 2);
        for i in 0..size {
            for j in (i + 1)..size {
                values.push(distance(vectors.row(i), vectors.row(j)));
            }
        }
        Self { size, values }
    }

    fn index(&self, a: usize, b: usize) -> usize {
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        i * self.size - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, a: usize, b: usize) -> f64 {
        self.values[self.index(a, b)]
    }

    fn set(&mut self, a: usize, b: usize, value: f64) {
        let index = self.index(a, b);
        self.values[index] = value;
    }
}

#[derive(Clone, Copy, Debug)]
struct Merge {
    absorbed: usize,
    into: usize,
    distance: f64,
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "Lance-Williams updates are floating-point"
)]
fn lance_williams(linkage: Linkage, d_ka: f64, d_kb: f64, d_ab: f64, sizes: (usize, usize, usize)) -> f64 {
    let (a, b, k) = (sizes.0 as f64, sizes.1 as f64, sizes.2 as f64);
    match linkage {
        Linkage::Single => d_ka.min(d_kb),
        Linkage::Complete => d_ka.max(d_kb),
        Linkage::Average => (a * d_ka + b * d_kb) / (a + b),
        Linkage::Ward => ((a + k) * d_ka + (b + k) * d_kb - k * d_ab) / (a + b + k),
    }
}

impl Agglomerative {
    /// Build every merge with the nearest-neighbour chain.
    fn merges(&self, vectors: &Matrix) -> Vec<Merge> {
        let n = vectors.rows();
        // Ward's update is exact on squared Euclidean dissimilarities.
        let mut dist = match self.linkage {
            Linkage::Ward => Condensed::build(vectors, squared_euclidean),
            _ => Condensed::build(vectors, |a, b| self.affinity.distance(a, b)),
        };
        let mut active = vec![true; n];
        let mut sizes = vec![1_usize; n];
        let mut merges = Vec::with_capacity(n.saturating_sub(1));
        let mut chain: Vec<usize> = Vec::new();

        while merges.len() + 1 < n {
            if chain.is_empty() {
                if let Some(start) = active.iter().position(|&alive| alive) {
                    chain.push(start);
                }
            }
            let (a, b) = loop {
                let Some(&tip) = chain.last() else { break (0, 0) };
                let previous = chain.len().checked_sub(2).map(|i| chain[i]);
                let mut best = previous;
                let mut best_distance = previous.map_or(f64::INFINITY, |p| dist.get(tip, p));
                for candidate in (0..n).filter(|&c| active[c] && c != tip) {
                    let d = dist.get(tip, candidate);
                    if d < best_distance {
                        best = Some(candidate);
                        best_distance = d;
                    }
                }
                match best {
                    Some(next) if Some(next) == previous => break (tip, next),
                    Some(next) => chain.push(next),
                    None => break (tip, tip),
                }
            };
            if a == b {
                break;
            }
            chain.truncate(chain.len().saturating_sub(2));

            let d_ab = dist.get(a, b);
            for k in (0..n).filter(|&k| active[k] && k != a && k != b) {
                let updated = lance_williams(
                    self.linkage,
                    dist.get(k, a),
                    dist.get(k, b),
                    d_ab,
                    (sizes[a], sizes[b], sizes[k]),
                );
                dist.set(k, b, updated);
            }
            active[a] = false;
            sizes[b] += sizes[a];
            merges.push(Merge {
                absorbed: a,
                into: b,
                distance: d_ab,
            });
        }
        merges
    }
}

impl Clusterer for Agglomerative {
    fn name(&self) -> &'static str {
        "aggl"
    }

    fn cluster(&self, vectors: &Matrix) -> Result<Vec<i64>> {
        let n = vectors.rows();
        if n == 0 {
            return Ok(Vec::new());
        }
        if n < self.clusters {
            return Err(TtmError::algorithm(
                "aggl",
                format!("cannot form {} clusters from {n} rows", self.clusters),
            ));
        }

        let mut merges = self.merges(vectors);
        merges.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        debug!(merges = merges.len(), "built merge tree");

        let mut components = DisjointSet::new(n);
        for merge in merges.iter().take(n - self.clusters) {
            components.union(merge.absorbed, merge.into);
        }

        let mut numbering = vec![None; n];
        let mut next_label = 0_i64;
        Ok((0..n)
            .map(|row| {
                let root = components.find(row);
                *numbering[root].get_or_insert_with(|| {
                    let label = next_label;
                    next_label += 1;
                    label
                })
            })
            .collect())
    }
}
