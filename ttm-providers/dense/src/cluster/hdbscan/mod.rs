//! Hierarchical density-based clustering (HDBSCAN).
//!
//! The pipeline runs in four steps:
//!
//! 1. Core distances: the distance from each point to its `min_samples`-th
//!    nearest neighbour, counting the point itself.
//! 2. The minimum spanning tree of the mutual-reachability graph (Prim).
//! 3. The single-linkage forest of that tree, condensed with
//!    `min_cluster_size`.
//! 4. Excess-of-mass or leaf selection on the condensed tree, then labelling;
//!    points outside every selected cluster are noise (`-1`).

mod condense;
mod linkage;
mod union_find;

use clap::Parser;
use rayon::prelude::*;
use tracing::debug;
use ttm_core::{Matrix, Result, TtmError, parse_method_args};

pub use self::condense::Selection;
pub(crate) use self::union_find::DisjointSet;

use self::{
    condense::CondensedTree,
    linkage::{SingleLinkageForest, mutual_reachability_mst},
};
use super::{Clusterer, NOISE};
use crate::distance::Metric;

#[derive(Debug, Parser)]
#[command(about = "Density-based hierarchical clustering")]
struct HdbscanArgs {
    /// Smallest group of rows considered a cluster.
    #[arg(long, default_value_t = 15)]
    min_cluster_size: usize,
    /// Neighbourhood size for core distances; defaults to
    /// `--min-cluster-size`.
    #[arg(long)]
    min_samples: Option<usize>,
    /// Distance between rows.
    #[arg(long, value_enum, default_value_t = Metric::Euclidean)]
    metric: Metric,
    /// How flat clusters are picked from the condensed tree.
    #[arg(long, value_enum, default_value_t = Selection::Eom)]
    cluster_selection_method: Selection,
}

/// HDBSCAN over a dense matrix with an exact O(n²) spanning tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: usize,
    metric: Metric,
    selection: Selection,
}

impl Hdbscan {
    /// Configure the clusterer.
    ///
    /// # Errors
    /// Returns [`TtmError::Config`] when `min_cluster_size < 2` or
    /// `min_samples == 0`.
    pub fn new(
        min_cluster_size: usize,
        min_samples: usize,
        metric: Metric,
        selection: Selection,
    ) -> Result<Self> {
        if min_cluster_size < 2 {
            return Err(TtmError::config("hdbscan", "--min-cluster-size must be at least 2"));
        }
        if min_samples == 0 {
            return Err(TtmError::config("hdbscan", "--min-samples must be at least 1"));
        }
        Ok(Self {
            min_cluster_size,
            min_samples,
            metric,
            selection,
        })
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: HdbscanArgs = parse_method_args("hdbscan", args)?;
        Self::new(
            parsed.min_cluster_size,
            parsed.min_samples.unwrap_or(parsed.min_cluster_size),
            parsed.metric,
            parsed.cluster_selection_method,
        )
    }

    fn core_distances(&self, vectors: &Matrix) -> Vec<f64> {
        let rank = self.min_samples.min(vectors.rows()) - 1;
        (0..vectors.rows())
            .into_par_iter()
            .map(|point| {
                let mut distances: Vec<f64> = vectors
                    .iter_rows()
                    .map(|other| self.metric.distance(vectors.row(point), other))
                    .collect();
                let (_, kth, _) = distances.select_nth_unstable_by(rank, f64::total_cmp);
                *kth
            })
            .collect()
    }
}

impl Clusterer for Hdbscan {
    fn name(&self) -> &'static str {
        "hdbscan"
    }

    fn cluster(&self, vectors: &Matrix) -> Result<Vec<i64>> {
        let n = vectors.rows();
        if n < self.min_cluster_size {
            return Ok(vec![NOISE; n]);
        }
        let core = self.core_distances(vectors);
        let edges = mutual_reachability_mst(vectors, &core, self.metric);
        let forest = SingleLinkageForest::from_edges(n, &edges);
        let tree = CondensedTree::build(&forest, self.min_cluster_size);
        let selected = tree.select(self.selection);
        debug!(selected = selected.len(), "selected clusters");
        Ok(tree.labels(n, &selected))
    }
}

#[cfg(test)]
mod tests;
