//! The `random` clusterer: a noise baseline for evaluation.

use clap::Parser;
use rand::{
    SeedableRng,
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
};
use ttm_core::{Matrix, Result, TtmError, parse_method_args};

use super::Clusterer;

const DEFAULT_CLUSTERS: usize = 10;

#[derive(Debug, Parser)]
#[command(about = "Assign random cluster labels")]
struct RandomArgs {
    /// Number of clusters; inferred from `--weights` when omitted.
    #[arg(long)]
    clusters: Option<usize>,
    /// Relative cluster sizes, one per cluster.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    weights: Option<Vec<f64>>,
    /// Seed for the draws.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Draws every label independently from a weighted distribution over
/// `0..clusters`. The result is deliberately meaningless and gives a feel for
/// how far real clusterings are from chance.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomLabels {
    weights: Vec<f64>,
    seed: u64,
}

impl RandomLabels {
    /// Draw from `weights.len()` clusters with the given relative sizes.
    ///
    /// # Errors
    /// Returns [`TtmError::Config`] when the weights are empty, negative or
    /// all zero.
    pub fn new(weights: Vec<f64>, seed: u64) -> Result<Self> {
        WeightedIndex::new(&weights)
            .map_err(|err| TtmError::config("random", format!("invalid --weights: {err}")))?;
        Ok(Self { weights, seed })
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: RandomArgs = parse_method_args("random", args)?;
        let weights = match (parsed.clusters, parsed.weights) {
            (Some(clusters), Some(weights)) if clusters != weights.len() => {
                return Err(TtmError::config(
                    "random",
                    format!(
                        "expected the number of weights to match the number of clusters, \
                         but found {} weights for {clusters} clusters",
                        weights.len()
                    ),
                ));
            }
            (_, Some(weights)) => weights,
            (clusters, None) => vec![1.0; clusters.unwrap_or(DEFAULT_CLUSTERS)],
        };
        Self::new(weights, parsed.seed)
    }
}

impl Clusterer for RandomLabels {
    fn name(&self) -> &'static str {
        "random"
    }

    #[expect(clippy::cast_possible_wrap, reason = "cluster counts fit in i64")]
    fn cluster(&self, vectors: &Matrix) -> Result<Vec<i64>> {
        let distribution = WeightedIndex::new(&self.weights)
            .map_err(|err| TtmError::algorithm("random", err.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..vectors.rows())
            .map(|_| distribution.sample(&mut rng) as i64)
            .collect())
    }
}
