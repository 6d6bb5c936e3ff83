//! Clustering and the `cluster` stage.
//!
//! A [`Clusterer`] assigns one integer label per row of a matrix. HDBSCAN may
//! label rows as noise with [`NOISE`]. The stage either clusters every row or,
//! in split mode, only the rows of one existing cluster, which then receive
//! dotted sub-labels.

mod agglomerative;
mod argmax;
mod hdbscan;
mod kmeans;
mod random;

use std::sync::OnceLock;

use tracing::{info, instrument};
use ttm_core::{Matrix, MethodRegistry, Result, SchemaError, Stage, TableSource, TtmError};

pub use self::{
    agglomerative::{Agglomerative, Linkage},
    argmax::Argmax,
    hdbscan::{Hdbscan, Selection},
    kmeans::{Init, KMeans},
    random::RandomLabels,
};

/// Default column holding the vectors to cluster.
pub const DEFAULT_INPUT_COLUMN: &str = "lowdim";
/// Default column receiving cluster labels.
pub const DEFAULT_OUTPUT_COLUMN: &str = "cluster";
/// Default output column in split mode.
pub const DEFAULT_SPLIT_OUTPUT_COLUMN: &str = "subcluster";
/// Label for rows that belong to no cluster.
pub const NOISE: i64 = -1;

/// Assigns a cluster label to every row of a matrix.
pub trait Clusterer {
    /// Method name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Label every row of `vectors`.
    ///
    /// # Errors
    /// Returns [`TtmError::Algorithm`] when the method cannot be applied to
    /// `vectors`, for example when more clusters are requested than rows
    /// exist.
    fn cluster(&self, vectors: &Matrix) -> Result<Vec<i64>>;
}

/// Boxed clusterer as produced by the registry.
pub type BoxedClusterer = Box<dyn Clusterer>;

/// Registry of clustering methods.
#[must_use]
pub fn clusterer_registry() -> &'static MethodRegistry<BoxedClusterer> {
    static REGISTRY: OnceLock<MethodRegistry<BoxedClusterer>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        MethodRegistry::new("cluster")
            .with("argmax", |args| {
                Argmax::from_args(args).map(|m| Box::new(m) as BoxedClusterer)
            })
            .with("kmeans", |args| {
                KMeans::from_args(args).map(|m| Box::new(m) as BoxedClusterer)
            })
            .with("aggl", |args| {
                Agglomerative::from_args(args).map(|m| Box::new(m) as BoxedClusterer)
            })
            .with("hdbscan", |args| {
                Hdbscan::from_args(args).map(|m| Box::new(m) as BoxedClusterer)
            })
            .with("random", |args| {
                RandomLabels::from_args(args).map(|m| Box::new(m) as BoxedClusterer)
            })
    })
}

/// An existing cluster to split into sub-clusters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SplitTarget {
    /// Label of the cluster to split.
    pub label: String,
    /// Column holding the existing labels.
    pub column: String,
}

impl SplitTarget {
    /// Split `label` as found in the default `cluster` column.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            column: DEFAULT_OUTPUT_COLUMN.to_owned(),
        }
    }

    /// Read existing labels from `column` instead.
    #[must_use]
    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

/// The `cluster` stage.
pub struct ClusterStage {
    input_column: String,
    output_column: String,
    split: Option<SplitTarget>,
    method: String,
    clusterer: BoxedClusterer,
}

impl std::fmt::Debug for ClusterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterStage")
            .field("input_column", &self.input_column)
            .field("output_column", &self.output_column)
            .field("split", &self.split)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl ClusterStage {
    /// Build the stage from the words following the `cluster` verb.
    ///
    /// # Errors
    /// Returns [`ttm_core::DependencyError`] for unknown methods and
    /// [`TtmError::Config`] for bad arguments, including a second method
    /// name, which reaches the first method as a stray word.
    pub fn from_words(
        input_column: impl Into<String>,
        output_column: impl Into<String>,
        words: &[String],
    ) -> Result<Self> {
        let registry = clusterer_registry();
        let invocation = registry.single_invocation(words)?;
        Ok(Self {
            input_column: input_column.into(),
            output_column: output_column.into(),
            split: None,
            method: invocation.describe(),
            clusterer: registry.resolve(&invocation.method, &invocation.args)?,
        })
    }

    /// Only cluster the rows of `target`.
    #[must_use]
    pub fn split(mut self, target: SplitTarget) -> Self {
        self.split = Some(target);
        self
    }

    #[instrument(name = "cluster.labels", err, skip(self, vectors), fields(method = %self.method, rows = vectors.rows()))]
    fn labels(&self, vectors: &Matrix) -> Result<Vec<i64>> {
        let labels = self.clusterer.cluster(vectors)?;
        if labels.len() != vectors.rows() {
            return Err(SchemaError::ValueCountMismatch {
                column: self.output_column.clone(),
                expected: vectors.rows(),
                actual: labels.len(),
            }
            .into());
        }
        let clusters = distinct_clusters(&labels);
        info!(method = self.clusterer.name(), clusters, "clustered vectors");
        Ok(labels)
    }

    fn split_labels(&self, source: &mut TableSource, target: &SplitTarget) -> Result<Vec<String>> {
        let existing = source.collect_column(&target.column)?;
        let vectors = source.matrix(&self.input_column)?;
        let selected = vectors.select_rows(|row| existing[row] == target.label);
        if selected.is_empty() {
            return Err(TtmError::algorithm(
                self.clusterer.name(),
                format!(
                    "cluster `{}` does not exist in column `{}`",
                    target.label, target.column
                ),
            ));
        }
        info!(
            cluster = %target.label,
            rows = selected.rows(),
            "splitting cluster"
        );
        let mut sublabels = self.labels(&selected)?.into_iter();
        Ok(existing
            .into_iter()
            .map(|label| {
                if label == target.label {
                    let sub = sublabels.next().unwrap_or(NOISE);
                    format!("{label}.{sub}")
                } else {
                    label
                }
            })
            .collect())
    }
}

fn distinct_clusters(labels: &[i64]) -> usize {
    let mut clusters: Vec<i64> = labels.iter().copied().filter(|&l| l != NOISE).collect();
    clusters.sort_unstable();
    clusters.dedup();
    clusters.len()
}

impl Stage for ClusterStage {
    fn name(&self) -> &str {
        "cluster"
    }

    fn method(&self) -> String {
        self.method.clone()
    }

    fn output_column(&self) -> &str {
        &self.output_column
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        if let Some(target) = &self.split {
            return self.split_labels(source, target);
        }
        let vectors = source.matrix(&self.input_column)?;
        Ok(self
            .labels(&vectors)?
            .into_iter()
            .map(|label| label.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests;
