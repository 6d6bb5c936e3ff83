//! Dense-vector methods for ttm.
//!
//! Dimensionality reduction (`redim`), clustering (`cluster`), the clustering
//! quality metrics reported by `eval` and the model agreement measure reported
//! by `comp`. Every method works on the row-major [`ttm_core::Matrix`] decoded
//! from a vector column.

pub mod agreement;
pub mod cluster;
pub mod distance;
mod linalg;
pub mod quality;
pub mod redim;

pub use crate::{
    agreement::{Agreement, AverageAgreement, Labelling, average_kappa, kappa},
    cluster::{ClusterStage, Clusterer, SplitTarget, clusterer_registry},
    distance::Metric,
    quality::{ChanceAdjusted, ClusterDistribution, Silhouette},
    redim::{RedimStage, Reducer, reducer_registry},
};
