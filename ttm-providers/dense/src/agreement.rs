//! Agreement between clustering models, reported by `ttm comp`.
//!
//! Two models agree on a pair of documents when both put the pair in one
//! cluster or both keep it apart. The observed agreement rate over all
//! unordered pairs is adjusted for chance in the manner of Cohen's kappa,
//! with the chance rate derived from each model's cluster sizes.
//!
//! Pair counts come from the contingency table of the two labellings, so the
//! cost is linear in the number of documents rather than quadratic.

use std::collections::HashMap;

use ttm_core::{Result, TtmError};

use crate::quality::{ChanceAdjusted, ClusterDistribution};

/// Cluster label per document id.
pub type Labelling = HashMap<String, String>;

/// Chance-adjusted agreement between two models.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agreement {
    /// Cohen-style kappa; one for identical partitions, zero at chance level.
    pub kappa: f64,
    /// Scale factor of the chance adjustment.
    pub zoom: f64,
}

/// Mean and population standard deviation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spread {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub deviation: f64,
}

impl Spread {
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "mean and deviation are floating point"
    )]
    fn of(values: &[f64]) -> Self {
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / count;
        Self {
            mean,
            deviation: variance.sqrt(),
        }
    }
}

/// Agreement averaged over every pair of models.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AverageAgreement {
    /// Spread of the pairwise kappas.
    pub kappa: Spread,
    /// Spread of the pairwise zooms.
    pub zoom: Spread,
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "pair counts are compared as rates"
)]
fn pairs(count: usize) -> f64 {
    let count = count as f64;
    count * (count - 1.0) / 2.0
}

/// Kappa of co-assignment agreement between two labellings of the same
/// documents.
///
/// # Errors
/// Returns [`TtmError::Algorithm`] when the labellings cover different
/// documents, hold fewer than two documents, or both put every document in a
/// single cluster, which leaves the chance adjustment undefined.
///
/// # Examples
/// ```
/// use ttm_providers_dense::agreement::{Labelling, kappa};
///
/// let model: Labelling = [("a", "0"), ("b", "0"), ("c", "1")]
///     .into_iter()
///     .map(|(id, cluster)| (id.to_owned(), cluster.to_owned()))
///     .collect();
/// let agreement = kappa(&model, &model)?;
/// assert!((agreement.kappa - 1.0).abs() < 1e-12);
/// # Ok::<(), ttm_core::TtmError>(())
/// ```
#[expect(clippy::float_arithmetic, reason = "agreement rates are floating point")]
pub fn kappa(left: &Labelling, right: &Labelling) -> Result<Agreement> {
    if left.len() != right.len() || left.keys().any(|id| !right.contains_key(id)) {
        return Err(TtmError::algorithm(
            "comp",
            "models must label the same documents",
        ));
    }
    if left.len() < 2 {
        return Err(TtmError::algorithm(
            "comp",
            "at least two documents are needed to compare models",
        ));
    }

    let mut left_sizes: HashMap<&str, usize> = HashMap::new();
    let mut right_sizes: HashMap<&str, usize> = HashMap::new();
    let mut joint: HashMap<(&str, &str), usize> = HashMap::new();
    for (id, left_label) in left {
        let right_label = right.get(id).map_or("", String::as_str);
        *left_sizes.entry(left_label).or_insert(0) += 1;
        *right_sizes.entry(right_label).or_insert(0) += 1;
        *joint.entry((left_label, right_label)).or_insert(0) += 1;
    }

    let same_left: f64 = left_sizes.values().copied().map(pairs).sum();
    let same_right: f64 = right_sizes.values().copied().map(pairs).sum();
    let same_both: f64 = joint.values().copied().map(pairs).sum();
    let disagreements = same_left + same_right - 2.0 * same_both;
    let observed = 1.0 - disagreements / pairs(left.len());

    let left_labels: Vec<&String> = left.values().collect();
    let right_labels: Vec<&String> = right.values().collect();
    let left_chance = ClusterDistribution::from_labels(&left_labels).bucket_probability();
    let right_chance = ClusterDistribution::from_labels(&right_labels).bucket_probability();
    let expected = left_chance * right_chance + (1.0 - left_chance) * (1.0 - right_chance);

    ChanceAdjusted::new(observed, expected)
        .map(|adjusted| Agreement {
            kappa: adjusted.score,
            zoom: adjusted.zoom,
        })
        .ok_or_else(|| {
            TtmError::algorithm(
                "comp",
                "agreement is undefined when both models use a single cluster",
            )
        })
}

/// Kappa and zoom averaged over every unordered pair of `models`.
///
/// # Errors
/// Returns [`TtmError::Algorithm`] with fewer than two models or when any
/// pairwise [`kappa`] fails.
pub fn average_kappa(models: &[Labelling]) -> Result<AverageAgreement> {
    if models.len() < 2 {
        return Err(TtmError::algorithm("comp", "at least two models are needed"));
    }
    let mut kappas = Vec::new();
    let mut zooms = Vec::new();
    for (index, left) in models.iter().enumerate() {
        for right in &models[index + 1..] {
            let agreement = kappa(left, right)?;
            kappas.push(agreement.kappa);
            zooms.push(agreement.zoom);
        }
    }
    Ok(AverageAgreement {
        kappa: Spread::of(&kappas),
        zoom: Spread::of(&zooms),
    })
}
