//! Class-based tf-idf cluster descriptions.

use std::collections::{BTreeMap, HashMap};

use clap::Parser;
use ttm_core::{Result, parse_method_args};

use super::{Describer, LabelledDocuments};
use crate::tokenize::tokenize;

#[derive(Debug, Parser)]
#[command(about = "Most significant terms per cluster")]
struct TfIdfArgs {
    /// Include only the N most significant terms for each cluster.
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

/// Ranks each cluster's terms by class-based tf-idf.
///
/// Term frequencies are pooled per cluster and divided by the cluster's token
/// count; the inverse frequency is `ln(clusters / clusters containing the
/// term)`. The top `limit` terms, ties broken alphabetically, are joined with
/// `", "`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClassTfIdf {
    limit: usize,
}

#[derive(Default)]
struct ClusterTerms {
    counts: BTreeMap<String, usize>,
    tokens: usize,
}

impl ClassTfIdf {
    /// Keep the `limit` best terms per cluster.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: TfIdfArgs = parse_method_args("tfidf", args)?;
        Ok(Self::new(parsed.limit))
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "tf-idf scores are floating-point ratios of small counts"
)]
fn rank(clusters: &HashMap<String, ClusterTerms>, limit: usize) -> HashMap<String, String> {
    let mut containing: HashMap<&str, usize> = HashMap::new();
    for terms in clusters.values() {
        for term in terms.counts.keys() {
            *containing.entry(term.as_str()).or_insert(0) += 1;
        }
    }
    let cluster_count = clusters.len() as f64;

    clusters
        .iter()
        .map(|(label, terms)| {
            let tokens = terms.tokens.max(1) as f64;
            let mut scored: Vec<(&str, f64)> = terms
                .counts
                .iter()
                .map(|(term, &count)| {
                    let df = containing.get(term.as_str()).copied().unwrap_or(1) as f64;
                    (term.as_str(), (count as f64 / tokens) * (cluster_count / df).ln())
                })
                .collect();
            // Counts are alphabetical, so a stable sort breaks ties by term.
            scored.sort_by(|left, right| right.1.total_cmp(&left.1));
            let description = scored
                .into_iter()
                .take(limit)
                .map(|(term, _)| term)
                .collect::<Vec<_>>()
                .join(", ");
            (label.clone(), description)
        })
        .collect()
}

impl Describer for ClassTfIdf {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn describe(&self, documents: &mut LabelledDocuments<'_>) -> Result<HashMap<String, String>> {
        let mut clusters: HashMap<String, ClusterTerms> = HashMap::new();
        for document in documents {
            let (label, text) = document?;
            let terms = clusters.entry(label).or_default();
            for token in tokenize(&text) {
                terms.tokens += 1;
                *terms.counts.entry(token).or_insert(0) += 1;
            }
        }
        Ok(rank(&clusters, self.limit))
    }
}
