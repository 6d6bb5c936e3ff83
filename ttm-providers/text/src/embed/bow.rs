//! Bag-of-words embeddings, optionally tf-idf weighted.
//!
//! Both variants take two passes over the text column: the first builds the
//! vocabulary and document frequencies, the second counts terms per row.

use std::collections::{BTreeMap, HashMap};

use clap::Parser;
use tracing::debug;
use ttm_core::{ColumnRef, Matrix, Result, TableSource, TtmError, parse_method_args};

use super::{Embedder, normalise_rows};
use crate::tokenize::tokenize;

/// How raw term counts are turned into vector components.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Weighting {
    /// Raw term counts.
    Counts,
    /// Counts times smoothed inverse document frequency, L2-normalised.
    TfIdf,
}

#[derive(Debug, Parser)]
#[command(about = "Bag-of-words document vectors")]
struct BowArgs {
    /// Ignore terms that occur in fewer than N documents.
    #[arg(long, default_value_t = 1)]
    min_df: usize,
    /// Keep at most N of the most frequent terms.
    #[arg(long, default_value_t = 2048)]
    max_features: usize,
}

/// Vocabulary-based embedder.
#[derive(Clone, Debug)]
pub struct BagOfWords {
    name: &'static str,
    weighting: Weighting,
    min_df: usize,
    max_features: usize,
}

#[derive(Default)]
struct TermStats {
    documents: usize,
    occurrences: usize,
}

/// Terms in alphabetical order with their document frequencies.
struct Vocabulary {
    index: HashMap<String, usize>,
    document_frequency: Vec<usize>,
    documents: usize,
}

impl BagOfWords {
    /// Create an embedder with explicit settings.
    #[must_use]
    pub const fn new(
        name: &'static str,
        weighting: Weighting,
        min_df: usize,
        max_features: usize,
    ) -> Self {
        Self {
            name,
            weighting,
            min_df,
            max_features,
        }
    }

    pub(super) fn from_args(name: &'static str, weighting: Weighting, args: &[String]) -> Result<Self> {
        let parsed: BowArgs = parse_method_args(name, args)?;
        if parsed.max_features == 0 {
            return Err(TtmError::config(name, "--max-features must be positive"));
        }
        Ok(Self::new(name, weighting, parsed.min_df, parsed.max_features))
    }

    fn vocabulary(&self, source: &mut TableSource, column: &ColumnRef) -> Result<Vocabulary> {
        let mut stats: BTreeMap<String, TermStats> = BTreeMap::new();
        let mut documents = 0;
        for cell in source.cells(column)? {
            let mut tokens = tokenize(&cell?);
            documents += 1;
            for token in &tokens {
                stats.entry(token.clone()).or_default().occurrences += 1;
            }
            tokens.sort_unstable();
            tokens.dedup();
            for token in tokens {
                stats.entry(token).or_default().documents += 1;
            }
        }

        let mut kept: Vec<(String, TermStats)> = stats
            .into_iter()
            .filter(|(_, term)| term.documents >= self.min_df)
            .collect();
        if kept.len() > self.max_features {
            // Stable sort keeps alphabetical order among equally frequent terms.
            kept.sort_by(|left, right| right.1.occurrences.cmp(&left.1.occurrences));
            kept.truncate(self.max_features);
            kept.sort_by(|left, right| left.0.cmp(&right.0));
        }
        debug!(method = self.name, terms = kept.len(), documents, "built vocabulary");

        let mut index = HashMap::with_capacity(kept.len());
        let mut document_frequency = Vec::with_capacity(kept.len());
        for (position, (term, term_stats)) in kept.into_iter().enumerate() {
            index.insert(term, position);
            document_frequency.push(term_stats.documents);
        }
        Ok(Vocabulary {
            index,
            document_frequency,
            documents,
        })
    }
}

impl Vocabulary {
    fn len(&self) -> usize {
        self.document_frequency.len()
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "document counts stay far below 2^52"
    )]
    fn idf(&self) -> Vec<f64> {
        let documents = self.documents as f64;
        self.document_frequency
            .iter()
            .map(|&df| ((1.0 + documents) / (1.0 + df as f64)).ln() + 1.0)
            .collect()
    }
}

impl Embedder for BagOfWords {
    fn name(&self) -> &'static str {
        self.name
    }

    fn embed(&self, source: &mut TableSource, column: &ColumnRef) -> Result<Matrix> {
        let vocabulary = self.vocabulary(source, column)?;
        if vocabulary.documents == 0 {
            return Ok(Matrix::zeros(0, 0));
        }
        if vocabulary.len() == 0 {
            return Err(TtmError::algorithm(
                self.name,
                "empty vocabulary: no term reaches --min-df",
            ));
        }

        let mut matrix = Matrix::zeros(vocabulary.documents, vocabulary.len());
        for (row, cell) in source.cells(column)?.enumerate() {
            if row >= matrix.rows() {
                return Err(TtmError::algorithm(self.name, "input changed between passes"));
            }
            let vector = matrix.row_mut(row);
            for token in tokenize(&cell?) {
                if let Some(&position) = vocabulary.index.get(&token) {
                    vector[position] += 1.0;
                }
            }
        }

        if self.weighting == Weighting::TfIdf {
            let idf = vocabulary.idf();
            for row in 0..matrix.rows() {
                for (value, weight) in matrix.row_mut(row).iter_mut().zip(&idf) {
                    *value *= weight;
                }
            }
            normalise_rows(&mut matrix);
        }
        Ok(matrix)
    }
}
