//! Latent Dirichlet allocation by collapsed Gibbs sampling.

use clap::Parser;
use rand::{
    Rng, SeedableRng,
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
};
use tracing::debug;
use ttm_core::{Matrix, Result, TtmError, parse_method_args};

use super::Reducer;

#[derive(Debug, Parser)]
#[command(about = "Topic proportions from latent Dirichlet allocation")]
struct LdaArgs {
    /// Number of topics, and so of output dimensions.
    #[arg(long, default_value_t = 5)]
    components: usize,
    /// Number of Gibbs sweeps over the corpus.
    #[arg(long, default_value_t = 10)]
    max_epochs: usize,
    /// Seed for topic initialisation and sampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Fits an LDA topic model to count vectors and returns each document's topic
/// proportions.
///
/// Input components are rounded to the nearest integer and read as term
/// counts, so the method is meant for `bow` embeddings. Both Dirichlet priors
/// are `1 / components`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LatentDirichlet {
    components: usize,
    max_epochs: usize,
    seed: u64,
}

impl LatentDirichlet {
    /// Fit `components` topics with `max_epochs` sweeps.
    #[must_use]
    pub const fn new(components: usize, max_epochs: usize, seed: u64) -> Self {
        Self {
            components,
            max_epochs,
            seed,
        }
    }

    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let parsed: LdaArgs = parse_method_args("lda", args)?;
        if parsed.components == 0 {
            return Err(TtmError::config("lda", "--components must be at least 1"));
        }
        Ok(Self::new(parsed.components, parsed.max_epochs, parsed.seed))
    }
}

/// Expand each row into one word id per counted occurrence.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "counts are rounded, non-negative and checked to be finite"
)]
fn documents(vectors: &Matrix) -> Result<Vec<Vec<usize>>> {
    vectors
        .iter_rows()
        .enumerate()
        .map(|(row, values)| {
            let mut words = Vec::new();
            for (word, &value) in values.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(TtmError::algorithm(
                        "lda",
                        format!("row {row} holds {value}; term counts must be non-negative"),
                    ));
                }
                let count = value.round() as usize;
                words.extend(std::iter::repeat_n(word, count));
            }
            Ok(words)
        })
        .collect()
}

struct GibbsSampler {
    topics: usize,
    prior: f64,
    vocabulary: usize,
    docs: Vec<Vec<usize>>,
    assignments: Vec<Vec<usize>>,
    doc_topic: Vec<Vec<usize>>,
    topic_word: Vec<Vec<usize>>,
    topic_total: Vec<usize>,
    rng: StdRng,
}

impl GibbsSampler {
    fn new(docs: Vec<Vec<usize>>, vocabulary: usize, topics: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut doc_topic = vec![vec![0; topics]; docs.len()];
        let mut topic_word = vec![vec![0; vocabulary]; topics];
        let mut topic_total = vec![0; topics];
        let assignments = docs
            .iter()
            .enumerate()
            .map(|(doc, words)| {
                words
                    .iter()
                    .map(|&word| {
                        let topic = rng.gen_range(0..topics);
                        doc_topic[doc][topic] += 1;
                        topic_word[topic][word] += 1;
                        topic_total[topic] += 1;
                        topic
                    })
                    .collect()
            })
            .collect();
        #[expect(clippy::cast_precision_loss, reason = "topic counts are small")]
        let prior = 1.0 / topics as f64;
        Self {
            topics,
            prior,
            vocabulary,
            docs,
            assignments,
            doc_topic,
            topic_word,
            topic_total,
            rng,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "conditional topic weights are floating-point"
    )]
    fn sweep(&mut self) {
        let smoothing = self.vocabulary as f64 * self.prior;
        let mut weights = vec![0.0; self.topics];
        for doc in 0..self.docs.len() {
            for position in 0..self.docs[doc].len() {
                let word = self.docs[doc][position];
                let old = self.assignments[doc][position];
                self.doc_topic[doc][old] -= 1;
                self.topic_word[old][word] -= 1;
                self.topic_total[old] -= 1;

                for (topic, weight) in weights.iter_mut().enumerate() {
                    *weight = (self.doc_topic[doc][topic] as f64 + self.prior)
                        * (self.topic_word[topic][word] as f64 + self.prior)
                        / (self.topic_total[topic] as f64 + smoothing);
                }
                let new = match WeightedIndex::new(&weights) {
                    Ok(index) => index.sample(&mut self.rng),
                    Err(_) => self.rng.gen_range(0..self.topics),
                };

                self.assignments[doc][position] = new;
                self.doc_topic[doc][new] += 1;
                self.topic_word[new][word] += 1;
                self.topic_total[new] += 1;
            }
        }
    }

    /// Per-document topic proportions `(n_dk + α) / (N_d + Kα)`.
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "proportions are floating-point"
    )]
    fn proportions(&self) -> Matrix {
        let mut theta = Matrix::zeros(self.docs.len(), self.topics);
        let total_prior = self.topics as f64 * self.prior;
        for (doc, counts) in self.doc_topic.iter().enumerate() {
            let denominator = self.docs[doc].len() as f64 + total_prior;
            for (cell, &count) in theta.row_mut(doc).iter_mut().zip(counts) {
                *cell = (count as f64 + self.prior) / denominator;
            }
        }
        theta
    }
}

impl Reducer for LatentDirichlet {
    fn name(&self) -> &'static str {
        "lda"
    }

    fn reduce(&self, vectors: &Matrix) -> Result<Matrix> {
        let docs = documents(vectors)?;
        let mut sampler = GibbsSampler::new(docs, vectors.cols(), self.components, self.seed);
        for epoch in 0..self.max_epochs {
            sampler.sweep();
            debug!(epoch = epoch + 1, epochs = self.max_epochs, "lda sweep finished");
        }
        Ok(sampler.proportions())
    }
}
