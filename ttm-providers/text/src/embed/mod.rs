//! Document embeddings and the `embed` stage.
//!
//! An [`Embedder`] turns a text column into one vector per row. The stage
//! accepts several methods in one invocation; each runs independently over the
//! same column and the resulting vectors are concatenated per row in
//! command-line order.

mod bow;
mod hash;

use std::sync::OnceLock;

use tracing::{info, instrument};
use ttm_core::{
    ColumnRef, Matrix, MethodRegistry, Result, Stage, TableSource, TtmError,
};

pub use self::bow::{BagOfWords, Weighting};
pub use self::hash::FeatureHasher;

/// Default column holding the documents' text.
pub const DEFAULT_INPUT_COLUMN: &str = "text";
/// Default column receiving the embedding.
pub const DEFAULT_OUTPUT_COLUMN: &str = "highdim";

/// Maps a text column to a dense matrix with one row per table row.
pub trait Embedder {
    /// Method name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Embed every cell of `column`.
    ///
    /// # Errors
    /// Returns source errors and [`TtmError::Algorithm`] when the method
    /// cannot produce vectors.
    fn embed(&self, source: &mut TableSource, column: &ColumnRef) -> Result<Matrix>;
}

/// Boxed embedder as produced by the registry.
pub type BoxedEmbedder = Box<dyn Embedder>;

/// Registry of embedding methods.
#[must_use]
pub fn embedder_registry() -> &'static MethodRegistry<BoxedEmbedder> {
    static REGISTRY: OnceLock<MethodRegistry<BoxedEmbedder>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        MethodRegistry::new("embed")
            .with("bow", |args| {
                BagOfWords::from_args("bow", Weighting::Counts, args).map(|m| Box::new(m) as BoxedEmbedder)
            })
            .with("tfidf", |args| {
                BagOfWords::from_args("tfidf", Weighting::TfIdf, args).map(|m| Box::new(m) as BoxedEmbedder)
            })
            .with("hash", |args| {
                FeatureHasher::from_args(args).map(|m| Box::new(m) as BoxedEmbedder)
            })
            .with_unavailable("doc2vec", "gensim")
            .with_unavailable("flair", "flair")
    })
}

/// The `embed` stage.
pub struct EmbedStage {
    input_column: String,
    output_column: String,
    methods: Vec<(String, BoxedEmbedder)>,
}

impl std::fmt::Debug for EmbedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedStage")
            .field("input_column", &self.input_column)
            .field("output_column", &self.output_column)
            .field("methods", &self.method())
            .finish()
    }
}

impl EmbedStage {
    /// Build the stage from the words following the `embed` verb.
    ///
    /// # Errors
    /// Returns [`ttm_core::DependencyError`] for unknown or unavailable
    /// methods and [`TtmError::Config`] for bad method arguments.
    pub fn from_words(
        input_column: impl Into<String>,
        output_column: impl Into<String>,
        words: &[String],
    ) -> Result<Self> {
        let registry = embedder_registry();
        let invocations = registry.split_invocations(words)?;
        Ok(Self::new(
            input_column,
            output_column,
            registry.resolve_all(&invocations)?,
        ))
    }

    /// Build the stage from already constructed methods.
    pub fn new(
        input_column: impl Into<String>,
        output_column: impl Into<String>,
        methods: Vec<(String, BoxedEmbedder)>,
    ) -> Self {
        Self {
            input_column: input_column.into(),
            output_column: output_column.into(),
            methods,
        }
    }

    /// Run every method and concatenate their vectors per row.
    ///
    /// # Errors
    /// Returns the first failing method's error; nothing is returned for the
    /// others.
    pub fn embed_all(&self, source: &mut TableSource) -> Result<Matrix> {
        let column = source.column(&self.input_column)?;
        let mut parts = Vec::with_capacity(self.methods.len());
        for (described, embedder) in &self.methods {
            parts.push(run_method(described, embedder.as_ref(), source, &column)?);
        }
        Matrix::hstack(&parts)
            .ok_or_else(|| TtmError::algorithm(self.method(), "methods disagree on row count"))
    }
}

#[instrument(name = "embed.method", err, skip(embedder, source, column), fields(column = column.name()))]
fn run_method(
    described: &str,
    embedder: &dyn Embedder,
    source: &mut TableSource,
    column: &ColumnRef,
) -> Result<Matrix> {
    info!(method = described, "embedding documents");
    let matrix = embedder.embed(source, column)?;
    info!(method = embedder.name(), dimensions = matrix.cols(), "embedded documents");
    Ok(matrix)
}

impl Stage for EmbedStage {
    fn name(&self) -> &str {
        "embed"
    }

    fn method(&self) -> String {
        self.methods
            .iter()
            .map(|(described, _)| described.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn output_column(&self) -> &str {
        &self.output_column
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        self.embed_all(source)?.to_cells(&self.method())
    }
}

/// Scale every row of `matrix` to unit Euclidean length; zero rows stay zero.
pub(crate) fn normalise_rows(matrix: &mut Matrix) {
    for index in 0..matrix.rows() {
        let row = matrix.row_mut(index);
        let norm = row.iter().map(|value| value * value).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|value| *value /= norm);
        }
    }
}
