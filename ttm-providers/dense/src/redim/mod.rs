//! Dimensionality reduction and the `redim` stage.
//!
//! A [`Reducer`] maps the vector column decoded into a [`Matrix`] to a new
//! matrix with the same number of rows and usually far fewer columns.

mod identity;
mod lda;
mod svd;

use std::sync::OnceLock;

use tracing::{info, instrument};
use ttm_core::{Matrix, MethodRegistry, Result, SchemaError, Stage, TableSource};

pub use self::{identity::Identity, lda::LatentDirichlet, svd::TruncatedSvd};

/// Default column holding the high-dimensional vectors.
pub const DEFAULT_INPUT_COLUMN: &str = "highdim";
/// Default column receiving the reduced vectors.
pub const DEFAULT_OUTPUT_COLUMN: &str = "lowdim";

/// Maps every row of a matrix into a lower-dimensional space.
pub trait Reducer {
    /// Method name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Reduce `vectors`, returning exactly one row per input row.
    ///
    /// # Errors
    /// Returns [`ttm_core::TtmError::Algorithm`] when the method cannot be applied to
    /// `vectors`.
    fn reduce(&self, vectors: &Matrix) -> Result<Matrix>;
}

/// Boxed reducer as produced by the registry.
pub type BoxedReducer = Box<dyn Reducer>;

/// Registry of dimensionality-reduction methods.
#[must_use]
pub fn reducer_registry() -> &'static MethodRegistry<BoxedReducer> {
    static REGISTRY: OnceLock<MethodRegistry<BoxedReducer>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        MethodRegistry::new("redim")
            .with("id", |args| {
                Identity::from_args(args).map(|m| Box::new(m) as BoxedReducer)
            })
            .with("svd", |args| {
                TruncatedSvd::from_args(args).map(|m| Box::new(m) as BoxedReducer)
            })
            .with("lda", |args| {
                LatentDirichlet::from_args(args).map(|m| Box::new(m) as BoxedReducer)
            })
            .with_unavailable("umap", "umap-learn")
    })
}

/// The `redim` stage.
pub struct RedimStage {
    input_column: String,
    output_column: String,
    method: String,
    reducer: BoxedReducer,
}

impl std::fmt::Debug for RedimStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedimStage")
            .field("input_column", &self.input_column)
            .field("output_column", &self.output_column)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl RedimStage {
    /// Build the stage from the words following the `redim` verb.
    ///
    /// # Errors
    /// Returns [`ttm_core::DependencyError`] for unknown or unavailable
    /// methods and [`ttm_core::TtmError::Config`] for bad arguments. Words
    /// after the method name all belong to it.
    pub fn from_words(
        input_column: impl Into<String>,
        output_column: impl Into<String>,
        words: &[String],
    ) -> Result<Self> {
        let registry = reducer_registry();
        let invocation = registry.single_invocation(words)?;
        Ok(Self {
            input_column: input_column.into(),
            output_column: output_column.into(),
            method: invocation.describe(),
            reducer: registry.resolve(&invocation.method, &invocation.args)?,
        })
    }

    /// Decode the input column and reduce it.
    ///
    /// # Errors
    /// Returns source errors, method errors, and [`SchemaError`] when the
    /// method returns the wrong number of rows.
    #[instrument(name = "redim.reduce", err, skip(self, source), fields(method = %self.method))]
    pub fn reduce(&self, source: &mut TableSource) -> Result<Matrix> {
        let vectors = source.matrix(&self.input_column)?;
        info!(
            rows = vectors.rows(),
            dimensions = vectors.cols(),
            "reducing vectors"
        );
        let reduced = self.reducer.reduce(&vectors)?;
        if reduced.rows() != vectors.rows() {
            return Err(SchemaError::ValueCountMismatch {
                column: self.output_column.clone(),
                expected: vectors.rows(),
                actual: reduced.rows(),
            }
            .into());
        }
        info!(
            method = self.reducer.name(),
            dimensions = reduced.cols(),
            "reduced vectors"
        );
        Ok(reduced)
    }
}

impl Stage for RedimStage {
    fn name(&self) -> &str {
        "redim"
    }

    fn method(&self) -> String {
        self.method.clone()
    }

    fn output_column(&self) -> &str {
        &self.output_column
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        self.reduce(source)?.to_cells(&self.method)
    }
}

#[cfg(test)]
mod tests;
