//! Cluster descriptions and the `desc` stage.
//!
//! A [`Describer`] sees every `(cluster, text)` pair once and returns one
//! description per cluster; the stage then copies each row's cluster
//! description into the new column.

mod tfidf;

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::{info, instrument};
use ttm_core::{MethodRegistry, Result, Stage, TableSource};

pub use self::tfidf::ClassTfIdf;

/// Default column holding the documents' text.
pub const DEFAULT_TEXT_COLUMN: &str = "text";
/// Default column holding cluster labels.
pub const DEFAULT_CLUSTER_COLUMN: &str = "cluster";
/// Default column receiving the description.
pub const DEFAULT_OUTPUT_COLUMN: &str = "desc";

/// One `(cluster, text)` pair per row.
pub type LabelledDocuments<'a> = dyn Iterator<Item = Result<(String, String)>> + 'a;

/// Summarises the documents of each cluster.
pub trait Describer {
    /// Method name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Describe every cluster appearing in `documents`.
    ///
    /// # Errors
    /// Returns errors raised while reading the documents.
    fn describe(&self, documents: &mut LabelledDocuments<'_>) -> Result<HashMap<String, String>>;
}

/// Boxed describer as produced by the registry.
pub type BoxedDescriber = Box<dyn Describer>;

/// Registry of description methods.
#[must_use]
pub fn describer_registry() -> &'static MethodRegistry<BoxedDescriber> {
    static REGISTRY: OnceLock<MethodRegistry<BoxedDescriber>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        MethodRegistry::new("desc").with("tfidf", |args| {
            ClassTfIdf::from_args(args).map(|m| Box::new(m) as BoxedDescriber)
        })
    })
}

/// The `desc` stage.
pub struct DescStage {
    text_column: String,
    cluster_column: String,
    output_column: String,
    method: String,
    describer: BoxedDescriber,
}

impl std::fmt::Debug for DescStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescStage")
            .field("text_column", &self.text_column)
            .field("cluster_column", &self.cluster_column)
            .field("output_column", &self.output_column)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Column names used by [`DescStage`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DescColumns {
    /// Column holding the documents' text.
    pub text: String,
    /// Column holding cluster labels.
    pub cluster: String,
    /// Column receiving the description.
    pub output: String,
}

impl Default for DescColumns {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_COLUMN.to_owned(),
            cluster: DEFAULT_CLUSTER_COLUMN.to_owned(),
            output: DEFAULT_OUTPUT_COLUMN.to_owned(),
        }
    }
}

impl DescStage {
    /// Build the stage from the words following the `desc` verb.
    ///
    /// # Errors
    /// Returns [`ttm_core::DependencyError`] for unknown methods,
    /// [`ttm_core::TtmError::Config`] for bad arguments, including extra words.
    pub fn from_words(columns: DescColumns, words: &[String]) -> Result<Self> {
        let registry = describer_registry();
        let invocation = registry.single_invocation(words)?;
        let describer = registry.resolve(&invocation.method, &invocation.args)?;
        Ok(Self {
            text_column: columns.text,
            cluster_column: columns.cluster,
            output_column: columns.output,
            method: invocation.describe(),
            describer,
        })
    }

    /// Describe every cluster in `source`.
    ///
    /// # Errors
    /// Returns source errors, including a missing text or cluster column.
    #[instrument(name = "desc.describe", err, skip(self, source), fields(method = %self.method))]
    pub fn descriptions(&self, source: &mut TableSource) -> Result<HashMap<String, String>> {
        let text = source.column(&self.text_column)?;
        let cluster = source.column(&self.cluster_column)?;
        let mut pairs = source.rows()?.map(|row| {
            row.map(|row| (cluster.cell(&row).to_owned(), text.cell(&row).to_owned()))
        });
        let descriptions = self.describer.describe(&mut pairs)?;
        info!(
            method = self.describer.name(),
            clusters = descriptions.len(),
            "described clusters"
        );
        Ok(descriptions)
    }
}

impl Stage for DescStage {
    fn name(&self) -> &str {
        "desc"
    }

    fn method(&self) -> String {
        self.method.clone()
    }

    fn output_column(&self) -> &str {
        &self.output_column
    }

    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>> {
        let descriptions = self.descriptions(source)?;
        let cluster = source.column(&self.cluster_column)?;
        source
            .cells(&cluster)?
            .map(|label| label.map(|label| descriptions.get(&label).cloned().unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests;
