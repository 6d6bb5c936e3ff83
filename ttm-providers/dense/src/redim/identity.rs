//! The `id` reducer.

use clap::Parser;
use ttm_core::{Matrix, Result, parse_method_args};

use super::Reducer;

#[derive(Debug, Parser)]
#[command(about = "Copy vectors verbatim")]
struct IdentityArgs {}

/// Copies every vector unchanged; useful to run clustering on `highdim`
/// through the usual `lowdim` column.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Identity;

impl Identity {
    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let IdentityArgs {} = parse_method_args("id", args)?;
        Ok(Self)
    }
}

impl Reducer for Identity {
    fn name(&self) -> &'static str {
        "id"
    }

    fn reduce(&self, vectors: &Matrix) -> Result<Matrix> {
        Ok(vectors.clone())
    }
}
