//! The `argmax` clusterer.

use clap::Parser;
use ttm_core::{Matrix, Result, parse_method_args};

use super::Clusterer;

#[derive(Debug, Parser)]
#[command(about = "Label each row with its largest component")]
struct ArgmaxArgs {}

/// Labels each row with the index of its largest component, the first one on
/// ties. Paired with `lda`, this assigns every document its dominant topic.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Argmax;

impl Argmax {
    pub(super) fn from_args(args: &[String]) -> Result<Self> {
        let ArgmaxArgs {} = parse_method_args("argmax", args)?;
        Ok(Self)
    }
}

impl Clusterer for Argmax {
    fn name(&self) -> &'static str {
        "argmax"
    }

    #[expect(clippy::cast_possible_wrap, reason = "vector widths fit in i64")]
    fn cluster(&self, vectors: &Matrix) -> Result<Vec<i64>> {
        Ok(vectors
            .iter_rows()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold(None, |best: Option<(usize, f64)>, (index, &value)| match best {
                        Some((_, top)) if top >= value => best,
                        _ => Some((index, value)),
                    })
                    .map_or(0, |(index, _)| index as i64)
            })
            .collect())
    }
}
