//! Enrichment stages and the runner that drives them.
//!
//! A [`Stage`] derives one new cell per row from a [`TableSource`]. The
//! [`StageRunner`] owns everything around that: validating the input,
//! refusing to overwrite an existing column, checking the value count, and
//! streaming the enriched table to the sink. Nothing is written until every
//! value has been derived.

use std::io::Write;
use std::time::Instant;

use tracing::{Span, field, info, instrument};

use crate::error::{FormatError, Result, SchemaError, TtmError};
use crate::sink::TableWriter;
use crate::source::TableSource;
use crate::table::check_value_count;

/// One enrichment step.
pub trait Stage {
    /// Stage verb, such as `embed`.
    fn name(&self) -> &str;

    /// Human-readable description of the configured method(s).
    fn method(&self) -> String;

    /// Column the stage appends.
    fn output_column(&self) -> &str;

    /// Derive one cell per input row, in row order.
    ///
    /// # Errors
    /// Implementations return any error raised while reading the source or
    /// running the method.
    fn derive(&self, source: &mut TableSource) -> Result<Vec<String>>;
}

/// Outcome of a completed stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StageSummary {
    /// Stage verb.
    pub stage: String,
    /// Column appended.
    pub column: String,
    /// Rows written.
    pub rows: usize,
    /// Whether the input was re-read from disk between passes.
    pub seekable: bool,
}

/// Drives a [`Stage`] from source to sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageRunner;

impl StageRunner {
    /// Create a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run `stage` over `source`, writing the enriched table to `writer`.
    ///
    /// Existing columns are copied unchanged and in order; the derived column
    /// is appended last. `writer` receives nothing if any step fails before
    /// the final pass.
    ///
    /// # Errors
    /// Returns [`SchemaError::ColumnExists`] when the output column is
    /// already present, [`SchemaError::ValueCountMismatch`] when the stage
    /// derives the wrong number of values, [`FormatError::RowCountChanged`]
    /// when the final pass disagrees with the first on the row count, and any
    /// source, method or sink error.
    #[instrument(
        name = "stage.run",
        err,
        skip(self, stage, source, writer),
        fields(stage = stage.name(), method = field::Empty, column = stage.output_column(), rows = field::Empty),
    )]
    pub fn run<W: Write>(
        &self,
        stage: &dyn Stage,
        source: &mut TableSource,
        writer: &mut TableWriter<W>,
    ) -> Result<StageSummary> {
        let started = Instant::now();
        let span = Span::current();
        let method = stage.method();
        span.record("method", field::display(&method));

        let column = stage.output_column();
        let mut header = source.header()?;
        let rows = source.len()?;
        span.record("rows", rows);
        if header.contains(column) {
            return Err(SchemaError::ColumnExists {
                column: column.to_owned(),
            }
            .into());
        }

        info!(
            stage = stage.name(),
            method = method.as_str(),
            input = source.name(),
            "applying method"
        );
        let values = stage.derive(source)?;
        check_value_count(column, rows, values.len())?;
        header.push(column)?;

        writer.write_header(&header)?;
        let input = source.name().to_owned();
        let mut cells = values.iter();
        let mut written = 0;
        for row in source.rows()? {
            let row = row?;
            let Some(value) = cells.next() else {
                return Err(row_count_changed(&input, rows, written + 1));
            };
            writer.write_row(
                &row.id,
                row.cells
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(value.as_str())),
            )?;
            written += 1;
        }
        if written != rows {
            return Err(row_count_changed(&input, rows, written));
        }
        writer.flush()?;

        info!(
            stage = stage.name(),
            rows,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "stage completed"
        );
        Ok(StageSummary {
            stage: stage.name().to_owned(),
            column: column.to_owned(),
            rows,
            seekable: source.is_seekable(),
        })
    }
}

fn row_count_changed(table: &str, expected: usize, actual: usize) -> TtmError {
    TtmError::format(table, FormatError::RowCountChanged { expected, actual })
}

#[cfg(test)]
mod tests;
