//! In-memory table model used by corpus ingestion and tests.
//!
//! A table is an ordered list of rows sharing a header. The `id` column is
//! implicit: [`Header`] names only the data columns while every [`Row`] carries
//! its [`DocumentId`] separately. Columns are only ever appended.

pub mod codec;

use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead, Write};

use crate::error::{FormatError, Result, SchemaError, TtmError};
use crate::vector::encode_row;

/// Name of the mandatory first column.
pub const ID_COLUMN: &str = "id";

/// Stable identifier correlating rows across independently produced tables.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an externally supplied id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the `<file>:<index>` id used for corpus-derived rows.
    ///
    /// # Examples
    /// ```
    /// use ttm_core::DocumentId;
    ///
    /// assert_eq!(DocumentId::from_parts("a.txt", 1).as_str(), "a.txt:1");
    /// ```
    #[must_use]
    pub fn from_parts(file: &str, index: usize) -> Self {
        Self(format!("{file}:{index}"))
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Ordered, unique data column names (the `id` column excluded).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Build a header from data column names.
    ///
    /// # Errors
    /// Returns [`FormatError::DuplicateColumn`] for repeated names, including
    /// any column named `id`.
    pub fn new<I, S>(columns: I) -> core::result::Result<Self, FormatError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut header = Self::default();
        for column in columns {
            let column = column.into();
            if column == ID_COLUMN || header.position(&column).is_some() {
                return Err(FormatError::DuplicateColumn { column });
            }
            header.columns.push(column);
        }
        Ok(header)
    }

    /// Parse the decoded fields of a header line.
    ///
    /// # Errors
    /// Returns [`FormatError::MissingIdColumn`] when the first field is not
    /// `id`, or [`FormatError::DuplicateColumn`] for repeated names.
    pub fn from_fields(fields: Vec<String>) -> core::result::Result<Self, FormatError> {
        let mut fields = fields.into_iter();
        match fields.next() {
            Some(first) if first == ID_COLUMN => Self::new(fields),
            Some(found) => Err(FormatError::MissingIdColumn { found }),
            None => Err(FormatError::EmptyInput),
        }
    }

    /// Data column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no data columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of `column` among the data columns.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Whether `column` is present, counting the implicit `id` column.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        column == ID_COLUMN || self.position(column).is_some()
    }

    pub(crate) fn push(&mut self, column: &str) -> core::result::Result<(), SchemaError> {
        if self.contains(column) {
            return Err(SchemaError::ColumnExists {
                column: column.to_owned(),
            });
        }
        self.columns.push(column.to_owned());
        Ok(())
    }

    /// Write the header line, `id` first.
    ///
    /// # Errors
    /// Returns any [`io::Error`] raised by `writer`.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        codec::write_record(
            writer,
            std::iter::once(ID_COLUMN).chain(self.columns.iter().map(String::as_str)),
        )
    }
}

/// One document: its id plus one cell per data column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    /// Document id.
    pub id: DocumentId,
    /// Cells in header order.
    pub cells: Vec<String>,
}

impl Row {
    /// Build a row.
    #[must_use]
    pub fn new(id: DocumentId, cells: Vec<String>) -> Self {
        Self { id, cells }
    }

    /// Decode one data line against a header of `width` data columns.
    ///
    /// # Errors
    /// Returns [`FormatError::ColumnCountMismatch`] or
    /// [`FormatError::EmptyId`] naming `row`.
    pub fn parse(line: &str, width: usize, row: usize) -> core::result::Result<Self, FormatError> {
        let mut fields = codec::split_record(line);
        if fields.len() != width + 1 {
            return Err(FormatError::ColumnCountMismatch {
                row,
                expected: width + 1,
                actual: fields.len(),
            });
        }
        let cells = fields.split_off(1);
        let id = fields.pop().unwrap_or_default();
        if id.is_empty() {
            return Err(FormatError::EmptyId { row });
        }
        Ok(Self {
            id: DocumentId(id),
            cells,
        })
    }

    /// Write the row, `id` first.
    ///
    /// # Errors
    /// Returns any [`io::Error`] raised by `writer`.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        codec::write_record(
            writer,
            std::iter::once(self.id.as_str()).chain(self.cells.iter().map(String::as_str)),
        )
    }
}

/// Tracks ids seen so far while streaming rows.
#[derive(Debug, Default)]
pub(crate) struct IdGuard {
    seen: HashSet<String>,
}

impl IdGuard {
    pub(crate) fn admit(&mut self, id: &DocumentId, row: usize) -> core::result::Result<(), FormatError> {
        if self.seen.insert(id.as_str().to_owned()) {
            Ok(())
        } else {
            Err(FormatError::DuplicateId {
                row,
                id: id.as_str().to_owned(),
            })
        }
    }
}

/// A fully materialised table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    header: Header,
    rows: Vec<Row>,
    ids: HashSet<DocumentId>,
}

impl Table {
    /// Create an empty table with the given header.
    #[must_use]
    pub fn new(header: Header) -> Self {
        Self {
            header,
            rows: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Append a row.
    ///
    /// # Errors
    /// Returns [`FormatError::ColumnCountMismatch`], [`FormatError::EmptyId`]
    /// or [`FormatError::DuplicateId`] naming the index the row would take.
    pub fn push_row(&mut self, row: Row) -> core::result::Result<(), FormatError> {
        let index = self.rows.len();
        if row.cells.len() != self.header.len() {
            return Err(FormatError::ColumnCountMismatch {
                row: index,
                expected: self.header.len() + 1,
                actual: row.cells.len() + 1,
            });
        }
        if row.id.as_str().is_empty() {
            return Err(FormatError::EmptyId { row: index });
        }
        if !self.ids.insert(row.id.clone()) {
            return Err(FormatError::DuplicateId {
                row: index,
                id: row.id.0,
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// The table header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of `column` in row order.
    ///
    /// # Errors
    /// Returns [`SchemaError::MissingColumn`] when the column is absent.
    pub fn column(&self, column: &str) -> core::result::Result<Vec<&str>, SchemaError> {
        if column == ID_COLUMN {
            return Ok(self.rows.iter().map(|row| row.id.as_str()).collect());
        }
        let position = self
            .header
            .position(column)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: column.to_owned(),
            })?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.cells.get(position).map_or("", String::as_str))
            .collect())
    }

    /// Append a column, extending the header and every row by one cell.
    ///
    /// # Errors
    /// Returns [`SchemaError::ColumnExists`] when the name is taken or
    /// [`SchemaError::ValueCountMismatch`] when `values` does not hold exactly
    /// one value per row. The table is unchanged on error.
    pub fn append_column(
        &mut self,
        name: &str,
        values: Vec<String>,
    ) -> core::result::Result<(), SchemaError> {
        check_value_count(name, self.rows.len(), values.len())?;
        self.header.push(name)?;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.cells.push(value);
        }
        Ok(())
    }

    /// Append a vector column from a flat row-major buffer of
    /// `rows × dimension` values.
    ///
    /// # Errors
    /// Returns [`SchemaError::VectorShapeMismatch`] when the buffer does not
    /// match the table shape, [`TtmError::Algorithm`] naming the column when
    /// a value is NaN or infinite, or the errors of [`Table::append_column`].
    ///
    /// # Examples
    /// ```
    /// use ttm_core::{DocumentId, Header, Row, SchemaError, Table, TtmError};
    ///
    /// let mut table = Table::new(Header::new(["text"])?);
    /// table.push_row(Row::new(DocumentId::from_parts("a.txt", 0), vec!["x".into()]))?;
    /// table.push_row(Row::new(DocumentId::from_parts("a.txt", 1), vec!["y".into()]))?;
    ///
    /// let err = table
    ///     .append_vector_column("highdim", &[0.5, 1.0], 3)
    ///     .expect_err("two values cannot fill two rows of three");
    /// assert!(matches!(err, TtmError::Schema(SchemaError::VectorShapeMismatch { .. })));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn append_vector_column(
        &mut self,
        name: &str,
        values: &[f64],
        dimension: usize,
    ) -> Result<()> {
        let rows = self.rows.len();
        if rows.checked_mul(dimension) != Some(values.len()) || (dimension == 0 && rows > 0) {
            return Err(SchemaError::VectorShapeMismatch {
                column: name.to_owned(),
                rows,
                dimension,
                values: values.len(),
            }
            .into());
        }
        let cells = values
            .chunks(dimension.max(1))
            .enumerate()
            .map(|(row, vector)| encode_row(name, row, vector))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.append_column(name, cells)?)
    }

    /// Parse a table from `reader`, validating structure and id uniqueness.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] for read failures and [`TtmError::Format`]
    /// for structural violations; both name `table`.
    pub fn read<R: BufRead>(reader: R, table: &str) -> Result<Self> {
        let mut lines = reader.lines();
        let header_line = lines
            .next()
            .ok_or_else(|| TtmError::format(table, FormatError::EmptyInput))?
            .map_err(|source| TtmError::io(table, source))?;
        let header = Header::from_fields(codec::split_record(&header_line))
            .map_err(|error| TtmError::format(table, error))?;
        let width = header.len();
        let mut parsed = Self::new(header);
        for (index, line) in lines.enumerate() {
            let line = line.map_err(|source| TtmError::io(table, source))?;
            let row = Row::parse(&line, width, index).map_err(|error| TtmError::format(table, error))?;
            parsed
                .push_row(row)
                .map_err(|error| TtmError::format(table, error))?;
        }
        Ok(parsed)
    }

    /// Serialise the header followed by every row.
    ///
    /// # Errors
    /// Returns any [`io::Error`] raised by `writer`.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.header.write(writer)?;
        for row in &self.rows {
            row.write(writer)?;
        }
        Ok(())
    }
}

/// Ensure a derived column holds exactly one value per row.
///
/// # Errors
/// Returns [`SchemaError::ValueCountMismatch`] otherwise.
pub fn check_value_count(
    column: &str,
    expected: usize,
    actual: usize,
) -> core::result::Result<(), SchemaError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SchemaError::ValueCountMismatch {
            column: column.to_owned(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests;
