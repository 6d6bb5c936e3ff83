//! Table sources: the seekable-file and buffered-stream duality.
//!
//! A [`TableSource`] hands stages any number of passes over a table. A
//! seekable source reopens its file for every pass and so never holds more
//! than one row in memory. A buffered source wraps a stream that cannot be
//! rewound; the first pass materialises every line and later passes replay
//! that copy. Stages never branch on the variant.
//!
//! Opening a file only checks that it exists. The first pass validates the
//! whole table (header, per-row field counts, id uniqueness) and caches the
//! resulting [`TableShape`].

mod lines;

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::compression::Compression;
use crate::error::{FormatError, Result, SchemaError, TtmError};
use crate::table::{Header, ID_COLUMN, IdGuard, Row, Table};
use crate::vector::{Matrix, MatrixBuilder};

use self::lines::LineSource;

/// Name used for the ambient input stream in diagnostics.
pub const STDIN_NAME: &str = "<stdin>";

/// Where a stage reads its table from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InputDesignator {
    /// The ambient input stream.
    Stdin,
    /// A file path.
    Path(PathBuf),
}

impl InputDesignator {
    /// Interpret an optional `-i` argument; `-` and absence mean stdin.
    #[must_use]
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(path) if path != Path::new("-") => Self::Path(path.to_path_buf()),
            _ => Self::Stdin,
        }
    }
}

/// Header and row count established by the validating pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableShape {
    /// Data column names.
    pub header: Header,
    /// Number of data rows.
    pub rows: usize,
}

/// Resolved position of a column within a source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnRef {
    name: String,
    position: Option<usize>,
}

impl ColumnRef {
    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow this column's cell from `row`.
    #[must_use]
    pub fn cell<'r>(&self, row: &'r Row) -> &'r str {
        match self.position {
            None => row.id.as_str(),
            Some(position) => row.cells.get(position).map_or("", String::as_str),
        }
    }

    fn pick(&self, row: Row) -> String {
        match self.position {
            None => row.id.as_str().to_owned(),
            Some(position) => row.cells.into_iter().nth(position).unwrap_or_default(),
        }
    }
}

/// Multi-pass access to a table, backed by a file or a buffered stream.
pub struct TableSource {
    name: String,
    lines: LineSource,
    shape: Option<TableShape>,
}

impl std::fmt::Debug for TableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSource")
            .field("name", &self.name)
            .field("seekable", &self.is_seekable())
            .field("shape", &self.shape)
            .finish()
    }
}

/// Boxed iterator over the rows of one pass.
pub type RowPass<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

impl TableSource {
    /// Resolve `designator`, reading stdin lazily when it names the stream.
    ///
    /// # Errors
    /// See [`TableSource::open_path`].
    pub fn open(designator: &InputDesignator) -> Result<Self> {
        match designator {
            InputDesignator::Stdin => Ok(Self::from_reader(
                STDIN_NAME,
                Box::new(std::io::stdin().lock()),
            )),
            InputDesignator::Path(path) => Self::open_path(path),
        }
    }

    /// Open a seekable source. Nothing is read until the first pass.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when the path does not exist or is not a
    /// regular file, and [`TtmError::Dependency`] when its compression codec
    /// is not compiled in.
    #[instrument(name = "source.open", err, fields(path = %path.display()))]
    pub fn open_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let metadata = fs::metadata(path).map_err(|source| TtmError::io(&name, source))?;
        if !metadata.is_file() {
            return Err(TtmError::io(
                name,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let compression = Compression::from_path(path);
        compression.ensure_supported(path)?;
        Ok(Self {
            name,
            lines: LineSource::Seekable {
                path: path.to_path_buf(),
                compression,
            },
            shape: None,
        })
    }

    /// Wrap a non-seekable stream. It is materialised on the first pass.
    #[must_use]
    pub fn from_reader(name: impl Into<String>, reader: Box<dyn BufRead>) -> Self {
        Self {
            name: name.into(),
            lines: LineSource::Buffered {
                pending: Some(reader),
                lines: Vec::new(),
            },
            shape: None,
        }
    }

    /// Path or stream name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether passes re-read from disk rather than from memory.
    #[must_use]
    pub const fn is_seekable(&self) -> bool {
        matches!(self.lines, LineSource::Seekable { .. })
    }

    /// Validate the table and return its shape.
    ///
    /// The first call performs a full pass, holding only the set of ids seen
    /// so far; later calls return the cached shape.
    ///
    /// # Errors
    /// Returns [`TtmError::Format`] naming the offending row, or
    /// [`TtmError::Io`] when reading fails.
    pub fn shape(&mut self) -> Result<&TableShape> {
        if self.shape.is_none() {
            let shape = self.scan()?;
            debug!(
                table = self.name.as_str(),
                rows = shape.rows,
                columns = shape.header.len(),
                "validated table"
            );
            self.shape = Some(shape);
        }
        self.shape
            .as_ref()
            .ok_or_else(|| TtmError::format(&self.name, FormatError::EmptyInput))
    }

    #[instrument(name = "source.scan", err, skip(self), fields(table = %self.name))]
    fn scan(&mut self) -> Result<TableShape> {
        let name = self.name.clone();
        let mut lines = self.lines.pass(&name)?;
        let header_line = lines
            .next()
            .ok_or_else(|| TtmError::format(&name, FormatError::EmptyInput))??;
        let header = Header::from_fields(crate::table::codec::split_record(&header_line))
            .map_err(|error| TtmError::format(&name, error))?;
        let width = header.len();
        let mut ids = IdGuard::default();
        let mut rows = 0;
        for line in lines {
            let line = line?;
            let row = Row::parse(&line, width, rows).map_err(|error| TtmError::format(&name, error))?;
            ids.admit(&row.id, rows)
                .map_err(|error| TtmError::format(&name, error))?;
            rows += 1;
        }
        Ok(TableShape { header, rows })
    }

    /// Number of data rows.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn len(&mut self) -> Result<usize> {
        Ok(self.shape()?.rows)
    }

    /// Whether the table has no data rows.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The validated header.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn header(&mut self) -> Result<Header> {
        Ok(self.shape()?.header.clone())
    }

    /// Start a pass over every row, validating first if necessary.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn rows(&mut self) -> Result<RowPass<'_>> {
        let width = self.shape()?.header.len();
        let name = self.name.clone();
        let mut lines = self.lines.pass(&name)?;
        // Skip the header; it was validated by `shape`.
        if let Some(header) = lines.next() {
            header?;
        }
        Ok(Box::new(lines.enumerate().map(move |(index, line)| {
            let line = line?;
            Row::parse(&line, width, index).map_err(|error| TtmError::format(&name, error))
        })))
    }

    /// Resolve `column`, accepting `id` as well as any data column.
    ///
    /// # Errors
    /// Returns [`SchemaError::MissingColumn`] when the column is absent.
    pub fn column(&mut self, column: &str) -> Result<ColumnRef> {
        if column == ID_COLUMN {
            return Ok(ColumnRef {
                name: column.to_owned(),
                position: None,
            });
        }
        let position = self.shape()?.header.position(column).ok_or_else(|| {
            SchemaError::MissingColumn {
                column: column.to_owned(),
            }
        })?;
        Ok(ColumnRef {
            name: column.to_owned(),
            position: Some(position),
        })
    }

    /// Whether `column` exists.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn has_column(&mut self, column: &str) -> Result<bool> {
        Ok(self.shape()?.header.contains(column))
    }

    /// Start a pass yielding the cells of one column.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn cells<'a>(
        &'a mut self,
        column: &'a ColumnRef,
    ) -> Result<Box<dyn Iterator<Item = Result<String>> + 'a>> {
        let rows = self.rows()?;
        Ok(Box::new(rows.map(move |row| row.map(|row| column.pick(row)))))
    }

    /// Collect one column into memory.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn collect_column(&mut self, column: &str) -> Result<Vec<String>> {
        let column = self.column(column)?;
        self.cells(&column)?.collect()
    }

    /// Decode a vector column into a dense matrix.
    ///
    /// # Errors
    /// Returns [`TtmError::Format`] when a cell is not a vector or when
    /// dimensionalities disagree.
    #[instrument(name = "source.matrix", err, skip(self), fields(table = %self.name))]
    pub fn matrix(&mut self, column: &str) -> Result<Matrix> {
        let column = self.column(column)?;
        let name = self.name.clone();
        let mut builder = MatrixBuilder::new(column.name());
        for cell in self.cells(&column)? {
            builder
                .push_cell(&cell?)
                .map_err(|error| TtmError::format(&name, error))?;
        }
        Ok(builder.finish())
    }

    /// Dimensionality of the first vector in `column`, if any.
    ///
    /// # Errors
    /// Returns [`TtmError::Format`] when the first cell is not a vector.
    pub fn first_vector_len(&mut self, column: &str) -> Result<Option<usize>> {
        let column = self.column(column)?;
        let name = self.name.clone();
        let Some(cell) = self.cells(&column)?.next() else {
            return Ok(None);
        };
        let mut builder = MatrixBuilder::new(column.name());
        builder
            .push_cell(&cell?)
            .map_err(|error| TtmError::format(&name, error))?;
        Ok(Some(builder.finish().cols()))
    }

    /// Read the whole table into memory.
    ///
    /// # Errors
    /// See [`TableSource::shape`].
    pub fn read_table(&mut self) -> Result<Table> {
        let header = self.header()?;
        let name = self.name.clone();
        let mut table = Table::new(header);
        for row in self.rows()? {
            table
                .push_row(row?)
                .map_err(|error| TtmError::format(&name, error))?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests;
