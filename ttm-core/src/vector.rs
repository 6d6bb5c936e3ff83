//! Vector cells and the dense matrices decoded from them.
//!
//! Vector cells are JSON arrays of numbers. A column of vector cells decodes
//! into a row-major [`Matrix`] whose rows all share one dimensionality.

use thiserror::Error;

use crate::error::{FormatError, Result, TtmError};

/// A vector that cannot be written as a cell.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VectorCellError {
    /// JSON has no NaN or infinity, so such components cannot be stored.
    #[error("component {index} is {value}, which a vector cell cannot hold")]
    NonFinite {
        /// Position of the component.
        index: usize,
        /// The offending value.
        value: f64,
    },
    /// The JSON encoder failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Encode a vector as a JSON array cell.
///
/// # Errors
/// Returns [`VectorCellError::NonFinite`] naming the first NaN or infinite
/// component.
///
/// # Examples
/// ```
/// use ttm_core::vector::encode_vector;
///
/// assert_eq!(encode_vector(&[0.5, 2.0])?, "[0.5,2.0]");
/// assert!(encode_vector(&[1.0, f64::NAN]).is_err());
/// # Ok::<(), ttm_core::vector::VectorCellError>(())
/// ```
pub fn encode_vector(values: &[f64]) -> core::result::Result<String, VectorCellError> {
    let non_finite = values.iter().enumerate().find(|(_, value)| !value.is_finite());
    if let Some((index, &value)) = non_finite {
        return Err(VectorCellError::NonFinite { index, value });
    }
    Ok(serde_json::to_string(values)?)
}

/// Encode row `row` of the output of `method`, reporting unencodable values
/// as failures of that method.
pub(crate) fn encode_row(method: &str, row: usize, values: &[f64]) -> Result<String> {
    encode_vector(values).map_err(|err| {
        TtmError::algorithm(method, format!("row {row} has no vector cell: {err}"))
    })
}

/// Decode a JSON array cell.
///
/// # Errors
/// Returns the JSON diagnostic when the cell is not an array of numbers.
pub fn decode_vector(cell: &str) -> core::result::Result<Vec<f64>, serde_json::Error> {
    serde_json::from_str(cell)
}

/// Dense row-major matrix of `f64` values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Build a matrix from a flat row-major buffer.
    ///
    /// Returns `None` when `data.len() != rows * cols`.
    #[must_use]
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (rows.checked_mul(cols) == Some(data.len())).then_some(Self { rows, cols, data })
    }

    /// A `rows × cols` matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from owned rows, requiring equal lengths.
    ///
    /// # Errors
    /// Returns [`FormatError::InconsistentDimension`] naming the first row
    /// whose length differs from row `0`.
    pub fn from_rows(column: &str, rows: Vec<Vec<f64>>) -> core::result::Result<Self, FormatError> {
        let mut builder = MatrixBuilder::new(column);
        for row in rows {
            builder.push(row)?;
        }
        Ok(builder.finish())
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the matrix has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `index`.
    ///
    /// # Panics
    /// Panics when `index >= self.rows()`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Mutably borrow row `index`.
    ///
    /// # Panics
    /// Panics when `index >= self.rows()`.
    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        let start = index * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Iterate rows in order.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        // `chunks_exact(0)` panics, so zero-width matrices yield empty slices.
        (0..self.rows).map(move |index| self.row(index))
    }

    /// Borrow the flat row-major buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Keep only the rows whose index satisfies `keep`.
    #[must_use]
    pub fn select_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let mut data = Vec::new();
        let mut rows = 0;
        for index in 0..self.rows {
            if keep(index) {
                data.extend_from_slice(self.row(index));
                rows += 1;
            }
        }
        Self {
            rows,
            cols: self.cols,
            data,
        }
    }

    /// Encode every row as a vector cell.
    ///
    /// # Errors
    /// Returns [`TtmError::Algorithm`] for `method` when a row holds a NaN or
    /// infinite value.
    pub fn to_cells(&self, method: &str) -> Result<Vec<String>> {
        self.iter_rows()
            .enumerate()
            .map(|(row, values)| encode_row(method, row, values))
            .collect()
    }

    /// Concatenate matrices column-wise, preserving argument order.
    ///
    /// Returns `None` when the row counts differ.
    #[must_use]
    pub fn hstack(parts: &[Self]) -> Option<Self> {
        let rows = parts.first().map_or(0, Self::rows);
        if parts.iter().any(|part| part.rows != rows) {
            return None;
        }
        let cols = parts.iter().map(Self::cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for index in 0..rows {
            for part in parts {
                data.extend_from_slice(part.row(index));
            }
        }
        Some(Self { rows, cols, data })
    }
}

/// Incrementally decodes a vector column while checking dimensionality.
#[derive(Debug)]
pub struct MatrixBuilder<'a> {
    column: &'a str,
    cols: Option<usize>,
    rows: usize,
    data: Vec<f64>,
}

impl<'a> MatrixBuilder<'a> {
    /// Start decoding `column`.
    #[must_use]
    pub fn new(column: &'a str) -> Self {
        Self {
            column,
            cols: None,
            rows: 0,
            data: Vec::new(),
        }
    }

    /// Decode and append one vector cell.
    ///
    /// # Errors
    /// Returns [`FormatError::InvalidVector`] or
    /// [`FormatError::InconsistentDimension`] naming the row.
    pub fn push_cell(&mut self, cell: &str) -> core::result::Result<(), FormatError> {
        let values = decode_vector(cell).map_err(|err| FormatError::InvalidVector {
            row: self.rows,
            column: self.column.to_owned(),
            message: err.to_string(),
        })?;
        self.push(values)
    }

    /// Append one decoded vector.
    ///
    /// # Errors
    /// Returns [`FormatError::InconsistentDimension`] when the length differs
    /// from the first row.
    pub fn push(&mut self, values: Vec<f64>) -> core::result::Result<(), FormatError> {
        let expected = *self.cols.get_or_insert(values.len());
        if values.len() != expected {
            return Err(FormatError::InconsistentDimension {
                row: self.rows,
                column: self.column.to_owned(),
                expected,
                actual: values.len(),
            });
        }
        self.data.extend(values);
        self.rows += 1;
        Ok(())
    }

    /// Finish decoding.
    #[must_use]
    pub fn finish(self) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols.unwrap_or(0),
            data: self.data,
        }
    }
}
