//! Error types for the ttm core library.
//!
//! Every failure a stage can raise is one of five kinds: I/O, malformed table
//! structure, schema violations while enriching, missing method capabilities,
//! and failures inside a method itself. Configuration problems with method
//! arguments form a sixth, user-facing kind.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident
                    $( { $($pattern:tt)* } )?
                    $( ( $($tuple:tt)* ) )?
                    => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(
                        Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )?
                            => $CodeTy::$CodeVariant,
                    )+
                }
            }
        }
    };
}

/// Structural problems found while decoding a table.
///
/// Row indices are zero-based and count data rows only, so the header is never
/// row `0`.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FormatError {
    /// The input held no header line.
    #[error("table is empty; expected a header line starting with `id`")]
    EmptyInput,
    /// The first header field was not `id`.
    #[error("first header column must be `id` (found `{found}`)")]
    MissingIdColumn {
        /// The field found in place of `id`.
        found: String,
    },
    /// A column name appeared twice in the header.
    #[error("column `{column}` appears more than once in the header")]
    DuplicateColumn {
        /// Repeated column name.
        column: String,
    },
    /// A row carried a different number of fields than the header.
    #[error("row {row} has {actual} fields but the header declares {expected}")]
    ColumnCountMismatch {
        /// Offending data row.
        row: usize,
        /// Field count declared by the header, including `id`.
        expected: usize,
        /// Field count found on the row.
        actual: usize,
    },
    /// A row had an empty document id.
    #[error("row {row} has an empty document id")]
    EmptyId {
        /// Offending data row.
        row: usize,
    },
    /// A document id was already used by an earlier row.
    #[error("row {row} repeats document id `{id}`")]
    DuplicateId {
        /// Row holding the second occurrence.
        row: usize,
        /// The repeated id.
        id: String,
    },
    /// A vector cell was not a JSON array of numbers.
    #[error("row {row} column `{column}` is not a numeric vector: {message}")]
    InvalidVector {
        /// Offending data row.
        row: usize,
        /// Column holding the cell.
        column: String,
        /// Decoder diagnostic.
        message: String,
    },
    /// A vector cell had a different length from the first row's vector.
    #[error("row {row} column `{column}` has {actual} dimensions, expected {expected}")]
    InconsistentDimension {
        /// Offending data row.
        row: usize,
        /// Column holding the cell.
        column: String,
        /// Dimensionality established by the first row.
        expected: usize,
        /// Dimensionality found on this row.
        actual: usize,
    },
    /// A later pass over the input saw a different number of rows than the
    /// first, typically because the file changed in between.
    #[error("input yielded {actual} rows on its final pass but {expected} on its first")]
    RowCountChanged {
        /// Rows counted by the first pass.
        expected: usize,
        /// Rows yielded by the final pass.
        actual: usize,
    },
    /// A header-less pair list line did not contain exactly two ids.
    #[error("line {line} must hold exactly two tab-separated ids (found {actual})")]
    MalformedPair {
        /// Zero-based line number.
        line: usize,
        /// Number of fields on the line.
        actual: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`FormatError`] variants.
    enum FormatErrorCode for FormatError {
        /// The input held no header line.
        EmptyInput => EmptyInput => "FORMAT_EMPTY_INPUT",
        /// The first header field was not `id`.
        MissingIdColumn => MissingIdColumn { .. } => "FORMAT_MISSING_ID_COLUMN",
        /// A column name appeared twice in the header.
        DuplicateColumn => DuplicateColumn { .. } => "FORMAT_DUPLICATE_COLUMN",
        /// A row carried a different number of fields than the header.
        ColumnCountMismatch => ColumnCountMismatch { .. } => "FORMAT_COLUMN_COUNT_MISMATCH",
        /// A row had an empty document id.
        EmptyId => EmptyId { .. } => "FORMAT_EMPTY_ID",
        /// A document id was already used by an earlier row.
        DuplicateId => DuplicateId { .. } => "FORMAT_DUPLICATE_ID",
        /// A vector cell was not a JSON array of numbers.
        InvalidVector => InvalidVector { .. } => "FORMAT_INVALID_VECTOR",
        /// A vector cell had an unexpected dimensionality.
        InconsistentDimension => InconsistentDimension { .. } => "FORMAT_INCONSISTENT_DIMENSION",
        /// The input changed between passes.
        RowCountChanged => RowCountChanged { .. } => "FORMAT_ROW_COUNT_CHANGED",
        /// A pair list line was malformed.
        MalformedPair => MalformedPair { .. } => "FORMAT_MALFORMED_PAIR",
    }
}

/// Violations of the enrichment contract while appending columns.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SchemaError {
    /// A method produced a different number of values than the table has rows.
    #[error("column `{column}` received {actual} values for {expected} rows")]
    ValueCountMismatch {
        /// Column being appended.
        column: String,
        /// Number of rows in the table.
        expected: usize,
        /// Number of values produced.
        actual: usize,
    },
    /// A flat vector buffer did not cover `rows × dimension` values.
    #[error(
        "column `{column}` needs {rows} rows of {dimension} values but {values} values were produced"
    )]
    VectorShapeMismatch {
        /// Column being appended.
        column: String,
        /// Number of rows in the table.
        rows: usize,
        /// Declared vector dimensionality.
        dimension: usize,
        /// Number of scalar values produced.
        values: usize,
    },
    /// The output column already exists; existing columns are never rewritten.
    #[error("column `{column}` already exists")]
    ColumnExists {
        /// Name of the existing column.
        column: String,
    },
    /// A stage asked for a column the table does not have.
    #[error("column `{column}` not found")]
    MissingColumn {
        /// Name of the requested column.
        column: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`SchemaError`] variants.
    enum SchemaErrorCode for SchemaError {
        /// A method produced a different number of values than the table has rows.
        ValueCountMismatch => ValueCountMismatch { .. } => "SCHEMA_VALUE_COUNT_MISMATCH",
        /// A flat vector buffer did not match the table shape.
        VectorShapeMismatch => VectorShapeMismatch { .. } => "SCHEMA_VECTOR_SHAPE_MISMATCH",
        /// The output column already exists.
        ColumnExists => ColumnExists { .. } => "SCHEMA_COLUMN_EXISTS",
        /// A stage asked for a missing column.
        MissingColumn => MissingColumn { .. } => "SCHEMA_MISSING_COLUMN",
    }
}

/// A requested capability is not part of this build.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DependencyError {
    /// No method with this name is registered for the stage.
    #[error("unknown {kind} method `{method}`")]
    UnknownMethod {
        /// Stage kind, such as `embed`.
        kind: &'static str,
        /// Requested method name.
        method: String,
    },
    /// The method is known but its backend is not compiled in.
    #[error("{kind} method `{method}` requires `{dependency}`, which is not available in this build")]
    Unavailable {
        /// Stage kind, such as `redim`.
        kind: &'static str,
        /// Requested method name.
        method: String,
        /// Missing backend.
        dependency: &'static str,
    },
    /// The path names a compression codec this build cannot handle.
    #[error("`{path}` uses {codec} compression, which is not available in this build")]
    UnsupportedCompression {
        /// Path carrying the compression suffix.
        path: PathBuf,
        /// Codec inferred from the suffix.
        codec: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`DependencyError`] variants.
    enum DependencyErrorCode for DependencyError {
        /// No method with this name is registered.
        UnknownMethod => UnknownMethod { .. } => "DEPENDENCY_UNKNOWN_METHOD",
        /// The method's backend is not compiled in.
        Unavailable => Unavailable { .. } => "DEPENDENCY_UNAVAILABLE",
        /// The compression codec is not compiled in.
        UnsupportedCompression => UnsupportedCompression { .. } => "DEPENDENCY_UNSUPPORTED_COMPRESSION",
    }
}

/// Error type returned by every ttm stage.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TtmError {
    /// A file or stream could not be opened, read or written.
    #[error("I/O failure on `{target}`: {source}")]
    Io {
        /// Path or stream name.
        target: String,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The input table is structurally malformed.
    #[error("malformed table `{table}`: {error}")]
    Format {
        /// Path or stream name of the table.
        table: String,
        /// Structural violation.
        #[source]
        error: FormatError,
    },
    /// Appending a column would violate the enrichment contract.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A method or codec is not available.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    /// The method itself failed.
    #[error("method `{method}` failed: {message}")]
    Algorithm {
        /// Method that failed.
        method: String,
        /// Description of the failure.
        message: String,
    },
    /// Method arguments were rejected.
    #[error("invalid arguments for `{method}`: {message}")]
    Config {
        /// Method whose arguments were rejected.
        method: String,
        /// Parser diagnostic.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`TtmError`] variants.
    enum TtmErrorCode for TtmError {
        /// A file or stream could not be accessed.
        Io => Io { .. } => "TTM_IO",
        /// The input table is malformed.
        Format => Format { .. } => "TTM_FORMAT",
        /// The enrichment contract was violated.
        Schema => Schema(..) => "TTM_SCHEMA",
        /// A method or codec is not available.
        Dependency => Dependency(..) => "TTM_DEPENDENCY",
        /// The method itself failed.
        Algorithm => Algorithm { .. } => "TTM_ALGORITHM",
        /// Method arguments were rejected.
        Config => Config { .. } => "TTM_CONFIG",
    }
}

impl TtmError {
    /// Build an [`TtmError::Io`] for `target`.
    pub fn io(target: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            target: target.into(),
            source,
        }
    }

    /// Build an [`TtmError::Format`] for the table named `table`.
    pub fn format(table: impl Into<String>, error: FormatError) -> Self {
        Self::Format {
            table: table.into(),
            error,
        }
    }

    /// Build an [`TtmError::Algorithm`] for `method`.
    pub fn algorithm(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Algorithm {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Build an [`TtmError::Config`] for `method`.
    pub fn config(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Retrieve the code of the wrapped error when the variant carries one.
    #[must_use]
    pub const fn detail_code(&self) -> Option<&'static str> {
        match self {
            Self::Format { error, .. } => Some(error.code().as_str()),
            Self::Schema(error) => Some(error.code().as_str()),
            Self::Dependency(error) => Some(error.code().as_str()),
            Self::Io { .. } | Self::Algorithm { .. } | Self::Config { .. } => None,
        }
    }

    /// Whether the error is a write to a closed pipe, which callers treat as
    /// a normal end of output.
    #[must_use]
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::BrokenPipe)
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, TtmError>;
