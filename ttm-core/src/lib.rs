//! ttm core library.
//!
//! Defines the enrichment table format, the seekable/buffered table source,
//! atomic output sinks, method registries and the stage runner shared by every
//! pipeline verb.

pub mod compression;
mod error;
pub mod registry;
pub mod sink;
pub mod source;
pub mod stage;
pub mod table;
pub mod vector;

pub use crate::{
    compression::Compression,
    error::{
        DependencyError, DependencyErrorCode, FormatError, FormatErrorCode, Result, SchemaError,
        SchemaErrorCode, TtmError, TtmErrorCode,
    },
    registry::{Capability, Factory, Invocation, MethodRegistry, parse_method_args},
    sink::{OutputDesignator, OutputSink, TableWriter},
    source::{ColumnRef, InputDesignator, TableShape, TableSource},
    stage::{Stage, StageRunner, StageSummary},
    table::{DocumentId, Header, Row, Table},
    vector::Matrix,
};
