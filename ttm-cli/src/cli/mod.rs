//! Command-line interface orchestration for `ttm`.
//!
//! Every invocation runs a single verb. Table-producing verbs write to `-o`
//! or stdout; `eval` and `comp` print reports to the writer handed to
//! [`run_cli`].

mod commands;
mod comp;
mod eval;

pub use commands::{
    CatArgs, Cli, CliError, ClusterArgs, Command, DescArgs, EmbedArgs, ExecutionSummary,
    NewsgroupsArgs, RedimArgs, run_cli,
};
pub use comp::{CompArgs, labelling, write_comparison};
pub use eval::{
    EvalArgs, EvalReport, ReportFormat, SilhouetteOptions, TSV_COLUMNS, evaluate, read_reports,
    render, write_text, write_tsv_header, write_tsv_row,
};
