//! Command implementations and argument parsing for the `ttm` CLI.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{Span, field, info, instrument};
use ttm_core::{
    InputDesignator, OutputDesignator, Stage, StageRunner, Table, TableSource, TableWriter,
    TtmError,
};
use ttm_providers_corpus::newsgroups::DATA_HOME_ENV;
use ttm_providers_corpus::split::DEFAULT_WINDOW;
use ttm_providers_corpus::{
    CorpusDirectory, MessageFilter, Newsgroups, PsqPair, SplitMode, Splitter, Window, write_pairs,
};
use ttm_providers_dense::{ClusterStage, RedimStage, SplitTarget, cluster, redim};
use ttm_providers_text::desc::DescColumns;
use ttm_providers_text::{DescStage, EmbedStage, desc, embed};

use super::comp::{CompArgs, run_comp};
use super::eval::{EvalArgs, run_eval};

/// Top-level CLI options parsed by [`clap`].
///
/// `-i` and `-o` come before the verb, as in `ttm -i in.tsv embed bow`.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "ttm",
    version,
    about = "Topic modelling by enriching a table of documents, one stage at a time."
)]
pub struct Cli {
    /// Read the input table from FILE instead of stdin; `.gz` is decompressed.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write output to FILE instead of stdout; `.gz` is compressed.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Split the files of a directory into a fresh table of documents.
    Cat(CatArgs),
    /// Copy a local 20 newsgroups corpus into a fresh table of documents.
    #[command(name = "20cat")]
    Newsgroups(NewsgroupsArgs),
    /// Embed a text column as vectors, concatenating several methods.
    Embed(EmbedArgs),
    /// Reduce the dimensionality of a vector column.
    Redim(RedimArgs),
    /// Cluster a vector column, or split one existing cluster.
    Cluster(ClusterArgs),
    /// Describe every cluster from the text of its documents.
    Desc(DescArgs),
    /// Report clustering quality metrics for one or more tables.
    Eval(EvalArgs),
    /// Compare the clusterings of two or more tables.
    Comp(CompArgs),
}

impl Command {
    /// Verb as typed on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cat(_) => "cat",
            Self::Newsgroups(_) => "20cat",
            Self::Embed(_) => "embed",
            Self::Redim(_) => "redim",
            Self::Cluster(_) => "cluster",
            Self::Desc(_) => "desc",
            Self::Eval(_) => "eval",
            Self::Comp(_) => "comp",
        }
    }

    /// Whether the verb reads a table through `-i`.
    #[must_use]
    pub const fn reads_input(&self) -> bool {
        matches!(
            self,
            Self::Embed(_) | Self::Redim(_) | Self::Cluster(_) | Self::Desc(_)
        )
    }

    /// Whether the verb writes a table through `-o`.
    #[must_use]
    pub const fn writes_output(&self) -> bool {
        matches!(self, Self::Cat(_) | Self::Newsgroups(_)) || self.reads_input()
    }
}

/// Options accepted by `cat`.
#[derive(Debug, Args, Clone)]
pub struct CatArgs {
    /// Splitting policy; `window` is implied by `--window` or `--step`.
    #[arg(long = "split", value_enum, value_name = "POLICY")]
    pub split: Option<SplitMode>,

    /// Tokens per window.
    #[arg(short = 'w', long = "window", value_name = "N")]
    pub window: Option<usize>,

    /// Tokens between window starts. Defaults to half the window.
    #[arg(short = 's', long = "step", value_name = "N")]
    pub step: Option<usize>,

    /// Print pairs of consecutive, non-overlapping document ids instead.
    #[arg(long = "psq-pairs")]
    pub psq_pairs: bool,

    /// Directory holding the corpus files.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

impl CatArgs {
    fn splitter(&self) -> Result<Splitter, CliError> {
        let windowed = self.window.is_some() || self.step.is_some();
        match self.split {
            Some(SplitMode::Paragraph) if windowed => Err(CliError::usage(
                "`--window` and `--step` require `--split window`",
            )),
            Some(SplitMode::Paragraph) => Ok(Splitter::Paragraphs),
            None if !windowed => Ok(Splitter::Paragraphs),
            Some(SplitMode::Window) | None => {
                let size = self.window.unwrap_or(DEFAULT_WINDOW);
                let window = match self.step {
                    Some(step) => Window::new(size, step)?,
                    None => Window::half_step(size)?,
                };
                Ok(Splitter::Windows(window))
            }
        }
    }
}

/// Options accepted by `20cat`.
#[derive(Debug, Args, Clone)]
pub struct NewsgroupsArgs {
    /// Local copy of the corpus.
    #[arg(long = "data-home", env = DATA_HOME_ENV, value_name = "DIR")]
    pub data_home: PathBuf,

    /// Cut every message into windows of N tokens.
    #[arg(short = 'w', long = "window", value_name = "N")]
    pub window: Option<usize>,

    /// Tokens between window starts. Defaults to the window, so windows do
    /// not overlap.
    #[arg(short = 's', long = "step", value_name = "N")]
    pub step: Option<usize>,

    /// Print pairs of consecutive, non-overlapping document ids instead.
    #[arg(long = "psq-pairs")]
    pub psq_pairs: bool,

    /// Skip messages with fewer than N characters.
    #[arg(long = "min-chars", value_name = "N", default_value_t = 1)]
    pub min_chars: usize,

    /// Skip messages with fewer than N tokens.
    #[arg(long = "min-tokens", value_name = "N", default_value_t = 1)]
    pub min_tokens: usize,

    /// Skip messages with more than N characters.
    #[arg(long = "max-chars", value_name = "N")]
    pub max_chars: Option<usize>,

    /// Skip messages with more than N tokens.
    #[arg(long = "max-tokens", value_name = "N")]
    pub max_tokens: Option<usize>,
}

impl NewsgroupsArgs {
    const fn filter(&self) -> MessageFilter {
        MessageFilter {
            min_chars: self.min_chars,
            min_tokens: self.min_tokens,
            max_chars: self.max_chars,
            max_tokens: self.max_tokens,
        }
    }

    fn window(&self) -> Result<Option<Window>, CliError> {
        match (self.window, self.step) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(CliError::usage("`--step` requires `--window`")),
            (Some(size), step) => Ok(Some(Window::new(size, step.unwrap_or(size))?)),
        }
    }
}

/// Options accepted by `embed`.
#[derive(Debug, Args, Clone)]
pub struct EmbedArgs {
    /// Column holding the documents' text.
    #[arg(long = "input-column", default_value = embed::DEFAULT_INPUT_COLUMN)]
    pub input_column: String,

    /// Column receiving the concatenated vectors.
    #[arg(long = "output-column", default_value = embed::DEFAULT_OUTPUT_COLUMN)]
    pub output_column: String,

    /// One or more methods, each followed by its own options.
    #[arg(
        value_name = "METHOD",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub methods: Vec<String>,
}

/// Options accepted by `redim`.
#[derive(Debug, Args, Clone)]
pub struct RedimArgs {
    /// Column holding the vectors to reduce.
    #[arg(long = "input-column", default_value = redim::DEFAULT_INPUT_COLUMN)]
    pub input_column: String,

    /// Column receiving the reduced vectors.
    #[arg(long = "output-column", default_value = redim::DEFAULT_OUTPUT_COLUMN)]
    pub output_column: String,

    /// The method followed by its own options.
    #[arg(
        value_name = "METHOD",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub method: Vec<String>,
}

/// Options accepted by `cluster`.
#[derive(Debug, Args, Clone)]
pub struct ClusterArgs {
    /// Column holding the vectors to cluster.
    #[arg(long = "input-column", default_value = cluster::DEFAULT_INPUT_COLUMN)]
    pub input_column: String,

    /// Column receiving the labels. Defaults to `cluster`, or `subcluster`
    /// with `--split`.
    #[arg(long = "output-column")]
    pub output_column: Option<String>,

    /// Only cluster the documents of this existing cluster.
    #[arg(long = "split", value_name = "CLUSTER")]
    pub split: Option<String>,

    /// Column holding the labels `--split` refers to.
    #[arg(long = "split-column", default_value = cluster::DEFAULT_OUTPUT_COLUMN, requires = "split")]
    pub split_column: String,

    /// The method followed by its own options.
    #[arg(
        value_name = "METHOD",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub method: Vec<String>,
}

/// Options accepted by `desc`.
#[derive(Debug, Args, Clone)]
pub struct DescArgs {
    /// Column holding the documents' text.
    #[arg(long = "text-column", default_value = desc::DEFAULT_TEXT_COLUMN)]
    pub text_column: String,

    /// Column holding cluster labels.
    #[arg(long = "cluster-column", default_value = desc::DEFAULT_CLUSTER_COLUMN)]
    pub cluster_column: String,

    /// Column receiving the descriptions.
    #[arg(long = "output-column", default_value = desc::DEFAULT_OUTPUT_COLUMN)]
    pub output_column: String,

    /// The method followed by its own options.
    #[arg(
        value_name = "METHOD",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub method: Vec<String>,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command line combines options that do not fit together.
    #[error("{message}")]
    Usage {
        /// What is wrong with the command line.
        message: String,
    },
    /// A stored evaluation report could not be parsed.
    #[error("malformed evaluation report `{source_name}` at line {line}: {message}")]
    Report {
        /// Path of the report.
        source_name: String,
        /// Zero-based line number.
        line: usize,
        /// What is wrong with the line.
        message: String,
    },
    /// A pipeline operation failed.
    #[error(transparent)]
    Core(#[from] TtmError),
}

impl CliError {
    pub(super) fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionSummary {
    /// Verb that ran.
    pub command: &'static str,
    /// Rows, pairs, reports or models written.
    pub written: usize,
}

/// Executes the command represented by `cli`.
///
/// Tables go to `-o` or stdout; `eval` and `comp` reports go to `report`.
///
/// # Errors
/// Returns [`CliError::Usage`] when `-i` or `-o` is given to a verb that does
/// not take it, and any error raised by the verb.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use std::ffi::OsStr;
/// # use clap::Parser;
/// # use ttm_cli::cli::{Cli, run_cli};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let corpus = tempfile::tempdir()?;
/// std::fs::write(corpus.path().join("a.txt"), "one\n\ntwo\n")?;
/// let target = tempfile::tempdir()?;
/// let output = target.path().join("corpus.tsv");
/// let cli = Cli::try_parse_from([
///     OsStr::new("ttm"),
///     OsStr::new("-o"),
///     output.as_os_str(),
///     OsStr::new("cat"),
///     corpus.path().as_os_str(),
/// ])?;
/// let summary = run_cli(cli, &mut std::io::sink())?;
/// assert_eq!(summary.written, 2);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli, report),
    fields(command = field::Empty),
)]
pub fn run_cli<W: Write>(cli: Cli, report: &mut W) -> Result<ExecutionSummary, CliError> {
    let Cli {
        input,
        output,
        command,
    } = cli;
    let name = command.name();
    Span::current().record("command", field::display(name));
    if input.is_some() && !command.reads_input() {
        return Err(CliError::usage(format!("ttm {name} does not accept `--input`")));
    }
    if output.is_some() && !command.writes_output() {
        return Err(CliError::usage(format!("ttm {name} does not accept `--output`")));
    }
    let io = StageIo {
        input: InputDesignator::from_arg(input.as_deref()),
        output: OutputDesignator::from_arg(output.as_deref()),
    };

    let written = match command {
        Command::Cat(args) => run_cat(&args, &io.output)?,
        Command::Newsgroups(args) => run_newsgroups(&args, &io.output)?,
        Command::Embed(args) => {
            let stage = EmbedStage::from_words(args.input_column, args.output_column, &args.methods)?;
            run_stage(&stage, &io)?
        }
        Command::Redim(args) => {
            let stage = RedimStage::from_words(args.input_column, args.output_column, &args.method)?;
            run_stage(&stage, &io)?
        }
        Command::Cluster(args) => run_stage(&cluster_stage(args)?, &io)?,
        Command::Desc(args) => {
            let columns = DescColumns {
                text: args.text_column,
                cluster: args.cluster_column,
                output: args.output_column,
            };
            run_stage(&DescStage::from_words(columns, &args.method)?, &io)?
        }
        Command::Eval(args) => run_eval(&args, report)?,
        Command::Comp(args) => run_comp(&args, report)?,
    };
    info!(command = name, written, "command completed");
    Ok(ExecutionSummary {
        command: name,
        written,
    })
}

/// Resolved `-i`/`-o` designators.
#[derive(Debug)]
struct StageIo {
    input: InputDesignator,
    output: OutputDesignator,
}

fn cluster_stage(args: ClusterArgs) -> Result<ClusterStage, CliError> {
    let ClusterArgs {
        input_column,
        output_column,
        split,
        split_column,
        method,
    } = args;
    let default_output = if split.is_some() {
        cluster::DEFAULT_SPLIT_OUTPUT_COLUMN
    } else {
        cluster::DEFAULT_OUTPUT_COLUMN
    };
    let output_column = output_column.unwrap_or_else(|| default_output.to_owned());
    let stage = ClusterStage::from_words(input_column, output_column, &method)?;
    Ok(match split {
        Some(label) => stage.split(SplitTarget::new(label).in_column(split_column)),
        None => stage,
    })
}

#[instrument(name = "cli.stage", err, skip(stage, io), fields(stage = stage.name()))]
fn run_stage(stage: &dyn Stage, io: &StageIo) -> Result<usize, CliError> {
    let mut source = TableSource::open(&io.input)?;
    let mut writer = TableWriter::open(&io.output)?;
    let summary = StageRunner::new().run(stage, &mut source, &mut writer)?;
    writer.finish()?;
    Ok(summary.rows)
}

#[instrument(name = "cli.cat", err, skip(args, output), fields(dir = %args.dir.display()))]
fn run_cat(args: &CatArgs, output: &OutputDesignator) -> Result<usize, CliError> {
    let splitter = args.splitter()?;
    let corpus = CorpusDirectory::open(&args.dir)?;
    if args.psq_pairs {
        emit_pairs(&corpus.psq_pairs(splitter)?, output)
    } else {
        emit_table(&corpus.ingest(splitter)?, output)
    }
}

#[instrument(name = "cli.20cat", err, skip(args, output), fields(data_home = %args.data_home.display()))]
fn run_newsgroups(args: &NewsgroupsArgs, output: &OutputDesignator) -> Result<usize, CliError> {
    let window = args.window()?;
    let corpus = Newsgroups::open(&args.data_home)?;
    if args.psq_pairs {
        emit_pairs(&corpus.psq_pairs(args.filter(), window)?, output)
    } else {
        emit_table(&corpus.ingest(args.filter(), window)?, output)
    }
}

fn emit_table(table: &Table, output: &OutputDesignator) -> Result<usize, CliError> {
    let mut writer = TableWriter::open(output)?;
    writer.write_table(table)?;
    writer.finish()?;
    Ok(table.len())
}

fn emit_pairs(pairs: &[PsqPair], output: &OutputDesignator) -> Result<usize, CliError> {
    let mut writer = TableWriter::open(output)?;
    write_pairs(&mut writer, pairs)?;
    writer.finish()?;
    Ok(pairs.len())
}

/// Model name for a table path, as given on the command line.
pub(super) fn display_name(path: &Path) -> String {
    path.display().to_string()
}
