//! The `eval` verb: clustering quality reports.
//!
//! A report is either computed from an enriched table or read back from a
//! report previously written with `--format tsv`. Values a table lacks the
//! columns for print as `N/A`; values the metric does not define for the
//! clustering at hand print as `undefined`.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde_json::{Map, Value};
use tracing::{info, instrument};
use ttm_core::sink::STDOUT_NAME;
use ttm_core::table::ID_COLUMN;
use ttm_core::table::codec::{split_record, write_record};
use ttm_core::{Compression, TableSource, TtmError};
use ttm_providers_corpus::open_pairs;
use ttm_providers_dense::quality::{
    DEFAULT_SILHOUETTE_FRACTION, calinski_harabasz, davies_bouldin, psq_count, psq_score,
    silhouette,
};
use ttm_providers_dense::{ChanceAdjusted, ClusterDistribution, Metric, Silhouette, cluster, redim};

use super::commands::{CliError, display_name};

const CLUSTER_COLUMN: &str = cluster::DEFAULT_OUTPUT_COLUMN;
const HIGHDIM_COLUMN: &str = redim::DEFAULT_INPUT_COLUMN;
const LOWDIM_COLUMN: &str = redim::DEFAULT_OUTPUT_COLUMN;

const NOT_AVAILABLE: &str = "N/A";
const UNDEFINED: &str = "undefined";
const HISTOGRAM_WIDTH: f64 = 50.0;

/// Columns of a TSV report, in order.
pub const TSV_COLUMNS: [&str; 12] = [
    "model_name",
    "psq_score",
    "psq_score_zoom",
    "psq_count",
    "silhouette",
    "silhouette_samples",
    "davies_bouldin",
    "calinski_harabasz",
    "highdim_size",
    "lowdim_size",
    "clusters",
    "cluster_distribution",
];

/// Report layout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ReportFormat {
    /// Indented, with a histogram of cluster sizes.
    #[default]
    Text,
    /// One row per model under a fixed header.
    Tsv,
}

/// Options accepted by `eval`.
#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Report layout.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Re-render the reports stored in a TSV report; may be repeated.
    #[arg(long = "include", value_name = "FILE")]
    pub include: Vec<PathBuf>,

    /// Distance used for the silhouette coefficient.
    #[arg(long = "silhouette-metric", value_enum, default_value_t = Metric::Euclidean)]
    pub silhouette_metric: Metric,

    /// Fraction of documents sampled for the silhouette coefficient.
    #[arg(long = "silhouette-sample-size", value_name = "F", default_value_t = DEFAULT_SILHOUETTE_FRACTION)]
    pub silhouette_sample_size: f64,

    /// Seed for the silhouette sample.
    #[arg(long = "seed", default_value_t = 0)]
    pub seed: u64,

    /// Header-less list of consecutive page pairs, needed for psq metrics.
    #[arg(long = "psq-pairs", value_name = "FILE")]
    pub psq_pairs: Option<PathBuf>,

    /// Enriched tables to evaluate.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Silhouette settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilhouetteOptions {
    /// Distance between vectors.
    pub metric: Metric,
    /// Fraction of rows sampled.
    pub sample_size: f64,
    /// Sampling seed.
    pub seed: u64,
}

impl Default for SilhouetteOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            sample_size: DEFAULT_SILHOUETTE_FRACTION,
            seed: 0,
        }
    }
}

/// Quality metrics of one clustering. `None` marks a value that was not
/// computed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalReport {
    /// Table the report describes.
    pub model_name: String,
    /// Relative cluster sizes, largest first.
    pub distribution: ClusterDistribution,
    /// Number of clusters.
    pub clusters: Option<usize>,
    /// Dimensionality of the `highdim` vectors.
    pub highdim_size: Option<usize>,
    /// Dimensionality of the `lowdim` vectors.
    pub lowdim_size: Option<usize>,
    /// Caliński–Harabasz index.
    pub calinski_harabasz: Option<f64>,
    /// Davies–Bouldin index.
    pub davies_bouldin: Option<f64>,
    /// Sampled silhouette coefficient.
    pub silhouette: Option<Silhouette>,
    /// Share of consecutive page pairs that share a cluster.
    pub psq_count: Option<f64>,
    /// Psq-count adjusted for chance.
    pub psq_score: Option<ChanceAdjusted>,
}

/// Compute the report for the table at `path`.
///
/// Separation metrics need a `lowdim` column and at least two clusters; psq
/// metrics need `pairs` and at least one cluster.
///
/// # Errors
/// Returns source errors and metric errors such as a psq pair naming an
/// unknown document.
#[instrument(name = "eval.model", err, skip(options, pairs), fields(path = %path.display()))]
pub fn evaluate(
    path: &Path,
    options: &SilhouetteOptions,
    pairs: Option<&[(String, String)]>,
) -> Result<EvalReport, TtmError> {
    let mut source = TableSource::open_path(path)?;
    let labels = if source.has_column(CLUSTER_COLUMN)? {
        source.collect_column(CLUSTER_COLUMN)?
    } else {
        Vec::new()
    };
    let distribution = ClusterDistribution::from_labels(&labels);
    let clusters = distribution.len();
    let mut report = EvalReport {
        model_name: display_name(path),
        clusters: Some(clusters),
        highdim_size: vector_size(&mut source, HIGHDIM_COLUMN)?,
        lowdim_size: vector_size(&mut source, LOWDIM_COLUMN)?,
        ..EvalReport::default()
    };

    if clusters > 1 && source.has_column(LOWDIM_COLUMN)? {
        let vectors = source.matrix(LOWDIM_COLUMN)?;
        report.calinski_harabasz = calinski_harabasz(&vectors, &labels)?;
        report.davies_bouldin = davies_bouldin(&vectors, &labels)?;
        report.silhouette = silhouette(
            &vectors,
            &labels,
            options.metric,
            options.sample_size,
            options.seed,
        )?;
    }

    if let Some(pairs) = pairs.filter(|_| clusters > 0) {
        let ids = source.collect_column(ID_COLUMN)?;
        let assignment: HashMap<String, String> = ids.into_iter().zip(labels).collect();
        let count = psq_count(&assignment, pairs)?;
        report.psq_count = Some(count);
        report.psq_score = psq_score(count, &distribution);
    }

    info!(clusters, "evaluated model");
    report.distribution = distribution;
    Ok(report)
}

fn vector_size(source: &mut TableSource, column: &str) -> Result<Option<usize>, TtmError> {
    if source.has_column(column)? {
        source.first_vector_len(column)
    } else {
        Ok(None)
    }
}

pub(super) fn run_eval<W: Write>(args: &EvalArgs, out: &mut W) -> Result<usize, CliError> {
    if args.files.is_empty() && args.include.is_empty() {
        return Err(CliError::usage(
            "ttm eval needs at least one FILE or `--include` argument",
        ));
    }
    let options = SilhouetteOptions {
        metric: args.silhouette_metric,
        sample_size: args.silhouette_sample_size,
        seed: args.seed,
    };
    let pairs = args.psq_pairs.as_deref().map(open_pairs).transpose()?;

    if args.format == ReportFormat::Tsv {
        write_tsv_header(out).map_err(report_io)?;
    }
    let mut rendered = 0;
    for path in &args.include {
        let name = display_name(path);
        for report in read_reports(Compression::open_reader(path)?, &name)? {
            render(&report, args.format, out).map_err(report_io)?;
            rendered += 1;
        }
    }
    for path in &args.files {
        let report = evaluate(path, &options, pairs.as_deref())?;
        render(&report, args.format, out).map_err(report_io)?;
        rendered += 1;
    }
    out.flush().map_err(report_io)?;
    Ok(rendered)
}

fn report_io(source: io::Error) -> CliError {
    TtmError::io(STDOUT_NAME, source).into()
}

/// Render `report` in `format`. TSV rows are written without the header.
///
/// # Errors
/// Returns any error raised by `out`.
pub fn render<W: Write>(report: &EvalReport, format: ReportFormat, out: &mut W) -> io::Result<()> {
    match format {
        ReportFormat::Text => write_text(report, out),
        ReportFormat::Tsv => write_tsv_row(report, out),
    }
}

/// Write the text report, ending with a blank line.
///
/// # Errors
/// Returns any error raised by `out`.
pub fn write_text<W: Write>(report: &EvalReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "Evaluation results for {}", report.model_name)?;
    for (cluster, share) in report.distribution.iter() {
        writeln!(
            out,
            "    {cluster:>5}    {:6.2} %     {}",
            percent(share),
            "*".repeat(histogram_bar(share))
        )?;
    }
    match report.highdim_size {
        Some(size) => writeln!(out, "  highdim-size          {size}")?,
        None => writeln!(out, "  highdim-size             {NOT_AVAILABLE}")?,
    }
    match report.lowdim_size {
        Some(size) => writeln!(out, "  lowdim-size           {size}")?,
        None => writeln!(out, "  lowdim-size              {NOT_AVAILABLE}")?,
    }
    match report.calinski_harabasz {
        Some(value) => writeln!(out, "  calinski-harabasz     {value:.4}")?,
        None => writeln!(out, "  calinski-harabasz  {UNDEFINED}")?,
    }
    match report.davies_bouldin {
        Some(value) => writeln!(out, "  davies-bouldin        {value:.4}")?,
        None => writeln!(out, "  davies-bouldin     {UNDEFINED}")?,
    }
    match report.silhouette {
        Some(Silhouette { score, samples }) => {
            writeln!(out, "  silhouette           {score:>7.4}  ({samples} samples)")?;
        }
        None => writeln!(out, "  silhouette         {UNDEFINED}")?,
    }
    match (report.psq_count, report.psq_score) {
        (None, _) => {
            writeln!(out, "  psq-count                {NOT_AVAILABLE}")?;
            writeln!(out, "  psq-score                {NOT_AVAILABLE}")?;
        }
        (Some(count), score) => {
            writeln!(out, "  psq-count            {count:>7.4}")?;
            match score {
                Some(ChanceAdjusted { score, zoom }) => {
                    writeln!(out, "  psq-score            {score:>7.4}  (zoom {zoom:.2})")?;
                }
                None => writeln!(out, "  psq-score          {UNDEFINED}")?,
            }
        }
    }
    writeln!(out)
}

#[expect(clippy::float_arithmetic, reason = "shares are printed as percentages")]
fn percent(share: f64) -> f64 {
    100.0 * share
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "bar lengths are rounded non-negative shares of a fixed width"
)]
fn histogram_bar(share: f64) -> usize {
    let width = (share * HISTOGRAM_WIDTH).round_ties_even();
    if width.is_finite() && width > 0.0 {
        width as usize
    } else {
        0
    }
}

/// Write the TSV header line.
///
/// # Errors
/// Returns any error raised by `out`.
pub fn write_tsv_header<W: Write>(out: &mut W) -> io::Result<()> {
    write_record(out, TSV_COLUMNS)
}

/// Write one TSV report row.
///
/// # Errors
/// Returns any error raised by `out`.
pub fn write_tsv_row<W: Write>(report: &EvalReport, out: &mut W) -> io::Result<()> {
    let (psq_count_cell, psq_score_cell, psq_zoom_cell) = match (report.psq_count, report.psq_score) {
        (None, _) => (NOT_AVAILABLE.to_owned(), NOT_AVAILABLE.to_owned(), NOT_AVAILABLE.to_owned()),
        (Some(count), None) => (float_cell(count), UNDEFINED.to_owned(), UNDEFINED.to_owned()),
        (Some(count), Some(adjusted)) => (
            float_cell(count),
            float_cell(adjusted.score),
            float_cell(adjusted.zoom),
        ),
    };
    let (silhouette_cell, samples_cell) = match report.silhouette {
        Some(Silhouette { score, samples }) => (float_cell(score), samples.to_string()),
        None => (UNDEFINED.to_owned(), UNDEFINED.to_owned()),
    };
    let fields = [
        report.model_name.clone(),
        psq_score_cell,
        psq_zoom_cell,
        psq_count_cell,
        silhouette_cell,
        samples_cell,
        report
            .davies_bouldin
            .map_or_else(|| UNDEFINED.to_owned(), float_cell),
        report
            .calinski_harabasz
            .map_or_else(|| UNDEFINED.to_owned(), float_cell),
        count_cell(report.highdim_size),
        count_cell(report.lowdim_size),
        count_cell(report.clusters),
        distribution_cell(&report.distribution),
    ];
    write_record(out, fields.iter().map(String::as_str))
}

fn float_cell(value: f64) -> String {
    format!("{value:?}")
}

fn count_cell(value: Option<usize>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_owned(), |count| count.to_string())
}

fn distribution_cell(distribution: &ClusterDistribution) -> String {
    let shares: Map<String, Value> = distribution
        .iter()
        .map(|(cluster, share)| (cluster.to_owned(), Value::from(share)))
        .collect();
    Value::Object(shares).to_string()
}

/// Parse a TSV report written by [`write_tsv_header`] and [`write_tsv_row`].
///
/// Columns are matched by header name; unknown columns are ignored and
/// `N/A` or `undefined` cells leave the value unset.
///
/// # Errors
/// Returns [`CliError::Report`] for unparsable cells and
/// [`CliError::Core`] when reading fails.
pub fn read_reports<R: BufRead>(reader: R, name: &str) -> Result<Vec<EvalReport>, CliError> {
    let mut lines = reader.lines().enumerate();
    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let header = split_record(&header.map_err(|source| TtmError::io(name, source))?);
    let mut reports = Vec::new();
    for (line_number, line) in lines {
        let line = line.map_err(|source| TtmError::io(name, source))?;
        if line.is_empty() {
            continue;
        }
        let malformed = |message: String| CliError::Report {
            source_name: name.to_owned(),
            line: line_number,
            message,
        };
        let mut cells = StoredCells::default();
        for (column, cell) in header.iter().zip(split_record(&line)) {
            cells.set(column, cell).map_err(&malformed)?;
        }
        reports.push(cells.into_report());
    }
    Ok(reports)
}

/// Cells of one stored report row, before pairing related values.
#[derive(Debug, Default)]
struct StoredCells {
    report: EvalReport,
    silhouette: Option<f64>,
    silhouette_samples: Option<usize>,
    psq_score: Option<f64>,
    psq_zoom: Option<f64>,
}

impl StoredCells {
    fn set(&mut self, column: &str, cell: String) -> Result<(), String> {
        if column == "model_name" {
            self.report.model_name = cell;
            return Ok(());
        }
        if cell == NOT_AVAILABLE || cell == UNDEFINED {
            return Ok(());
        }
        match column {
            "psq_score" => self.psq_score = Some(parse_float(column, &cell)?),
            "psq_score_zoom" => self.psq_zoom = Some(parse_float(column, &cell)?),
            "psq_count" => self.report.psq_count = Some(parse_float(column, &cell)?),
            "silhouette" => self.silhouette = Some(parse_float(column, &cell)?),
            "silhouette_samples" => self.silhouette_samples = Some(parse_count(column, &cell)?),
            "davies_bouldin" => self.report.davies_bouldin = Some(parse_float(column, &cell)?),
            "calinski_harabasz" => {
                self.report.calinski_harabasz = Some(parse_float(column, &cell)?);
            }
            "highdim_size" => self.report.highdim_size = Some(parse_count(column, &cell)?),
            "lowdim_size" => self.report.lowdim_size = Some(parse_count(column, &cell)?),
            "clusters" => self.report.clusters = Some(parse_count(column, &cell)?),
            "cluster_distribution" => self.report.distribution = parse_distribution(&cell)?,
            _ => {}
        }
        Ok(())
    }

    fn into_report(self) -> EvalReport {
        let Self {
            mut report,
            silhouette,
            silhouette_samples,
            psq_score,
            psq_zoom,
        } = self;
        report.silhouette = silhouette.map(|score| Silhouette {
            score,
            samples: silhouette_samples.unwrap_or_default(),
        });
        report.psq_score = psq_score
            .zip(psq_zoom)
            .map(|(score, zoom)| ChanceAdjusted { score, zoom });
        report
    }
}

fn parse_float(column: &str, cell: &str) -> Result<f64, String> {
    cell.trim()
        .parse()
        .map_err(|err| format!("`{column}` value `{cell}` is not a number: {err}"))
}

fn parse_count(column: &str, cell: &str) -> Result<usize, String> {
    let trimmed = cell.trim();
    // Counts written by other tools may carry a fractional `.0`.
    let integral = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    integral
        .parse()
        .map_err(|err| format!("`{column}` value `{cell}` is not a count: {err}"))
}

fn parse_distribution(cell: &str) -> Result<ClusterDistribution, String> {
    if cell.trim().is_empty() {
        return Ok(ClusterDistribution::default());
    }
    let shares: Map<String, Value> = serde_json::from_str(cell)
        .map_err(|err| format!("`cluster_distribution` is not a JSON object: {err}"))?;
    shares
        .into_iter()
        .map(|(cluster, share)| {
            share
                .as_f64()
                .map(|share| (cluster.clone(), share))
                .ok_or_else(|| format!("share of cluster `{cluster}` is not a number"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(ClusterDistribution::from_shares)
}
