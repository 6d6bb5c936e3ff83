//! The `comp` verb: agreement between clusterings of the same documents.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::instrument;
use ttm_core::sink::STDOUT_NAME;
use ttm_core::table::ID_COLUMN;
use ttm_core::{TableSource, TtmError};
use ttm_providers_dense::agreement::Spread;
use ttm_providers_dense::{AverageAgreement, Labelling, average_kappa, cluster};

use super::commands::{CliError, display_name};

/// Options accepted by `comp`.
#[derive(Debug, Args, Clone)]
pub struct CompArgs {
    /// Enriched tables whose `cluster` columns are compared.
    #[arg(value_name = "FILE", required = true, num_args = 2..)]
    pub files: Vec<PathBuf>,
}

/// Read the `id` → `cluster` assignment of the table at `path`.
///
/// # Errors
/// Returns source errors, including a missing `cluster` column.
#[instrument(name = "comp.labelling", err, fields(path = %path.display()))]
pub fn labelling(path: &Path) -> Result<Labelling, TtmError> {
    let mut source = TableSource::open_path(path)?;
    let ids = source.collect_column(ID_COLUMN)?;
    let clusters = source.collect_column(cluster::DEFAULT_OUTPUT_COLUMN)?;
    Ok(ids.into_iter().zip(clusters).collect())
}

pub(super) fn run_comp<W: Write>(args: &CompArgs, out: &mut W) -> Result<usize, CliError> {
    if args.files.len() < 2 {
        return Err(CliError::usage("ttm comp needs at least two FILE arguments"));
    }
    let models = args
        .files
        .iter()
        .map(|path| labelling(path))
        .collect::<Result<Vec<_>, _>>()?;
    let average = average_kappa(&models)?;
    let names: Vec<String> = args.files.iter().map(|path| display_name(path)).collect();
    write_comparison(&names, &average, out)
        .and_then(|()| out.flush())
        .map_err(|source| TtmError::io(STDOUT_NAME, source))?;
    Ok(models.len())
}

/// Write the comparison summary.
///
/// # Errors
/// Returns any error raised by `out`.
pub fn write_comparison<W: Write>(
    names: &[String],
    average: &AverageAgreement,
    out: &mut W,
) -> io::Result<()> {
    let listed: Vec<String> = names.iter().map(|name| format!("'{name}'")).collect();
    writeln!(out, "models              {}    [{}]", names.len(), listed.join(", "))?;
    let AverageAgreement {
        kappa: Spread {
            mean: kappa,
            deviation: kappa_deviation,
        },
        zoom: Spread {
            mean: zoom,
            deviation: zoom_deviation,
        },
    } = *average;
    writeln!(
        out,
        "avg-kappa           {kappa:.4} \u{b1}{kappa_deviation:.4}  (zoom {zoom:.2} \u{b1}{zoom_deviation:.2})"
    )
}
