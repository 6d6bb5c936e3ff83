//! Output sinks for enriched tables.
//!
//! File output is staged in a sibling `.part` file and renamed into place by
//! [`OutputSink::finish`], so a failing stage never leaves a truncated table
//! behind. Dropping an unfinished sink removes the partial file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::compression::{Compression, Encoder};
use crate::error::{Result, TtmError};
use crate::table::codec::write_record;
use crate::table::{DocumentId, Header, Table};

/// Name used for the ambient output stream in diagnostics.
pub const STDOUT_NAME: &str = "<stdout>";

/// Where a stage writes its table to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutputDesignator {
    /// The ambient output stream.
    Stdout,
    /// A file path.
    Path(PathBuf),
}

impl OutputDesignator {
    /// Interpret an optional `-o` argument; `-` and absence mean stdout.
    #[must_use]
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(path) if path != Path::new("-") => Self::Path(path.to_path_buf()),
            _ => Self::Stdout,
        }
    }
}

/// A file written under a temporary name and renamed on success.
#[derive(Debug)]
pub struct AtomicFile {
    part: PathBuf,
    destination: PathBuf,
    encoder: Option<Encoder>,
}

impl AtomicFile {
    fn create(destination: &Path) -> Result<Self> {
        let compression = Compression::from_path(destination);
        compression.ensure_supported(destination)?;
        let part = part_path(destination);
        let file = File::create(&part)
            .map_err(|source| TtmError::io(part.display().to_string(), source))?;
        Ok(Self {
            part,
            destination: destination.to_path_buf(),
            encoder: Some(compression.writer(file)),
        })
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(encoder) = self.encoder.take() {
            encoder
                .finish()
                .map_err(|source| TtmError::io(self.part.display().to_string(), source))?;
            fs::rename(&self.part, &self.destination).map_err(|source| {
                TtmError::io(self.destination.display().to_string(), source)
            })?;
            debug!(path = %self.destination.display(), "committed output");
        }
        Ok(())
    }

    fn encoder(&mut self) -> io::Result<&mut Encoder> {
        self.encoder
            .as_mut()
            .ok_or_else(|| io::Error::other("output already committed"))
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.encoder.take().is_some()
            && let Err(err) = fs::remove_file(&self.part)
        {
            debug!(path = %self.part.display(), error = %err, "could not remove partial output");
        }
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Byte sink for a stage: stdout or an atomically committed file.
#[derive(Debug)]
pub enum OutputSink {
    /// Buffered standard output.
    Stdout(BufWriter<Stdout>),
    /// Staged file output.
    File(AtomicFile),
}

impl OutputSink {
    /// Open the sink named by `designator`.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when the staging file cannot be created and
    /// [`TtmError::Dependency`] when the path's compression codec is not
    /// compiled in.
    #[instrument(name = "sink.open", err, skip(designator))]
    pub fn open(designator: &OutputDesignator) -> Result<Self> {
        match designator {
            OutputDesignator::Stdout => Ok(Self::Stdout(BufWriter::new(io::stdout()))),
            OutputDesignator::Path(path) => AtomicFile::create(path).map(Self::File),
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Stdout(_) => STDOUT_NAME.to_owned(),
            Self::File(file) => file.destination.display().to_string(),
        }
    }

    /// Flush everything and, for files, move the result into place.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when flushing or renaming fails.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Stdout(mut writer) => writer
                .flush()
                .map_err(|source| TtmError::io(STDOUT_NAME, source)),
            Self::File(mut file) => file.commit(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(writer) => writer.write(buf),
            Self::File(file) => file.encoder()?.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(writer) => writer.flush(),
            Self::File(file) => file.encoder()?.flush(),
        }
    }
}

/// Writes header and rows in the table format, escaping every field.
#[derive(Debug)]
pub struct TableWriter<W: Write> {
    target: String,
    out: W,
    rows: usize,
}

impl<W: Write> TableWriter<W> {
    /// Wrap `out`, naming it `target` in diagnostics.
    pub fn new(target: impl Into<String>, out: W) -> Self {
        Self {
            target: target.into(),
            out,
            rows: 0,
        }
    }

    /// Target name used in diagnostics.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of data rows written so far.
    #[must_use]
    pub const fn rows_written(&self) -> usize {
        self.rows
    }

    /// Write the header line.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when writing fails.
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        header
            .write(&mut self.out)
            .map_err(|source| TtmError::io(self.target.as_str(), source))
    }

    /// Write one data row.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when writing fails.
    pub fn write_row<'a, I>(&mut self, id: &'a DocumentId, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        write_record(&mut self.out, std::iter::once(id.as_str()).chain(cells))
            .map_err(|source| TtmError::io(self.target.as_str(), source))?;
        self.rows += 1;
        Ok(())
    }

    /// Write a raw record with no `id` semantics, as used by header-less
    /// pair lists.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when writing fails.
    pub fn write_fields<'a, I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        write_record(&mut self.out, fields)
            .map_err(|source| TtmError::io(self.target.as_str(), source))?;
        self.rows += 1;
        Ok(())
    }

    /// Write an in-memory table, header first.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when writing fails.
    pub fn write_table(&mut self, table: &Table) -> Result<()> {
        self.write_header(table.header())?;
        for row in table.rows() {
            self.write_row(&row.id, row.cells.iter().map(String::as_str))?;
        }
        Ok(())
    }

    /// Flush buffered output.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|source| TtmError::io(self.target.as_str(), source))
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TableWriter<OutputSink> {
    /// Open a writer for `designator`.
    ///
    /// # Errors
    /// See [`OutputSink::open`].
    pub fn open(designator: &OutputDesignator) -> Result<Self> {
        let sink = OutputSink::open(designator)?;
        Ok(Self::new(sink.name(), sink))
    }

    /// Flush and commit the output.
    ///
    /// # Errors
    /// See [`OutputSink::finish`].
    pub fn finish(self) -> Result<()> {
        self.out.finish()
    }
}
