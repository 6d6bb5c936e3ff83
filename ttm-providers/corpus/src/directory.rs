//! The `cat` ingestor: a directory of plain-text files becomes a table.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use ttm_core::{DocumentId, Header, Result, Row, Table, TtmError};
use walkdir::WalkDir;

use crate::pairs::{PsqPair, consecutive_pairs};
use crate::split::Splitter;

/// Column holding the document text.
pub const TEXT_COLUMN: &str = "text";

/// A directory whose regular files, read in lexicographic name order, make
/// up a corpus.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CorpusDirectory {
    root: PathBuf,
}

/// One decoded corpus file.
#[derive(Clone, Debug, Eq, PartialEq)]
struct CorpusFile {
    name: String,
    text: String,
}

impl CorpusDirectory {
    /// Check that `root` is a directory.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when `root` is missing or not a directory.
    pub fn open(root: &Path) -> Result<Self> {
        let name = root.display().to_string();
        let metadata = fs::metadata(root).map_err(|source| TtmError::io(&name, source))?;
        if !metadata.is_dir() {
            return Err(TtmError::io(
                name,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Split every file with `splitter` into a table with a single
    /// [`TEXT_COLUMN`]; ids are `<file>:<index>`, counted from zero per file.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when the directory cannot be listed or a file
    /// cannot be read.
    #[instrument(name = "cat.ingest", err, skip(self), fields(root = %self.root.display()))]
    pub fn ingest(&self, splitter: Splitter) -> Result<Table> {
        let header = Header::new([TEXT_COLUMN])
            .map_err(|error| TtmError::format(self.root.display().to_string(), error))?;
        let mut table = Table::new(header);
        for file in self.files()? {
            for (index, text) in splitter.split(&file.text).into_iter().enumerate() {
                table
                    .push_row(Row::new(DocumentId::from_parts(&file.name, index), vec![text]))
                    .map_err(|error| TtmError::format(self.root.display().to_string(), error))?;
            }
        }
        info!(documents = table.len(), "ingested corpus");
        Ok(table)
    }

    /// Pairs of consecutive, non-overlapping documents within each file.
    ///
    /// # Errors
    /// See [`CorpusDirectory::ingest`].
    #[instrument(name = "cat.psq_pairs", err, skip(self), fields(root = %self.root.display()))]
    pub fn psq_pairs(&self, splitter: Splitter) -> Result<Vec<PsqPair>> {
        let mut pairs = Vec::new();
        for file in self.files()? {
            let ids: Vec<DocumentId> = (0..splitter.split(&file.text).len())
                .map(|index| DocumentId::from_parts(&file.name, index))
                .collect();
            pairs.extend(consecutive_pairs(&ids, splitter.stride()));
        }
        Ok(pairs)
    }

    fn files(&self) -> Result<Vec<CorpusFile>> {
        let mut files = Vec::new();
        // Symlinked files are read through; the row id keeps the link's name.
        let entries = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in entries {
            let entry = entry.map_err(|err| {
                let target = err
                    .path()
                    .unwrap_or(&self.root)
                    .display()
                    .to_string();
                TtmError::io(target, err.into())
            })?;
            if !entry.file_type().is_file() {
                debug!(path = %entry.path().display(), "skipping non-file entry");
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let bytes = fs::read(entry.path())
                .map_err(|source| TtmError::io(entry.path().display().to_string(), source))?;
            match String::from_utf8(bytes) {
                Ok(text) => files.push(CorpusFile { name, text }),
                Err(err) => warn!(file = %name, error = %err, "skipping file that is not UTF-8 text"),
            }
        }
        Ok(files)
    }
}
