//! Line-level passes behind [`super::TableSource`].

use std::fs::File;
use std::io::BufRead;
use std::path::PathBuf;

use tracing::info;

use crate::compression::Compression;
use crate::error::{Result, TtmError};

pub(super) type LinePass<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

pub(super) enum LineSource {
    /// Reopened and decoded from disk on every pass.
    Seekable {
        path: PathBuf,
        compression: Compression,
    },
    /// Drained into `lines` on the first pass, replayed afterwards.
    Buffered {
        pending: Option<Box<dyn BufRead>>,
        lines: Vec<String>,
    },
}

impl LineSource {
    pub(super) fn pass(&mut self, name: &str) -> Result<LinePass<'_>> {
        match self {
            Self::Seekable { path, compression } => {
                let file = File::open(&*path).map_err(|source| TtmError::io(name, source))?;
                let target = name.to_owned();
                Ok(Box::new(compression.reader(file).lines().map(move |line| {
                    line.map_err(|source| TtmError::io(target.as_str(), source))
                })))
            }
            Self::Buffered { pending, lines } => {
                if let Some(reader) = pending.take() {
                    drain(reader, lines, name)?;
                }
                Ok(Box::new(lines.iter().cloned().map(Ok)))
            }
        }
    }
}

fn drain(reader: Box<dyn BufRead>, lines: &mut Vec<String>, name: &str) -> Result<()> {
    for line in reader.lines() {
        lines.push(line.map_err(|source| TtmError::io(name, source))?);
    }
    info!(
        table = name,
        lines = lines.len(),
        "buffered non-seekable input in memory"
    );
    Ok(())
}
