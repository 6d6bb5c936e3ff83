//! The `20cat` ingestor for a local copy of the 20 newsgroups corpus.
//!
//! Two layouts are recognised: `ROOT/<group>/<message>` and the "bydate"
//! release, where `ROOT/20news-bydate-train` and `ROOT/20news-bydate-test`
//! each hold group directories. Training messages come before test messages.
//! Messages are Latin-1. Headers, quoted lines and signature blocks are
//! removed before whitespace is normalised; messages left empty are dropped
//! and do not consume a message number.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};
use ttm_core::{DocumentId, Header, Result, Row, Table, TtmError};
use walkdir::WalkDir;

use crate::directory::TEXT_COLUMN;
use crate::pairs::{PsqPair, consecutive_pairs};
use crate::split::{Window, normalise_whitespace};

/// Environment variable naming the corpus directory.
pub const DATA_HOME_ENV: &str = "TTM_20NEWS_HOME";

/// Column holding the newsgroup of each message.
pub const NEWSGROUP_COLUMN: &str = "newsgroup";

const BYDATE_SUBSETS: [&str; 2] = ["20news-bydate-train", "20news-bydate-test"];

const QUOTE_MARKERS: [&str; 5] = ["writes in", "writes:", "wrote:", "says:", "said:"];
const QUOTE_PREFIXES: [&str; 4] = ["In article", "Quoted from", "|", ">"];

/// Size limits a cleaned message must satisfy to be kept.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageFilter {
    /// Fewest characters.
    pub min_chars: usize,
    /// Fewest whitespace-separated tokens.
    pub min_tokens: usize,
    /// Most characters, unbounded when `None`.
    pub max_chars: Option<usize>,
    /// Most tokens, unbounded when `None`.
    pub max_tokens: Option<usize>,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            min_chars: 1,
            min_tokens: 1,
            max_chars: None,
            max_tokens: None,
        }
    }
}

impl MessageFilter {
    fn accepts(&self, text: &str) -> bool {
        let chars = text.chars().count();
        let tokens = text.split_whitespace().count();
        chars >= self.min_chars
            && tokens >= self.min_tokens
            && self.max_chars.is_none_or(|max| chars <= max)
            && self.max_tokens.is_none_or(|max| tokens <= max)
    }
}

/// One cleaned message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// `<group>.message-<NNN>`, numbered from one within each group.
    pub id: String,
    /// Newsgroup name.
    pub group: String,
    /// Cleaned, whitespace-normalised body.
    pub text: String,
}

/// A local 20 newsgroups tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Newsgroups {
    root: PathBuf,
}

impl Newsgroups {
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

    fn subsets(&self) -> Vec<PathBuf> {
        let bydate: Vec<PathBuf> = BYDATE_SUBSETS
            .iter()
            .map(|subset| self.root.join(subset))
            .filter(|path| path.is_dir())
            .collect();
        if bydate.is_empty() {
            vec![self.root.clone()]
        } else {
            bydate
        }
    }

    /// Every cleaned message that passes `filter`, in corpus order.
    ///
    /// # Errors
    /// Returns [`TtmError::Io`] when the tree cannot be listed or a message
    /// cannot be read.
    #[instrument(name = "20cat.messages", err, skip(self), fields(root = %self.root.display()))]
    pub fn messages(&self, filter: MessageFilter) -> Result<Vec<Message>> {
        let mut numbers: HashMap<String, usize> = HashMap::new();
        let mut messages = Vec::new();
        for subset in self.subsets() {
            let entries = WalkDir::new(&subset)
                .min_depth(2)
                .max_depth(2)
                .sort_by_file_name();
            for entry in entries {
                let entry = entry.map_err(|err| {
                    let target = err.path().unwrap_or(&subset).display().to_string();
                    TtmError::io(target, err.into())
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(group) = entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
                else {
                    continue;
                };
                let bytes = fs::read(entry.path())
                    .map_err(|source| TtmError::io(entry.path().display().to_string(), source))?;
                let text = clean_message(&decode_latin1(&bytes));
                if text.is_empty() {
                    continue;
                }
                let number = numbers.entry(group.clone()).or_insert(0);
                *number += 1;
                if filter.accepts(&text) {
                    messages.push(Message {
                        id: format!("{group}.message-{number:03}"),
                        group,
                        text,
                    });
                }
            }
        }
        info!(messages = messages.len(), groups = numbers.len(), "read newsgroups");
        Ok(messages)
    }

    /// Table with [`NEWSGROUP_COLUMN`] and [`TEXT_COLUMN`]. With a `window`,
    /// every message is cut into windows whose ids append `:<index>`.
    ///
    /// # Errors
    /// See [`Newsgroups::messages`].
    pub fn ingest(&self, filter: MessageFilter, window: Option<Window>) -> Result<Table> {
        let name = self.root.display().to_string();
        let header = Header::new([NEWSGROUP_COLUMN, TEXT_COLUMN])
            .map_err(|error| TtmError::format(&name, error))?;
        let mut table = Table::new(header);
        for message in self.messages(filter)? {
            let rows: Vec<Row> = match window {
                None => vec![Row::new(
                    DocumentId::new(message.id),
                    vec![message.group, message.text],
                )],
                Some(window) => window
                    .split(&message.text)
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| {
                        Row::new(
                            DocumentId::from_parts(&message.id, index),
                            vec![message.group.clone(), text],
                        )
                    })
                    .collect(),
            };
            for row in rows {
                table
                    .push_row(row)
                    .map_err(|error| TtmError::format(&name, error))?;
            }
        }
        Ok(table)
    }

    /// Pairs of consecutive, non-overlapping windows within each message.
    /// Without a window every message is a single page and there are none.
    ///
    /// # Errors
    /// See [`Newsgroups::messages`].
    pub fn psq_pairs(&self, filter: MessageFilter, window: Option<Window>) -> Result<Vec<PsqPair>> {
        let Some(window) = window else {
            return Ok(Vec::new());
        };
        let mut pairs = Vec::new();
        for message in self.messages(filter)? {
            let ids: Vec<DocumentId> = (0..window.split(&message.text).len())
                .map(|index| DocumentId::from_parts(&message.id, index))
                .collect();
            pairs.extend(consecutive_pairs(&ids, window.stride()));
        }
        Ok(pairs)
    }
}

/// Decode ISO-8859-1, where every byte is the code point of the same value.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Strip header, quoted lines and signature from a raw message, then
/// normalise whitespace.
#[must_use]
pub fn clean_message(raw: &str) -> String {
    let body = strip_header(raw);
    let unquoted = strip_quotes(body);
    normalise_whitespace(&strip_footer(&unquoted))
}

/// Everything after the first blank line; nothing when there is none.
fn strip_header(text: &str) -> &str {
    text.split_once("\n\n").map_or("", |(_, body)| body)
}

fn is_quote(line: &str) -> bool {
    QUOTE_MARKERS.iter().any(|marker| line.contains(marker))
        || QUOTE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

fn strip_quotes(text: &str) -> String {
    text.split('\n')
        .filter(|line| !is_quote(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop the signature block: everything from the last line that is blank or
/// made only of dashes. A text whose only such line is the first is kept.
fn strip_footer(text: &str) -> String {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    match lines
        .iter()
        .rposition(|line| line.trim().trim_matches('-').is_empty())
    {
        Some(separator) if separator > 0 => lines[..separator].join("\n"),
        _ => text.to_owned(),
    }
}
