//! Corpus ingestion for ttm.
//!
//! Builds fresh tables from raw text: `cat` reads a directory of plain-text
//! files and `20cat` a local 20 newsgroups tree. Both can emit psq pairs,
//! the ids of consecutive pages used to evaluate clusterings.

pub mod directory;
pub mod newsgroups;
pub mod pairs;
pub mod split;

pub use crate::{
    directory::{CorpusDirectory, TEXT_COLUMN},
    newsgroups::{MessageFilter, Newsgroups},
    pairs::{PsqPair, open_pairs, write_pairs},
    split::{SplitMode, Splitter, Window},
};
