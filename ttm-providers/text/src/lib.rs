//! Text-facing methods: tokenisation, document embeddings and cluster
//! descriptions, plus the `embed` and `desc` stages built on them.

pub mod desc;
pub mod embed;
pub mod tokenize;

pub use crate::{
    desc::{DescStage, Describer, describer_registry},
    embed::{EmbedStage, Embedder, embedder_registry},
    tokenize::tokenize,
};
