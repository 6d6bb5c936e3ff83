//! Support library for the `ttm` binary.
//!
//! Exposes the command surface and logging setup so integration tests can
//! drive whole pipeline verbs without spawning a process.

pub mod cli;
pub mod logging;
